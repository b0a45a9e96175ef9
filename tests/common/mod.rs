#![allow(dead_code)]

//! Shared test support: a scripted in-process encode device
//!
//! `MockDevice` simulates the hardware collaborator's observable protocol:
//! FIFO completion, frame buffering before the first output, busy streaks,
//! output-capacity rejections, warnings, and sync timeouts. Tests configure
//! the public fields before handing the device to `EncodeSession::open`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use hevc_hwenc::{
    BitstreamBuffer, BitstreamSink, CapabilityDescriptor, DeviceError, DeviceWarning,
    EncodeDevice, EncodeResult, EncodedUnit, FrameSource, FrameSurface, Generation,
    NegotiatedParam, ParameterSet, SourceStatus, SubmitStatus, SurfaceId, SurfacePool,
    SurfaceRequest, SyncHandle,
};

/// Counters observable after the session consumed the device
#[derive(Debug, Default)]
pub struct MockState {
    pub query_calls: u32,
    pub frame_submits: u32,
    pub null_submits: u32,
    pub sync_calls: u32,
    pub closed: bool,
}

pub struct MockDevice {
    /// Driver capabilities reported to the session
    pub caps: CapabilityDescriptor,
    /// Post-init buffer sizing hint
    pub buffer_size_kb: u32,
    /// Bytes every encoded unit occupies
    pub unit_size: usize,
    /// Frames the device buffers before producing its first output
    pub buffer_depth: usize,
    /// Surfaces suggested by `query_io_surf` (raised to fit `buffer_depth`)
    pub suggested_surfaces: u16,
    /// Number of leading `encode_frame_async` calls answered with busy
    pub busy_times: u32,
    /// Warning attached to the `query` result
    pub query_warning: Option<DeviceWarning>,
    /// Warning attached to the `init` result
    pub init_warning: Option<DeviceWarning>,
    /// Warning attached to the next accepted submission (consumed once)
    pub submit_warning: Option<DeviceWarning>,
    /// 1-based sync call that times out, if any
    pub sync_timeout_on: Option<u32>,

    pub state: Rc<RefCell<MockState>>,

    queued: VecDeque<SurfaceId>,
    pending: VecDeque<(u64, SurfaceId)>,
    next_handle: u64,
    frames_emitted: u64,
    initialized: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            caps: CapabilityDescriptor {
                generation: Generation::Gen12,
                max_ref: [8, 1],
                color420_only: false,
                max_roi_regions: 8,
                ten_bit_support: true,
                ..Default::default()
            },
            buffer_size_kb: 2,
            unit_size: 1000,
            buffer_depth: 0,
            suggested_surfaces: 4,
            busy_times: 0,
            query_warning: None,
            init_warning: None,
            submit_warning: None,
            sync_timeout_on: None,
            state: Rc::new(RefCell::new(MockState::default())),
            queued: VecDeque::new(),
            pending: VecDeque::new(),
            next_handle: 0,
            frames_emitted: 0,
            initialized: false,
        }
    }

    /// Shared handle onto the call counters
    pub fn state_handle(&self) -> Rc<RefCell<MockState>> {
        Rc::clone(&self.state)
    }

    fn issue_handle(&mut self, surface: SurfaceId) -> SubmitStatus {
        self.next_handle += 1;
        self.pending.push_back((self.next_handle, surface));
        SubmitStatus::Accepted {
            handle: SyncHandle::from_raw(self.next_handle),
            warning: self.submit_warning.take(),
        }
    }
}

impl EncodeDevice for MockDevice {
    fn hardware_caps(&mut self) -> Result<CapabilityDescriptor, DeviceError> {
        Ok(self.caps.clone())
    }

    fn query(
        &mut self,
        par: &ParameterSet,
    ) -> Result<(ParameterSet, Option<DeviceWarning>), DeviceError> {
        self.state.borrow_mut().query_calls += 1;
        Ok((par.clone(), self.query_warning))
    }

    fn query_io_surf(&mut self, par: &ParameterSet) -> Result<SurfaceRequest, DeviceError> {
        Ok(SurfaceRequest {
            suggested_surfaces: self
                .suggested_surfaces
                .max(self.buffer_depth as u16 + 2),
            geometry: par.geometry,
        })
    }

    fn init(&mut self, _par: &ParameterSet) -> Result<Option<DeviceWarning>, DeviceError> {
        self.initialized = true;
        Ok(self.init_warning)
    }

    fn video_param(&self) -> Result<NegotiatedParam, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        Ok(NegotiatedParam {
            buffer_size_kb: self.buffer_size_kb,
        })
    }

    fn encode_frame_async(
        &mut self,
        pool: &mut SurfacePool,
        surface: Option<SurfaceId>,
        bitstream: &BitstreamBuffer,
    ) -> Result<SubmitStatus, DeviceError> {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        if self.busy_times > 0 {
            self.busy_times -= 1;
            return Ok(SubmitStatus::Busy);
        }
        if bitstream.capacity() < self.unit_size {
            return Ok(SubmitStatus::NotEnoughBuffer {
                required: self.unit_size,
            });
        }

        match surface {
            Some(id) => {
                self.state.borrow_mut().frame_submits += 1;
                pool.lock(id);
                self.queued.push_back(id);
                if self.queued.len() <= self.buffer_depth {
                    // Buffered; output needs more input first.
                    return Ok(SubmitStatus::MoreData);
                }
                let ready = self.queued.pop_front().expect("queue non-empty");
                Ok(self.issue_handle(ready))
            }
            None => {
                self.state.borrow_mut().null_submits += 1;
                match self.queued.pop_front() {
                    Some(ready) => Ok(self.issue_handle(ready)),
                    None => Ok(SubmitStatus::MoreData),
                }
            }
        }
    }

    fn sync_operation(
        &mut self,
        pool: &mut SurfacePool,
        handle: SyncHandle,
        timeout: Duration,
    ) -> Result<EncodedUnit, DeviceError> {
        let call = {
            let mut state = self.state.borrow_mut();
            state.sync_calls += 1;
            state.sync_calls
        };
        if self.sync_timeout_on == Some(call) {
            return Err(DeviceError::SyncTimeout {
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        // Completion is FIFO; anything else is a handle the device does not
        // recognize as next.
        let (expected, surface) = self
            .pending
            .pop_front()
            .ok_or(DeviceError::UnknownHandle(handle.raw()))?;
        if expected != handle.raw() {
            return Err(DeviceError::UnknownHandle(handle.raw()));
        }

        pool.unlock(surface);
        self.frames_emitted += 1;
        Ok(EncodedUnit {
            data: vec![0xAB; self.unit_size],
            key_frame: self.frames_emitted == 1,
        })
    }

    fn close(&mut self) {
        self.state.borrow_mut().closed = true;
    }
}

/// Frame source producing a fixed number of synthetic frames
pub struct TestSource {
    pub frames: usize,
    produced: usize,
}

impl TestSource {
    pub fn new(frames: usize) -> Self {
        Self { frames, produced: 0 }
    }
}

impl FrameSource for TestSource {
    fn read_frame(&mut self, surface: &mut FrameSurface) -> EncodeResult<SourceStatus> {
        if self.produced == self.frames {
            return Ok(SourceStatus::EndOfStream);
        }
        self.produced += 1;
        surface.data[0] = self.produced as u8;
        Ok(SourceStatus::Frame)
    }
}

/// Sink collecting every emitted unit
#[derive(Default)]
pub struct CollectSink {
    pub units: Vec<Vec<u8>>,
}

impl BitstreamSink for CollectSink {
    fn write_unit(&mut self, data: &[u8]) -> EncodeResult<()> {
        self.units.push(data.to_vec());
        Ok(())
    }
}

/// Initialize tracing once for a test binary
#[allow(dead_code)]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
