//! Asynchronous submission/drain engine
//!
//! Drives one encoding session through its three phases:
//!
//! ```text
//! Feeding ──(input exhausted)──▸ Draining ──(no buffered frames)──▸ Idle
//! ```
//!
//! During `Feeding` the engine pulls raw frames into free pool surfaces and
//! submits them; a buffered submission (more-data, no handle) just advances
//! to the next frame. During `Draining` it submits null frames until the
//! device reports more-data for a flush, meaning nothing is left in flight.
//!
//! Backpressure is absorbed locally: a busy device is retried after a short
//! sleep under [`RetryPolicy`], and a too-small output buffer is grown
//! before the retry. Every handle the device issues is consumed by exactly
//! one synchronization wait before the surface it references can be reused.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::device::{EncodeDevice, SubmitStatus, SyncHandle};
use crate::error::{EncodeError, EncodeResult};
use crate::params::ParameterSet;
use crate::stats::{EncodeReport, EncodeStats};
use crate::surface::{BitstreamBuffer, SurfaceId, SurfacePool};

/// Default completion-wait timeout
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Busy-retry behavior
///
/// The device signals busy as pure backpressure; the engine sleeps one
/// quantum and repeats the identical submission. With `max_wait` unset the
/// retries continue until the device yields a handle or fails hard; a cap
/// turns a permanently busy device into a fatal
/// [`EncodeError::DeviceBusyTimeout`].
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Sleep between busy retries
    pub quantum: Duration,
    /// Total busy-wait budget per submission, if bounded
    pub max_wait: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            quantum: Duration::from_millis(1),
            max_wait: None,
        }
    }
}

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Input available; real frames are being submitted
    Feeding,
    /// Input exhausted; buffered frames are being flushed
    Draining,
    /// Fully drained; the session may be torn down
    Idle,
}

/// Raw-frame input collaborator
pub trait FrameSource {
    /// Fill `surface` with the next raw frame
    ///
    /// End of input is an expected terminator, signaled distinctly from
    /// errors via [`SourceStatus::EndOfStream`].
    fn read_frame(&mut self, surface: &mut crate::surface::FrameSurface)
        -> EncodeResult<SourceStatus>;
}

/// Outcome of one frame read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatus {
    /// A frame was written into the surface
    Frame,
    /// Input exhausted; feeding ends
    EndOfStream,
}

/// Encoded-output collaborator; appends one unit's bytes per call
pub trait BitstreamSink {
    /// Consume one encoded unit
    fn write_unit(&mut self, data: &[u8]) -> EncodeResult<()>;
}

/// Sink that discards all output (output suppression)
#[derive(Debug, Default)]
pub struct NullSink;

impl BitstreamSink for NullSink {
    fn write_unit(&mut self, _data: &[u8]) -> EncodeResult<()> {
        Ok(())
    }
}

/// Outcome of one submission attempt, after retries
enum Submit {
    Accepted(SyncHandle),
    MoreData,
}

/// The submission/drain engine for one initialized session
pub struct EncodeEngine<D: EncodeDevice> {
    device: D,
    pool: SurfacePool,
    bitstream: BitstreamBuffer,
    params: ParameterSet,
    retry: RetryPolicy,
    sync_timeout: Duration,
    stats: EncodeStats,
    phase: Phase,
}

impl<D: EncodeDevice> EncodeEngine<D> {
    /// Assemble an engine from negotiated parts (see [`crate::session`])
    pub fn new(
        device: D,
        pool: SurfacePool,
        bitstream: BitstreamBuffer,
        params: ParameterSet,
    ) -> Self {
        Self {
            device,
            pool,
            bitstream,
            params,
            retry: RetryPolicy::default(),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            stats: EncodeStats::default(),
            phase: Phase::Feeding,
        }
    }

    /// Override the busy-retry policy
    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.retry = retry;
    }

    /// Override the completion-wait timeout
    pub fn set_sync_timeout(&mut self, timeout: Duration) {
        self.sync_timeout = timeout;
    }

    /// The frozen parameter set this session was initialized with
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Current session phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Session statistics so far
    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// Surface pool state (for reuse diagnostics)
    pub fn pool(&self) -> &SurfacePool {
        &self.pool
    }

    /// Encode everything `source` provides, then drain
    ///
    /// Runs the feed loop until the source signals end of input, flushes the
    /// device's buffered frames, and returns the session summary. Any error
    /// is fatal: the session must be closed afterwards either way.
    pub fn encode(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn BitstreamSink,
    ) -> EncodeResult<EncodeReport> {
        let started = Instant::now();
        self.phase = Phase::Feeding;

        // Stage 1: main encoding loop.
        loop {
            let surface_id = self.acquire_surface()?;
            match source.read_frame(self.pool.get_mut(surface_id))? {
                SourceStatus::EndOfStream => break,
                SourceStatus::Frame => {}
            }

            match self.submit_with_retry(Some(surface_id))? {
                Submit::Accepted(handle) => self.sync_and_emit(handle, sink)?,
                // Frame buffered by the device; feed the next one.
                Submit::MoreData => continue,
            }
        }

        info!(
            frames = self.stats.frames_encoded,
            "input exhausted, draining buffered frames"
        );
        self.phase = Phase::Draining;

        // Stage 2: retrieve the buffered frames.
        loop {
            match self.submit_with_retry(None)? {
                Submit::Accepted(handle) => self.sync_and_emit(handle, sink)?,
                // No buffered frames remain.
                Submit::MoreData => break,
            }
        }

        self.phase = Phase::Idle;
        let report = EncodeReport {
            frames: self.stats.frames_encoded,
            bytes: self.stats.bytes_emitted,
            elapsed: started.elapsed(),
        };
        info!(
            frames = report.frames,
            bytes = report.bytes,
            fps = format!("{:.2}", report.fps()),
            "encode session drained"
        );
        Ok(report)
    }

    /// Close the device and release the session, returning the device for
    /// teardown inspection
    pub fn close(mut self) -> D {
        debug!(phase = ?self.phase, "closing encode session");
        self.device.close();
        self.device
    }

    fn acquire_surface(&self) -> EncodeResult<SurfaceId> {
        self.pool
            .find_free()
            .ok_or_else(|| EncodeError::SurfacePoolExhausted {
                in_use: self.pool.locked_count(),
                total: self.pool.len(),
            })
    }

    /// Submit one surface (or a flush), absorbing busy and capacity
    /// conditions
    fn submit_with_retry(&mut self, surface: Option<SurfaceId>) -> EncodeResult<Submit> {
        let mut waited = Duration::ZERO;
        loop {
            let status =
                self.device
                    .encode_frame_async(&mut self.pool, surface, &self.bitstream)?;
            match status {
                SubmitStatus::Accepted { handle, warning } => {
                    if let Some(warning) = warning {
                        // Warnings are not failures once a handle exists.
                        warn!(?warning, "device warning on submission");
                        self.stats.warnings += 1;
                    }
                    return Ok(Submit::Accepted(handle));
                }
                SubmitStatus::MoreData => return Ok(Submit::MoreData),
                SubmitStatus::Busy => {
                    if let Some(max_wait) = self.retry.max_wait {
                        if waited >= max_wait {
                            return Err(EncodeError::DeviceBusyTimeout {
                                waited_ms: waited.as_millis() as u64,
                                limit_ms: max_wait.as_millis() as u64,
                            });
                        }
                    }
                    trace!(waited_ms = waited.as_millis() as u64, "device busy, retrying");
                    self.stats.busy_retries += 1;
                    std::thread::sleep(self.retry.quantum);
                    waited += self.retry.quantum;
                }
                SubmitStatus::NotEnoughBuffer { required } => {
                    debug!(
                        required,
                        capacity = self.bitstream.capacity(),
                        "output buffer too small, growing"
                    );
                    self.stats.buffer_growths += 1;
                    self.bitstream.grow_to(required);
                }
            }
        }
    }

    /// Wait for one unit, move it through the bitstream buffer into the sink
    fn sync_and_emit(
        &mut self,
        handle: SyncHandle,
        sink: &mut dyn BitstreamSink,
    ) -> EncodeResult<()> {
        let wait_started = Instant::now();
        let unit = self
            .device
            .sync_operation(&mut self.pool, handle, self.sync_timeout)?;
        let sync_wait = wait_started.elapsed();

        self.bitstream.append(&unit.data)?;
        sink.write_unit(self.bitstream.unit())?;
        self.stats
            .record_frame(unit.data.len(), unit.key_frame, sync_wait);
        self.bitstream.clear();

        trace!(
            frame = self.stats.frames_encoded,
            bytes = unit.data.len(),
            key_frame = unit.key_frame,
            "unit synchronized"
        );
        Ok(())
    }
}

impl<D: EncodeDevice> std::fmt::Debug for EncodeEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeEngine")
            .field("phase", &self.phase)
            .field("surfaces", &self.pool.len())
            .field("bitstream_capacity", &self.bitstream.capacity())
            .finish()
    }
}
