//! Device/session collaborator interface
//!
//! [`EncodeDevice`] is the seam between the control plane and whatever
//! actually produces the bitstream — a VA-API driver, a vendor SDK, or a
//! simulated device in tests. The submission path is caller-driven
//! asynchronous dispatch: `encode_frame_async` returns immediately with a
//! [`SyncHandle`] (or a backpressure/exhaustion status), and
//! `sync_operation` is the only blocking point.
//!
//! Within one session the device preserves submission order: handles
//! complete FIFO relative to their issuance.

use std::time::Duration;

use thiserror::Error;

use crate::caps::CapabilityDescriptor;
use crate::params::{FrameGeometry, ParameterSet};
use crate::surface::{BitstreamBuffer, SurfaceId, SurfacePool};

/// Correlator between one asynchronous submission and its completion wait
///
/// Deliberately not `Clone`: a handle is consumed by exactly one
/// `sync_operation` call, and the move enforces that at compile time.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SyncHandle(u64);

impl SyncHandle {
    /// Construct a handle from a device-native token (device implementations
    /// only)
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The device-native token
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Non-fatal conditions a device may attach to a successful call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWarning {
    /// Requested parameters were adjusted to the closest supported set
    IncompatibleParam,
    /// Initialization fell back to partial acceleration
    PartialAcceleration,
}

/// Outcome of one `encode_frame_async` call
#[derive(Debug)]
pub enum SubmitStatus {
    /// Work accepted; a warning alongside a handle still counts as success
    Accepted {
        /// Completion correlator for this submission
        handle: SyncHandle,
        /// Optional non-fatal condition
        warning: Option<DeviceWarning>,
    },
    /// Device busy, no handle produced; retry the identical call after a
    /// short sleep
    Busy,
    /// More input needed before output can be produced. During feeding this
    /// means the frame was buffered; for a null submission it means the
    /// drain is complete.
    MoreData,
    /// Output buffer too small for the pending unit; grow and retry
    NotEnoughBuffer {
        /// Minimum capacity in bytes the unit requires
        required: usize,
    },
}

/// Surface-count negotiation result
#[derive(Debug, Clone, Copy)]
pub struct SurfaceRequest {
    /// Number of surfaces the device suggests allocating
    pub suggested_surfaces: u16,
    /// Geometry the surfaces must be allocated with (may be padded)
    pub geometry: FrameGeometry,
}

/// Parameters the device settled on after initialization
#[derive(Debug, Clone, Copy)]
pub struct NegotiatedParam {
    /// Output buffer sizing hint, in kilobytes
    pub buffer_size_kb: u32,
}

/// One completed encoded unit
///
/// May be empty when output suppression is configured.
#[derive(Debug)]
pub struct EncodedUnit {
    /// Encoded bytes
    pub data: Vec<u8>,
    /// Whether the unit is a random-access point
    pub key_frame: bool,
}

/// Fatal device statuses
///
/// Everything here tears the session down; backpressure and exhaustion
/// travel through [`SubmitStatus`] instead.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A completion wait did not finish within its timeout
    #[error("synchronization timed out after {timeout_ms} ms")]
    SyncTimeout {
        /// The timeout that elapsed
        timeout_ms: u64,
    },

    /// Operation before `init`
    #[error("device not initialized")]
    NotInitialized,

    /// A handle the device never issued (or already consumed)
    #[error("unknown sync handle {0}")]
    UnknownHandle(u64),

    /// Any other negative device status
    #[error("device reported status {status}: {context}")]
    Hardware {
        /// Originating status code
        status: i32,
        /// Operation that produced it
        context: &'static str,
    },
}

/// Result alias for device calls
pub type DeviceResult<T> = Result<T, DeviceError>;

/// The hardware encode device
pub trait EncodeDevice {
    /// Report driver capabilities; seeds the session capability descriptor
    /// before the query stage runs
    fn hardware_caps(&mut self) -> DeviceResult<CapabilityDescriptor>;

    /// Capability-clamped parameter negotiation
    ///
    /// Returns the adjusted parameter set; an `IncompatibleParam` warning
    /// means the device substituted the closest supported configuration and
    /// must be treated as success.
    fn query(&mut self, par: &ParameterSet)
        -> DeviceResult<(ParameterSet, Option<DeviceWarning>)>;

    /// Number and geometry of surfaces this configuration needs
    fn query_io_surf(&mut self, par: &ParameterSet) -> DeviceResult<SurfaceRequest>;

    /// Initialize the device; freezes the parameter set
    ///
    /// A `PartialAcceleration` warning is treated as success.
    fn init(&mut self, par: &ParameterSet) -> DeviceResult<Option<DeviceWarning>>;

    /// Parameters selected by the device, the source of final buffer sizing
    fn video_param(&self) -> DeviceResult<NegotiatedParam>;

    /// Submit one frame (or `None` to flush buffered frames)
    ///
    /// Returns immediately. The device locks the surfaces it keeps as input
    /// or reference and unlocks them once no longer needed. `bitstream` is
    /// inspected for capacity only; encoded bytes are delivered at sync.
    fn encode_frame_async(
        &mut self,
        pool: &mut SurfacePool,
        surface: Option<SurfaceId>,
        bitstream: &BitstreamBuffer,
    ) -> DeviceResult<SubmitStatus>;

    /// Block until the referenced unit completes or `timeout` elapses
    ///
    /// A timeout is fatal for the session. Completion order is FIFO with
    /// respect to submission order.
    fn sync_operation(
        &mut self,
        pool: &mut SurfacePool,
        handle: SyncHandle,
        timeout: Duration,
    ) -> DeviceResult<EncodedUnit>;

    /// Release device resources; no further submissions are valid
    fn close(&mut self);
}
