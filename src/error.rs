//! Unified error types for the encode control plane
//!
//! Only the *fatal* class of conditions is expressed as an error here.
//! The other outcomes a hardware encoder produces are handled locally and
//! never reach the caller as failures:
//!
//! - parameter adjustments (out-of-range values clamped or defaulted),
//! - backpressure (device busy, output buffer too small),
//! - exhaustion ("more data needed" at the end of the feed or drain phase).
//!
//! Those travel through [`crate::device::SubmitStatus`] and the retry logic
//! in [`crate::engine`]; anything that lands in this enum tears the session
//! down.

use std::path::PathBuf;
use thiserror::Error;

use crate::device::DeviceError;

/// Result alias used throughout the crate
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Unified error type for encode control-plane operations
#[derive(Debug, Error)]
pub enum EncodeError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A mandatory configuration field is missing or invalid
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read a configuration file
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        /// Path that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a TOML configuration file
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // =========================================================================
    // Negotiation Errors
    // =========================================================================
    /// A pipeline stage referenced session state that was never constructed
    #[error("query stage did not populate {what}")]
    MissingSessionState {
        /// Name of the missing store entry
        what: &'static str,
    },

    // =========================================================================
    // Runtime Encoding Errors
    // =========================================================================
    /// No free surface in the pool (the device holds every slot)
    #[error("surface pool exhausted ({in_use} of {total} in use)")]
    SurfacePoolExhausted {
        /// Surfaces currently owned by the device
        in_use: usize,
        /// Pool capacity
        total: usize,
    },

    /// The device stayed busy past the configured retry budget
    #[error("device busy for {waited_ms} ms (limit {limit_ms} ms)")]
    DeviceBusyTimeout {
        /// Total time spent in busy-retry sleeps
        waited_ms: u64,
        /// Configured cap from [`crate::engine::RetryPolicy`]
        limit_ms: u64,
    },

    /// An encoded unit did not fit the bitstream buffer after growth
    #[error("encoded unit of {needed} bytes exceeds bitstream capacity {capacity}")]
    BitstreamOverflow {
        /// Bytes the unit requires
        needed: usize,
        /// Current buffer capacity
        capacity: usize,
    },

    /// Frame source failure (distinct from orderly end-of-input)
    #[error("frame source error: {0}")]
    Source(#[source] std::io::Error),

    /// Bitstream sink failure
    #[error("bitstream sink error: {0}")]
    Sink(#[source] std::io::Error),

    // =========================================================================
    // Device Errors (wrapped)
    // =========================================================================
    /// Fatal status from the device collaborator, including sync timeouts
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl EncodeError {
    /// Check whether this error was raised before the device was initialized
    /// (configuration or negotiation stage) rather than mid-stream.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            EncodeError::InvalidConfig(_)
                | EncodeError::ConfigIo { .. }
                | EncodeError::ConfigParse(_)
                | EncodeError::MissingSessionState { .. }
        )
    }
}
