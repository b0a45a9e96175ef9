//! # hevc-hwenc
//!
//! Control plane for hardware HEVC encoding: parameter negotiation,
//! per-generation capability specialization, and the asynchronous
//! submit/drain protocol that turns raw frames into a compressed bitstream.
//!
//! This crate deliberately contains no bitstream syntax and no vendor
//! bindings. The device is a trait ([`device::EncodeDevice`]); what lives
//! here is everything *around* it:
//!
//! ```text
//! EncoderConfig ──▸ ParameterSet
//!                        │
//!              ┌─────────▼──────────┐
//!              │  FeatureBlocks     │  query stages, in registration order
//!              │  gen11 → gen12 →   │  (later generations layer chains on
//!              │  roi               │   top of the base generation's)
//!              └─────────┬──────────┘
//!                        │ populates
//!              ┌─────────▼──────────┐
//!              │  FeatureStore      │  CapabilityDescriptor,
//!              │  (session-scoped)  │  DefaultsRegistry, platform buffers
//!              └─────────┬──────────┘
//!                        │ sizes
//!        SurfacePool + BitstreamBuffer
//!                        │
//!              ┌─────────▼──────────┐
//!              │  EncodeEngine      │  Feeding → Draining → Idle,
//!              │                    │  busy retry, buffer growth,
//!              └────────────────────┘  one sync per handle
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use hevc_hwenc::{EncoderConfig, EncodeSession};
//!
//! let config = EncoderConfig::load("encoder.toml")?;
//! let mut session = EncodeSession::open(&config, device)?;
//! let report = session.encode(&mut source, &mut sink)?;
//! println!("{} frames at {:.2} fps", report.frames, report.fps());
//! session.close();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Encoder configuration and mandatory-field validation
pub mod config;

/// Negotiated parameter set and frame geometry
pub mod params;

/// Session-scoped type-keyed store
pub mod store;

/// Default-policy chains and the specialization registry
pub mod defaults;

/// Hardware capability descriptor
pub mod caps;

/// Feature-block pipeline (stage registry and dispatch)
pub mod pipeline;

/// Per-generation and platform feature blocks
pub mod features;

/// Frame surfaces and the output bitstream buffer
pub mod surface;

/// Device collaborator trait and status model
pub mod device;

/// Submission/drain engine
pub mod engine;

/// Session orchestration
pub mod session;

/// Session statistics
pub mod stats;

/// Error types
pub mod error;

// Re-exports of the main entry points
pub use caps::{CapabilityDescriptor, Generation, RefDirection};
pub use config::EncoderConfig;
pub use defaults::{check_range_or_default, Chain, DefaultsParam, DefaultsRegistry, Lower};
pub use device::{
    DeviceError, DeviceWarning, EncodeDevice, EncodedUnit, NegotiatedParam, SubmitStatus,
    SurfaceRequest, SyncHandle,
};
pub use engine::{
    BitstreamSink, EncodeEngine, FrameSource, NullSink, Phase, RetryPolicy, SourceStatus,
    DEFAULT_SYNC_TIMEOUT,
};
pub use error::{EncodeError, EncodeResult};
pub use params::{
    ChromaFormat, Codec, CodecProfile, FrameGeometry, FrameRate, ParameterSet, RateControl,
    RegionOfInterest,
};
pub use pipeline::{FeatureBlocks, FeatureId, Stage};
pub use session::EncodeSession;
pub use stats::{EncodeReport, EncodeStats};
pub use store::FeatureStore;
pub use surface::{BitstreamBuffer, FrameSurface, SurfaceId, SurfacePool};
