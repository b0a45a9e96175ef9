//! Session orchestration
//!
//! Ties the configuration pipeline to the device protocol, in the order the
//! hardware expects:
//!
//! 1. validate the configuration and build the initial parameter set,
//! 2. seed the store with driver capabilities and run the query stages
//!    (defaults chains, capability specialization, ROI clamping),
//! 3. negotiate with the device (`query`, treating adjusted-parameter
//!    warnings as success),
//! 4. size and allocate the surface pool from `query_io_surf`,
//! 5. run init-alloc blocks (platform ROI descriptors), initialize the
//!    device, and size the bitstream buffer from the post-init parameters,
//! 6. hand the frozen parameter set to the engine.

use tracing::{debug, info, warn};

use crate::caps::CapabilityDescriptor;
use crate::config::EncoderConfig;
use crate::defaults::{DefaultsParam, DefaultsRegistry};
use crate::device::EncodeDevice;
use crate::engine::{BitstreamSink, EncodeEngine, FrameSource, Phase, RetryPolicy};
use crate::error::{EncodeError, EncodeResult};
use crate::features;
use crate::params::ParameterSet;
use crate::pipeline::{FeatureBlocks, Stage};
use crate::stats::{EncodeReport, EncodeStats};
use crate::store::FeatureStore;
use crate::surface::{BitstreamBuffer, SurfacePool};

/// One fully negotiated and initialized encode session
pub struct EncodeSession<D: EncodeDevice> {
    store: FeatureStore,
    engine: EncodeEngine<D>,
}

impl<D: EncodeDevice> EncodeSession<D> {
    /// Negotiate, allocate, and initialize a session on `device`
    pub fn open(config: &EncoderConfig, mut device: D) -> EncodeResult<Self> {
        config.validate()?;
        let mut par = config.to_parameter_set();

        // Seed the store with what the driver reports, then let the feature
        // blocks refine it.
        let mut store = FeatureStore::new();
        let hw_caps = device.hardware_caps()?;
        let generation = hw_caps.generation;
        debug!(?generation, max_ref = ?hw_caps.max_ref, "driver capabilities");
        store.insert(hw_caps);

        let mut blocks = FeatureBlocks::new();
        features::register_for(&mut blocks, generation);

        for stage in [Stage::QueryNoCaps, Stage::QueryWithCaps, Stage::QueryIoSurf] {
            let snapshot = par.clone();
            blocks.run_stage(stage, &snapshot, &mut par, &mut store)?;
        }

        // Derived parameters come off the top of the policy chains.
        let num_ref = {
            let caps = store.get::<CapabilityDescriptor>().ok_or(
                EncodeError::MissingSessionState {
                    what: "CapabilityDescriptor",
                },
            )?;
            let defaults =
                store
                    .get::<DefaultsRegistry>()
                    .ok_or(EncodeError::MissingSessionState {
                        what: "DefaultsRegistry",
                    })?;
            defaults.max_num_ref.eval(&DefaultsParam { par: &par, caps })
        };
        if let Some(refs) = num_ref {
            debug!(l0 = refs.0, l1 = refs.1, "derived active reference counts");
            par.num_ref_active = refs;
        }

        // Device-side negotiation; adjusted parameters are success.
        let (adjusted, query_warning) = device.query(&par)?;
        if let Some(warning) = query_warning {
            warn!(?warning, "device adjusted requested parameters");
        }
        par = adjusted;

        let request = device.query_io_surf(&par)?;
        let pool = SurfacePool::allocate(request.suggested_surfaces, request.geometry);

        // Platform-native resources (ROI descriptors) before init.
        let snapshot = par.clone();
        blocks.run_stage(Stage::InitAlloc, &snapshot, &mut par, &mut store)?;

        if let Some(warning) = device.init(&par)? {
            warn!(?warning, "device initialized with warning");
        }

        let negotiated = device.video_param()?;
        let bitstream = BitstreamBuffer::with_capacity_kb(negotiated.buffer_size_kb);

        info!(
            width = par.geometry.crop_w,
            height = par.geometry.crop_h,
            bitrate_kbps = par.target_kbps,
            target_usage = par.target_usage,
            low_power = par.low_power,
            surfaces = pool.len(),
            bitstream_kb = negotiated.buffer_size_kb,
            "encode session initialized"
        );

        // Parameter set is frozen from here on.
        Ok(Self {
            store,
            engine: EncodeEngine::new(device, pool, bitstream, par),
        })
    }

    /// Encode everything `source` provides and drain (see
    /// [`EncodeEngine::encode`])
    pub fn encode(
        &mut self,
        source: &mut dyn FrameSource,
        sink: &mut dyn BitstreamSink,
    ) -> EncodeResult<EncodeReport> {
        self.engine.encode(source, sink)
    }

    /// The session store populated during the query stage
    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    /// The frozen parameter set
    pub fn params(&self) -> &ParameterSet {
        self.engine.params()
    }

    /// Current engine phase
    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    /// Session statistics
    pub fn stats(&self) -> &EncodeStats {
        self.engine.stats()
    }

    /// Surface pool state
    pub fn pool(&self) -> &SurfacePool {
        self.engine.pool()
    }

    /// Override the busy-retry policy
    pub fn set_retry_policy(&mut self, retry: RetryPolicy) {
        self.engine.set_retry_policy(retry);
    }

    /// Override the completion-wait timeout
    pub fn set_sync_timeout(&mut self, timeout: std::time::Duration) {
        self.engine.set_sync_timeout(timeout);
    }

    /// Close the device and tear the session down
    pub fn close(self) -> D {
        self.engine.close()
    }
}

impl<D: EncodeDevice> std::fmt::Debug for EncodeSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodeSession")
            .field("engine", &self.engine)
            .field("store", &self.store)
            .finish()
    }
}
