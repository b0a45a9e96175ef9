//! Feature-block pipeline
//!
//! The composition root of the query machinery. Feature blocks — one per
//! hardware generation or platform concern — register stage callbacks here,
//! and [`FeatureBlocks::run_stage`] dispatches them in registration order.
//! The pipeline itself computes nothing: defaults and capabilities are
//! entirely the business of the registered callbacks.
//!
//! Later hardware generations layer *additional* blocks on top of the base
//! generation's blocks. They never replace a base block's registrations,
//! only extend the chains those registrations populated. A stage may
//! therefore run the same callback list more than once across layered
//! queries; callbacks guard their own side effects through the
//! [`crate::defaults::DefaultsRegistry`] specialization flags.

use tracing::{trace, warn};

use crate::error::EncodeResult;
use crate::params::ParameterSet;
use crate::store::FeatureStore;

/// Identity of one feature block
///
/// Stable numeric identities, used both for registration bookkeeping and as
/// keys for the per-feature specialization flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureId(pub u32);

impl FeatureId {
    /// Base-generation capability and defaults block
    pub const GEN11_CAPS: Self = Self(1);
    /// Later-generation capability and defaults block
    pub const GEN12_CAPS: Self = Self(2);
    /// Region-of-interest block
    pub const ROI: Self = Self(3);
}

/// Pipeline stages, in session order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Derive defaults that need no hardware capability data
    QueryNoCaps,
    /// Refine the capability descriptor against the parameter set
    QueryWithCaps,
    /// Contribute to surface-count negotiation
    QueryIoSurf,
    /// Build platform-native resources ahead of device init
    InitAlloc,
}

/// A stage callback: reads the incoming parameter set, may adjust the
/// outgoing one, and works against the shared store
pub type StageCallback =
    Box<dyn Fn(&ParameterSet, &mut ParameterSet, &mut FeatureStore) -> EncodeResult<()>>;

struct BlockEntry {
    block: FeatureId,
    stage: Stage,
    callback: StageCallback,
}

/// Ordered registry of feature-block stage callbacks
#[derive(Default)]
pub struct FeatureBlocks {
    entries: Vec<BlockEntry>,
}

impl FeatureBlocks {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` to run when `stage` executes
    ///
    /// Callbacks run in registration order within a stage, so base-generation
    /// blocks must register before the generations layered on top of them.
    pub fn push<F>(&mut self, block: FeatureId, stage: Stage, callback: F)
    where
        F: Fn(&ParameterSet, &mut ParameterSet, &mut FeatureStore) -> EncodeResult<()> + 'static,
    {
        self.entries.push(BlockEntry {
            block,
            stage,
            callback: Box::new(callback),
        });
    }

    /// Run every callback registered for `stage`, in registration order
    ///
    /// The first non-success status short-circuits the stage and surfaces to
    /// the caller.
    pub fn run_stage(
        &self,
        stage: Stage,
        par_in: &ParameterSet,
        par_out: &mut ParameterSet,
        store: &mut FeatureStore,
    ) -> EncodeResult<()> {
        for entry in self.entries.iter().filter(|e| e.stage == stage) {
            trace!(block = ?entry.block, ?stage, "running feature block");
            (entry.callback)(par_in, par_out, store).map_err(|err| {
                warn!(block = ?entry.block, ?stage, %err, "feature block failed");
                err
            })?;
        }
        Ok(())
    }

    /// Number of callbacks registered for `stage`
    pub fn stage_len(&self, stage: Stage) -> usize {
        self.entries.iter().filter(|e| e.stage == stage).count()
    }
}

impl std::fmt::Debug for FeatureBlocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureBlocks")
            .field("entries", &self.entries.len())
            .finish()
    }
}
