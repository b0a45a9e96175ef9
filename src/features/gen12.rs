//! Later-generation capability and defaults block
//!
//! Layers on top of [`super::gen11`]: replaces the active reference-count
//! layer with the table that accounts for random-access B GOPs on the
//! low-power path, and hardcodes the capability bits this generation pins
//! regardless of what the driver reports.

use tracing::debug;

use crate::caps::{CapabilityDescriptor, RefDirection};
use crate::defaults::{check_range_or_default, DefaultsParam, DefaultsRegistry};
use crate::error::EncodeError;
use crate::pipeline::{FeatureBlocks, FeatureId, Stage};

/// Encode mode rows of the reference-count table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefMode {
    /// General-purpose motion estimation, any GOP
    Vme = 0,
    /// Low-power path, P-only GOP
    VdencP = 1,
    /// Low-power path, random-access B GOP
    VdencRaB = 2,
}

impl RefMode {
    fn select(low_power: bool, b_frames: bool) -> Self {
        match (low_power, b_frames) {
            (false, _) => RefMode::Vme,
            (true, false) => RefMode::VdencP,
            (true, true) => RefMode::VdencRaB,
        }
    }
}

/// Reference counts per `[mode][direction][target_usage - 1]`
const NREF: [[[u16; 7]; 2]; 3] = [
    // VME
    [[4, 4, 3, 3, 3, 1, 1], [2, 2, 1, 1, 1, 1, 1]],
    // VDENC P
    [[3, 3, 2, 2, 2, 1, 1], [3, 3, 2, 2, 2, 1, 1]],
    // VDENC RA B
    [[2, 2, 1, 1, 1, 1, 1], [1, 1, 1, 1, 1, 1, 1]],
];

/// Active reference-count computation for this generation
///
/// Closed small-table decision: range-check target usage (default 4), index
/// the table, then clamp against the driver-reported per-direction maxima —
/// in that order.
pub(crate) fn derive_max_num_ref(dpar: &DefaultsParam<'_>) -> (u16, u16) {
    let mode = RefMode::select(dpar.par.low_power, dpar.par.has_b_frames()) as usize;
    let tu = check_range_or_default(dpar.par.target_usage, 1, 7, 4) as usize - 1;
    let count = |dir: RefDirection| -> u16 {
        NREF[mode][dir as usize][tu].min(dpar.caps.max_ref_for(dir))
    };
    (
        count(RefDirection::Forward),
        count(RefDirection::Backward),
    )
}

/// Register this generation's stage callbacks
pub fn register(blocks: &mut FeatureBlocks) {
    blocks.push(FeatureId::GEN12_CAPS, Stage::QueryNoCaps, |_, _, store| {
        let defaults = store.get_or_construct::<DefaultsRegistry>();
        if !defaults.mark_specialized(FeatureId::GEN12_CAPS) {
            return Ok(());
        }
        defaults
            .max_num_ref
            .push(|_, dpar| derive_max_num_ref(dpar));
        debug!("registered RA-B aware reference-count layer");
        Ok(())
    });

    // Hardcoded capability bits for this generation.
    blocks.push(FeatureId::GEN12_CAPS, Stage::QueryWithCaps, |_, _, store| {
        let caps = store
            .get_mut::<CapabilityDescriptor>()
            .ok_or(EncodeError::MissingSessionState {
                what: "CapabilityDescriptor",
            })?;
        caps.single_slice_multi_tile = false;
        Ok(())
    });
}
