//! Base-generation capability and defaults block
//!
//! Contributes the bottom layer of the reference-count chain (this hardware
//! has no random-access B support on the low-power path) and the baseline
//! capability rules that hold across generations.

use tracing::debug;

use crate::caps::{CapabilityDescriptor, RefDirection};
use crate::defaults::{check_range_or_default, DefaultsParam, DefaultsRegistry};
use crate::error::EncodeError;
use crate::pipeline::{FeatureBlocks, FeatureId, Stage};

/// Reference counts per `[path][direction][target_usage - 1]`
///
/// Two encode paths on this generation: the general-purpose motion
/// estimation block (VME) and the fixed-function low-power block (VDENC),
/// which only produces P GOPs here.
const NREF: [[[u16; 7]; 2]; 2] = [
    // VME
    [[4, 4, 3, 3, 3, 1, 1], [2, 2, 1, 1, 1, 1, 1]],
    // VDENC P
    [[3, 3, 2, 2, 2, 1, 1], [3, 3, 2, 2, 2, 1, 1]],
];

/// Bottom layer of the reference-count chain
pub(crate) fn derive_max_num_ref(dpar: &DefaultsParam<'_>) -> (u16, u16) {
    let path = dpar.par.low_power as usize;
    let tu = check_range_or_default(dpar.par.target_usage, 1, 7, 4) as usize - 1;
    let count = |dir: RefDirection| -> u16 {
        NREF[path][dir as usize][tu].min(dpar.caps.max_ref_for(dir))
    };
    (
        count(RefDirection::Forward),
        count(RefDirection::Backward),
    )
}

/// Register the base generation's stage callbacks
pub fn register(blocks: &mut FeatureBlocks) {
    // Defaults chain contribution; guarded so layered re-queries do not
    // stack duplicate layers.
    blocks.push(FeatureId::GEN11_CAPS, Stage::QueryNoCaps, |_, _, store| {
        let defaults = store.get_or_construct::<DefaultsRegistry>();
        if !defaults.mark_specialized(FeatureId::GEN11_CAPS) {
            return Ok(());
        }
        defaults
            .max_num_ref
            .push(|_, dpar| derive_max_num_ref(dpar));
        debug!("registered base reference-count layer");
        Ok(())
    });

    // Baseline capability rules, computable from generic facts alone.
    blocks.push(FeatureId::GEN11_CAPS, Stage::QueryWithCaps, |_, par, store| {
        let caps = store
            .get_mut::<CapabilityDescriptor>()
            .ok_or(EncodeError::MissingSessionState {
                what: "CapabilityDescriptor",
            })?;

        caps.slice_ip_only = par.low_power && par.target_usage == 7;
        caps.yuv422_recon_support |= !caps.color420_only && !par.low_power;

        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;

    #[test]
    fn vme_path_row_selected_without_low_power() {
        let mut par = EncoderConfig::default().to_parameter_set();
        par.low_power = false;
        par.target_usage = 1;
        let caps = CapabilityDescriptor {
            max_ref: [8, 8],
            ..Default::default()
        };
        let refs = derive_max_num_ref(&DefaultsParam { par: &par, caps: &caps });
        assert_eq!(refs, (4, 2));
    }

    #[test]
    fn low_power_selects_vdenc_row() {
        let mut par = EncoderConfig::default().to_parameter_set();
        par.low_power = true;
        par.target_usage = 1;
        let caps = CapabilityDescriptor {
            max_ref: [8, 8],
            ..Default::default()
        };
        let refs = derive_max_num_ref(&DefaultsParam { par: &par, caps: &caps });
        assert_eq!(refs, (3, 3));
    }
}
