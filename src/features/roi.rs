//! Region-of-interest block
//!
//! The generic part clamps the requested ROI list against the capability
//! limit during query. The platform part runs at init-alloc: it translates
//! the generic rectangles into the VA-style descriptors the acceleration
//! API consumes — a pure data transformation with no decision logic.

use tracing::debug;

use crate::caps::CapabilityDescriptor;
use crate::error::EncodeError;
use crate::params::RegionOfInterest;
use crate::pipeline::{FeatureBlocks, FeatureId, Stage};

/// One platform-native ROI descriptor (VA layout: rectangle plus a
/// priority/QP value)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaEncRoi {
    /// Rectangle x origin
    pub x: i16,
    /// Rectangle y origin
    pub y: i16,
    /// Rectangle width
    pub width: u16,
    /// Rectangle height
    pub height: u16,
    /// QP delta, clamped to the descriptor's i8 field
    pub value: i8,
}

impl From<&RegionOfInterest> for VaEncRoi {
    fn from(roi: &RegionOfInterest) -> Self {
        Self {
            x: roi.left as i16,
            y: roi.top as i16,
            width: roi.right.saturating_sub(roi.left) as u16,
            height: roi.bottom.saturating_sub(roi.top) as u16,
            value: roi.delta_qp.clamp(i8::MIN as i16, i8::MAX as i16) as i8,
        }
    }
}

/// Platform-native ROI descriptors, built during init-alloc
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VaRoiBuffer(pub Vec<VaEncRoi>);

/// Register the ROI stage callbacks
pub fn register(blocks: &mut FeatureBlocks) {
    // Adjustment pass: a list longer than the hardware limit is truncated,
    // never rejected.
    blocks.push(FeatureId::ROI, Stage::QueryWithCaps, |_, par, store| {
        let caps = store
            .get::<CapabilityDescriptor>()
            .ok_or(EncodeError::MissingSessionState {
                what: "CapabilityDescriptor",
            })?;
        let limit = caps.max_roi_regions as usize;
        if par.roi.len() > limit {
            debug!(
                requested = par.roi.len(),
                limit, "truncating ROI list to hardware limit"
            );
            par.roi.truncate(limit);
        }
        Ok(())
    });

    // Allocation pass: build the platform descriptors the driver consumes.
    blocks.push(FeatureId::ROI, Stage::InitAlloc, |_, par, store| {
        let descriptors: Vec<VaEncRoi> = par.roi.iter().map(VaEncRoi::from).collect();
        store.get_or_construct::<VaRoiBuffer>().0 = descriptors;
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EncoderConfig;
    use crate::store::FeatureStore;

    fn roi(left: u32, top: u32, right: u32, bottom: u32, delta_qp: i16) -> RegionOfInterest {
        RegionOfInterest {
            left,
            top,
            right,
            bottom,
            delta_qp,
        }
    }

    #[test]
    fn descriptor_translation_is_pure_geometry() {
        let va = VaEncRoi::from(&roi(64, 32, 320, 160, -5));
        assert_eq!(
            va,
            VaEncRoi {
                x: 64,
                y: 32,
                width: 256,
                height: 128,
                value: -5,
            }
        );
    }

    #[test]
    fn delta_qp_is_clamped_to_i8() {
        let va = VaEncRoi::from(&roi(0, 0, 16, 16, 300));
        assert_eq!(va.value, i8::MAX);
    }

    #[test]
    fn init_alloc_builds_descriptors_in_store() {
        let mut blocks = FeatureBlocks::new();
        register(&mut blocks);

        let mut par = EncoderConfig::default().to_parameter_set();
        par.roi = vec![roi(0, 0, 64, 64, -3), roi(64, 0, 128, 64, 2)];
        let par_in = par.clone();
        let mut store = FeatureStore::new();
        store.insert(CapabilityDescriptor {
            max_roi_regions: 8,
            ..Default::default()
        });

        blocks
            .run_stage(Stage::QueryWithCaps, &par_in, &mut par, &mut store)
            .unwrap();
        blocks
            .run_stage(Stage::InitAlloc, &par_in, &mut par, &mut store)
            .unwrap();

        let buffer = store.get::<VaRoiBuffer>().unwrap();
        assert_eq!(buffer.0.len(), 2);
        assert_eq!(buffer.0[0].value, -3);
    }

    #[test]
    fn roi_list_truncated_to_capability_limit() {
        let mut blocks = FeatureBlocks::new();
        register(&mut blocks);

        let mut par = EncoderConfig::default().to_parameter_set();
        par.roi = (0..4).map(|i| roi(i * 16, 0, i * 16 + 16, 16, 0)).collect();
        let par_in = par.clone();
        let mut store = FeatureStore::new();
        store.insert(CapabilityDescriptor {
            max_roi_regions: 2,
            ..Default::default()
        });

        blocks
            .run_stage(Stage::QueryWithCaps, &par_in, &mut par, &mut store)
            .unwrap();
        assert_eq!(par.roi.len(), 2);
    }
}
