//! Hardware capability descriptor
//!
//! [`CapabilityDescriptor`] mixes two kinds of fields: raw limits reported
//! by the device driver (reference-count maxima, chroma support, suggested
//! surface counts) and policy-derived flags the query stage computes from
//! generic rules plus per-generation specialization. The device seeds the
//! descriptor before the query stage runs; feature blocks refine it; after
//! that it is read-only for the whole session.

/// Hardware generation of the encode block
///
/// Ordering matters: a session on a later generation runs the feature
/// blocks of every generation up to and including its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Generation {
    /// First generation with the low-power (VDENC) path
    Gen11,
    /// Adds random-access B support on the low-power path
    #[default]
    Gen12,
}

/// Reference-list direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefDirection {
    /// L0, past references
    Forward = 0,
    /// L1, future references
    Backward = 1,
}

/// Hardware-reported and policy-derived encode capabilities
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapabilityDescriptor {
    /// Hardware generation
    pub generation: Generation,

    /// Driver-reported maximum reference counts, indexed by direction
    pub max_ref: [u16; 2],

    /// Device only supports 4:2:0 reconstruction
    pub color420_only: bool,

    /// Maximum region-of-interest rectangles per frame
    pub max_roi_regions: u16,

    /// 10-bit encode support
    pub ten_bit_support: bool,

    // -------------------------------------------------------------------
    // Policy-derived flags, written by the query stage
    // -------------------------------------------------------------------
    /// Slices restricted to I/P types (fastest low-power mode)
    pub slice_ip_only: bool,

    /// 4:2:2 reconstruction path enabled
    pub yuv422_recon_support: bool,

    /// Single-slice frames may span multiple tiles
    pub single_slice_multi_tile: bool,
}

impl CapabilityDescriptor {
    /// Driver-reported maximum for one reference direction
    pub fn max_ref_for(&self, dir: RefDirection) -> u16 {
        self.max_ref[dir as usize]
    }
}
