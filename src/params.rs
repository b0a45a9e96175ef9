//! Negotiated encode parameter set
//!
//! [`ParameterSet`] is the mutable working copy of the encode configuration.
//! It is built from [`crate::config::EncoderConfig`], adjusted by the query
//! stage (feature blocks may clamp or derive fields), then frozen once the
//! device is initialized. After that point the engine treats it as
//! read-only.

use serde::{Deserialize, Serialize};

/// Align up to a multiple of 16 (coded picture geometry)
pub(crate) fn align16(v: u32) -> u32 {
    (v + 15) & !15
}

/// Align up to a multiple of 32 (surface allocation geometry)
pub(crate) fn align32(v: u32) -> u32 {
    (v + 31) & !31
}

/// Codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// H.265 / HEVC
    #[default]
    Hevc,
    /// H.264 / AVC
    Avc,
}

/// Codec profile, derived from bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecProfile {
    /// 8-bit 4:2:0
    #[default]
    Main,
    /// 10-bit 4:2:0
    Main10,
}

/// Rate-control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    /// Variable bitrate targeting an average
    #[default]
    Vbr,
    /// Constant bitrate
    Cbr,
    /// Constant quantizer
    Cqp,
}

/// Chroma subsampling of the input surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromaFormat {
    /// 4:2:0 (NV12 / P010)
    #[default]
    Yuv420,
    /// 4:2:2
    Yuv422,
}

/// Frame rate as an exact rational
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    /// Numerator (e.g. 30)
    pub num: u32,
    /// Denominator (e.g. 1)
    pub den: u32,
}

/// Frame geometry with coded (aligned) and visible (crop) dimensions
///
/// Coded width/height follow the hardware alignment rules: a multiple of 16
/// for progressive content. Surface allocation additionally aligns to 32 and
/// doubles bytes per sample for 10-bit formats (P010 stores each sample in
/// two bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    /// Coded width (16-aligned)
    pub width: u32,
    /// Coded height (16-aligned, progressive)
    pub height: u32,
    /// Visible width
    pub crop_w: u32,
    /// Visible height
    pub crop_h: u32,
    /// Luma/chroma bit depth (8 or 10)
    pub bit_depth: u8,
    /// Chroma subsampling
    pub chroma: ChromaFormat,
}

impl FrameGeometry {
    /// Build coded geometry from visible dimensions
    pub fn progressive(crop_w: u32, crop_h: u32, bit_depth: u8) -> Self {
        Self {
            width: align16(crop_w),
            height: align16(crop_h),
            crop_w,
            crop_h,
            bit_depth,
            chroma: ChromaFormat::Yuv420,
        }
    }

    /// Bytes per stored sample (10-bit formats use 16-bit containers)
    pub fn bytes_per_sample(&self) -> u32 {
        if self.bit_depth > 8 {
            2
        } else {
            1
        }
    }

    /// Row pitch for surface allocation (32-aligned, sample-size scaled)
    pub fn surface_pitch(&self) -> u32 {
        align32(self.width * self.bytes_per_sample())
    }

    /// Total bytes one surface needs (luma plane plus half-size chroma)
    pub fn surface_bytes(&self) -> usize {
        let luma = self.surface_pitch() as usize * align32(self.height) as usize;
        luma + luma / 2
    }
}

/// One region-of-interest rectangle with a quantizer adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    /// Left edge in pixels
    pub left: u32,
    /// Top edge in pixels
    pub top: u32,
    /// Right edge in pixels (exclusive)
    pub right: u32,
    /// Bottom edge in pixels (exclusive)
    pub bottom: u32,
    /// QP delta applied inside the region (negative = higher quality)
    pub delta_qp: i16,
}

/// The negotiated encode configuration
///
/// Mutable only during the query stage; the session freezes it at device
/// initialization and the engine reads it for the rest of its life.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// Codec selection
    pub codec: Codec,
    /// Profile (Main / Main10)
    pub profile: CodecProfile,
    /// Level indicator, e.g. 51 for level 5.1
    pub level: u16,
    /// Quality/speed dial, nominally 1..=7 (1 = best quality)
    pub target_usage: u16,
    /// Rate-control mode
    pub rate_control: RateControl,
    /// Target bitrate in kbit/s
    pub target_kbps: u32,
    /// Frame rate
    pub frame_rate: FrameRate,
    /// Frame geometry
    pub geometry: FrameGeometry,
    /// GOP reference distance; values above 1 introduce B frames
    pub gop_ref_dist: u16,
    /// Use the fixed-function low-power encode path
    pub low_power: bool,
    /// Active reference counts per direction, derived during query
    pub num_ref_active: (u16, u16),
    /// Region-of-interest list (may be truncated by capability limits)
    pub roi: Vec<RegionOfInterest>,
}

impl ParameterSet {
    /// Whether the GOP structure produces B frames
    pub fn has_b_frames(&self) -> bool {
        self.gop_ref_dist > 1
    }
}
