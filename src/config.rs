//! Encoder configuration
//!
//! [`EncoderConfig`] is the boundary between whatever collects user input
//! (CLI, config file, embedding application) and the control plane.
//! Mandatory-field validation happens here, before any core component is
//! invoked; the query stage only ever sees a structurally valid
//! configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EncodeError, EncodeResult};
use crate::params::{
    Codec, CodecProfile, FrameGeometry, FrameRate, ParameterSet, RateControl, RegionOfInterest,
};

/// HEVC level 5.1, the default for 4K-capable sessions
const DEFAULT_LEVEL: u16 = 51;

/// Encoder configuration supplied by the caller
///
/// Out-of-range `target_usage` is deliberately *not* rejected here: the
/// default-policy chain substitutes the balanced level (4) before any table
/// lookup, matching observed hardware-driver behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Visible frame width in pixels (mandatory, non-zero, even)
    pub width: u32,

    /// Visible frame height in pixels (mandatory, non-zero, even)
    pub height: u32,

    /// Target bitrate in kbit/s (mandatory, non-zero)
    pub bitrate_kbps: u32,

    /// Frame rate numerator (mandatory, non-zero)
    pub fps_num: u32,

    /// Frame rate denominator (mandatory, non-zero)
    pub fps_den: u32,

    /// Bit depth: 8 or 10
    pub bit_depth: u8,

    /// Quality/speed trade-off, 1 (best quality) to 7 (fastest)
    pub target_usage: u16,

    /// Use the fixed-function low-power encode path
    pub low_power: bool,

    /// GOP reference distance; 1 disables B frames
    pub gop_ref_dist: u16,

    /// Rate-control mode
    pub rate_control: RateControl,

    /// Region-of-interest rectangles
    pub roi: Vec<RegionOfInterest>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            bitrate_kbps: 4000,
            fps_num: 30,
            fps_den: 1,
            bit_depth: 8,
            target_usage: 4,
            low_power: true,
            gop_ref_dist: 1,
            rate_control: RateControl::Vbr,
            roi: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> EncodeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| EncodeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> EncodeResult<Self> {
        let config: EncoderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate mandatory fields
    ///
    /// Geometry, bitrate and framerate must be non-zero and dimensions even;
    /// everything else is corrected downstream rather than rejected.
    pub fn validate(&self) -> EncodeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EncodeError::InvalidConfig(format!(
                "frame geometry not set: {}x{}",
                self.width, self.height
            )));
        }
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(EncodeError::InvalidConfig(format!(
                "frame dimensions must be even: {}x{}",
                self.width, self.height
            )));
        }
        if self.bitrate_kbps == 0 {
            return Err(EncodeError::InvalidConfig("bitrate not set".into()));
        }
        if self.fps_num == 0 || self.fps_den == 0 {
            return Err(EncodeError::InvalidConfig(format!(
                "framerate not set: {}/{}",
                self.fps_num, self.fps_den
            )));
        }
        if self.bit_depth != 8 && self.bit_depth != 10 {
            return Err(EncodeError::InvalidConfig(format!(
                "unsupported bit depth: {}",
                self.bit_depth
            )));
        }
        if self.gop_ref_dist == 0 {
            return Err(EncodeError::InvalidConfig(
                "GOP reference distance must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the initial parameter set the query stage will refine
    pub fn to_parameter_set(&self) -> ParameterSet {
        let profile = if self.bit_depth == 10 {
            CodecProfile::Main10
        } else {
            CodecProfile::Main
        };
        debug!(
            width = self.width,
            height = self.height,
            bitrate_kbps = self.bitrate_kbps,
            target_usage = self.target_usage,
            low_power = self.low_power,
            ?profile,
            "building initial parameter set"
        );
        ParameterSet {
            codec: Codec::Hevc,
            profile,
            level: DEFAULT_LEVEL,
            target_usage: self.target_usage,
            rate_control: self.rate_control,
            target_kbps: self.bitrate_kbps,
            frame_rate: FrameRate {
                num: self.fps_num,
                den: self.fps_den,
            },
            geometry: FrameGeometry::progressive(self.width, self.height, self.bit_depth),
            gop_ref_dist: self.gop_ref_dist,
            low_power: self.low_power,
            num_ref_active: (0, 0),
            roi: self.roi.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EncoderConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_geometry_rejected() {
        let config = EncoderConfig {
            width: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EncodeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn odd_dimensions_rejected() {
        let config = EncoderConfig {
            width: 1921,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_framerate_rejected() {
        let config = EncoderConfig {
            fps_den: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = EncoderConfig {
            bit_depth: 10,
            target_usage: 7,
            ..Default::default()
        };
        let text = toml::to_string(&config).unwrap();
        let parsed = EncoderConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.bit_depth, 10);
        assert_eq!(parsed.target_usage, 7);
    }

    #[test]
    fn ten_bit_selects_main10() {
        let config = EncoderConfig {
            bit_depth: 10,
            ..Default::default()
        };
        let par = config.to_parameter_set();
        assert_eq!(par.profile, CodecProfile::Main10);
        assert_eq!(par.geometry.bit_depth, 10);
    }

    #[test]
    fn out_of_range_target_usage_passes_validation() {
        // Corrected by the defaults chain, not rejected here.
        let config = EncoderConfig {
            target_usage: 99,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
