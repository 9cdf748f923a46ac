//! # Decoder Configuration
//!
//! Configuration types for the decode pipeline and its optional resampling
//! stage. Every field has a serde default so partial JSON documents load.

use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};

/// Decode pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Output sample rate applied when a request does not specify one.
    ///
    /// `None` keeps the source rate.
    ///
    /// Default: `None`.
    #[serde(default)]
    pub target_sample_rate: Option<u32>,

    /// Resampler tuning, used only when the output rate differs from the
    /// source rate.
    #[serde(default)]
    pub resampler: ResamplerConfig,

    /// Return samples decoded before a mid-stream failure instead of
    /// discarding them. The result still carries the error status.
    ///
    /// Default: false.
    #[serde(default)]
    pub preserve_partial_on_error: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: None,
            resampler: ResamplerConfig::default(),
            preserve_partial_on_error: false,
        }
    }
}

impl DecoderConfig {
    /// Set the default output sample rate.
    pub fn with_target_sample_rate(mut self, sample_rate: u32) -> Self {
        self.target_sample_rate = Some(sample_rate);
        self
    }

    /// Replace the resampler tuning.
    pub fn with_resampler(mut self, resampler: ResamplerConfig) -> Self {
        self.resampler = resampler;
        self
    }

    /// Keep partial output on mid-stream failures.
    pub fn with_partial_on_error(mut self, preserve: bool) -> Self {
        self.preserve_partial_on_error = preserve;
        self
    }

    /// Parse a JSON document, applying defaults for missing fields.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| DecodeError::InvalidRequest(format!("Invalid decoder config: {}", e)))?;
        config.validate().map_err(DecodeError::InvalidRequest)?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.target_sample_rate == Some(0) {
            return Err("target_sample_rate must be > 0".to_string());
        }

        self.resampler.validate()
    }
}

/// Interpolation used between sinc table points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    Linear,
    Quadratic,
    Cubic,
}

/// Resampler tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResamplerConfig {
    /// Input frames handed to the resampler per processing call.
    ///
    /// Default: 1024.
    #[serde(default = "default_chunk_frames")]
    pub chunk_frames: usize,

    /// Length of the windowed sinc filter.
    ///
    /// Default: 128.
    #[serde(default = "default_sinc_len")]
    pub sinc_len: usize,

    /// Cutoff relative to the Nyquist frequency, in `(0.0, 1.0]`.
    ///
    /// Default: 0.95.
    #[serde(default = "default_f_cutoff")]
    pub f_cutoff: f32,

    /// Sinc table oversampling.
    ///
    /// Default: 128.
    #[serde(default = "default_oversampling_factor")]
    pub oversampling_factor: usize,

    /// Default: linear.
    #[serde(default = "default_interpolation")]
    pub interpolation: Interpolation,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self {
            chunk_frames: default_chunk_frames(),
            sinc_len: default_sinc_len(),
            f_cutoff: default_f_cutoff(),
            oversampling_factor: default_oversampling_factor(),
            interpolation: default_interpolation(),
        }
    }
}

impl ResamplerConfig {
    /// Short filter, cheap to run.
    pub fn fast() -> Self {
        Self {
            sinc_len: 64,
            oversampling_factor: 64,
            interpolation: Interpolation::Linear,
            ..Default::default()
        }
    }

    /// Long filter with cubic interpolation.
    pub fn high_quality() -> Self {
        Self {
            sinc_len: 256,
            oversampling_factor: 256,
            interpolation: Interpolation::Cubic,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_frames == 0 {
            return Err("resampler.chunk_frames must be > 0".to_string());
        }

        if self.sinc_len == 0 {
            return Err("resampler.sinc_len must be > 0".to_string());
        }

        if !(self.f_cutoff > 0.0 && self.f_cutoff <= 1.0) {
            return Err("resampler.f_cutoff must be in (0.0, 1.0]".to_string());
        }

        if self.oversampling_factor == 0 {
            return Err("resampler.oversampling_factor must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_chunk_frames() -> usize {
    1024
}

fn default_sinc_len() -> usize {
    128
}

fn default_f_cutoff() -> f32 {
    0.95
}

fn default_oversampling_factor() -> usize {
    128
}

fn default_interpolation() -> Interpolation {
    Interpolation::Linear
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_sample_rate, None);
        assert!(!config.preserve_partial_on_error);
        assert_eq!(config.resampler.chunk_frames, 1024);
    }

    #[test]
    fn test_resampler_presets() {
        assert!(ResamplerConfig::fast().validate().is_ok());
        assert!(ResamplerConfig::high_quality().validate().is_ok());
        assert!(ResamplerConfig::fast().sinc_len < ResamplerConfig::high_quality().sinc_len);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DecoderConfig::default();

        // Invalid: zero target rate
        config.target_sample_rate = Some(0);
        assert!(config.validate().is_err());
        config.target_sample_rate = Some(16000);
        assert!(config.validate().is_ok());

        // Invalid: zero chunk
        config.resampler.chunk_frames = 0;
        assert!(config.validate().is_err());
        config.resampler.chunk_frames = 512;

        // Invalid: cutoff out of range
        config.resampler.f_cutoff = 1.5;
        assert!(config.validate().is_err());
        config.resampler.f_cutoff = 0.0;
        assert!(config.validate().is_err());
        config.resampler.f_cutoff = 0.9;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = DecoderConfig::from_json(
            r#"{ "target_sample_rate": 22050, "resampler": { "interpolation": "cubic" } }"#,
        )
        .unwrap();

        assert_eq!(config.target_sample_rate, Some(22050));
        assert_eq!(config.resampler.interpolation, Interpolation::Cubic);
        assert_eq!(config.resampler.sinc_len, 128);
        assert!(!config.preserve_partial_on_error);
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(DecoderConfig::from_json("{ not json").is_err());
        assert!(DecoderConfig::from_json(r#"{ "target_sample_rate": 0 }"#).is_err());
    }

    #[test]
    fn test_builder_chaining() {
        let config = DecoderConfig::default()
            .with_target_sample_rate(8000)
            .with_resampler(ResamplerConfig::fast())
            .with_partial_on_error(true);

        assert_eq!(config.target_sample_rate, Some(8000));
        assert_eq!(config.resampler, ResamplerConfig::fast());
        assert!(config.preserve_partial_on_error);
    }
}
