//! Bloom Configuration
//!
//! [`BloomSettings`] is pure data: the host hands a copy to
//! [`Bloom::set_parameters`](crate::core::Bloom::set_parameters) each frame
//! (or whenever it changes). Setters clamp to the supported ranges, and the
//! serde representation is sanitized on load so a hand-edited config file can
//! never produce an out-of-range pyramid.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut settings = BloomSettings::default();
//! settings.set_threshold(1.0);
//! settings.set_iterations(6);
//!
//! let from_disk = BloomSettings::from_json_str(r#"{ "intensity": 1.5 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Supported range for [`BloomSettings::resolution`].
pub const RESOLUTION_RANGE: (u32, u32) = (64, 1024);
/// Supported range for [`BloomSettings::iterations`].
pub const ITERATIONS_RANGE: (u32, u32) = (2, 8);
/// Upper bound for intensity and threshold.
pub const MAX_SCALAR: f32 = 10.0;

/// User-facing bloom parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Whether the fused pipeline runs at all.
    pub enabled: bool,

    /// Short side of the bloom target in pixels. The long side is derived
    /// from the screen aspect ratio.
    ///
    /// Default: `512`
    resolution: u32,

    /// Requested pyramid depth. The realized chain may be shorter when the
    /// resolution runs out first.
    ///
    /// Default: `8`
    iterations: u32,

    /// Gain applied by the final pass.
    ///
    /// Default: `0.8`
    intensity: f32,

    /// Brightness above which pixels pass through the prefilter unchanged.
    ///
    /// Default: `0.6`
    threshold: f32,

    /// Width of the quadratic roll-off below the threshold, as a fraction of
    /// the threshold.
    ///
    /// Default: `0.7`
    soft_knee: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            resolution: 512,
            iterations: 8,
            intensity: 0.8,
            threshold: 0.6,
            soft_knee: 0.7,
        }
    }
}

impl BloomSettings {
    /// Creates settings with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses settings from JSON. Missing fields take their defaults and
    /// every value is clamped into its supported range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        Ok(parsed.sanitized())
    }

    /// Serializes the settings as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns a copy with every field clamped into its supported range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.set_resolution(self.resolution);
        self.set_iterations(self.iterations);
        self.set_intensity(self.intensity);
        self.set_threshold(self.threshold);
        self.set_soft_knee(self.soft_knee);
        self
    }

    #[inline]
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    #[must_use]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    #[inline]
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[inline]
    #[must_use]
    pub fn soft_knee(&self) -> f32 {
        self.soft_knee
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Sets the short side of the bloom target, clamped to 64..=1024.
    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution.clamp(RESOLUTION_RANGE.0, RESOLUTION_RANGE.1);
    }

    /// Sets the pyramid depth, clamped to 2..=8.
    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations.clamp(ITERATIONS_RANGE.0, ITERATIONS_RANGE.1);
    }

    /// Sets the final gain, clamped to 0..=10. NaN becomes 0.
    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = clamp_scalar(intensity, MAX_SCALAR);
    }

    /// Sets the brightness threshold, clamped to 0..=10. NaN becomes 0.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = clamp_scalar(threshold, MAX_SCALAR);
    }

    /// Sets the soft knee fraction, clamped to 0..=1. NaN becomes 0.
    pub fn set_soft_knee(&mut self, soft_knee: f32) {
        self.soft_knee = clamp_scalar(soft_knee, 1.0);
    }
}

fn clamp_scalar(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}
