//! Configuration types for the movie player.

use serde::{Deserialize, Serialize};

use crate::progress::ProgressStages;

fn default_entry_names() -> Vec<String> {
    vec!["data.bin".to_string(), "movie.abin".to_string()]
}

fn default_rotation_step() -> f32 {
    5.0
}

fn default_delta_sample_limit() -> usize {
    100
}

fn default_highlight_color() -> [u8; 3] {
    [255, 0, 255]
}

/// Top-level player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Accepted archive entry names, tried in order.
    #[serde(default = "default_entry_names")]
    pub entry_names: Vec<String>,
    /// Playback rate bounds and keyboard step.
    #[serde(default)]
    pub rate: RateLimits,
    /// Display zoom bounds.
    #[serde(default)]
    pub zoom: ZoomLimits,
    /// Rotation applied per key press, in degrees.
    #[serde(default = "default_rotation_step")]
    pub rotation_step_degrees: f32,
    #[serde(default)]
    pub scheduling: SchedulingMode,
    /// Maximum number of edits listed by the debug delta listing.
    #[serde(default = "default_delta_sample_limit")]
    pub delta_sample_limit: usize,
    /// RGB color used for changed-cell highlighting.
    #[serde(default = "default_highlight_color")]
    pub highlight_color: [u8; 3],
    /// Overall-progress bands for the load stages.
    #[serde(default)]
    pub progress: ProgressStages,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            entry_names: default_entry_names(),
            rate: RateLimits::default(),
            zoom: ZoomLimits::default(),
            rotation_step_degrees: default_rotation_step(),
            scheduling: SchedulingMode::default(),
            delta_sample_limit: default_delta_sample_limit(),
            highlight_color: default_highlight_color(),
            progress: ProgressStages::default(),
        }
    }
}

/// Playback rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimits {
    pub min: f64,
    pub max: f64,
    /// Increment applied by the rate up/down commands.
    pub step: f64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 4.0,
            step: 0.1,
        }
    }
}

impl RateLimits {
    /// Clamp `rate` into bounds, rounded to one decimal place.
    ///
    /// NaN maps to the minimum rate.
    pub fn clamp(&self, rate: f64) -> f64 {
        if rate.is_nan() {
            return self.min;
        }
        ((rate * 10.0).round() / 10.0).clamp(self.min, self.max)
    }
}

/// Display zoom limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    /// Scale change per unit of wheel delta.
    pub wheel_sensitivity: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 40.0,
            wheel_sensitivity: 0.001,
        }
    }
}

/// How the scheduler maps wall-clock time to frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Target frame derived from time elapsed since the play anchor.
    #[default]
    Timeline,
    /// One frame per elapsed (rate-scaled) frame interval.
    Interval,
}

impl PlayerConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_names.is_empty() || self.entry_names.iter().any(String::is_empty) {
            return Err(ConfigError::InvalidEntryNames);
        }
        let rate = &self.rate;
        if !(rate.min > 0.0 && rate.min <= rate.max) || !rate.max.is_finite() {
            return Err(ConfigError::InvalidRateBounds {
                min: rate.min,
                max: rate.max,
            });
        }
        if !(rate.step > 0.0) {
            return Err(ConfigError::InvalidRateStep(rate.step));
        }
        let zoom = &self.zoom;
        if !(zoom.min > 0.0 && zoom.min <= zoom.max) || !zoom.max.is_finite() {
            return Err(ConfigError::InvalidZoomBounds {
                min: zoom.min,
                max: zoom.max,
            });
        }
        if !(zoom.wheel_sensitivity > 0.0) {
            return Err(ConfigError::InvalidWheelSensitivity(zoom.wheel_sensitivity));
        }
        if !self.rotation_step_degrees.is_finite() || self.rotation_step_degrees <= 0.0 {
            return Err(ConfigError::InvalidRotationStep(self.rotation_step_degrees));
        }
        if self.delta_sample_limit == 0 {
            return Err(ConfigError::InvalidSampleLimit);
        }
        for band in [&self.progress.unzip, &self.progress.read, &self.progress.parse] {
            if band.start < 0.0 || band.start + band.span > 100.0 || band.span < 0.0 {
                return Err(ConfigError::InvalidProgressBand {
                    start: band.start,
                    end: band.start + band.span,
                });
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Entry name list must be non-empty and contain no empty names")]
    InvalidEntryNames,
    #[error("Rate bounds must satisfy 0 < min <= max (got {min}..{max})")]
    InvalidRateBounds { min: f64, max: f64 },
    #[error("Rate step must be positive (got {0})")]
    InvalidRateStep(f64),
    #[error("Zoom bounds must satisfy 0 < min <= max (got {min}..{max})")]
    InvalidZoomBounds { min: f32, max: f32 },
    #[error("Wheel sensitivity must be positive (got {0})")]
    InvalidWheelSensitivity(f32),
    #[error("Rotation step must be positive (got {0})")]
    InvalidRotationStep(f32),
    #[error("Delta sample limit must be non-zero")]
    InvalidSampleLimit,
    #[error("Progress band {start}..{end} must lie within 0..100")]
    InvalidProgressBand { start: f32, end: f32 },
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.entry_names, ["data.bin", "movie.abin"]);
        assert_eq!(config.zoom.max, 40.0);
        assert_eq!(config.rate.max, 4.0);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config =
            PlayerConfig::from_json(r#"{ "scheduling": "interval", "delta_sample_limit": 5 }"#)
                .unwrap();
        assert_eq!(config.scheduling, SchedulingMode::Interval);
        assert_eq!(config.delta_sample_limit, 5);
        assert_eq!(config.rate, RateLimits::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PlayerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PlayerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_inverted_zoom() {
        let mut config = PlayerConfig::default();
        config.zoom.min = 50.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidZoomBounds { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            PlayerConfig::from_json("{ not json"),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            PlayerConfig::from_json(r#"{ "entry_names": [] }"#),
            Err(ConfigError::InvalidEntryNames)
        ));
    }

    #[test]
    fn test_rate_clamp_rounds() {
        let rate = RateLimits::default();
        assert_eq!(rate.clamp(1.0 + 0.1 + 0.1), 1.2);
        assert_eq!(rate.clamp(0.0), 0.1);
        assert_eq!(rate.clamp(9.0), 4.0);
        assert_eq!(rate.clamp(f64::INFINITY), 4.0);
        assert_eq!(rate.clamp(f64::NAN), 0.1);
    }
}
