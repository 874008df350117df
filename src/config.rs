//! Capture configuration
//!
//! Timing knobs for the full-page scan, bounds on retries and round-trips,
//! and the output encoding. Loaded from a JSON file or built from defaults.

use crate::{Error, OutputFormat, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration shared by every capture operation
///
/// The defaults mirror the pacing a browser's visible-tab capture API
/// tolerates: a short settle after each scroll, a longer gap between tiles,
/// and an even longer back-off once the rate limiter has pushed back.
///
/// # Examples
///
/// ```
/// let cfg = pagesnap::CaptureConfig::default();
/// assert!(cfg.rate_limit_backoff_ms > cfg.inter_tile_delay_ms);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Wait after each scroll confirmation before grabbing, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Delay between successive tiles, in milliseconds
    #[serde(default = "default_inter_tile_delay_ms")]
    pub inter_tile_delay_ms: u64,

    /// Wait before retrying a rate-limited grab, in milliseconds
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Consecutive rate-limit retries allowed at a single offset
    #[serde(default = "default_max_rate_limit_retries")]
    pub max_rate_limit_retries: u32,

    /// Upper bound on any prober or grabber round-trip, in milliseconds
    #[serde(default = "default_round_trip_timeout_ms")]
    pub round_trip_timeout_ms: u64,

    /// Total attempts for a visible-part capture
    #[serde(default = "default_visible_capture_attempts")]
    pub visible_capture_attempts: u32,

    /// Selections narrower or shorter than this are discarded
    #[serde(default = "default_min_selection_px")]
    pub min_selection_px: u32,

    /// Encoding for composites and cropped regions
    #[serde(default)]
    pub output_format: OutputFormat,

    /// JPEG quality, 1-100 (ignored for PNG)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            inter_tile_delay_ms: default_inter_tile_delay_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            round_trip_timeout_ms: default_round_trip_timeout_ms(),
            visible_capture_attempts: default_visible_capture_attempts(),
            min_selection_px: default_min_selection_px(),
            output_format: OutputFormat::default(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    250
}

fn default_inter_tile_delay_ms() -> u64 {
    300
}

fn default_rate_limit_backoff_ms() -> u64 {
    1000
}

fn default_max_rate_limit_retries() -> u32 {
    5
}

fn default_round_trip_timeout_ms() -> u64 {
    10_000
}

fn default_visible_capture_attempts() -> u32 {
    2
}

fn default_min_selection_px() -> u32 {
    10
}

fn default_jpeg_quality() -> u8 {
    90
}

impl CaptureConfig {
    /// Load and validate a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: CaptureConfig = serde_json::from_str(&raw).map_err(|e| {
            Error::ConfigError(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.round_trip_timeout_ms == 0 {
            return Err(Error::ConfigError("round_trip_timeout_ms must be > 0".into()));
        }
        if self.rate_limit_backoff_ms <= self.inter_tile_delay_ms {
            return Err(Error::ConfigError(format!(
                "rate_limit_backoff_ms ({}) must be longer than inter_tile_delay_ms ({})",
                self.rate_limit_backoff_ms, self.inter_tile_delay_ms
            )));
        }
        if self.visible_capture_attempts == 0 {
            return Err(Error::ConfigError("visible_capture_attempts must be >= 1".into()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!(
                "jpeg_quality must be within 1..=100 (got {})",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn inter_tile_delay(&self) -> Duration {
        Duration::from_millis(self.inter_tile_delay_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }

    pub fn round_trip_timeout(&self) -> Duration {
        Duration::from_millis(self.round_trip_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = CaptureConfig::default();
        assert_eq!(cfg.settle_delay_ms, 250);
        assert_eq!(cfg.inter_tile_delay_ms, 300);
        assert_eq!(cfg.rate_limit_backoff_ms, 1000);
        assert_eq!(cfg.output_format, OutputFormat::Png);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: CaptureConfig =
            serde_json::from_str(r#"{"inter_tile_delay_ms": 500, "output_format": "jpeg"}"#)
                .unwrap();
        assert_eq!(cfg.inter_tile_delay_ms, 500);
        assert_eq!(cfg.settle_delay_ms, 250);
        assert_eq!(cfg.output_format, OutputFormat::Jpeg);
    }

    #[test]
    fn test_backoff_must_exceed_tile_delay() {
        let cfg = CaptureConfig {
            rate_limit_backoff_ms: 300,
            inter_tile_delay_ms: 300,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("rate_limit_backoff_ms"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cfg = CaptureConfig {
            round_trip_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"max_rate_limit_retries": 2, "jpeg_quality": 75}}"#).unwrap();
        let cfg = CaptureConfig::load(file.path()).unwrap();
        assert_eq!(cfg.max_rate_limit_retries, 2);
        assert_eq!(cfg.jpeg_quality, 75);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CaptureConfig::load("/nonexistent/pagesnap.json").unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
