use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_DETECTION_INTERVAL_MS, DEFAULT_LOOKING_AWAY_THRESHOLD, DEFAULT_MAX_FACE_SIZE,
    DEFAULT_MIN_FACE_SIZE, DEFAULT_READINESS_RETRY_DELAY_MS, DEFAULT_READINESS_RETRY_LIMIT,
    DEFAULT_SINK_READY_TIMEOUT_MS, DEFAULT_VIOLATION_COOLDOWN_MS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Thresholds and timings for one proctoring service.
///
/// Face sizes are percentages of frame height. The looking-away threshold is
/// a fraction of frame width or height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctoringConfig {
    pub min_face_size: f64,
    pub max_face_size: f64,
    pub looking_away_threshold: f64,
    pub detection_interval_ms: u64,
    pub violation_cooldown_ms: u64,
    pub readiness_retry_limit: u32,
    pub readiness_retry_delay_ms: u64,
    pub sink_ready_timeout_ms: u64,
}

impl Default for ProctoringConfig {
    fn default() -> Self {
        Self {
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            max_face_size: DEFAULT_MAX_FACE_SIZE,
            looking_away_threshold: DEFAULT_LOOKING_AWAY_THRESHOLD,
            detection_interval_ms: DEFAULT_DETECTION_INTERVAL_MS,
            violation_cooldown_ms: DEFAULT_VIOLATION_COOLDOWN_MS,
            readiness_retry_limit: DEFAULT_READINESS_RETRY_LIMIT,
            readiness_retry_delay_ms: DEFAULT_READINESS_RETRY_DELAY_MS,
            sink_ready_timeout_ms: DEFAULT_SINK_READY_TIMEOUT_MS,
        }
    }
}

impl ProctoringConfig {
    /// Loads a JSON config; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("min_face_size", self.min_face_size),
            ("max_face_size", self.max_face_size),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} is not a percentage"),
                });
            }
        }
        if self.min_face_size > self.max_face_size {
            return Err(ConfigError::Invalid {
                field: "min_face_size",
                reason: format!(
                    "{} exceeds max_face_size {}",
                    self.min_face_size, self.max_face_size
                ),
            });
        }
        if !(self.looking_away_threshold > 0.0 && self.looking_away_threshold <= 0.5) {
            return Err(ConfigError::Invalid {
                field: "looking_away_threshold",
                reason: format!("{} is outside (0, 0.5]", self.looking_away_threshold),
            });
        }
        if self.detection_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "detection_interval_ms",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Returns a copy with every key present in `update` replaced.
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        Self {
            min_face_size: update.min_face_size.unwrap_or(self.min_face_size),
            max_face_size: update.max_face_size.unwrap_or(self.max_face_size),
            looking_away_threshold: update
                .looking_away_threshold
                .unwrap_or(self.looking_away_threshold),
            detection_interval_ms: update
                .detection_interval_ms
                .unwrap_or(self.detection_interval_ms),
            violation_cooldown_ms: update
                .violation_cooldown_ms
                .unwrap_or(self.violation_cooldown_ms),
            readiness_retry_limit: update
                .readiness_retry_limit
                .unwrap_or(self.readiness_retry_limit),
            readiness_retry_delay_ms: update
                .readiness_retry_delay_ms
                .unwrap_or(self.readiness_retry_delay_ms),
            sink_ready_timeout_ms: update
                .sink_ready_timeout_ms
                .unwrap_or(self.sink_ready_timeout_ms),
        }
    }
}

/// Partial config change. `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigUpdate {
    pub min_face_size: Option<f64>,
    pub max_face_size: Option<f64>,
    pub looking_away_threshold: Option<f64>,
    pub detection_interval_ms: Option<u64>,
    pub violation_cooldown_ms: Option<u64>,
    pub readiness_retry_limit: Option<u32>,
    pub readiness_retry_delay_ms: Option<u64>,
    pub sink_ready_timeout_ms: Option<u64>,
}
