use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::domain::identity_matcher::DEFAULT_MATCH_THRESHOLD;
use crate::recognition::infrastructure::equalized_feature_extractor::DEFAULT_FEATURE_SIZE;
use crate::shared::constants::{APP_DIR_NAME, CONFIG_FILE_NAME, DATABASE_FILE_NAME};
use crate::tracking::domain::box_smoother::DEFAULT_ALPHA;
use crate::tracking::domain::face_tracker::DEFAULT_TRACKING_TIMEOUT;
use crate::tracking::domain::registration::DEFAULT_REGISTRATION_DURATION;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for the kiosk. Every field has a default so partial JSON files
/// are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    /// Maximum Euclidean distance for two feature vectors to be the same person.
    pub match_threshold: f64,
    /// Side length of the square face crop fed to the feature extractor.
    pub feature_size: u32,
    /// EMA weight of the newest box; lower is smoother.
    pub smoothing_alpha: f64,
    pub tracking_timeout_secs: f64,
    pub registration_duration_secs: f64,
    pub detection_cooldown_secs: f64,
    pub detector_confidence: f64,
    pub database_path: Option<PathBuf>,
}

pub const DEFAULT_DETECTION_COOLDOWN_SECS: f64 = 0.5;
pub const DEFAULT_DETECTOR_CONFIDENCE: f64 = 0.5;

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            feature_size: DEFAULT_FEATURE_SIZE,
            smoothing_alpha: DEFAULT_ALPHA,
            tracking_timeout_secs: DEFAULT_TRACKING_TIMEOUT,
            registration_duration_secs: DEFAULT_REGISTRATION_DURATION,
            detection_cooldown_secs: DEFAULT_DETECTION_COOLDOWN_SECS,
            detector_confidence: DEFAULT_DETECTOR_CONFIDENCE,
            database_path: None,
        }
    }
}

impl KioskConfig {
    /// Platform config file location, e.g. `~/.config/FaceGate/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Loads an explicit config file, or the platform default if present.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Database location: the configured path or the platform data dir.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("data"))
                .join(DATABASE_FILE_NAME)
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.match_threshold > 0.0) {
            return Err(invalid("match_threshold", "must be greater than 0"));
        }
        if self.feature_size == 0 {
            return Err(invalid("feature_size", "must be at least 1"));
        }
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(invalid("smoothing_alpha", "must be in (0, 1]"));
        }
        for (field, value) in [
            ("tracking_timeout_secs", self.tracking_timeout_secs),
            ("registration_duration_secs", self.registration_duration_secs),
            ("detection_cooldown_secs", self.detection_cooldown_secs),
        ] {
            if !(value >= 0.0) {
                return Err(invalid(field, "must not be negative"));
            }
        }
        if !(0.0..=1.0).contains(&self.detector_confidence) {
            return Err(invalid("detector_confidence", "must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
