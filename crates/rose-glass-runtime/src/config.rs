//! Configuration for rose-glass-runtime.

use chrono::{DateTime, Utc};
use rose_glass_core::{LensKind, RenderOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid runtime config: {0}")]
    Invalid(String),
}

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Lens used when a request names none
    #[serde(default = "default_lens")]
    pub default_lens: LensKind,

    /// Clinical context selecting the decay half-life
    #[serde(default = "default_context")]
    pub context: String,

    /// Calibration file (YAML or JSON)
    #[serde(default)]
    pub calibration_path: Option<PathBuf>,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub render: RenderOptions,

    #[serde(default)]
    pub determinism: DeterminismConfig,
}

fn default_lens() -> LensKind {
    LensKind::GriefAccumulation
}

fn default_context() -> String {
    "general_oncology".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_lens: default_lens(),
            context: default_context(),
            calibration_path: None,
            tracking: TrackingConfig::default(),
            render: RenderOptions::default(),
            determinism: DeterminismConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load by extension: `.json` is JSON, anything else YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.trim().is_empty() {
            return Err(ConfigError::Invalid("context must not be empty".to_string()));
        }
        if self.tracking.max_readings == 0 {
            return Err(ConfigError::Invalid(
                "tracking.max_readings must be at least 1".to_string(),
            ));
        }
        if self.tracking.history_window == Some(Duration::ZERO) {
            return Err(ConfigError::Invalid(
                "tracking.history_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The fixed evaluation time if configured, otherwise now.
    pub fn evaluated_at(&self) -> DateTime<Utc> {
        self.determinism.evaluated_at.unwrap_or_else(Utc::now)
    }
}

/// Per-subject reading accumulation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingConfig {
    /// Keep dimension readings per subject for trend reporting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Readings retained per subject; older ones are dropped
    #[serde(default = "default_max_readings")]
    pub max_readings: usize,

    /// How far back the grief-accumulation lens looks; all history when unset
    #[serde(with = "humantime_serde", default)]
    pub history_window: Option<Duration>,
}

fn default_true() -> bool {
    true
}

fn default_max_readings() -> usize {
    50
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_readings: default_max_readings(),
            history_window: None,
        }
    }
}

/// Determinism configuration for reproducible translations.
///
/// When `evaluated_at` is set, every new grief event is registered at that
/// time and outcomes carry it as `translated_at`, matching the CLI's
/// `--evaluated-at` flag:
///
/// ```yaml
/// determinism:
///   evaluated_at: "2025-12-20T10:00:00Z"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeterminismConfig {
    #[serde(default)]
    pub evaluated_at: Option<DateTime<Utc>>,
}

// Optional Duration as a humantime string ("365days")
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_str(&humantime::format_duration(*d).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
