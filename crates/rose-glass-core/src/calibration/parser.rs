//! Calibration parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::event::{normalize_tag, ProcessingState};
use crate::lenses::{AccumulationThresholds, CompassionThresholds, CulturalProfile, PresenceThresholds};

/// Errors that can occur when loading a calibration.
///
/// Any of these prevents a classifier or tracker from being constructed.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Failed to read calibration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Calibration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("No decay half-life configured for context: {0}")]
    UnknownContext(String),
}

/// Decay section: how fast past losses stop weighing on the present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecayCalibration {
    /// Half-life per clinical context (e.g. `general_oncology: 30days`)
    #[serde(with = "humantime_map")]
    pub half_lives: BTreeMap<String, Duration>,
}

/// Severity section: how the focal event itself is weighed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeverityCalibration {
    pub intensity_weight: f64,

    pub depth_weight: f64,

    /// Multiplier per circumstance or subject-category tag. Unlisted tags count as 1.0.
    pub circumstance_multipliers: BTreeMap<String, f64>,
}

/// Per-state weights applied to history events in the load score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateWeights {
    #[serde(default = "default_weight")]
    pub raw: f64,

    #[serde(default = "default_weight")]
    pub processing: f64,

    #[serde(default = "default_weight")]
    pub transformed: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Default for StateWeights {
    fn default() -> Self {
        Self {
            raw: 1.0,
            processing: 1.0,
            transformed: 1.0,
        }
    }
}

impl StateWeights {
    pub fn weight(&self, state: ProcessingState) -> f64 {
        match state {
            ProcessingState::Raw => self.raw,
            ProcessingState::Processing => self.processing,
            ProcessingState::Transformed => self.transformed,
        }
    }
}

/// A wisdom pathway and its reflection prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathwayTemplate {
    /// Unique identifier (e.g., "presence", "resilience")
    pub id: String,

    /// Human-readable label
    pub label: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Reflection prompts, returned verbatim and in order
    pub prompts: Vec<String>,

    /// Phrases that show this kind of wisdom in a reflection; built-in
    /// vocabulary is used for the six standard pathways when empty
    #[serde(default)]
    pub wisdom_markers: Vec<String>,

    /// Summary recorded with each wisdom fragment drawn along this pathway
    #[serde(default)]
    pub insight: Option<String>,
}

/// One selection bucket: a half-open load x severity rectangle naming a pathway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectionRule {
    /// Bucket label reported with the suggestion
    #[serde(default)]
    pub label: Option<String>,

    /// Pathway id this bucket selects
    pub pathway: String,

    #[serde(default)]
    pub load_min: f64,

    /// Exclusive upper bound; `None` is unbounded
    #[serde(default)]
    pub load_max: Option<f64>,

    #[serde(default)]
    pub severity_min: f64,

    /// Exclusive upper bound; `None` is unbounded
    #[serde(default)]
    pub severity_max: Option<f64>,
}

impl SelectionRule {
    pub fn matches(&self, load: f64, severity: f64) -> bool {
        load >= self.load_min
            && self.load_max.map_or(true, |max| load < max)
            && severity >= self.severity_min
            && self.severity_max.map_or(true, |max| severity < max)
    }

    /// Label if configured, otherwise a rendering of the bounds.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!(
                "load [{}, {}) x severity [{}, {})",
                self.load_min,
                bound(self.load_max),
                self.severity_min,
                bound(self.severity_max)
            ),
        }
    }
}

fn bound(max: Option<f64>) -> String {
    max.map_or_else(|| "inf".to_string(), |m| m.to_string())
}

/// Optional threshold overrides for the built-in lenses.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LensCalibration {
    #[serde(default)]
    pub compassion_preservation: CompassionThresholds,

    #[serde(default)]
    pub protective_presence: PresenceThresholds,

    #[serde(default)]
    pub grief_accumulation: AccumulationThresholds,
}

/// A complete calibration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Calibration {
    /// Version of this calibration
    pub calibration_version: String,

    /// Human-readable name
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub decay: DecayCalibration,

    pub severity: SeverityCalibration,

    #[serde(default)]
    pub state_weights: StateWeights,

    /// Pathways in priority order, highest first
    pub pathways: Vec<PathwayTemplate>,

    pub rules: Vec<SelectionRule>,

    #[serde(default)]
    pub lenses: LensCalibration,

    /// Cultural profiles keyed by the value of a `culture:<key>` tag
    #[serde(default)]
    pub cultural_profiles: BTreeMap<String, CulturalProfile>,
}

impl Calibration {
    /// Parse and validate a calibration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, CalibrationError> {
        let calibration: Calibration = serde_yaml::from_str(yaml)?;
        calibration.validate()?;
        Ok(calibration)
    }

    /// Parse and validate a calibration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CalibrationError> {
        let calibration: Calibration = serde_json::from_str(json)?;
        calibration.validate()?;
        Ok(calibration)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load by extension: `.json` is JSON, anything else YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    /// Half-life configured for a clinical context.
    pub fn half_life(&self, context: &str) -> Result<Duration, CalibrationError> {
        self.decay
            .half_lives
            .get(context)
            .copied()
            .ok_or_else(|| CalibrationError::UnknownContext(context.to_string()))
    }

    /// Multiplier for a tag; unlisted tags contribute 1.0.
    pub fn multiplier(&self, tag: &str) -> f64 {
        self.severity
            .circumstance_multipliers
            .get(tag)
            .copied()
            .unwrap_or(1.0)
    }

    /// Pathway by id, with its priority index (0 is highest).
    pub fn pathway(&self, id: &str) -> Option<(usize, &PathwayTemplate)> {
        self.pathways.iter().enumerate().find(|(_, p)| p.id == id)
    }

    /// Validate the calibration semantics.
    ///
    /// Parsing already rejects structurally malformed input; this checks
    /// ranges, references and rule coverage.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.name.trim().is_empty() {
            return Err(CalibrationError::MissingField("name".to_string()));
        }

        self.validate_decay()?;
        self.validate_severity()?;
        self.validate_state_weights()?;
        self.validate_pathways()?;
        self.validate_rules()?;
        self.validate_lenses()?;

        Ok(())
    }

    fn validate_decay(&self) -> Result<(), CalibrationError> {
        if self.decay.half_lives.is_empty() {
            return Err(CalibrationError::MissingField(
                "decay.half_lives".to_string(),
            ));
        }
        for (context, half_life) in &self.decay.half_lives {
            if half_life.is_zero() {
                return Err(CalibrationError::ValidationError(format!(
                    "Half-life for context '{}' must be positive",
                    context
                )));
            }
        }
        Ok(())
    }

    fn validate_severity(&self) -> Result<(), CalibrationError> {
        let severity = &self.severity;
        for (field, value) in [
            ("severity.intensity_weight", severity.intensity_weight),
            ("severity.depth_weight", severity.depth_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::ValidationError(format!(
                    "{} must be a non-negative number, got {}",
                    field, value
                )));
            }
        }
        if severity.intensity_weight + severity.depth_weight <= 0.0 {
            return Err(CalibrationError::ValidationError(
                "Severity weights must not both be zero".to_string(),
            ));
        }

        for (tag, multiplier) in &severity.circumstance_multipliers {
            if tag.is_empty() || *tag != normalize_tag(tag) {
                return Err(CalibrationError::ValidationError(format!(
                    "Circumstance multiplier key '{}' must be non-empty trimmed lowercase",
                    tag
                )));
            }
            if !multiplier.is_finite() || *multiplier <= 0.0 {
                return Err(CalibrationError::ValidationError(format!(
                    "Circumstance multiplier for '{}' must be a positive number, got {}",
                    tag, multiplier
                )));
            }
        }
        Ok(())
    }

    fn validate_state_weights(&self) -> Result<(), CalibrationError> {
        let weights = &self.state_weights;
        for (state, value) in [
            ("raw", weights.raw),
            ("processing", weights.processing),
            ("transformed", weights.transformed),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::ValidationError(format!(
                    "State weight for '{}' must be a non-negative number, got {}",
                    state, value
                )));
            }
        }
        Ok(())
    }

    fn validate_pathways(&self) -> Result<(), CalibrationError> {
        if self.pathways.is_empty() {
            return Err(CalibrationError::MissingField("pathways".to_string()));
        }

        let mut seen = HashSet::new();
        for pathway in &self.pathways {
            if pathway.id.trim().is_empty() {
                return Err(CalibrationError::MissingField("pathways[].id".to_string()));
            }
            if !seen.insert(pathway.id.as_str()) {
                return Err(CalibrationError::ValidationError(format!(
                    "Duplicate pathway ID: {}",
                    pathway.id
                )));
            }
            if pathway.prompts.is_empty() || pathway.prompts.iter().any(|p| p.trim().is_empty()) {
                return Err(CalibrationError::ValidationError(format!(
                    "Pathway '{}' needs at least one non-empty prompt",
                    pathway.id
                )));
            }
            if pathway.wisdom_markers.iter().any(|m| m.trim().is_empty()) {
                return Err(CalibrationError::ValidationError(format!(
                    "Pathway '{}' has an empty wisdom marker",
                    pathway.id
                )));
            }
        }
        Ok(())
    }

    fn validate_rules(&self) -> Result<(), CalibrationError> {
        if self.rules.is_empty() {
            return Err(CalibrationError::MissingField("rules".to_string()));
        }

        for (index, rule) in self.rules.iter().enumerate() {
            let name = rule
                .label
                .clone()
                .unwrap_or_else(|| format!("rules[{}]", index));

            if self.pathway(&rule.pathway).is_none() {
                return Err(CalibrationError::ValidationError(format!(
                    "Rule '{}' names unknown pathway '{}'",
                    name, rule.pathway
                )));
            }
            for (axis, min, max) in [
                ("load", rule.load_min, rule.load_max),
                ("severity", rule.severity_min, rule.severity_max),
            ] {
                if !min.is_finite() || min < 0.0 {
                    return Err(CalibrationError::ValidationError(format!(
                        "Rule '{}' has invalid {}_min {}",
                        name, axis, min
                    )));
                }
                if let Some(max) = max {
                    if !max.is_finite() || max <= min {
                        return Err(CalibrationError::ValidationError(format!(
                            "Rule '{}' has {}_max {} not above {}_min {}",
                            name, axis, max, axis, min
                        )));
                    }
                }
            }
        }

        if let Some((load, severity)) = super::coverage::find_uncovered(&self.rules) {
            return Err(CalibrationError::ValidationError(format!(
                "Selection rules leave load={} severity={} uncovered",
                load, severity
            )));
        }
        Ok(())
    }

    fn validate_lenses(&self) -> Result<(), CalibrationError> {
        self.lenses
            .compassion_preservation
            .validate()
            .and_then(|_| self.lenses.protective_presence.validate())
            .and_then(|_| self.lenses.grief_accumulation.validate())
            .map_err(|e| CalibrationError::ValidationError(format!("Lens thresholds: {}", e)))
    }
}

/// Serde helper for maps of humantime duration strings ("30days", "2w").
mod humantime_map {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::time::Duration;

    pub fn serialize<S>(map: &BTreeMap<String, Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        map.iter()
            .map(|(k, v)| (k.clone(), humantime::format_duration(*v).to_string()))
            .collect::<BTreeMap<String, String>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(context, s)| {
                humantime::parse_duration(&s)
                    .map(|d| (context.clone(), d))
                    .map_err(|e| {
                        serde::de::Error::custom(format!("half-life for '{}': {}", context, e))
                    })
            })
            .collect()
    }
}
