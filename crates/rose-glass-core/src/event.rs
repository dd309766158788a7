//! Grief events and their processing lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Stable identifier of a grief event, unique within a subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a time-ordered identifier (UUID v7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The person whose grief history is being tracked (usually a physician).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where an event sits in its processing lifecycle.
///
/// Transitions only move forward, one step at a time.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Raw,
    Processing,
    Transformed,
}

impl ProcessingState {
    /// The only state this one may advance to.
    pub fn next(&self) -> Option<ProcessingState> {
        match self {
            ProcessingState::Raw => Some(ProcessingState::Processing),
            ProcessingState::Processing => Some(ProcessingState::Transformed),
            ProcessingState::Transformed => None,
        }
    }

    pub fn can_advance_to(&self, target: ProcessingState) -> bool {
        self.next() == Some(target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingState::Raw => "raw",
            ProcessingState::Processing => "processing",
            ProcessingState::Transformed => "transformed",
        }
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown processing state: {0} (expected raw, processing or transformed)")]
pub struct UnknownProcessingState(pub String);

impl FromStr for ProcessingState {
    type Err = UnknownProcessingState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Ok(ProcessingState::Raw),
            "processing" => Ok(ProcessingState::Processing),
            "transformed" => Ok(ProcessingState::Transformed),
            _ => Err(UnknownProcessingState(s.to_string())),
        }
    }
}

/// A registered loss.
///
/// Everything except `processing_state` is immutable once registered; the
/// state only changes through the store's `mark_processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriefEvent {
    pub event_id: EventId,

    /// When the event was registered, not necessarily when the loss occurred
    pub timestamp: DateTime<Utc>,

    /// Open-vocabulary category of the person affected (`pediatric`, `adult`, ...)
    pub subject_category: String,

    /// Depth of attachment, 0.0..=1.0
    pub relationship_depth: f64,

    /// Free-form circumstance tags (`prolonged`, `sudden`, ...)
    #[serde(default)]
    pub circumstances: BTreeSet<String>,

    /// Intensity at registration, 0.0..=1.0
    pub initial_intensity: f64,

    #[serde(default)]
    pub(crate) processing_state: ProcessingState,
}

impl GriefEvent {
    /// Create a raw event. Tags are normalized to trimmed lowercase.
    pub fn new(
        event_id: impl Into<EventId>,
        timestamp: DateTime<Utc>,
        subject_category: impl Into<String>,
        relationship_depth: f64,
        initial_intensity: f64,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            timestamp,
            subject_category: normalize_tag(&subject_category.into()),
            relationship_depth,
            circumstances: BTreeSet::new(),
            initial_intensity,
            processing_state: ProcessingState::Raw,
        }
    }

    pub fn with_circumstance(mut self, tag: impl AsRef<str>) -> Self {
        let tag = normalize_tag(tag.as_ref());
        if !tag.is_empty() {
            self.circumstances.insert(tag);
        }
        self
    }

    pub fn with_circumstances<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .fold(self, |event, tag| event.with_circumstance(tag))
    }

    pub fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    /// Undecayed contribution: intensity times depth.
    pub fn weight(&self) -> f64 {
        self.initial_intensity * self.relationship_depth
    }

    /// Circumstance tags followed by the subject category.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.circumstances
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.subject_category.as_str()))
    }

    /// Bring the category and circumstance tags to trimmed lowercase, dropping empty tags.
    pub(crate) fn normalize(&mut self) {
        self.subject_category = normalize_tag(&self.subject_category);
        self.circumstances = std::mem::take(&mut self.circumstances)
            .iter()
            .map(|tag| normalize_tag(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
    }

    /// Check the bounded scalars. Returns a reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_id.as_str().trim().is_empty() {
            return Err("event_id must not be empty".to_string());
        }
        for (field, value) in [
            ("relationship_depth", self.relationship_depth),
            ("initial_intensity", self.initial_intensity),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("{} must be within 0.0..=1.0, got {}", field, value));
            }
        }
        Ok(())
    }
}

pub(crate) fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}
