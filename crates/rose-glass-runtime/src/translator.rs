//! Translation pipeline.
//!
//! One call runs the whole flow for a reflection:
//! - extract dimensions from the text
//! - read them through the requested lens, with the subject's prior history
//! - register the accompanying grief event, if any, and classify it
//! - render the narrative
//!
//! The lens sees history as it stood before this call's event is registered.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use rose_glass_core::{
    accumulation_trend, period_summary, render, timeline_summary, translate_with,
    AccumulationTrend, Calibration, DimensionExtractor, Dimensions, EventId, GriefEvent,
    GriefWisdomTracker, LensKind, LensSet, MarkerExtractor, NarrativeInput, PathwaySuggestion,
    PeriodSummary, RoseGlassError, SubjectId, TimeRange, TrackingPoint, Translation,
};

use crate::config::{ConfigError, RuntimeConfig};

/// Errors from the translation pipeline.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error(transparent)]
    Core(#[from] RoseGlassError),

    #[error("Runtime config error: {0}")]
    Config(#[from] ConfigError),

    #[error("No calibration supplied and no calibration_path configured")]
    MissingCalibration,
}

/// A grief event to register alongside a reflection.
///
/// The translator stamps it with the evaluation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewGriefEvent {
    /// Generated when absent
    #[serde(default)]
    pub id: Option<EventId>,
    pub subject_category: String,
    pub relationship_depth: f64,
    pub initial_intensity: f64,
    #[serde(default)]
    pub circumstances: BTreeSet<String>,
}

/// One reflection to translate.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub subject: SubjectId,
    pub text: String,

    /// Falls back to the configured default lens
    pub lens: Option<LensKind>,

    pub tags: BTreeSet<String>,
    pub grief_event: Option<NewGriefEvent>,
}

impl TranslationRequest {
    pub fn new(subject: impl Into<SubjectId>, text: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            lens: None,
            tags: BTreeSet::new(),
            grief_event: None,
        }
    }

    pub fn lens(mut self, lens: LensKind) -> Self {
        self.lens = Some(lens);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn grief_event(mut self, event: NewGriefEvent) -> Self {
        self.grief_event = Some(event);
        self
    }
}

/// Everything one translation produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationOutcome {
    pub translation: Translation,

    /// Present when a grief event was registered
    pub suggestion: Option<PathwaySuggestion>,

    pub narrative: String,
    pub translated_at: DateTime<Utc>,

    /// Present once the subject has enough tracked readings
    pub trend: Option<AccumulationTrend>,
}

/// Builder for a `Translator`.
pub struct TranslatorBuilder {
    extractor: Box<dyn DimensionExtractor>,
    calibration: Option<Arc<Calibration>>,
    config: RuntimeConfig,
}

impl Default for TranslatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslatorBuilder {
    pub fn new() -> Self {
        Self {
            extractor: Box::new(MarkerExtractor),
            calibration: None,
            config: RuntimeConfig::default(),
        }
    }

    pub fn extractor(mut self, extractor: impl DimensionExtractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn calibration(mut self, calibration: Arc<Calibration>) -> Self {
        self.calibration = Some(calibration);
        self
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate configuration and build the translator.
    ///
    /// Without an explicit calibration, `config.calibration_path` is loaded.
    pub fn build(self) -> Result<Translator, TranslateError> {
        self.config.validate()?;

        let calibration = match (self.calibration, &self.config.calibration_path) {
            (Some(calibration), _) => calibration,
            (None, Some(path)) => {
                Arc::new(Calibration::from_path(path).map_err(RoseGlassError::from)?)
            }
            (None, None) => return Err(TranslateError::MissingCalibration),
        };

        let lenses = LensSet::from_calibration(&calibration);
        let tracker = GriefWisdomTracker::with_shared(calibration, self.config.context.clone())
            .map_err(RoseGlassError::from)?;

        Ok(Translator {
            extractor: self.extractor,
            lenses,
            tracker,
            config: self.config,
            readings: Mutex::new(BTreeMap::new()),
        })
    }
}

/// Runs the translation pipeline against one tracker.
pub struct Translator {
    extractor: Box<dyn DimensionExtractor>,
    lenses: LensSet,
    tracker: GriefWisdomTracker,
    config: RuntimeConfig,

    /// Recent tracking points per subject, oldest first
    readings: Mutex<BTreeMap<SubjectId, VecDeque<TrackingPoint>>>,
}

impl Translator {
    pub fn builder() -> TranslatorBuilder {
        TranslatorBuilder::new()
    }

    pub fn tracker(&self) -> &GriefWisdomTracker {
        &self.tracker
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn lenses(&self) -> &LensSet {
        &self.lenses
    }

    /// Translate a reflection and, if it carries a grief event, register and classify it.
    pub fn translate(&self, request: TranslationRequest) -> Result<TranslationOutcome, TranslateError> {
        let lens = request.lens.unwrap_or(self.config.default_lens);
        let translated_at = self.config.evaluated_at();
        let subject = &request.subject;

        let history = self.tracker.get_history(subject, self.history_range(translated_at));
        let translation = translate_with(
            self.extractor.as_ref(),
            &self.lenses,
            lens,
            &request.text,
            &request.tags,
            history.as_slice(),
        )?;

        let suggestion = match request.grief_event {
            Some(new_event) => Some(self.register_and_classify(subject, new_event, translated_at)?),
            None => None,
        };

        let point = TrackingPoint {
            timestamp: translated_at,
            dimensions: translation.dimensions,
            grief_load: self.tracker.load_score(subject, translated_at).value,
            losses: usize::from(suggestion.is_some()),
        };
        let trend = self.track(subject, point);

        let input = NarrativeInput::new(&translation.dimensions, &translation.reading)
            .with_suggestion(suggestion.as_ref())
            .with_uncertainty(&translation.uncertainty_notes, translation.confidence);
        let narrative = render(&input, &self.config.render);

        debug!(
            subject = %subject,
            lens = %lens,
            pattern = %translation.reading.pattern,
            confidence = translation.confidence,
            pathway = suggestion.as_ref().map(|s| s.pathway.id.as_str()),
            "Translated reflection"
        );

        Ok(TranslationOutcome {
            translation,
            suggestion,
            narrative,
            translated_at,
            trend,
        })
    }

    /// Recent readings tracked for a subject, oldest first.
    pub fn readings(&self, subject: &SubjectId) -> Vec<Dimensions> {
        self.tracking_points(subject)
            .into_iter()
            .map(|p| p.dimensions)
            .collect()
    }

    pub fn tracking_points(&self, subject: &SubjectId) -> Vec<TrackingPoint> {
        self.readings
            .lock()
            .get(subject)
            .map(|r| r.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Averages over a subject's tracked readings within `range`.
    pub fn period_summary(&self, subject: &SubjectId, range: TimeRange) -> Option<PeriodSummary> {
        period_summary(&self.tracking_points(subject), range)
    }

    /// Narrative of the subject's tracked readings over the past `days` days.
    pub fn timeline_summary(&self, subject: &SubjectId, days: u32) -> String {
        timeline_summary(
            &self.tracking_points(subject),
            self.config.evaluated_at(),
            days,
        )
    }

    fn history_range(&self, as_of: DateTime<Utc>) -> TimeRange {
        self.config
            .tracking
            .history_window
            .and_then(|window| chrono::Duration::from_std(window).ok())
            .and_then(|window| as_of.checked_sub_signed(window))
            .map_or(TimeRange::until(as_of), |since| TimeRange::between(since, as_of))
    }

    fn register_and_classify(
        &self,
        subject: &SubjectId,
        new_event: NewGriefEvent,
        timestamp: DateTime<Utc>,
    ) -> Result<PathwaySuggestion, RoseGlassError> {
        let event = GriefEvent::new(
            new_event.id.unwrap_or_else(EventId::generate),
            timestamp,
            new_event.subject_category,
            new_event.relationship_depth,
            new_event.initial_intensity,
        )
        .with_circumstances(new_event.circumstances);

        let event_id = self.tracker.register_event(subject, event)?;
        Ok(self.tracker.suggest_pathway(subject, &event_id)?)
    }

    fn track(&self, subject: &SubjectId, point: TrackingPoint) -> Option<AccumulationTrend> {
        if !self.config.tracking.enabled {
            return None;
        }
        let mut readings = self.readings.lock();
        let log = readings.entry(subject.clone()).or_default();
        log.push_back(point);
        while log.len() > self.config.tracking.max_readings {
            log.pop_front();
        }
        let dimensions: Vec<Dimensions> = log.iter().map(|p| p.dimensions).collect();
        accumulation_trend(&dimensions)
    }
}
