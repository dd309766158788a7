//! Wisdom Pathway Classifier.
//!
//! Selects exactly one pathway for a focal grief event from two scores:
//!
//! - **Load**: decayed sum of the subject's other events registered at or
//!   before the focal event, `intensity * depth * state_weight * 0.5^(age / half_life)`.
//!   Age is measured from the focal event, so the result depends only on
//!   store contents.
//! - **Severity**: `(intensity_weight * intensity + depth_weight * depth)`
//!   scaled by the multiplier of every circumstance tag and the subject
//!   category.
//!
//! Every rule whose rectangle contains `(load, severity)` is collected and the
//! pathway earliest in the calibration's list wins. The classifier reads the
//! store and never writes to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::calibration::{Calibration, CalibrationError};
use crate::event::{EventId, GriefEvent, ProcessingState, SubjectId};
use crate::store::{GriefEventStore, History, TimeRange};

/// Readiness bonus for events already being worked through.
const PROCESSING_BONUS: f64 = 0.5;
/// Readiness bonus for events never revisited.
const UNTOUCHED_BONUS: f64 = 0.1;
/// Share of relationship depth counted toward readiness.
const DEPTH_READINESS: f64 = 0.3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Insufficient data: event {event_id} is not registered for subject {subject}")]
    InsufficientData {
        subject: SubjectId,
        event_id: EventId,
    },

    #[error("No selection rule matched load={load} severity={severity}")]
    NoMatchingRule { load: f64, severity: f64 },
}

/// The selected pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WisdomPathway {
    pub id: String,
    pub label: String,

    /// Position in the configured list; 0 is highest
    pub priority: usize,
}

/// Result of `suggest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwaySuggestion {
    pub subject: SubjectId,
    pub event_id: EventId,
    pub pathway: WisdomPathway,

    /// Reflection prompts, verbatim from the calibration
    pub prompts: Vec<String>,

    pub load_score: f64,
    pub focal_severity: f64,

    /// Number of history events that fed the load score
    pub contributing_events: usize,

    /// Label of the bucket that selected the pathway
    pub bucket: String,
}

/// A decayed load sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadScore {
    pub value: f64,
    pub contributing_events: usize,
}

/// A non-transformed event ranked for transformation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationCandidate {
    pub event: GriefEvent,
    pub readiness: f64,
}

/// Deterministic pathway classifier bound to one calibration and clinical context.
#[derive(Debug, Clone)]
pub struct WisdomPathwayClassifier {
    calibration: Arc<Calibration>,
    context: String,
    half_life: Duration,
}

impl WisdomPathwayClassifier {
    /// Build a classifier for a clinical context.
    ///
    /// Fails if the calibration is invalid or has no half-life for `context`.
    pub fn new(
        calibration: Arc<Calibration>,
        context: impl Into<String>,
    ) -> Result<Self, CalibrationError> {
        calibration.validate()?;
        let context = context.into();
        let half_life = calibration.half_life(&context)?;
        Ok(Self {
            calibration,
            context,
            half_life,
        })
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn half_life(&self) -> Duration {
        self.half_life
    }

    /// `0.5^(age / half_life)`; a non-positive age does not decay.
    pub fn decay(&self, age: chrono::Duration) -> f64 {
        if age <= chrono::Duration::zero() {
            return 1.0;
        }
        let age_secs = age.num_milliseconds() as f64 / 1000.0;
        0.5f64.powf(age_secs / self.half_life.as_secs_f64())
    }

    /// Decayed load of the events at or before `as_of`, optionally skipping one.
    ///
    /// Summed in history order so repeated calls are bit-identical.
    pub fn load<'a>(
        &self,
        events: impl IntoIterator<Item = &'a GriefEvent>,
        as_of: DateTime<Utc>,
        exclude: Option<&EventId>,
    ) -> LoadScore {
        let weights = &self.calibration.state_weights;
        events
            .into_iter()
            .filter(|e| e.timestamp <= as_of && Some(&e.event_id) != exclude)
            .fold(
                LoadScore {
                    value: 0.0,
                    contributing_events: 0,
                },
                |acc, e| LoadScore {
                    value: acc.value
                        + e.weight()
                            * weights.weight(e.processing_state())
                            * self.decay(as_of - e.timestamp),
                    contributing_events: acc.contributing_events + 1,
                },
            )
    }

    /// Severity of an event on its own.
    pub fn severity(&self, event: &GriefEvent) -> f64 {
        let weights = &self.calibration.severity;
        let base = weights.intensity_weight * event.initial_intensity
            + weights.depth_weight * event.relationship_depth;
        event
            .tags()
            .map(|tag| self.calibration.multiplier(tag))
            .fold(base, |acc, m| acc * m)
    }

    /// Pick the highest-priority pathway among all matching rules.
    ///
    /// Returns `(pathway index, rule index)`.
    fn select(&self, load: f64, severity: f64) -> Result<(usize, usize), ClassifierError> {
        self.calibration
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.matches(load, severity))
            .filter_map(|(rule_index, rule)| {
                self.calibration
                    .pathway(&rule.pathway)
                    .map(|(pathway_index, _)| (pathway_index, rule_index))
            })
            .min()
            .ok_or(ClassifierError::NoMatchingRule { load, severity })
    }

    /// Suggest a pathway for a registered event.
    pub fn suggest(
        &self,
        store: &GriefEventStore,
        subject: &SubjectId,
        event_id: &EventId,
    ) -> Result<PathwaySuggestion, ClassifierError> {
        let history = store.history(subject, TimeRange::all());
        let focal = history
            .iter()
            .find(|e| &e.event_id == event_id)
            .ok_or_else(|| ClassifierError::InsufficientData {
                subject: subject.clone(),
                event_id: event_id.clone(),
            })?;

        let load = self.load(&history, focal.timestamp, Some(event_id));
        let severity = self.severity(focal);
        let (pathway_index, rule_index) = self.select(load.value, severity)?;

        let template = &self.calibration.pathways[pathway_index];
        let rule = &self.calibration.rules[rule_index];

        debug!(
            subject = %subject,
            event_id = %event_id,
            pathway = %template.id,
            load = load.value,
            severity,
            context = %self.context,
            "Classified grief event"
        );

        Ok(PathwaySuggestion {
            subject: subject.clone(),
            event_id: event_id.clone(),
            pathway: WisdomPathway {
                id: template.id.clone(),
                label: template.label.clone(),
                priority: pathway_index,
            },
            prompts: template.prompts.clone(),
            load_score: load.value,
            focal_severity: severity,
            contributing_events: load.contributing_events,
            bucket: rule.display_label(),
        })
    }

    /// Decayed load of everything registered for a subject up to `as_of`.
    pub fn load_score(
        &self,
        store: &GriefEventStore,
        subject: &SubjectId,
        as_of: DateTime<Utc>,
    ) -> LoadScore {
        let history = store.history(subject, TimeRange::until(as_of));
        self.load(&history, as_of, None)
    }
}

/// Rank events that are not yet transformed by readiness for reflection work.
///
/// Readiness is a state bonus (0.5 while processing, 0.1 if never revisited)
/// plus 0.3 of the relationship depth. Ties go to the older event, then to
/// the smaller id.
pub fn transformation_candidates(history: &History, max: usize) -> Vec<TransformationCandidate> {
    let mut candidates: Vec<TransformationCandidate> = history
        .iter()
        .filter_map(|event| {
            let bonus = match event.processing_state() {
                ProcessingState::Raw => UNTOUCHED_BONUS,
                ProcessingState::Processing => PROCESSING_BONUS,
                ProcessingState::Transformed => return None,
            };
            Some(TransformationCandidate {
                event: event.clone(),
                readiness: bonus + event.relationship_depth * DEPTH_READINESS,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.readiness
            .total_cmp(&a.readiness)
            .then_with(|| a.event.timestamp.cmp(&b.event.timestamp))
            .then_with(|| a.event.event_id.cmp(&b.event.event_id))
    });
    candidates.truncate(max);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TEST_CALIBRATION_YAML;
    use chrono::TimeZone;

    fn classifier(context: &str) -> WisdomPathwayClassifier {
        let calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        WisdomPathwayClassifier::new(Arc::new(calibration), context).unwrap()
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_context_rejected_at_construction() {
        let calibration = Arc::new(Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap());
        let result = WisdomPathwayClassifier::new(calibration, "cardiology");
        assert!(matches!(result, Err(CalibrationError::UnknownContext(_))));
    }

    #[test]
    fn test_invalid_calibration_rejected_at_construction() {
        let mut calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        calibration
            .severity
            .circumstance_multipliers
            .insert("sudden".to_string(), 0.0);
        let result = WisdomPathwayClassifier::new(Arc::new(calibration), "general_oncology");
        assert!(matches!(result, Err(CalibrationError::ValidationError(_))));
    }

    #[test]
    fn test_decay_halves_each_half_life() {
        let c = classifier("general_oncology");
        assert_eq!(c.decay(chrono::Duration::zero()), 1.0);
        assert_eq!(c.decay(chrono::Duration::days(-3)), 1.0);
        assert!((c.decay(chrono::Duration::days(30)) - 0.5).abs() < 1e-12);
        assert!((c.decay(chrono::Duration::days(60)) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_severity_multiplies_circumstances_and_category() {
        let c = classifier("general_oncology");
        let event = GriefEvent::new("p1", day(1), "pediatric", 0.8, 0.9)
            .with_circumstance("prolonged")
            .with_circumstance("unlisted");
        let expected = (0.5 * 0.9 + 0.5 * 0.8) * 1.2 * 1.3;
        assert!((c.severity(&event) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_load_excludes_focal_and_later_events() {
        let store = GriefEventStore::new();
        let subject = SubjectId::from("dr_a");
        store
            .register(&subject, GriefEvent::new("old", day(1), "adult", 1.0, 1.0))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("focal", day(1) + chrono::Duration::days(30), "adult", 0.5, 0.5))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("later", day(1) + chrono::Duration::days(40), "adult", 1.0, 1.0))
            .unwrap();

        let c = classifier("general_oncology");
        let suggestion = c.suggest(&store, &subject, &"focal".into()).unwrap();
        assert_eq!(suggestion.contributing_events, 1);
        assert!((suggestion.load_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_state_weights_scale_load() {
        let mut calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        calibration.state_weights.processing = 0.5;
        let c = WisdomPathwayClassifier::new(Arc::new(calibration), "general_oncology").unwrap();

        let store = GriefEventStore::new();
        let subject = SubjectId::from("dr_a");
        store
            .register(&subject, GriefEvent::new("a", day(1), "adult", 1.0, 1.0))
            .unwrap();
        store
            .mark_processed(&subject, &"a".into(), ProcessingState::Processing)
            .unwrap();

        let load = c.load_score(&store, &subject, day(1));
        assert_eq!(load.value, 0.5);
        assert_eq!(load.contributing_events, 1);
    }

    #[test]
    fn test_unregistered_focal_is_insufficient_data() {
        let store = GriefEventStore::new();
        let c = classifier("general_oncology");
        let err = c
            .suggest(&store, &"dr_a".into(), &"ghost".into())
            .unwrap_err();
        assert!(matches!(err, ClassifierError::InsufficientData { .. }));
    }

    #[test]
    fn test_overlapping_rules_resolved_by_pathway_priority() {
        let c = classifier("general_oncology");
        // heavy-load-high-severity (resilience) and high-severity (compassion) both match
        let (pathway, rule) = c.select(2.0, 0.9).unwrap();
        assert_eq!(c.calibration().pathways[pathway].id, "resilience");
        assert_eq!(rule, 0);

        let (pathway, _) = c.select(0.2, 0.9).unwrap();
        assert_eq!(c.calibration().pathways[pathway].id, "compassion");
    }

    #[test]
    fn test_bucket_boundaries_are_half_open() {
        let c = classifier("general_oncology");
        let id = |load, severity| {
            let (p, _) = c.select(load, severity).unwrap();
            c.calibration().pathways[p].id.clone()
        };
        assert_eq!(id(0.0, 0.0), "presence");
        assert_eq!(id(0.5, 0.0), "service");
        assert_eq!(id(0.49, 0.35), "communication");
        assert_eq!(id(1.5, 0.69), "perspective");
        assert_eq!(id(1.5, 0.7), "resilience");
    }

    #[test]
    fn test_transformation_candidates_ranking() {
        let store = GriefEventStore::new();
        let subject = SubjectId::from("dr_a");
        store
            .register(&subject, GriefEvent::new("deep-raw", day(1), "adult", 0.9, 0.5))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("shallow-processing", day(2), "adult", 0.2, 0.5))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("done", day(3), "adult", 1.0, 1.0))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("b-tie", day(4), "adult", 0.5, 0.5))
            .unwrap();
        store
            .register(&subject, GriefEvent::new("a-tie", day(4), "adult", 0.5, 0.5))
            .unwrap();

        store
            .mark_processed(&subject, &"shallow-processing".into(), ProcessingState::Processing)
            .unwrap();
        for state in [ProcessingState::Processing, ProcessingState::Transformed] {
            store.mark_processed(&subject, &"done".into(), state).unwrap();
        }

        let history = store.history(&subject, TimeRange::all());
        let ranked: Vec<String> = transformation_candidates(&history, 10)
            .into_iter()
            .map(|c| c.event.event_id.to_string())
            .collect();
        // 0.56, 0.37, 0.25, 0.25
        assert_eq!(ranked, vec!["shallow-processing", "deep-raw", "a-tie", "b-tie"]);

        assert_eq!(transformation_candidates(&history, 1).len(), 1);
    }
}
