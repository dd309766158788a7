//! Grief wisdom tracker: the store and classifier behind one caller API.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

use crate::calibration::{Calibration, CalibrationError};
use crate::classifier::{
    transformation_candidates, ClassifierError, LoadScore, PathwaySuggestion,
    TransformationCandidate, WisdomPathway, WisdomPathwayClassifier,
};
use crate::event::{EventId, GriefEvent, ProcessingState, SubjectId};
use crate::store::{GriefEventStore, History, StoreError, TimeRange};
use crate::wisdom::{
    next_steps, reflection_notes, ReflectionOutcome, WisdomBank, WisdomError, WisdomFragment,
    WisdomMarkers, NO_GRIEF_COMPRESSION,
};

/// Tracks grief events per subject and suggests wisdom pathways for them.
///
/// A tracker cannot be built from an invalid calibration, so every operation
/// on an existing tracker runs against validated configuration.
#[derive(Debug)]
pub struct GriefWisdomTracker {
    store: GriefEventStore,
    classifier: WisdomPathwayClassifier,
    wisdom: WisdomBank,
    markers: WisdomMarkers,
}

impl GriefWisdomTracker {
    /// Create a tracker for one clinical context.
    pub fn new(calibration: Calibration, context: impl Into<String>) -> Result<Self, CalibrationError> {
        Self::with_shared(Arc::new(calibration), context)
    }

    /// Create a tracker sharing a calibration with other components.
    pub fn with_shared(
        calibration: Arc<Calibration>,
        context: impl Into<String>,
    ) -> Result<Self, CalibrationError> {
        let classifier = WisdomPathwayClassifier::new(calibration, context)?;
        let markers = WisdomMarkers::from_calibration(classifier.calibration())?;
        Ok(Self {
            store: GriefEventStore::new(),
            classifier,
            wisdom: WisdomBank::new(),
            markers,
        })
    }

    /// Register an event and return its id.
    pub fn register_event(
        &self,
        subject: &SubjectId,
        event: GriefEvent,
    ) -> Result<EventId, StoreError> {
        let event_id = event.event_id.clone();
        self.store.register(subject, event)?;
        Ok(event_id)
    }

    pub fn suggest_pathway(
        &self,
        subject: &SubjectId,
        event_id: &EventId,
    ) -> Result<PathwaySuggestion, ClassifierError> {
        self.classifier.suggest(&self.store, subject, event_id)
    }

    pub fn get_history(&self, subject: &SubjectId, range: TimeRange) -> History {
        self.store.history(subject, range)
    }

    pub fn mark_processed(
        &self,
        subject: &SubjectId,
        event_id: &EventId,
        new_state: ProcessingState,
    ) -> Result<GriefEvent, StoreError> {
        self.store.mark_processed(subject, event_id, new_state)
    }

    /// Decayed load of the subject's events up to `as_of`.
    pub fn load_score(&self, subject: &SubjectId, as_of: DateTime<Utc>) -> LoadScore {
        self.classifier.load_score(&self.store, subject, as_of)
    }

    /// Events most ready for transformation work, best first.
    pub fn transformation_candidates(
        &self,
        subject: &SubjectId,
        max: usize,
    ) -> Vec<TransformationCandidate> {
        transformation_candidates(&self.store.history(subject, TimeRange::all()), max)
    }

    /// Read a deliberate reflection on a registered loss along one pathway.
    ///
    /// Wisdom found in the text is recorded against the event. The event's
    /// processing state is reported, never changed.
    pub fn process_reflection(
        &self,
        subject: &SubjectId,
        event_id: &EventId,
        pathway_id: &str,
        text: &str,
        at: DateTime<Utc>,
    ) -> Result<ReflectionOutcome, WisdomError> {
        let event = self
            .store
            .get(subject, event_id)
            .ok_or_else(|| WisdomError::EventNotFound {
                subject: subject.clone(),
                event_id: event_id.clone(),
            })?;
        let calibration = self.classifier.calibration();
        let (priority, template) = calibration
            .pathway(pathway_id)
            .ok_or_else(|| WisdomError::UnknownPathway(pathway_id.to_string()))?;

        let fragment = self.markers.extract(template, event_id, text, at);
        if let Some(fragment) = &fragment {
            info!(
                subject = %subject,
                event_id = %event_id,
                pathway = %fragment.pathway,
                accessibility = fragment.accessibility,
                "Recorded wisdom fragment"
            );
            self.wisdom.record(subject, fragment.clone());
        }

        let drawn = self.wisdom.for_event(subject, event_id);
        let explored: BTreeSet<&str> = drawn.iter().map(|f| f.pathway.as_str()).collect();
        let unexplored = calibration
            .pathways
            .iter()
            .find(|p| !explored.contains(p.id.as_str()))
            .map(|p| p.label.as_str());
        let state = event.processing_state();

        Ok(ReflectionOutcome {
            subject: subject.clone(),
            event_id: event_id.clone(),
            pathway: WisdomPathway {
                id: template.id.clone(),
                label: template.label.clone(),
                priority,
            },
            fragment,
            processing_state: state,
            rho: self.wisdom.rho(subject),
            compression_ratio: self.compression_ratio(subject, at),
            remaining_load: self.classifier.load(std::iter::once(&event), at, None).value,
            reflections: reflection_notes(state, drawn.len(), &template.id),
            next_steps: next_steps(state, drawn.len(), unexplored),
        })
    }

    /// Every recorded fragment, grouped by pathway.
    ///
    /// Each configured pathway has an entry, empty if nothing was drawn along it.
    pub fn wisdom_inventory(&self, subject: &SubjectId) -> BTreeMap<String, Vec<WisdomFragment>> {
        let mut inventory: BTreeMap<String, Vec<WisdomFragment>> = self
            .classifier
            .calibration()
            .pathways
            .iter()
            .map(|p| (p.id.clone(), Vec::new()))
            .collect();
        for fragment in self.wisdom.fragments(subject) {
            inventory
                .entry(fragment.pathway.clone())
                .or_default()
                .push(fragment);
        }
        inventory
    }

    pub fn shareable_wisdom(&self, subject: &SubjectId) -> Vec<WisdomFragment> {
        self.wisdom.shareable(subject)
    }

    /// Accumulated wisdom, 0.0..=1.0.
    pub fn current_rho(&self, subject: &SubjectId) -> f64 {
        self.wisdom.rho(subject)
    }

    /// Recorded wisdom relative to the decayed grief load at `as_of`, capped at 1.0.
    ///
    /// A subject with no load reports 0.5.
    pub fn compression_ratio(&self, subject: &SubjectId, as_of: DateTime<Utc>) -> f64 {
        let grief = self.load_score(subject, as_of).value;
        if grief <= 0.0 {
            return NO_GRIEF_COMPRESSION;
        }
        (self.wisdom.total_accessibility(subject) / grief).min(1.0)
    }

    pub fn wisdom(&self) -> &WisdomBank {
        &self.wisdom
    }

    pub fn store(&self) -> &GriefEventStore {
        &self.store
    }

    pub fn classifier(&self) -> &WisdomPathwayClassifier {
        &self.classifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TEST_CALIBRATION_YAML;
    use chrono::TimeZone;

    fn tracker() -> GriefWisdomTracker {
        let calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        GriefWisdomTracker::new(calibration, "general_oncology").unwrap()
    }

    #[test]
    fn test_register_returns_event_id() {
        let tracker = tracker();
        let ts = Utc.with_ymd_and_hms(2025, 11, 3, 10, 0, 0).unwrap();
        let id = tracker
            .register_event(&"dr_b".into(), GriefEvent::new("e1", ts, "adult", 0.4, 0.6))
            .unwrap();
        assert_eq!(id.as_str(), "e1");
        assert_eq!(tracker.get_history(&"dr_b".into(), TimeRange::all()).len(), 1);
    }

    #[test]
    fn test_unknown_context_blocks_construction() {
        let calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        let err = GriefWisdomTracker::new(calibration, "emergency_medicine").unwrap_err();
        assert!(matches!(err, CalibrationError::UnknownContext(ctx) if ctx == "emergency_medicine"));
    }

    #[test]
    fn test_candidates_and_load_through_facade() {
        let tracker = tracker();
        let subject = SubjectId::from("dr_c");
        let ts = Utc.with_ymd_and_hms(2025, 11, 3, 10, 0, 0).unwrap();
        tracker
            .register_event(&subject, GriefEvent::new("e1", ts, "adult", 0.5, 0.8))
            .unwrap();
        tracker
            .mark_processed(&subject, &"e1".into(), ProcessingState::Processing)
            .unwrap();

        let candidates = tracker.transformation_candidates(&subject, 3);
        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].readiness - 0.65).abs() < 1e-12);

        let load = tracker.load_score(&subject, ts);
        assert!((load.value - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_mixed_case_deserialized_event_gets_multipliers() {
        let tracker = tracker();
        let ts = Utc.with_ymd_and_hms(2025, 11, 2, 8, 30, 0).unwrap();
        let lower = GriefEvent::new("p1", ts, "pediatric", 0.8, 0.9).with_circumstance("prolonged");
        tracker.register_event(&"dr_a".into(), lower).unwrap();

        let mixed: GriefEvent = serde_json::from_str(
            r#"{"event_id": "p1", "timestamp": "2025-11-02T08:30:00Z",
                "subject_category": "Pediatric", "relationship_depth": 0.8,
                "initial_intensity": 0.9, "circumstances": ["Prolonged"]}"#,
        )
        .unwrap();
        tracker.register_event(&"dr_z".into(), mixed).unwrap();

        let expected = tracker.suggest_pathway(&"dr_a".into(), &"p1".into()).unwrap();
        let actual = tracker.suggest_pathway(&"dr_z".into(), &"p1".into()).unwrap();
        assert!((actual.focal_severity - 1.326).abs() < 1e-9);
        assert_eq!(actual.focal_severity.to_bits(), expected.focal_severity.to_bits());
        assert_eq!(actual.pathway, expected.pathway);
    }

    fn tracker_with_loss(subject: &SubjectId) -> (GriefWisdomTracker, DateTime<Utc>) {
        let tracker = tracker();
        let ts = Utc.with_ymd_and_hms(2025, 11, 3, 10, 0, 0).unwrap();
        tracker
            .register_event(subject, GriefEvent::new("e1", ts, "adult", 0.8, 0.5))
            .unwrap();
        (tracker, ts)
    }

    #[test]
    fn test_reflection_records_wisdom_without_advancing_state() {
        let subject = SubjectId::from("dr_w");
        let (tracker, ts) = tracker_with_loss(&subject);
        tracker
            .mark_processed(&subject, &"e1".into(), ProcessingState::Processing)
            .unwrap();

        let outcome = tracker
            .process_reflection(
                &subject,
                &"e1".into(),
                "compassion",
                "I still feel the weight, but it keeps my heart open to families.",
                ts,
            )
            .unwrap();

        let fragment = outcome.fragment.as_ref().unwrap();
        assert_eq!(fragment.pathway, "compassion");
        assert_eq!(fragment.source_event.as_str(), "e1");
        assert_eq!(outcome.pathway.id, "compassion");
        assert_eq!(outcome.pathway.priority, 1);
        assert_eq!(outcome.processing_state, ProcessingState::Processing);
        assert!(outcome.reflections[0].starts_with("Integration is occurring"));
        assert_eq!(outcome.next_steps.last().unwrap(), "Consider exploring: Resilience");

        let stored = tracker.store().get(&subject, &"e1".into()).unwrap();
        assert_eq!(stored.processing_state(), ProcessingState::Processing);
        assert!((tracker.current_rho(&subject) - fragment.accessibility / 10.0).abs() < 1e-12);
        assert_eq!(outcome.rho, tracker.current_rho(&subject));
        // undecayed weight; the fixture leaves every state weight at 1.0
        assert!((outcome.remaining_load - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_reflection_without_markers_records_nothing() {
        let subject = SubjectId::from("dr_w");
        let (tracker, ts) = tracker_with_loss(&subject);

        let outcome = tracker
            .process_reflection(&subject, &"e1".into(), "service", "Long day.", ts)
            .unwrap();
        assert!(outcome.fragment.is_none());
        assert_eq!(outcome.processing_state, ProcessingState::Raw);
        assert!(outcome.reflections[0].starts_with("Processing continues"));
        assert!(tracker.wisdom().fragments(&subject).is_empty());
        assert_eq!(tracker.current_rho(&subject), 0.0);
    }

    #[test]
    fn test_reflection_rejects_unknown_event_and_pathway() {
        let subject = SubjectId::from("dr_w");
        let (tracker, ts) = tracker_with_loss(&subject);

        let missing = tracker
            .process_reflection(&subject, &"nope".into(), "service", "help share", ts)
            .unwrap_err();
        assert!(matches!(missing, WisdomError::EventNotFound { .. }));

        let unknown = tracker
            .process_reflection(&subject, &"e1".into(), "gratitude", "help share", ts)
            .unwrap_err();
        assert_eq!(unknown, WisdomError::UnknownPathway("gratitude".to_string()));
        assert!(tracker.wisdom().fragments(&subject).is_empty());
    }

    #[test]
    fn test_inventory_shareable_and_compression() {
        let subject = SubjectId::from("dr_w");
        let (tracker, ts) = tracker_with_loss(&subject);
        assert_eq!(tracker.compression_ratio(&"nobody".into(), ts), 0.5);

        tracker
            .process_reflection(
                &subject,
                &"e1".into(),
                "service",
                "I want to teach colleagues and help others carry this.",
                ts,
            )
            .unwrap();
        tracker
            .process_reflection(
                &subject,
                &"e1".into(),
                "presence",
                "I stayed in the room and was present with them.",
                ts,
            )
            .unwrap();

        let inventory = tracker.wisdom_inventory(&subject);
        assert_eq!(inventory.len(), 6);
        assert_eq!(inventory["service"].len(), 1);
        assert_eq!(inventory["presence"].len(), 1);
        assert!(inventory["resilience"].is_empty());

        let shareable = tracker.shareable_wisdom(&subject);
        assert_eq!(shareable.len(), 1);
        assert_eq!(shareable[0].pathway, "service");

        // grief load is 0.4 for the raw event at registration time
        let total = tracker.wisdom().total_accessibility(&subject);
        let expected = (total / 0.4).min(1.0);
        assert!((tracker.compression_ratio(&subject, ts) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_many_insights_suggest_advancing_state() {
        let subject = SubjectId::from("dr_w");
        let (tracker, ts) = tracker_with_loss(&subject);
        let mut last = None;
        for (pathway, text) in [
            ("service", "I can help and teach."),
            ("presence", "I stayed and was present."),
            ("resilience", "I found strength to continue."),
        ] {
            last = Some(
                tracker
                    .process_reflection(&subject, &"e1".into(), pathway, text, ts)
                    .unwrap(),
            );
        }
        let outcome = last.unwrap();
        assert_eq!(tracker.wisdom().for_event(&subject, &"e1".into()).len(), 3);
        assert_eq!(outcome.processing_state, ProcessingState::Raw);
        assert!(outcome
            .next_steps
            .last()
            .unwrap()
            .starts_with("3 insights are recorded"));
    }
}
