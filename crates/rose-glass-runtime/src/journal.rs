//! Event journals: grief events kept in a YAML or JSON file.
//!
//! ```yaml
//! events:
//!   - subject: dr_a
//!     id: p1
//!     timestamp: "2025-11-02T08:30:00Z"
//!     subject_category: pediatric
//!     relationship_depth: 0.8
//!     initial_intensity: 0.9
//!     circumstances: [prolonged]
//!     processing_state: processing
//! reflections:
//!   - subject: dr_a
//!     event_id: p1
//!     pathway: compassion
//!     timestamp: "2025-11-20T19:00:00Z"
//!     text: "It keeps my heart open; I still feel the connection."
//! ```
//!
//! Every entry is checked before anything is registered, so a bad entry
//! leaves the store untouched. Loading then replays each event: it is
//! registered raw and advanced one step at a time to its recorded state.
//! Reflections are replayed last and never change an event's state.

use chrono::{DateTime, Utc};
use rose_glass_core::{
    EventId, GriefEvent, GriefEventStore, GriefWisdomTracker, ProcessingState, StoreError,
    SubjectId, WisdomError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Failed to read journal: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Journal entry {index} ({event_id}): {source}")]
    Entry {
        index: usize,
        event_id: EventId,
        #[source]
        source: StoreError,
    },

    #[error("Journal reflection {index} ({event_id}): {source}")]
    Reflection {
        index: usize,
        event_id: EventId,
        #[source]
        source: WisdomError,
    },
}

/// One recorded grief event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub subject: SubjectId,

    /// Generated at load time when absent
    #[serde(default)]
    pub id: Option<EventId>,

    pub timestamp: DateTime<Utc>,
    pub subject_category: String,
    pub relationship_depth: f64,
    pub initial_intensity: f64,

    #[serde(default)]
    pub circumstances: BTreeSet<String>,

    /// Defaults to raw
    #[serde(default)]
    pub processing_state: Option<ProcessingState>,
}

impl JournalEntry {
    fn to_event(&self, event_id: EventId) -> GriefEvent {
        GriefEvent::new(
            event_id,
            self.timestamp,
            self.subject_category.clone(),
            self.relationship_depth,
            self.initial_intensity,
        )
        .with_circumstances(&self.circumstances)
    }
}

/// One recorded reflection on a journaled or already registered event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalReflection {
    pub subject: SubjectId,
    pub event_id: EventId,
    pub pathway: String,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventJournal {
    #[serde(default)]
    pub events: Vec<JournalEntry>,

    #[serde(default)]
    pub reflections: Vec<JournalReflection>,
}

/// What a journal added to a tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLoad {
    pub events: usize,
    pub reflections: usize,

    /// Reflections that yielded a wisdom fragment
    pub fragments: usize,
}

impl EventJournal {
    pub fn from_yaml(yaml: &str) -> Result<Self, JournalError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, JournalError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load by extension: `.json` is JSON, anything else YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, JournalError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }

    /// Register every entry in file order. Returns the number loaded.
    ///
    /// Fails without registering anything if any entry is invalid or its id
    /// is already taken, in the journal or in the store.
    pub fn load_into(&self, store: &GriefEventStore) -> Result<usize, JournalError> {
        let prepared = self.prepare(store)?;
        for (index, (entry, event)) in self.events.iter().zip(prepared).enumerate() {
            let event_id = event.event_id.clone();
            let entry_error = |source| JournalError::Entry {
                index,
                event_id: event_id.clone(),
                source,
            };
            store.register(&entry.subject, event).map_err(entry_error)?;

            let target = entry.processing_state.unwrap_or_default();
            let mut state = ProcessingState::Raw;
            while state != target {
                let Some(next) = state.next() else { break };
                store
                    .mark_processed(&entry.subject, &event_id, next)
                    .map_err(entry_error)?;
                state = next;
            }
        }
        debug!(events = self.events.len(), "Loaded event journal");
        Ok(self.events.len())
    }

    /// Load events into the tracker's store, then replay reflections.
    ///
    /// Reflections are checked along with the events: each must name a
    /// configured pathway and an event that is journaled or already
    /// registered.
    pub fn load_into_tracker(&self, tracker: &GriefWisdomTracker) -> Result<JournalLoad, JournalError> {
        let journaled: HashSet<(&SubjectId, &EventId)> = self
            .events
            .iter()
            .filter_map(|e| e.id.as_ref().map(|id| (&e.subject, id)))
            .collect();
        let calibration = tracker.classifier().calibration();

        for (index, reflection) in self.reflections.iter().enumerate() {
            let reflection_error = |source| JournalError::Reflection {
                index,
                event_id: reflection.event_id.clone(),
                source,
            };
            if calibration.pathway(&reflection.pathway).is_none() {
                return Err(reflection_error(WisdomError::UnknownPathway(
                    reflection.pathway.clone(),
                )));
            }
            let known = journaled.contains(&(&reflection.subject, &reflection.event_id))
                || tracker
                    .store()
                    .get(&reflection.subject, &reflection.event_id)
                    .is_some();
            if !known {
                return Err(reflection_error(WisdomError::EventNotFound {
                    subject: reflection.subject.clone(),
                    event_id: reflection.event_id.clone(),
                }));
            }
        }

        let events = self.load_into(tracker.store())?;

        let mut fragments = 0;
        for (index, reflection) in self.reflections.iter().enumerate() {
            let outcome = tracker
                .process_reflection(
                    &reflection.subject,
                    &reflection.event_id,
                    &reflection.pathway,
                    &reflection.text,
                    reflection.timestamp,
                )
                .map_err(|source| JournalError::Reflection {
                    index,
                    event_id: reflection.event_id.clone(),
                    source,
                })?;
            fragments += usize::from(outcome.fragment.is_some());
        }
        debug!(
            events,
            reflections = self.reflections.len(),
            fragments,
            "Replayed journal reflections"
        );
        Ok(JournalLoad {
            events,
            reflections: self.reflections.len(),
            fragments,
        })
    }

    /// Build and check every event without touching the store.
    fn prepare(&self, store: &GriefEventStore) -> Result<Vec<GriefEvent>, JournalError> {
        let mut seen = HashSet::new();
        self.events
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let event_id = entry.id.clone().unwrap_or_else(EventId::generate);
                let entry_error = |source| JournalError::Entry {
                    index,
                    event_id: event_id.clone(),
                    source,
                };

                let event = entry.to_event(event_id.clone());
                event.validate().map_err(|reason| {
                    entry_error(StoreError::InvalidEvent {
                        event_id: event_id.clone(),
                        reason,
                    })
                })?;
                let taken = store.get(&entry.subject, &event_id).is_some();
                if taken || !seen.insert((entry.subject.clone(), event_id.clone())) {
                    return Err(entry_error(StoreError::DuplicateEvent {
                        subject: entry.subject.clone(),
                        event_id: event_id.clone(),
                    }));
                }
                Ok(event)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rose_glass_core::fixtures::TEST_CALIBRATION_YAML;
    use rose_glass_core::{Calibration, TimeRange};

    const JOURNAL: &str = r#"
events:
  - subject: dr_a
    id: p2
    timestamp: "2025-11-10T08:00:00Z"
    subject_category: adult
    relationship_depth: 0.4
    initial_intensity: 0.5
  - subject: dr_a
    id: p1
    timestamp: "2025-11-02T08:30:00Z"
    subject_category: Pediatric
    relationship_depth: 0.8
    initial_intensity: 0.9
    circumstances: [prolonged]
    processing_state: transformed
  - subject: dr_b
    timestamp: "2025-11-03T12:00:00Z"
    subject_category: elderly
    relationship_depth: 0.3
    initial_intensity: 0.4
    processing_state: processing
"#;

    #[test]
    fn test_load_replays_states() {
        let journal = EventJournal::from_yaml(JOURNAL).unwrap();
        let store = GriefEventStore::new();
        assert_eq!(journal.load_into(&store).unwrap(), 3);

        let history = store.history(&"dr_a".into(), TimeRange::all());
        let ids: Vec<&str> = history.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        let p1 = store.get(&"dr_a".into(), &"p1".into()).unwrap();
        assert_eq!(p1.processing_state(), ProcessingState::Transformed);
        assert_eq!(p1.subject_category, "pediatric");

        let dr_b = store.history(&"dr_b".into(), TimeRange::all());
        assert_eq!(dr_b.len(), 1);
        assert_eq!(dr_b.iter().next().unwrap().processing_state(), ProcessingState::Processing);
    }

    #[test]
    fn test_duplicate_entry_reports_index() {
        let journal = EventJournal::from_yaml(JOURNAL).unwrap();
        let store = GriefEventStore::new();
        journal.load_into(&store).unwrap();

        let err = journal.load_into(&store).unwrap_err();
        match err {
            JournalError::Entry {
                index, event_id, source,
            } => {
                assert_eq!(index, 0);
                assert_eq!(event_id.as_str(), "p2");
                assert!(matches!(source, StoreError::DuplicateEvent { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_json_journal_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(
            &path,
            r#"{"events": [{"subject": "dr_c", "id": "e1", "timestamp": "2025-10-01T00:00:00Z",
                "subject_category": "adult", "relationship_depth": 0.5, "initial_intensity": 0.5}]}"#,
        )
        .unwrap();

        let journal = EventJournal::from_path(&path).unwrap();
        assert_eq!(journal.events.len(), 1);
        assert!(journal.events[0].processing_state.is_none());
    }

    #[test]
    fn test_unknown_state_is_a_parse_error() {
        let yaml = JOURNAL.replace("processing_state: processing", "processing_state: healed");
        assert!(matches!(EventJournal::from_yaml(&yaml), Err(JournalError::Yaml(_))));
    }

    #[test]
    fn test_bad_entry_leaves_store_untouched() {
        let yaml = JOURNAL.replace("initial_intensity: 0.4", "initial_intensity: 1.4");
        let journal = EventJournal::from_yaml(&yaml).unwrap();
        let store = GriefEventStore::new();

        let err = journal.load_into(&store).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Entry {
                index: 2,
                source: StoreError::InvalidEvent { .. },
                ..
            }
        ));
        assert!(store.subjects().is_empty());
    }

    #[test]
    fn test_repeated_id_within_journal_rejected_up_front() {
        let yaml = format!(
            "{}  - subject: dr_a\n    id: p1\n    timestamp: \"2025-11-04T08:00:00Z\"\n    \
             subject_category: adult\n    relationship_depth: 0.2\n    initial_intensity: 0.2\n",
            JOURNAL.trim_start()
        );
        let journal = EventJournal::from_yaml(&yaml).unwrap();
        let store = GriefEventStore::new();

        match journal.load_into(&store).unwrap_err() {
            JournalError::Entry { index, source, .. } => {
                assert_eq!(index, 3);
                assert!(matches!(source, StoreError::DuplicateEvent { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.len(&"dr_a".into()), 0);
    }

    fn tracker() -> GriefWisdomTracker {
        let calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        GriefWisdomTracker::new(calibration, "general_oncology").unwrap()
    }

    const REFLECTIONS: &str = r#"
reflections:
  - subject: dr_a
    event_id: p1
    pathway: compassion
    timestamp: "2025-11-20T19:00:00Z"
    text: "It keeps my heart open; I still feel the connection."
  - subject: dr_a
    event_id: p2
    pathway: service
    timestamp: "2025-11-21T19:00:00Z"
    text: "Long shift."
"#;

    #[test]
    fn test_reflections_replayed_into_wisdom_bank() {
        let journal = EventJournal::from_yaml(&format!("{}{}", JOURNAL, REFLECTIONS)).unwrap();
        let tracker = tracker();

        let loaded = journal.load_into_tracker(&tracker).unwrap();
        assert_eq!(
            loaded,
            JournalLoad {
                events: 3,
                reflections: 2,
                fragments: 1,
            }
        );

        let inventory = tracker.wisdom_inventory(&"dr_a".into());
        assert_eq!(inventory["compassion"].len(), 1);
        assert_eq!(inventory["compassion"][0].source_event.as_str(), "p1");
        let p2 = tracker.store().get(&"dr_a".into(), &"p2".into()).unwrap();
        assert_eq!(p2.processing_state(), ProcessingState::Raw);
    }

    #[test]
    fn test_reflection_on_unknown_event_blocks_whole_load() {
        let reflections = REFLECTIONS.replace("event_id: p2", "event_id: p9");
        let journal = EventJournal::from_yaml(&format!("{}{}", JOURNAL, reflections)).unwrap();
        let tracker = tracker();

        let err = journal.load_into_tracker(&tracker).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Reflection {
                index: 1,
                source: WisdomError::EventNotFound { .. },
                ..
            }
        ));
        assert!(tracker.store().subjects().is_empty());
        assert!(tracker.wisdom().fragments(&"dr_a".into()).is_empty());
    }

    #[test]
    fn test_reflection_on_unknown_pathway_rejected() {
        let reflections = REFLECTIONS.replace("pathway: service", "pathway: gratitude");
        let journal = EventJournal::from_yaml(&format!("{}{}", JOURNAL, reflections)).unwrap();
        let err = journal.load_into_tracker(&tracker()).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Reflection {
                source: WisdomError::UnknownPathway(_),
                ..
            }
        ));
    }
}
