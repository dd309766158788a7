//! Grief Event Store.
//!
//! A per-subject, chronological, append-mostly log of grief events.
//!
//! ## Concurrency
//!
//! The subject map sits behind one `RwLock`, and every subject log behind its
//! own, so writers for different subjects never contend. Each log keeps its
//! events in an `Arc<Vec<_>>` that is replaced copy-on-write: `history` clones
//! the `Arc` under the read lock and iterates outside it, so a reader always
//! sees a complete snapshot.
//!
//! ## Ordering
//!
//! Events are kept sorted by timestamp. Backfilled events are inserted after
//! every event with an equal or earlier timestamp, which preserves
//! registration order for ties.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::event::{EventId, GriefEvent, ProcessingState, SubjectId};

/// Errors raised by store mutations. The store is unchanged when any is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Event {event_id} already registered for subject {subject}")]
    DuplicateEvent {
        subject: SubjectId,
        event_id: EventId,
    },

    #[error("Invalid transition for event {event_id}: {from} -> {to}")]
    InvalidTransition {
        event_id: EventId,
        from: ProcessingState,
        to: ProcessingState,
    },

    #[error("Event {event_id} not found for subject {subject}")]
    EventNotFound {
        subject: SubjectId,
        event_id: EventId,
    },

    #[error("Invalid event {event_id}: {reason}")]
    InvalidEvent { event_id: EventId, reason: String },
}

/// Inclusive time window for history queries. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,

    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Unbounded window.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(since: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: None,
        }
    }

    pub fn until(until: DateTime<Utc>) -> Self {
        Self {
            since: None,
            until: Some(until),
        }
    }

    pub fn between(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            since: Some(since),
            until: Some(until),
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.since.map_or(true, |s| timestamp >= s) && self.until.map_or(true, |u| timestamp <= u)
    }
}

/// A snapshot of one subject's events within a window, oldest first.
///
/// Holding a `History` never blocks writers, and iterating it twice yields the
/// same sequence.
#[derive(Debug, Clone)]
pub struct History {
    events: Arc<Vec<GriefEvent>>,
    range: Range<usize>,
}

impl History {
    pub fn empty() -> Self {
        Self {
            events: Arc::new(Vec::new()),
            range: 0..0,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GriefEvent> {
        self.as_slice().iter()
    }

    pub fn as_slice(&self) -> &[GriefEvent] {
        &self.events[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn to_vec(&self) -> Vec<GriefEvent> {
        self.as_slice().to_vec()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a GriefEvent;
    type IntoIter = std::slice::Iter<'a, GriefEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Default)]
struct SubjectLog {
    events: Arc<Vec<GriefEvent>>,
    ids: HashSet<EventId>,
}

impl SubjectLog {
    fn insert(&mut self, event: GriefEvent) {
        let events = Arc::make_mut(&mut self.events);
        let at = events.partition_point(|e| e.timestamp <= event.timestamp);
        self.ids.insert(event.event_id.clone());
        events.insert(at, event);
    }

    fn position(&self, event_id: &EventId) -> Option<usize> {
        if !self.ids.contains(event_id) {
            return None;
        }
        self.events.iter().position(|e| &e.event_id == event_id)
    }
}

/// In-memory grief event store, safe to share across threads.
#[derive(Debug, Default)]
pub struct GriefEventStore {
    subjects: RwLock<BTreeMap<SubjectId, Arc<RwLock<SubjectLog>>>>,
}

impl GriefEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, subject: &SubjectId) -> Option<Arc<RwLock<SubjectLog>>> {
        self.subjects.read().get(subject).cloned()
    }

    fn log_or_create(&self, subject: &SubjectId) -> Arc<RwLock<SubjectLog>> {
        if let Some(log) = self.log(subject) {
            return log;
        }
        let mut subjects = self.subjects.write();
        Arc::clone(subjects.entry(subject.clone()).or_default())
    }

    /// Register a new event for a subject.
    ///
    /// The event must be `raw` with depth and intensity in `0.0..=1.0`.
    /// Category and circumstance tags are stored in trimmed lowercase however
    /// the event was built. Fails with `DuplicateEvent` if the id is already
    /// known for the subject.
    pub fn register(&self, subject: &SubjectId, mut event: GriefEvent) -> Result<(), StoreError> {
        event.normalize();
        if let Err(reason) = event.validate() {
            warn!(subject = %subject, event_id = %event.event_id, %reason, "Rejected invalid grief event");
            return Err(StoreError::InvalidEvent {
                event_id: event.event_id,
                reason,
            });
        }
        if event.processing_state != ProcessingState::Raw {
            return Err(StoreError::InvalidEvent {
                reason: format!(
                    "new events must start raw, got {}",
                    event.processing_state
                ),
                event_id: event.event_id,
            });
        }

        let log = self.log_or_create(subject);
        let mut log = log.write();
        if log.ids.contains(&event.event_id) {
            warn!(subject = %subject, event_id = %event.event_id, "Duplicate grief event");
            return Err(StoreError::DuplicateEvent {
                subject: subject.clone(),
                event_id: event.event_id,
            });
        }

        debug!(
            subject = %subject,
            event_id = %event.event_id,
            timestamp = %event.timestamp,
            category = %event.subject_category,
            "Registered grief event"
        );
        log.insert(event);
        Ok(())
    }

    /// Events for a subject within `range`, oldest first.
    ///
    /// Unknown subjects, empty windows and `since > until` all yield an empty
    /// history.
    pub fn history(&self, subject: &SubjectId, range: TimeRange) -> History {
        let Some(log) = self.log(subject) else {
            return History::empty();
        };
        let events = Arc::clone(&log.read().events);

        let start = range
            .since
            .map_or(0, |since| events.partition_point(|e| e.timestamp < since));
        let end = range.until.map_or(events.len(), |until| {
            events.partition_point(|e| e.timestamp <= until)
        });

        History {
            events,
            range: start..end.max(start),
        }
    }

    /// Advance an event's processing state by exactly one step.
    ///
    /// Returns the updated event.
    pub fn mark_processed(
        &self,
        subject: &SubjectId,
        event_id: &EventId,
        new_state: ProcessingState,
    ) -> Result<GriefEvent, StoreError> {
        let not_found = || StoreError::EventNotFound {
            subject: subject.clone(),
            event_id: event_id.clone(),
        };

        let log = self.log(subject).ok_or_else(not_found)?;
        let mut log = log.write();
        let index = log.position(event_id).ok_or_else(not_found)?;

        let from = log.events[index].processing_state;
        if !from.can_advance_to(new_state) {
            warn!(subject = %subject, event_id = %event_id, %from, to = %new_state, "Rejected state transition");
            return Err(StoreError::InvalidTransition {
                event_id: event_id.clone(),
                from,
                to: new_state,
            });
        }

        let events = Arc::make_mut(&mut log.events);
        events[index].processing_state = new_state;
        debug!(subject = %subject, event_id = %event_id, %from, to = %new_state, "Advanced processing state");
        Ok(events[index].clone())
    }

    /// Look up a single event.
    pub fn get(&self, subject: &SubjectId, event_id: &EventId) -> Option<GriefEvent> {
        let log = self.log(subject)?;
        let log = log.read();
        let index = log.position(event_id)?;
        Some(log.events[index].clone())
    }

    /// Subjects with at least one registered event, in sorted order.
    pub fn subjects(&self) -> Vec<SubjectId> {
        self.subjects
            .read()
            .iter()
            .filter(|(_, log)| !log.read().events.is_empty())
            .map(|(subject, _)| subject.clone())
            .collect()
    }

    /// Number of events registered for a subject.
    pub fn len(&self, subject: &SubjectId) -> usize {
        self.log(subject).map_or(0, |log| log.read().events.len())
    }
}
