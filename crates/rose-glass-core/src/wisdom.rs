//! Wisdom drawn from deliberate reflection.
//!
//! A reflection on a registered loss is read for the markers of one pathway.
//! With enough of them present, a `WisdomFragment` is recorded in the
//! subject's `WisdomBank`. Recording wisdom never advances an event's
//! processing state; that stays an explicit call to `mark_processed`.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::calibration::{Calibration, CalibrationError, PathwayTemplate};
use crate::classifier::WisdomPathway;
use crate::event::{EventId, ProcessingState, SubjectId};
use crate::extractor::{count_markers, fold_apostrophes, marker_pattern, try_marker_pattern};

/// Fewest distinct pathway markers a reflection needs to yield wisdom.
pub const MIN_WISDOM_MARKERS: usize = 2;

/// Fragments recorded for one event before it is worth asking whether the
/// loss has been transformed.
pub const TRANSFORMATION_HINT_FRAGMENTS: usize = 3;

/// Compression ratio reported when no grief is registered.
pub const NO_GRIEF_COMPRESSION: f64 = 0.5;

const MAX_LENGTH_ACCESSIBILITY: f64 = 0.8;
const ACCESSIBILITY_PER_MARKER: f64 = 0.05;
const WISDOM_SCALE: f64 = 10.0;

lazy_static! {
    static ref SHAREABLE_MARKERS: Regex =
        marker_pattern(&["others", "anyone", "people", "colleagues", "we"]);
}

/// Built-in vocabulary for the standard pathways.
fn default_markers(pathway: &str) -> Option<&'static [&'static str]> {
    let markers: &'static [&'static str] = match pathway {
        "presence" => &["being with", "showed up", "present", "stayed"],
        "communication" => &["said", "told", "words", "listen", "heard"],
        "compassion" => &["feel", "connect", "human", "heart", "care"],
        "perspective" => &["realize", "understand", "matter", "important", "life"],
        "resilience" => &["continue", "strength", "endure", "carry on", "cope"],
        "service" => &["help", "share", "teach", "guide", "support"],
        _ => return None,
    };
    Some(markers)
}

fn default_insight(pathway: &str) -> Option<&'static str> {
    match pathway {
        "presence" => Some("Learned to be present with suffering in new ways"),
        "communication" => Some("Discovered what words matter when facing loss"),
        "compassion" => Some("Deepened capacity for human connection through shared grief"),
        "perspective" => Some("Gained clarity on what matters through witnessing loss"),
        "resilience" => Some("Found inner resources to continue serving through difficulty"),
        "service" => Some("Discovered how grief equips us to help others"),
        _ => None,
    }
}

fn pathway_reflection(pathway: &str) -> Option<&'static str> {
    match pathway {
        "presence" => Some("The capacity to be with suffering grows with each encounter honored."),
        "communication" => {
            Some("Words found in grief's depth often reach others facing similar shadows.")
        }
        "compassion" => Some("The heart broken open by loss holds more, not less."),
        "perspective" => Some("Loss clarifies what matters, a gift wrapped in darkness."),
        "resilience" => Some("Each passage through grief maps the terrain for those who follow."),
        "service" => Some("What you draw from your suffering becomes medicine for others."),
        _ => None,
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WisdomError {
    #[error("Event {event_id} not found for subject {subject}")]
    EventNotFound {
        subject: SubjectId,
        event_id: EventId,
    },

    #[error("Unknown pathway: {0}")]
    UnknownPathway(String),
}

/// A piece of wisdom drawn from one reflection on one loss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WisdomFragment {
    /// Pathway id the reflection followed
    pub pathway: String,
    pub source_event: EventId,
    pub insight: String,

    /// How readily the wisdom can be drawn on, 0.0..=1.0
    pub accessibility: f64,

    /// Whether the reflection speaks beyond the physician's own experience
    pub shareable: bool,

    pub marker_count: usize,
    pub extracted_at: DateTime<Utc>,
}

/// Compiled wisdom markers for every pathway of a calibration.
#[derive(Debug, Clone)]
pub struct WisdomMarkers {
    patterns: BTreeMap<String, Regex>,
}

impl WisdomMarkers {
    /// Compile configured markers, falling back to the built-in vocabulary.
    ///
    /// Pathways with neither never yield wisdom.
    pub fn from_calibration(calibration: &Calibration) -> Result<Self, CalibrationError> {
        let mut patterns = BTreeMap::new();
        for pathway in &calibration.pathways {
            let pattern = if pathway.wisdom_markers.is_empty() {
                default_markers(&pathway.id).map(try_marker_pattern)
            } else {
                Some(try_marker_pattern(pathway.wisdom_markers.as_slice()))
            };
            if let Some(pattern) = pattern {
                let pattern = pattern.map_err(|e| {
                    CalibrationError::ValidationError(format!(
                        "Wisdom markers for pathway '{}' do not compile: {}",
                        pathway.id, e
                    ))
                })?;
                patterns.insert(pathway.id.clone(), pattern);
            }
        }
        Ok(Self { patterns })
    }

    /// Read a reflection for one pathway's markers.
    ///
    /// Returns `None` below `MIN_WISDOM_MARKERS` distinct markers.
    pub fn extract(
        &self,
        pathway: &PathwayTemplate,
        source_event: &EventId,
        text: &str,
        extracted_at: DateTime<Utc>,
    ) -> Option<WisdomFragment> {
        let pattern = self.patterns.get(&pathway.id)?;
        let text = fold_apostrophes(text);
        let marker_count = count_markers(pattern, &text);
        if marker_count < MIN_WISDOM_MARKERS {
            return None;
        }

        let words = text.split_whitespace().count() as f64;
        let accessibility = ((words / 100.0).min(MAX_LENGTH_ACCESSIBILITY)
            + marker_count as f64 * ACCESSIBILITY_PER_MARKER)
            .min(1.0);

        let insight = pathway
            .insight
            .clone()
            .or_else(|| default_insight(&pathway.id).map(str::to_string))
            .unwrap_or_else(|| format!("{} drawn from reflection on this loss", pathway.label));

        Some(WisdomFragment {
            pathway: pathway.id.clone(),
            source_event: source_event.clone(),
            insight,
            accessibility,
            shareable: SHAREABLE_MARKERS.is_match(&text),
            marker_count,
            extracted_at,
        })
    }
}

/// Wisdom fragments per subject, in recording order.
#[derive(Debug, Default)]
pub struct WisdomBank {
    fragments: RwLock<BTreeMap<SubjectId, Vec<WisdomFragment>>>,
}

impl WisdomBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, subject: &SubjectId, fragment: WisdomFragment) {
        self.fragments
            .write()
            .entry(subject.clone())
            .or_default()
            .push(fragment);
    }

    pub fn fragments(&self, subject: &SubjectId) -> Vec<WisdomFragment> {
        self.fragments
            .read()
            .get(subject)
            .cloned()
            .unwrap_or_default()
    }

    /// Fragments drawn from one event.
    pub fn for_event(&self, subject: &SubjectId, event_id: &EventId) -> Vec<WisdomFragment> {
        self.filtered(subject, |f| &f.source_event == event_id)
    }

    pub fn shareable(&self, subject: &SubjectId) -> Vec<WisdomFragment> {
        self.filtered(subject, |f| f.shareable)
    }

    pub fn total_accessibility(&self, subject: &SubjectId) -> f64 {
        self.fragments
            .read()
            .get(subject)
            .map_or(0.0, |fragments| fragments.iter().map(|f| f.accessibility).sum())
    }

    /// Accumulated wisdom: total accessibility over ten, capped at 1.0.
    pub fn rho(&self, subject: &SubjectId) -> f64 {
        (self.total_accessibility(subject) / WISDOM_SCALE).min(1.0)
    }

    fn filtered(
        &self,
        subject: &SubjectId,
        keep: impl Fn(&WisdomFragment) -> bool,
    ) -> Vec<WisdomFragment> {
        self.fragments
            .read()
            .get(subject)
            .map(|fragments| fragments.iter().filter(|f| keep(f)).cloned().collect())
            .unwrap_or_default()
    }
}

/// What one deliberate reflection produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReflectionOutcome {
    pub subject: SubjectId,
    pub event_id: EventId,
    pub pathway: WisdomPathway,

    /// Present when the reflection carried enough markers
    pub fragment: Option<WisdomFragment>,

    /// The event's state, unchanged by the reflection
    pub processing_state: ProcessingState,

    /// Subject's accumulated wisdom after recording
    pub rho: f64,
    pub compression_ratio: f64,

    /// Decayed load at the reflection time
    pub remaining_load: f64,

    pub reflections: Vec<String>,
    pub next_steps: Vec<String>,
}

/// Notes on where the loss stands, plus the pathway's own reflection.
pub(crate) fn reflection_notes(
    state: ProcessingState,
    fragments_for_event: usize,
    pathway: &str,
) -> Vec<String> {
    let mut notes = vec![match state {
        ProcessingState::Transformed => "This loss has moved through transformation. \
             The grief has compressed into wisdom that can serve others."
            .to_string(),
        ProcessingState::Processing if fragments_for_event > 0 => "Integration is occurring. \
             The loss is becoming part of your expanded capacity rather than just weight carried."
            .to_string(),
        _ => "Processing continues. Each deliberate return adds to transformation.".to_string(),
    }];
    notes.extend(pathway_reflection(pathway).map(str::to_string));
    notes
}

/// Suggested next steps for an event in `state`.
///
/// `unexplored` is the first pathway not yet drawn from this event.
pub(crate) fn next_steps(
    state: ProcessingState,
    fragments_for_event: usize,
    unexplored: Option<&str>,
) -> Vec<String> {
    let mut steps: Vec<String> = match state {
        ProcessingState::Raw => vec![
            "Allow acknowledgment without forcing processing",
            "Notice when this loss surfaces; these are invitations, not intrusions",
        ],
        ProcessingState::Processing => vec![
            "Continue deliberate engagement; transformation is in process",
            "Consider sharing insights with trusted colleague",
        ],
        ProcessingState::Transformed => vec![
            "This transformation is largely complete",
            "The wisdom can now be shared without re-opening the wound",
        ],
    }
    .into_iter()
    .map(str::to_string)
    .collect();

    if state == ProcessingState::Processing {
        if let Some(label) = unexplored {
            steps.push(format!("Consider exploring: {}", label));
        }
    }
    if state != ProcessingState::Transformed && fragments_for_event >= TRANSFORMATION_HINT_FRAGMENTS
    {
        steps.push(format!(
            "{} insights are recorded for this loss; consider whether its processing \
             state should advance",
            fragments_for_event
        ));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TEST_CALIBRATION_YAML;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 5, 18, 0, 0).unwrap()
    }

    fn calibration() -> Calibration {
        Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap()
    }

    fn template<'a>(calibration: &'a Calibration, id: &str) -> &'a PathwayTemplate {
        calibration.pathway(id).unwrap().1
    }

    #[test]
    fn test_extract_needs_two_markers() {
        let calibration = calibration();
        let markers = WisdomMarkers::from_calibration(&calibration).unwrap();
        let presence = template(&calibration, "presence");

        let one = markers.extract(presence, &"p1".into(), "I stayed in the room.", at());
        assert!(one.is_none());

        let two = markers
            .extract(
                presence,
                &"p1".into(),
                "I stayed in the room and was present with them.",
                at(),
            )
            .unwrap();
        assert_eq!(two.marker_count, 2);
        assert_eq!(two.pathway, "presence");
        assert_eq!(two.insight, "Learned to be present with suffering in new ways");
        assert!(!two.shareable);
        // 10 words: 0.1 for length plus 0.05 per marker
        assert!((two.accessibility - 0.2).abs() < 1e-12);
        assert_eq!(two.extracted_at, at());
    }

    #[test]
    fn test_markers_match_whole_words() {
        let calibration = calibration();
        let markers = WisdomMarkers::from_calibration(&calibration).unwrap();
        let presence = template(&calibration, "presence");
        let text = "The presentation stayed with me.";
        assert!(markers.extract(presence, &"p1".into(), text, at()).is_none());
    }

    #[test]
    fn test_shareable_when_speaking_to_others() {
        let calibration = calibration();
        let markers = WisdomMarkers::from_calibration(&calibration).unwrap();
        let service = template(&calibration, "service");
        let fragment = markers
            .extract(
                service,
                &"p1".into(),
                "I want to teach colleagues and help others carry this.",
                at(),
            )
            .unwrap();
        assert!(fragment.shareable);
    }

    #[test]
    fn test_configured_markers_and_insight_override_defaults() {
        let yaml = TEST_CALIBRATION_YAML.replace(
            "  - id: presence\n    label: Presence\n",
            "  - id: presence\n    label: Presence\n    insight: \"Sat with it\"\n    wisdom_markers: [\"sat with\", \"quiet\"]\n",
        );
        let calibration = Calibration::from_yaml(&yaml).unwrap();
        let markers = WisdomMarkers::from_calibration(&calibration).unwrap();
        let presence = template(&calibration, "presence");

        let text = "I stayed and was present.";
        assert!(markers.extract(presence, &"p1".into(), text, at()).is_none());

        let fragment = markers
            .extract(presence, &"p1".into(), "I sat with him in the quiet.", at())
            .unwrap();
        assert_eq!(fragment.insight, "Sat with it");
    }

    #[test]
    fn test_empty_configured_marker_rejected() {
        let yaml = TEST_CALIBRATION_YAML.replace(
            "  - id: presence\n    label: Presence\n",
            "  - id: presence\n    label: Presence\n    wisdom_markers: [\"  \"]\n",
        );
        assert!(matches!(
            Calibration::from_yaml(&yaml),
            Err(CalibrationError::ValidationError(_))
        ));
    }

    #[test]
    fn test_bank_per_subject_views() {
        let bank = WisdomBank::new();
        let subject = SubjectId::from("dr_a");
        let fragment = |event: &str, accessibility: f64, shareable: bool| WisdomFragment {
            pathway: "service".to_string(),
            source_event: event.into(),
            insight: "insight".to_string(),
            accessibility,
            shareable,
            marker_count: 2,
            extracted_at: at(),
        };

        bank.record(&subject, fragment("p1", 0.5, true));
        bank.record(&subject, fragment("p1", 0.3, false));
        bank.record(&subject, fragment("p2", 0.4, false));
        bank.record(&"dr_b".into(), fragment("p1", 0.9, true));

        assert_eq!(bank.fragments(&subject).len(), 3);
        assert_eq!(bank.for_event(&subject, &"p1".into()).len(), 2);
        assert_eq!(bank.shareable(&subject).len(), 1);
        assert!((bank.total_accessibility(&subject) - 1.2).abs() < 1e-12);
        assert!((bank.rho(&subject) - 0.12).abs() < 1e-12);
        assert_eq!(bank.rho(&"nobody".into()), 0.0);
    }

    #[test]
    fn test_next_steps_by_state() {
        let raw = next_steps(ProcessingState::Raw, 0, Some("Service"));
        assert_eq!(raw.len(), 2);
        assert!(!raw.iter().any(|s| s.starts_with("Consider exploring")));

        let processing = next_steps(ProcessingState::Processing, 1, Some("Service"));
        assert_eq!(processing.last().unwrap(), "Consider exploring: Service");

        let ready = next_steps(ProcessingState::Processing, 3, None);
        assert!(ready.last().unwrap().starts_with("3 insights are recorded"));

        let done = next_steps(ProcessingState::Transformed, 5, Some("Service"));
        assert_eq!(done.len(), 2);
    }

    #[test]
    fn test_reflection_notes() {
        let notes = reflection_notes(ProcessingState::Processing, 1, "compassion");
        assert!(notes[0].starts_with("Integration is occurring"));
        assert_eq!(notes[1], "The heart broken open by loss holds more, not less.");

        let custom = reflection_notes(ProcessingState::Raw, 0, "gratitude");
        assert_eq!(custom.len(), 1);
        assert!(custom[0].starts_with("Processing continues"));
    }
}
