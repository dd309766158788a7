//! # rose-glass-core
//!
//! Deterministic grief tracking and pattern translation for physician
//! reflection.
//!
//! This crate answers two questions about a physician's experience of loss:
//! - How does this reflection read through a chosen lens?
//! - Given every loss registered so far, which wisdom pathway fits this one?
//!
//! ## Key Guarantees
//!
//! 1. **Deterministic**: Same store contents and calibration, same suggestion
//! 2. **Read-only classification**: The classifier never writes to the store
//! 3. **Validated configuration**: No tracker exists with a bad calibration
//! 4. **Thread-safe store**: Subjects never contend on each other's writes
//!
//! ## Example
//!
//! ```rust,ignore
//! use rose_glass_core::{Calibration, GriefEvent, GriefWisdomTracker, SubjectId};
//!
//! let calibration = Calibration::from_yaml_file("calibration/example.yaml")?;
//! let tracker = GriefWisdomTracker::new(calibration, "general_oncology")?;
//!
//! let subject = SubjectId::from("dr_a");
//! let event = GriefEvent::new("p1", Utc::now(), "pediatric", 0.8, 0.9)
//!     .with_circumstance("prolonged");
//! let id = tracker.register_event(&subject, event)?;
//!
//! let suggestion = tracker.suggest_pathway(&subject, &id)?;
//! for prompt in &suggestion.prompts {
//!     println!("{}", prompt);
//! }
//! ```

pub mod calibration;
pub mod classifier;
pub mod event;
pub mod extractor;
pub mod fixtures;
pub mod lenses;
pub mod renderer;
pub mod store;
pub mod tracker;
pub mod trend;
pub mod types;
pub mod wisdom;

// Re-export main types at crate root
pub use calibration::{Calibration, CalibrationError};
pub use classifier::{
    ClassifierError, LoadScore, PathwaySuggestion, TransformationCandidate, WisdomPathway,
    WisdomPathwayClassifier,
};
pub use event::{EventId, GriefEvent, ProcessingState, SubjectId};
pub use extractor::{DimensionExtractor, MarkerExtractor};
pub use lenses::{Lens, LensSet};
pub use renderer::{render, NarrativeInput, RenderOptions};
pub use store::{GriefEventStore, History, StoreError, TimeRange};
pub use tracker::GriefWisdomTracker;
pub use trend::{
    accumulation_trend, period_summary, timeline_summary, AccumulationTrend, PeriodAverages,
    PeriodSummary, TrackingPoint, TrendDirection,
};
pub use types::{
    DimensionError, DimensionName, Dimensions, LensKind, LensReading, LensRequest, UnknownLens,
};
pub use wisdom::{ReflectionOutcome, WisdomBank, WisdomError, WisdomFragment, WisdomMarkers};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Ceiling on translation confidence; no reading of text is ever certain.
const MAX_CONFIDENCE: f64 = 0.85;

/// Errors that can occur anywhere in the core
#[derive(Error, Debug)]
pub enum RoseGlassError {
    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Dimension error: {0}")]
    Dimension(#[from] DimensionError),

    #[error("Wisdom error: {0}")]
    Wisdom(#[from] WisdomError),
}

/// A reflection read through one lens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Translation {
    pub dimensions: Dimensions,
    pub reading: LensReading,

    /// Grows with text length and signal clarity, capped at 0.85
    pub confidence: f64,

    pub uncertainty_notes: Vec<String>,
}

/// Translate text through a lens using the default extractor and lens thresholds.
pub fn translate(
    text: &str,
    lens: LensKind,
    tags: &BTreeSet<String>,
) -> Result<Translation, RoseGlassError> {
    translate_with(&MarkerExtractor, &LensSet::default(), lens, text, tags, &[])
}

/// Translate text with an explicit extractor, lens set and grief history.
///
/// The extractor's output is validated before any lens sees it.
pub fn translate_with(
    extractor: &dyn DimensionExtractor,
    lenses: &LensSet,
    lens: LensKind,
    text: &str,
    tags: &BTreeSet<String>,
    history: &[GriefEvent],
) -> Result<Translation, RoseGlassError> {
    let dimensions = extractor.extract(text);
    dimensions.validate()?;

    let request = LensRequest::new(&dimensions, tags)
        .with_history(history)
        .with_text(text);
    let reading = lenses.interpret(lens, &request);

    let word_count = text.split_whitespace().count() as f64;
    let confidence = if reading.confidence == 0.0 {
        0.0
    } else {
        ((word_count / 100.0).min(0.4) + reading.confidence).min(MAX_CONFIDENCE)
    };

    Ok(Translation {
        dimensions,
        uncertainty_notes: lenses::uncertainty_notes(&dimensions),
        reading,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedExtractor(Dimensions);

    impl DimensionExtractor for FixedExtractor {
        fn extract(&self, _text: &str) -> Dimensions {
            self.0
        }
    }

    #[test]
    fn test_translate_reflection() {
        let text = "Lost another child today. I held it together for the family but \
                    I keep thinking about her. Years of this and it never gets easier.";
        let translation =
            translate(text, LensKind::CompassionPreservation, &BTreeSet::new()).unwrap();

        assert_eq!(translation.reading.lens, LensKind::CompassionPreservation);
        assert!(translation.confidence > 0.0);
        assert!(translation.confidence <= MAX_CONFIDENCE);
        assert!(translation
            .uncertainty_notes
            .last()
            .unwrap()
            .starts_with("Coherence is constructed"));
    }

    #[test]
    fn test_empty_text_has_no_signal() {
        let translation = translate("", LensKind::GriefAccumulation, &BTreeSet::new()).unwrap();
        assert_eq!(translation.reading.pattern, "insufficient_signal");
        assert_eq!(translation.confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_extractor_rejected() {
        let broken = FixedExtractor(Dimensions {
            q: 1.4,
            ..Dimensions::default()
        });
        let err = translate_with(
            &broken,
            &LensSet::default(),
            LensKind::ProtectivePresence,
            "anything",
            &BTreeSet::new(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RoseGlassError::Dimension(DimensionError::OutOfRange {
                dimension: DimensionName::Q,
                ..
            })
        ));
    }

    #[test]
    fn test_confidence_is_capped() {
        let sharp = FixedExtractor(Dimensions::new(1.0, 0.0, 1.0, 0.0, 0.5, 0.0).unwrap());
        let text = "word ".repeat(200);
        let translation = translate_with(
            &sharp,
            &LensSet::default(),
            LensKind::CompassionPreservation,
            &text,
            &BTreeSet::new(),
            &[],
        )
        .unwrap();
        assert_eq!(translation.confidence, MAX_CONFIDENCE);
    }
}

/// Cross-module scenarios: store, classifier and tracker working together
#[cfg(test)]
mod scenario_tests {
    use super::*;
    use crate::fixtures::TEST_CALIBRATION_YAML;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn tracker() -> GriefWisdomTracker {
        let calibration = Calibration::from_yaml(TEST_CALIBRATION_YAML).unwrap();
        GriefWisdomTracker::new(calibration, "general_oncology").unwrap()
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_pediatric_prolonged_loss_selects_high_severity_pathway() {
        let tracker = tracker();
        let subject = SubjectId::from("dr_a");
        let event = GriefEvent::new("p1", at(1, 9), "pediatric", 0.8, 0.9)
            .with_circumstance("prolonged");
        let id = tracker.register_event(&subject, event).unwrap();

        let suggestion = tracker.suggest_pathway(&subject, &id).unwrap();
        // (0.5 * 0.9 + 0.5 * 0.8) * 1.2 * 1.3
        assert!((suggestion.focal_severity - 1.326).abs() < 1e-9);
        assert_eq!(suggestion.load_score, 0.0);
        assert_eq!(suggestion.bucket, "high-severity");
        assert_eq!(suggestion.pathway.id, "compassion");
        assert!(!suggestion.prompts.is_empty());
    }

    #[test]
    fn test_low_and_high_load_select_different_pathways() {
        let tracker = tracker();
        let light = SubjectId::from("dr_light");
        let heavy = SubjectId::from("dr_heavy");

        for i in 0..3 {
            tracker
                .register_event(
                    &heavy,
                    GriefEvent::new(format!("prior-{}", i), at(1, 8 + i), "adult", 0.9, 0.9),
                )
                .unwrap();
        }
        for subject in [&light, &heavy] {
            tracker
                .register_event(subject, GriefEvent::new("focal", at(1, 12), "adult", 0.2, 0.2))
                .unwrap();
        }

        let light_suggestion = tracker.suggest_pathway(&light, &"focal".into()).unwrap();
        let heavy_suggestion = tracker.suggest_pathway(&heavy, &"focal".into()).unwrap();

        assert_eq!(light_suggestion.bucket, "low-load-low-severity");
        assert_eq!(heavy_suggestion.bucket, "heavy-load");
        assert!(heavy_suggestion.load_score > 1.5);
        assert_ne!(light_suggestion.pathway, heavy_suggestion.pathway);
    }

    #[test]
    fn test_suggestion_is_bit_identical_across_calls() {
        let tracker = tracker();
        let subject = SubjectId::from("dr_a");
        for (i, day) in [3u32, 1, 7, 5].into_iter().enumerate() {
            tracker
                .register_event(
                    &subject,
                    GriefEvent::new(format!("e{}", i), at(day, 10), "elderly", 0.6, 0.7)
                        .with_circumstance("sudden"),
                )
                .unwrap();
        }

        let first = tracker.suggest_pathway(&subject, &"e2".into()).unwrap();
        for _ in 0..10 {
            let again = tracker.suggest_pathway(&subject, &"e2".into()).unwrap();
            assert_eq!(again, first);
            assert_eq!(again.load_score.to_bits(), first.load_score.to_bits());
            assert_eq!(again.focal_severity.to_bits(), first.focal_severity.to_bits());
        }
    }

    #[test]
    fn test_malformed_multiplier_table_blocks_tracker() {
        let original = "  circumstance_multipliers:\n    prolonged: 1.2";

        let negative = TEST_CALIBRATION_YAML.replace(
            original,
            "  circumstance_multipliers:\n    prolonged: -1.2",
        );
        assert!(matches!(
            Calibration::from_yaml(&negative),
            Err(CalibrationError::ValidationError(_))
        ));

        let not_a_number = TEST_CALIBRATION_YAML.replace(
            original,
            "  circumstance_multipliers:\n    prolonged: heavy",
        );
        assert!(matches!(
            Calibration::from_yaml(&not_a_number),
            Err(CalibrationError::YamlError(_))
        ));

        let missing = TEST_CALIBRATION_YAML.replace(original, "  multipliers:\n    prolonged: 1.2");
        assert!(Calibration::from_yaml(&missing).is_err());
    }

    #[test]
    fn test_window_excluding_all_events_is_empty() {
        let tracker = tracker();
        let subject = SubjectId::from("dr_a");
        tracker
            .register_event(&subject, GriefEvent::new("e1", at(10, 9), "adult", 0.5, 0.5))
            .unwrap();

        let before = TimeRange::until(at(10, 9) - Duration::seconds(1));
        assert!(tracker.get_history(&subject, before).is_empty());

        let inverted = TimeRange::between(at(12, 0), at(11, 0));
        assert!(tracker.get_history(&subject, inverted).is_empty());
    }

    #[test]
    fn test_grief_lens_sees_tracked_history() {
        let tracker = tracker();
        let subject = SubjectId::from("dr_a");
        for i in 0..3 {
            tracker
                .register_event(
                    &subject,
                    GriefEvent::new(format!("e{}", i), at(1 + i, 9), "adult", 0.5, 0.5),
                )
                .unwrap();
        }
        let history = tracker.get_history(&subject, TimeRange::all());

        let translation = translate_with(
            &MarkerExtractor,
            &LensSet::from_calibration(tracker.classifier().calibration()),
            LensKind::GriefAccumulation,
            "Another death this week. I miss them.",
            &BTreeSet::new(),
            history.as_slice(),
        )
        .unwrap();
        assert!(translation
            .reading
            .considerations
            .contains(&"3 of 3 registered losses still raw".to_string()));
    }
}
