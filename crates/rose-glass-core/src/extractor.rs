//! Dimension extraction from free text.
//!
//! Extraction is pluggable: anything implementing `DimensionExtractor` can
//! feed the lenses. The default `MarkerExtractor` counts vocabulary markers
//! calibrated for physician reflections and normalizes the counts by length.
//! It makes no claim about sentiment accuracy.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::types::Dimensions;

/// Turns free text into the six dimension values.
///
/// Implementations should return values in `0.0..=1.0`; the pipeline
/// validates them before any lens sees them.
pub trait DimensionExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Dimensions;
}

lazy_static! {
    static ref CLINICAL_MARKERS: Regex = marker_pattern(&[
        "the patient", "case", "presented", "expired", "passed",
        "prognosis", "outcome", "treatment", "protocol",
    ]);

    static ref HUMAN_MARKERS: Regex = marker_pattern(&[
        "i", "we", "felt", "feel", "hard", "difficult", "tears",
        "family", "mother", "father", "child", "loved", "miss",
    ]);

    static ref GRIEF_MARKERS: Regex = marker_pattern(&[
        "lost", "death", "died", "passed", "gone", "miss",
        "another one", "how many more", "can't take", "breaking",
    ]);

    static ref WISDOM_MARKERS: Regex = marker_pattern(&[
        "learned", "understand", "realize", "meaning", "purpose",
        "grateful", "honored", "privilege", "taught me", "gift",
    ]);

    static ref GROWTH_MARKERS: Regex = marker_pattern(&[
        "stronger", "perspective", "appreciate", "relationship",
        "meaning", "spiritual", "growth", "transformed",
    ]);

    static ref SUPPRESSION_MARKERS: Regex = marker_pattern(&[
        "held it together", "stayed strong",
    ]);

    static ref COLLECTIVE_MARKERS: Regex = marker_pattern(&[
        "we", "team", "colleagues", "nurses", "staff",
    ]);

    static ref ISOLATION_MARKERS: Regex = marker_pattern(&[
        "alone", "nobody", "by myself", "no one",
    ]);

    static ref TEMPORAL_MARKERS: Regex = marker_pattern(&[
        "years", "months", "always", "never", "every time",
        "another", "again", "keeps happening",
    ]);
}

/// Build a case-insensitive whole-word alternation. Longer markers are tried first.
pub(crate) fn try_marker_pattern<S: AsRef<str>>(markers: &[S]) -> Result<Regex, regex::Error> {
    let mut sorted: Vec<&str> = markers.iter().map(AsRef::as_ref).collect();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    let alternation = sorted
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
}

pub(crate) fn marker_pattern(markers: &[&str]) -> Regex {
    try_marker_pattern(markers).unwrap()
}

/// Text with curly apostrophes folded to ASCII.
pub(crate) fn fold_apostrophes(text: &str) -> String {
    text.replace('\u{2019}', "'")
}

/// Number of distinct markers present in the text.
pub(crate) fn count_markers(pattern: &Regex, text: &str) -> usize {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect::<HashSet<_>>()
        .len()
}

/// Vocabulary-based extractor.
///
/// | Dimension | Reading |
/// |-----------|---------|
/// | Ψ | clinical plus human markers, per tenth of a word |
/// | ρ | wisdom and growth markers |
/// | q | grief markers, raised by half when suppression is named |
/// | f | collective markers, halved when isolation is named |
/// | τ | temporal markers, saturating at three |
/// | λ | imbalance between clinical and human framing |
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerExtractor;

impl DimensionExtractor for MarkerExtractor {
    fn extract(&self, text: &str) -> Dimensions {
        let text = fold_apostrophes(text);
        let word_count = text.split_whitespace().count();
        if word_count == 0 {
            return Dimensions::default();
        }
        let words = word_count as f64;

        let clinical_ratio = count_markers(&CLINICAL_MARKERS, &text) as f64 / (words * 0.1 + 1.0);
        let human_ratio = count_markers(&HUMAN_MARKERS, &text) as f64 / (words * 0.1 + 1.0);
        let psi = (clinical_ratio + human_ratio).min(1.0);

        let wisdom = count_markers(&WISDOM_MARKERS, &text) + count_markers(&GROWTH_MARKERS, &text);
        let rho = (wisdom as f64 / (words * 0.05 + 1.0)).min(1.0);

        let mut intensity = count_markers(&GRIEF_MARKERS, &text) as f64 / (words * 0.05 + 1.0);
        if SUPPRESSION_MARKERS.is_match(&text) {
            intensity *= 1.5;
        }
        let q = intensity.min(1.0);

        let mut f = (count_markers(&COLLECTIVE_MARKERS, &text) as f64 / (words * 0.03 + 1.0)).min(1.0);
        if ISOLATION_MARKERS.is_match(&text) {
            f *= 0.5;
        }

        let tau = (count_markers(&TEMPORAL_MARKERS, &text) as f64 / 3.0).min(1.0);
        let lambda = (clinical_ratio - human_ratio).abs().min(1.0);

        Dimensions {
            psi,
            rho,
            q,
            f,
            tau,
            lambda,
        }
    }
}
