//! Grief Accumulation Lens
//!
//! Reads whether grief is accumulating as weight or compressing into wisdom.
//! Raw grief is read from q and wisdom from ρ. The processed level comes from
//! the subject's registered history when one is supplied (the share of events
//! no longer raw), otherwise from τ.

use serde::{Deserialize, Serialize};

use super::{
    alternative_readings, check_unit_range, insufficient_reading, is_silent, signal_confidence,
    Lens,
};
use crate::event::ProcessingState;
use crate::types::{LensKind, LensReading, LensRequest};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GriefState {
    Minimal,
    RawAccumulating,
    ProcessingActive,
    Integrating,
    Compressed,
}

impl GriefState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GriefState::Minimal => "minimal",
            GriefState::RawAccumulating => "raw_accumulating",
            GriefState::ProcessingActive => "processing_active",
            GriefState::Integrating => "integrating",
            GriefState::Compressed => "compressed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccumulationThresholds {
    /// All three levels below this read as minimal
    pub minimal: f64,
    pub compressed_wisdom: f64,
    pub compressed_max_raw: f64,
    pub processing: f64,
    pub integrating_wisdom: f64,
    pub raw_accumulating: f64,
    pub raw_max_wisdom: f64,
}

impl Default for AccumulationThresholds {
    fn default() -> Self {
        Self {
            minimal: 0.2,
            compressed_wisdom: 0.5,
            compressed_max_raw: 0.3,
            processing: 0.4,
            integrating_wisdom: 0.3,
            raw_accumulating: 0.3,
            raw_max_wisdom: 0.3,
        }
    }
}

impl AccumulationThresholds {
    pub fn validate(&self) -> Result<(), String> {
        check_unit_range(&[
            ("grief_accumulation.minimal", self.minimal),
            ("grief_accumulation.compressed_wisdom", self.compressed_wisdom),
            ("grief_accumulation.compressed_max_raw", self.compressed_max_raw),
            ("grief_accumulation.processing", self.processing),
            ("grief_accumulation.integrating_wisdom", self.integrating_wisdom),
            ("grief_accumulation.raw_accumulating", self.raw_accumulating),
            ("grief_accumulation.raw_max_wisdom", self.raw_max_wisdom),
        ])
    }
}

#[derive(Debug, Clone, Default)]
pub struct GriefAccumulationLens {
    thresholds: AccumulationThresholds,
}

impl GriefAccumulationLens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: AccumulationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn state(&self, raw: f64, processed: f64, wisdom: f64) -> GriefState {
        let t = &self.thresholds;

        if raw < t.minimal && processed < t.minimal && wisdom < t.minimal {
            return GriefState::Minimal;
        }
        if wisdom > t.compressed_wisdom && raw < t.compressed_max_raw {
            return GriefState::Compressed;
        }
        if processed > t.processing {
            if wisdom > t.integrating_wisdom {
                return GriefState::Integrating;
            }
            return GriefState::ProcessingActive;
        }
        if raw > t.raw_accumulating && wisdom < t.raw_max_wisdom {
            return GriefState::RawAccumulating;
        }
        GriefState::ProcessingActive
    }

    fn describe(state: GriefState, raw: f64, wisdom: f64) -> String {
        match state {
            GriefState::Minimal => "Low grief markers detected. This may reflect low exposure, \
                 effective ongoing processing, or an expression that did not capture grief content."
                .to_string(),
            GriefState::RawAccumulating => format!(
                "Raw grief level: {:.0}%. Grief appears to be accumulating faster than \
                 processing. This is common in high-volume settings but may benefit from \
                 dedicated processing time.",
                raw * 100.0
            ),
            GriefState::ProcessingActive => "Active processing indicators present. The work of \
                 meaning-making appears to be underway. This is the path from weight to wisdom."
                .to_string(),
            GriefState::Integrating => "Integration occurring. Grief is finding its place \
                 alongside purpose and meaning. This is post-traumatic growth in process."
                .to_string(),
            GriefState::Compressed => format!(
                "Wisdom level: {:.0}%. Significant transformation evident. Grief has compressed \
                 into accessible knowledge. This wisdom can now serve others.",
                wisdom * 100.0
            ),
        }
    }

    fn transformation(state: GriefState, ratio: f64) -> &'static str {
        if state == GriefState::Compressed {
            "Transformation largely complete. The compressed wisdom from this suffering can now \
             benefit others."
        } else if ratio > 0.6 {
            "Strong transformation occurring. Grief becoming wisdom."
        } else if ratio > 0.3 {
            "Transformation in progress. Some grief processing effectively."
        } else if ratio > 0.1 {
            "Early transformation. Processing capacity may need support."
        } else {
            "Limited transformation detected. Deliberate processing may help."
        }
    }

    fn next_steps(state: GriefState) -> Vec<String> {
        let steps: &[&str] = match state {
            GriefState::Minimal => &[],
            GriefState::RawAccumulating => &[
                "Consider dedicated time for grief processing",
                "Deliberate rumination (controlled, time-bounded) may help",
                "Sharing with a trusted colleague can facilitate processing",
            ],
            GriefState::ProcessingActive => &[
                "Continue processing work; transformation is underway",
                "Ask: What is this loss teaching me?",
                "Consider what wisdom could serve others",
            ],
            GriefState::Integrating => &[
                "Integration occurring; continue supportive practices",
                "Notice how this loss has changed your practice",
                "Consider sharing insights with others in similar work",
            ],
            GriefState::Compressed => &[
                "Consider sharing accumulated wisdom with colleagues",
                "This transformation can benefit those earlier in the journey",
                "Mentorship may be a natural extension of this growth",
            ],
        };
        steps.iter().map(|s| s.to_string()).collect()
    }
}

impl Lens for GriefAccumulationLens {
    fn kind(&self) -> LensKind {
        LensKind::GriefAccumulation
    }

    fn interpret(&self, request: &LensRequest<'_>) -> LensReading {
        let d = request.dimensions;
        if is_silent(d) && request.history.is_empty() {
            return insufficient_reading(self.kind());
        }

        let history = request.history;
        let unprocessed = history
            .iter()
            .filter(|e| e.processing_state() == ProcessingState::Raw)
            .count();
        let processed = if history.is_empty() {
            d.tau
        } else {
            (history.len() - unprocessed) as f64 / history.len() as f64
        };

        let raw = d.q;
        let wisdom = d.rho;
        let ratio = (wisdom / (raw + processed + 0.01)).min(1.0);
        let state = self.state(raw, processed, wisdom);

        let mut considerations = Vec::new();
        if !history.is_empty() {
            considerations.push(format!(
                "{} of {} registered losses still raw",
                unprocessed,
                history.len()
            ));
            if history.len() >= 3 && unprocessed * 2 > history.len() {
                considerations
                    .push("Most registered losses have not yet been revisited".to_string());
            }
        }
        if d.f < 0.3 && raw > 0.5 {
            considerations.push(
                "Grief is being carried with little community connection".to_string(),
            );
        }

        LensReading {
            lens: self.kind(),
            pattern: state.as_str().to_string(),
            description: Self::describe(state, raw, wisdom),
            assessment: format!(
                "{} Compression ratio: {:.0}%.",
                Self::transformation(state, ratio),
                ratio * 100.0
            ),
            interventions: Self::next_steps(state),
            considerations,
            alternative_readings: alternative_readings(d),
            confidence: signal_confidence(d),
        }
    }
}
