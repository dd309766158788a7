//! Compassion Preservation Lens
//!
//! Distinguishes sustainable engagement from compassion fatigue (secondary
//! traumatic stress) and burnout (depletion), and healthy protective distance
//! from both.
//!
//! Component readings:
//!
//! | Component | Source |
//! |-----------|--------|
//! | engagement | q |
//! | boundary health | Ψ |
//! | recovery capacity | f |
//! | intrusion | q × (1 − ρ): activation that has not become wisdom |

use serde::{Deserialize, Serialize};

use super::{
    alternative_readings, check_unit_range, insufficient_reading, is_silent, signal_confidence,
    Lens,
};
use crate::types::{LensKind, LensReading, LensRequest};

/// Intrusion above which intrusive thoughts are flagged.
const INTRUSION_WARNING: f64 = 0.3;

/// Current compassion operating mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompassionMode {
    FullEngagement,
    SustainableRhythm,
    ProtectiveDistance,
    CompassionFatigue,
    BurnoutCascade,
}

impl CompassionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompassionMode::FullEngagement => "full_engagement",
            CompassionMode::SustainableRhythm => "sustainable_rhythm",
            CompassionMode::ProtectiveDistance => "protective_distance",
            CompassionMode::CompassionFatigue => "compassion_fatigue",
            CompassionMode::BurnoutCascade => "burnout_cascade",
        }
    }
}

/// Mode boundaries for the compassion lens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompassionThresholds {
    /// Engagement above which unintegrated activation reads as fatigue
    pub fatigue_engagement: f64,

    /// Wisdom below which high engagement reads as fatigue
    pub fatigue_wisdom: f64,

    /// Engagement below which depletion is considered
    pub depleted_engagement: f64,

    /// Recovery below which depletion is considered
    pub depleted_recovery: f64,

    /// Integration at or above which distance reads as a deliberate boundary
    pub boundary_integration: f64,

    /// Engagement above which presence is full
    pub full_engagement: f64,

    /// Recovery above which engagement is being restored
    pub restoring_recovery: f64,
}

impl Default for CompassionThresholds {
    fn default() -> Self {
        Self {
            fatigue_engagement: 0.6,
            fatigue_wisdom: 0.3,
            depleted_engagement: 0.3,
            depleted_recovery: 0.3,
            boundary_integration: 0.6,
            full_engagement: 0.7,
            restoring_recovery: 0.4,
        }
    }
}

impl CompassionThresholds {
    pub fn validate(&self) -> Result<(), String> {
        check_unit_range(&[
            ("compassion_preservation.fatigue_engagement", self.fatigue_engagement),
            ("compassion_preservation.fatigue_wisdom", self.fatigue_wisdom),
            ("compassion_preservation.depleted_engagement", self.depleted_engagement),
            ("compassion_preservation.depleted_recovery", self.depleted_recovery),
            ("compassion_preservation.boundary_integration", self.boundary_integration),
            ("compassion_preservation.full_engagement", self.full_engagement),
            ("compassion_preservation.restoring_recovery", self.restoring_recovery),
        ])
    }
}

/// Compassion Preservation Lens implementation.
#[derive(Debug, Clone, Default)]
pub struct CompassionPreservationLens {
    thresholds: CompassionThresholds,
}

impl CompassionPreservationLens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: CompassionThresholds) -> Self {
        Self { thresholds }
    }

    /// Determine the operating mode. Checks run from most to least urgent.
    pub fn mode(&self, engagement: f64, wisdom: f64, boundary: f64, recovery: f64) -> CompassionMode {
        let t = &self.thresholds;

        if engagement > t.fatigue_engagement && wisdom < t.fatigue_wisdom {
            return CompassionMode::CompassionFatigue;
        }
        if engagement < t.depleted_engagement && recovery < t.depleted_recovery {
            return CompassionMode::BurnoutCascade;
        }
        if boundary >= t.boundary_integration
            && engagement >= t.depleted_engagement
            && engagement <= t.full_engagement
        {
            return CompassionMode::ProtectiveDistance;
        }
        if engagement > t.full_engagement && recovery > t.restoring_recovery {
            return CompassionMode::FullEngagement;
        }
        CompassionMode::SustainableRhythm
    }

    fn describe(&self, mode: CompassionMode, engagement: f64) -> String {
        match mode {
            CompassionMode::FullEngagement => format!(
                "High emotional engagement with patients and families. Engagement level: {:.0}%. \
                 This can be deeply rewarding but requires attention to sustainability.",
                engagement * 100.0
            ),
            CompassionMode::SustainableRhythm => "Balanced engagement pattern detected. \
                 Emotional presence appears sustainable with current practices."
                .to_string(),
            CompassionMode::ProtectiveDistance => "Healthy professional boundaries evident. \
                 This 'becoming a little numb to death' can be adaptive when genuine \
                 compassion remains accessible when needed."
                .to_string(),
            CompassionMode::CompassionFatigue => "Patterns suggest secondary traumatic stress \
                 may be present. Intrusive symptoms indicate the work may be affecting you in \
                 ways that deserve attention and support."
                .to_string(),
            CompassionMode::BurnoutCascade => "Patterns suggest energy depletion and diminished \
                 engagement. This is a signal, not a failure. The system is indicating need \
                 for restoration."
                .to_string(),
        }
    }

    fn sustainability(&self, mode: CompassionMode, recovery: f64) -> &'static str {
        let t = &self.thresholds;
        match mode {
            CompassionMode::CompassionFatigue | CompassionMode::BurnoutCascade => {
                "Current pattern appears unsustainable. Intervention or support may prevent \
                 deterioration."
            }
            _ if recovery < t.depleted_recovery => {
                "Recovery capacity appears limited. Current engagement may not be sustainable \
                 long-term."
            }
            CompassionMode::ProtectiveDistance if recovery > t.restoring_recovery => {
                "Current protective stance appears sustainable. Boundaries serving protective \
                 function while maintaining capacity."
            }
            CompassionMode::FullEngagement if recovery > t.restoring_recovery => {
                "High engagement appears sustainable with current recovery practices. Continue \
                 practices that restore."
            }
            _ => "Sustainability assessment uncertain. Monitor over time.",
        }
    }

    fn recommendations(&self, mode: CompassionMode) -> Vec<String> {
        let recs: &[&str] = match mode {
            CompassionMode::FullEngagement => &[
                "Maintain practices that restore compassion reserves",
                "Monitor for signs of over-extension",
                "Ensure boundaries remain healthy alongside engagement",
            ],
            CompassionMode::SustainableRhythm => &[
                "Current practices appear effective; continue",
                "Note what helps maintain this balance",
                "Share what works with colleagues who may be struggling",
            ],
            CompassionMode::ProtectiveDistance => &[
                "This distance may be serving a protective function",
                "Check: Is genuine connection still accessible when needed?",
                "Ensure distance is chosen, not forced by depletion",
            ],
            CompassionMode::CompassionFatigue => &[
                "Secondary traumatic stress responds to specific interventions",
                "Consider speaking with someone trained in trauma support",
                "Processing rituals after difficult cases may help",
                "This is not weakness; it is the cost of caring work",
            ],
            CompassionMode::BurnoutCascade => &[
                "Restoration needed before continued depletion",
                "Professional support specifically for physician burnout exists",
                "Time off is not abandonment; it preserves the capacity to serve",
            ],
        };
        recs.iter().map(|s| s.to_string()).collect()
    }

    fn warning_signs(&self, mode: CompassionMode, intrusion: f64, recovery: f64) -> Vec<String> {
        let mut signs = Vec::new();

        if intrusion > INTRUSION_WARNING {
            signs.push("Intrusive thoughts about patients increasing".to_string());
        }
        if recovery < self.thresholds.depleted_recovery {
            signs.push("Recovery practices not restoring reserves".to_string());
        }
        match mode {
            CompassionMode::BurnoutCascade => {
                signs.push("Cynicism or detachment affecting patient care".to_string());
                signs.push("Considering leaving medicine due to burnout".to_string());
            }
            CompassionMode::CompassionFatigue => {
                signs.push("Nightmares or sleep disruption from work".to_string());
                signs.push("Avoiding certain patient types or situations".to_string());
            }
            _ => {}
        }
        signs
    }
}

impl Lens for CompassionPreservationLens {
    fn kind(&self) -> LensKind {
        LensKind::CompassionPreservation
    }

    fn interpret(&self, request: &LensRequest<'_>) -> LensReading {
        let d = request.dimensions;
        if is_silent(d) {
            return insufficient_reading(self.kind());
        }

        let engagement = d.q;
        let recovery = d.f;
        let intrusion = d.q * (1.0 - d.rho);
        let mode = self.mode(engagement, d.rho, d.psi, recovery);

        LensReading {
            lens: self.kind(),
            pattern: mode.as_str().to_string(),
            description: self.describe(mode, engagement),
            assessment: self.sustainability(mode, recovery).to_string(),
            interventions: self.recommendations(mode),
            considerations: self.warning_signs(mode, intrusion, recovery),
            alternative_readings: alternative_readings(d),
            confidence: signal_confidence(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dimensions;
    use std::collections::BTreeSet;

    fn read(lens: &CompassionPreservationLens, psi: f64, rho: f64, q: f64, f: f64) -> LensReading {
        let dims = Dimensions::new(psi, rho, q, f, 0.3, 0.2).unwrap();
        let tags = BTreeSet::new();
        lens.interpret(&LensRequest::new(&dims, &tags))
    }

    #[test]
    fn test_fatigue_from_unintegrated_engagement() {
        let reading = read(&CompassionPreservationLens::new(), 0.4, 0.1, 0.8, 0.5);
        assert_eq!(reading.pattern, "compassion_fatigue");
        assert!(reading.assessment.contains("unsustainable"));
        assert!(reading
            .considerations
            .iter()
            .any(|s| s.contains("Intrusive thoughts")));
    }

    #[test]
    fn test_burnout_from_low_engagement_and_recovery() {
        let reading = read(&CompassionPreservationLens::new(), 0.4, 0.5, 0.2, 0.1);
        assert_eq!(reading.pattern, "burnout_cascade");
        assert!(reading
            .considerations
            .iter()
            .any(|s| s.contains("Recovery practices")));
    }

    #[test]
    fn test_protective_distance_with_integration() {
        let reading = read(&CompassionPreservationLens::new(), 0.7, 0.5, 0.5, 0.5);
        assert_eq!(reading.pattern, "protective_distance");
        assert!(reading.assessment.contains("protective stance appears sustainable"));
    }

    #[test]
    fn test_full_engagement_with_recovery() {
        let reading = read(&CompassionPreservationLens::new(), 0.4, 0.5, 0.8, 0.6);
        assert_eq!(reading.pattern, "full_engagement");
        assert!(reading.description.contains("80%"));
    }

    #[test]
    fn test_sustainable_rhythm_default() {
        let reading = read(&CompassionPreservationLens::new(), 0.3, 0.5, 0.5, 0.5);
        assert_eq!(reading.pattern, "sustainable_rhythm");
        assert!(reading.considerations.is_empty());
    }

    #[test]
    fn test_thresholds_change_mode() {
        let strict = CompassionPreservationLens::with_thresholds(CompassionThresholds {
            fatigue_engagement: 0.4,
            fatigue_wisdom: 0.6,
            ..CompassionThresholds::default()
        });
        let reading = read(&strict, 0.3, 0.5, 0.5, 0.5);
        assert_eq!(reading.pattern, "compassion_fatigue");
    }

    #[test]
    fn test_threshold_validation() {
        assert!(CompassionThresholds::default().validate().is_ok());
        let bad = CompassionThresholds {
            full_engagement: 1.5,
            ..CompassionThresholds::default()
        };
        assert!(bad.validate().unwrap_err().contains("full_engagement"));
    }
}
