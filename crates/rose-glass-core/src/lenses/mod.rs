//! The four interchangeable lenses.
//!
//! Each lens reads the same six dimension values through one question and
//! produces a `LensReading`. Lenses are stateless and side-effect-free:
//! thresholds are fixed at construction and any history they consider arrives
//! in the request.
//!
//! ## Lens Independence
//!
//! - Lenses never see each other's readings
//! - Callers select a lens by `LensKind`; nothing inspects concrete lens types
//! - The same request always produces the same reading

mod compassion_preservation;
mod cultural_bridge;
mod grief_accumulation;
mod protective_presence;

pub use compassion_preservation::{CompassionMode, CompassionPreservationLens, CompassionThresholds};
pub use cultural_bridge::{
    detect_assumptions, CommunicationContext, CommunicationGuidance, CulturalAssumption,
    CulturalBridgeLens, CulturalProfile, DeathBeliefs, DecisionStyle, DisclosurePreference,
    UnknownCommunicationContext,
};
pub use grief_accumulation::{AccumulationThresholds, GriefAccumulationLens, GriefState};
pub use protective_presence::{PresenceMode, PresenceThresholds, ProtectivePresenceLens};

use std::collections::BTreeMap;

use crate::calibration::{Calibration, LensCalibration};
use crate::types::{Dimensions, LensKind, LensReading, LensRequest};

/// Trait implemented by all lenses.
pub trait Lens: Send + Sync {
    /// Which lens this is.
    fn kind(&self) -> LensKind;

    /// The question this lens brings to a reflection.
    fn focus(&self) -> &'static str {
        self.kind().focus()
    }

    /// Read the request's dimensions through this lens.
    fn interpret(&self, request: &LensRequest<'_>) -> LensReading;
}

/// One configured instance of every lens, addressed by `LensKind`.
#[derive(Debug, Clone, Default)]
pub struct LensSet {
    compassion: CompassionPreservationLens,
    cultural: CulturalBridgeLens,
    grief: GriefAccumulationLens,
    presence: ProtectivePresenceLens,
}

impl LensSet {
    pub fn new(thresholds: &LensCalibration, profiles: BTreeMap<String, CulturalProfile>) -> Self {
        Self {
            compassion: CompassionPreservationLens::with_thresholds(
                thresholds.compassion_preservation,
            ),
            cultural: CulturalBridgeLens::with_profiles(profiles),
            grief: GriefAccumulationLens::with_thresholds(thresholds.grief_accumulation),
            presence: ProtectivePresenceLens::with_thresholds(thresholds.protective_presence),
        }
    }

    /// Lenses configured from a calibration's threshold blocks and cultural profiles.
    pub fn from_calibration(calibration: &Calibration) -> Self {
        Self::new(&calibration.lenses, calibration.cultural_profiles.clone())
    }

    pub fn get(&self, kind: LensKind) -> &dyn Lens {
        match kind {
            LensKind::CompassionPreservation => &self.compassion,
            LensKind::CulturalBridge => &self.cultural,
            LensKind::GriefAccumulation => &self.grief,
            LensKind::ProtectivePresence => &self.presence,
        }
    }

    pub fn interpret(&self, kind: LensKind, request: &LensRequest<'_>) -> LensReading {
        self.get(kind).interpret(request)
    }

    pub fn cultural(&self) -> &CulturalBridgeLens {
        &self.cultural
    }
}

/// Whether the values carry no signal at all (every dimension zero).
pub(crate) fn is_silent(dimensions: &Dimensions) -> bool {
    dimensions.iter().all(|(_, value)| value == 0.0)
}

/// Reading returned when there is no signal to interpret.
pub(crate) fn insufficient_reading(kind: LensKind) -> LensReading {
    LensReading {
        lens: kind,
        pattern: "insufficient_signal".to_string(),
        description: "No pattern signal to interpret".to_string(),
        assessment: "Insufficient data".to_string(),
        interventions: vec![],
        considerations: vec![],
        alternative_readings: vec![],
        confidence: 0.0,
    }
}

/// Check that every named threshold lies within `0.0..=1.0`.
pub(crate) fn check_unit_range(thresholds: &[(&str, f64)]) -> Result<(), String> {
    for (name, value) in thresholds {
        if !value.is_finite() || !(0.0..=1.0).contains(value) {
            return Err(format!("{} must be within 0.0..=1.0, got {}", name, value));
        }
    }
    Ok(())
}

/// How clearly the values support any reading.
///
/// Values far from the midpoint and a low frame ambiguity both raise
/// confidence; the result never exceeds 0.6.
pub fn signal_confidence(dimensions: &Dimensions) -> f64 {
    let clarity = ((dimensions.psi - 0.5).abs()
        + (dimensions.q - 0.5).abs()
        + (dimensions.rho - 0.5).abs()
        + (dimensions.f - 0.5).abs())
        / 2.0;
    clarity * 0.3 + (1.0 - dimensions.lambda) * 0.3
}

/// Other ways the same values could be read.
pub fn alternative_readings(dimensions: &Dimensions) -> Vec<String> {
    let mut alternatives = Vec::new();

    if dimensions.q < 0.3 {
        alternatives.push(
            "Low emotional activation could indicate protective presence OR concerning \
             detachment; context and history are needed to distinguish"
                .to_string(),
        );
    }
    if dimensions.psi > 0.7 {
        alternatives.push(
            "High integration could reflect mature practice OR suppressed conflict \
             between clinical and human responses"
                .to_string(),
        );
    }
    if dimensions.rho > 0.6 {
        alternatives.push(
            "Strong wisdom markers could indicate genuine transformation OR \
             intellectualization as defense against raw grief"
                .to_string(),
        );
    }

    alternatives.push(
        "This reading is through one lens; other calibrations may reveal different \
         patterns equally present in the same expression"
            .to_string(),
    );
    alternatives
}

/// Explicit uncertainty acknowledgments that accompany every translation.
pub fn uncertainty_notes(dimensions: &Dimensions) -> Vec<String> {
    let mut notes = Vec::new();
    if dimensions.lambda > 0.5 {
        notes.push(
            "High frame ambiguity: clinical and personal dimensions are mixing in ways \
             that complicate interpretation"
                .to_string(),
        );
    }
    notes.push(
        "Coherence is constructed, not discovered. This translation reflects pattern \
         visibility through this lens, not ground truth about internal states."
            .to_string(),
    );
    notes
}
