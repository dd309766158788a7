//! Protective Presence Lens
//!
//! Some emotional distance from patient deaths is necessary for sustainable
//! practice. This lens asks whether the distance protects while preserving
//! the capacity for genuine connection, or has started to replace it.
//!
//! Component readings:
//!
//! | Component | Source |
//! |-----------|--------|
//! | presence | q |
//! | distance | Ψ |
//! | adaptation | ρ |
//! | connection | f |
//! | detachment | (1 − q) × (1 − f) |

use serde::{Deserialize, Serialize};

use super::{
    alternative_readings, check_unit_range, insufficient_reading, is_silent, signal_confidence,
    Lens,
};
use crate::types::{LensKind, LensReading, LensRequest};

/// Mode of professional presence, from healthiest to crisis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceMode {
    FullPresence,
    ProtectiveDistance,
    AdaptiveNumbing,
    ProblematicDetachment,
    CompleteDisconnect,
}

impl PresenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceMode::FullPresence => "full_presence",
            PresenceMode::ProtectiveDistance => "protective_distance",
            PresenceMode::AdaptiveNumbing => "adaptive_numbing",
            PresenceMode::ProblematicDetachment => "problematic_detachment",
            PresenceMode::CompleteDisconnect => "complete_disconnect",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PresenceThresholds {
    pub disconnect_detachment: f64,
    pub disconnect_connection: f64,
    pub problematic_detachment: f64,
    pub problematic_adaptation: f64,
    pub numbing_detachment: f64,
    pub numbing_support: f64,
    pub distance_min: f64,
    pub distance_connection: f64,
    pub distance_max_detachment: f64,
    pub presence_min: f64,
    pub presence_max_detachment: f64,
}

impl Default for PresenceThresholds {
    fn default() -> Self {
        Self {
            disconnect_detachment: 0.6,
            disconnect_connection: 0.2,
            problematic_detachment: 0.4,
            problematic_adaptation: 0.3,
            numbing_detachment: 0.2,
            numbing_support: 0.3,
            distance_min: 0.3,
            distance_connection: 0.3,
            distance_max_detachment: 0.3,
            presence_min: 0.4,
            presence_max_detachment: 0.2,
        }
    }
}

impl PresenceThresholds {
    pub fn validate(&self) -> Result<(), String> {
        check_unit_range(&[
            ("protective_presence.disconnect_detachment", self.disconnect_detachment),
            ("protective_presence.disconnect_connection", self.disconnect_connection),
            ("protective_presence.problematic_detachment", self.problematic_detachment),
            ("protective_presence.problematic_adaptation", self.problematic_adaptation),
            ("protective_presence.numbing_detachment", self.numbing_detachment),
            ("protective_presence.numbing_support", self.numbing_support),
            ("protective_presence.distance_min", self.distance_min),
            ("protective_presence.distance_connection", self.distance_connection),
            ("protective_presence.distance_max_detachment", self.distance_max_detachment),
            ("protective_presence.presence_min", self.presence_min),
            ("protective_presence.presence_max_detachment", self.presence_max_detachment),
        ])
    }
}

#[derive(Debug, Clone, Copy)]
struct Components {
    presence: f64,
    distance: f64,
    adaptation: f64,
    detachment: f64,
    connection: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ProtectivePresenceLens {
    thresholds: PresenceThresholds,
}

impl ProtectivePresenceLens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thresholds(thresholds: PresenceThresholds) -> Self {
        Self { thresholds }
    }

    fn mode(&self, c: &Components) -> PresenceMode {
        let t = &self.thresholds;

        if c.detachment > t.disconnect_detachment && c.connection < t.disconnect_connection {
            return PresenceMode::CompleteDisconnect;
        }
        if c.detachment > t.problematic_detachment && c.adaptation < t.problematic_adaptation {
            return PresenceMode::ProblematicDetachment;
        }
        if c.detachment > t.numbing_detachment
            && c.adaptation > t.numbing_support
            && c.connection > t.numbing_support
        {
            return PresenceMode::AdaptiveNumbing;
        }
        if c.distance > t.distance_min
            && c.connection > t.distance_connection
            && c.detachment < t.distance_max_detachment
        {
            return PresenceMode::ProtectiveDistance;
        }
        if c.presence > t.presence_min && c.detachment < t.presence_max_detachment {
            return PresenceMode::FullPresence;
        }
        PresenceMode::ProtectiveDistance
    }

    /// Whether presence is reachable when a patient or family needs it.
    fn accessibility(c: &Components) -> f64 {
        ((c.connection + (1.0 - c.detachment)) / 2.0 + c.presence) / 2.0
    }

    /// Whether the distance is doing protective work rather than harm.
    fn protective_function(c: &Components) -> f64 {
        ((c.distance + c.adaptation - c.detachment * 0.5) / 2.0).clamp(0.0, 1.0)
    }

    fn interpretation(mode: PresenceMode) -> &'static str {
        match mode {
            PresenceMode::FullPresence => {
                "Operating with full emotional presence. This allows deep connection but \
                 requires attention to sustainability and adequate recovery practices."
            }
            PresenceMode::ProtectiveDistance => {
                "Maintaining professional distance while preserving capacity for genuine \
                 connection. This is often the sustainable mode for long-term practice in \
                 oncology."
            }
            PresenceMode::AdaptiveNumbing => {
                "Some emotional numbing present but appears to be serving adaptive function. \
                 This 'little bit numb to death' can be protective if genuine connection \
                 remains accessible."
            }
            PresenceMode::ProblematicDetachment => {
                "Detachment patterns may be affecting capacity for connection. This could \
                 indicate burnout precursors or compassion fatigue. Consider whether this is \
                 chosen distance or forced withdrawal."
            }
            PresenceMode::CompleteDisconnect => {
                "Significant disconnection detected. This may indicate a crisis state requiring \
                 attention. This is not failure; it is a signal that the system needs care."
            }
        }
    }

    fn health(mode: PresenceMode, protection: f64, connection: f64) -> String {
        match mode {
            PresenceMode::FullPresence | PresenceMode::ProtectiveDistance => format!(
                "Current mode appears healthy and sustainable. Protection function: {:.0}%, \
                 Connection preserved: {:.0}%",
                protection * 100.0,
                connection * 100.0
            ),
            PresenceMode::AdaptiveNumbing if connection > 0.4 => {
                "Numbing appears adaptive; connection capacity preserved. Monitor for further \
                 detachment."
                    .to_string()
            }
            PresenceMode::AdaptiveNumbing => "Numbing may be shifting toward problematic \
                 detachment. Connection capacity showing strain."
                .to_string(),
            PresenceMode::ProblematicDetachment => "Current mode may not be sustainable. \
                 Consider support to restore connection capacity."
                .to_string(),
            PresenceMode::CompleteDisconnect => "Crisis state indicated. Immediate support \
                 warranted. This is a signal, not a character flaw."
                .to_string(),
        }
    }

    fn accessibility_note(accessibility: f64) -> &'static str {
        if accessibility > 0.7 {
            "Genuine presence appears accessible when needed"
        } else if accessibility > 0.4 {
            "Moderate presence accessibility; genuine connection may take effort in some situations"
        } else {
            "Presence accessibility appears limited; support may help restore connection capacity"
        }
    }

    fn recommendations(mode: PresenceMode) -> Vec<String> {
        let recs: &[&str] = match mode {
            PresenceMode::FullPresence => &[
                "Ensure adequate recovery practices to sustain this presence",
                "Monitor for signs of over-extension or compassion fatigue",
                "This mode is valuable but requires self-care to maintain",
            ],
            PresenceMode::ProtectiveDistance => &[
                "Current mode appears sustainable; continue practices",
                "Periodically check that connection remains accessible",
                "This balance serves both you and your patients",
            ],
            PresenceMode::AdaptiveNumbing => &[
                "Monitor whether numbing remains adaptive or shifts further",
                "Ensure genuine connection remains accessible when needed",
                "Consider whether recovery practices are adequate",
            ],
            PresenceMode::ProblematicDetachment => &[
                "Consider whether this is chosen distance or forced withdrawal",
                "Support may help restore connection capacity",
                "This pattern often responds to dedicated intervention",
            ],
            PresenceMode::CompleteDisconnect => &[
                "This is a crisis signal; please seek support",
                "Professional resources specifically for physician wellbeing exist",
                "Taking time for restoration is not abandonment",
            ],
        };
        recs.iter().map(|s| s.to_string()).collect()
    }
}

impl Lens for ProtectivePresenceLens {
    fn kind(&self) -> LensKind {
        LensKind::ProtectivePresence
    }

    fn interpret(&self, request: &LensRequest<'_>) -> LensReading {
        let d = request.dimensions;
        if is_silent(d) {
            return insufficient_reading(self.kind());
        }

        let components = Components {
            presence: d.q,
            distance: d.psi,
            adaptation: d.rho,
            detachment: (1.0 - d.q) * (1.0 - d.f),
            connection: d.f,
        };
        let mode = self.mode(&components);
        let protection = Self::protective_function(&components);

        let mut considerations = vec![Self::accessibility_note(Self::accessibility(&components)).to_string()];
        if d.lambda > 0.5 {
            considerations.push(
                "Clinical and personal framing are split; distance may be unevenly applied"
                    .to_string(),
            );
        }

        LensReading {
            lens: self.kind(),
            pattern: mode.as_str().to_string(),
            description: Self::interpretation(mode).to_string(),
            assessment: Self::health(mode, protection, components.connection),
            interventions: Self::recommendations(mode),
            considerations,
            alternative_readings: alternative_readings(d),
            confidence: signal_confidence(d),
        }
    }
}
