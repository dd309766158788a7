//! Core types for Rose Glass translation.
//!
//! These are the data structures shared by the extractor, the lenses and the
//! renderer: the six pattern dimensions, lens identifiers, and the readings a
//! lens produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::event::GriefEvent;

/// Errors raised when dimension values fall outside their bounded range.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DimensionError {
    #[error("Dimension {dimension} out of range: {value} (expected 0.0..=1.0)")]
    OutOfRange { dimension: DimensionName, value: f64 },
}

/// The six named pattern dimensions.
///
/// Ordered for deterministic iteration in BTreeMap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DimensionName {
    Psi,
    Rho,
    Q,
    F,
    Tau,
    Lambda,
}

impl DimensionName {
    /// All dimensions in canonical display order.
    pub const ALL: [DimensionName; 6] = [
        DimensionName::Psi,
        DimensionName::Rho,
        DimensionName::Q,
        DimensionName::F,
        DimensionName::Tau,
        DimensionName::Lambda,
    ];

    /// Greek symbol used in narrative output.
    pub fn symbol(&self) -> &'static str {
        match self {
            DimensionName::Psi => "Ψ",
            DimensionName::Rho => "ρ",
            DimensionName::Q => "q",
            DimensionName::F => "f",
            DimensionName::Tau => "τ",
            DimensionName::Lambda => "λ",
        }
    }

    /// What the dimension reads in a physician's reflection.
    pub fn label(&self) -> &'static str {
        match self {
            DimensionName::Psi => "Clinical-Human Integration",
            DimensionName::Rho => "Wisdom Accumulation",
            DimensionName::Q => "Emotional Engagement",
            DimensionName::F => "Community Connection",
            DimensionName::Tau => "Temporal Pattern Depth",
            DimensionName::Lambda => "Frame Ambiguity",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            DimensionName::Psi => "psi",
            DimensionName::Rho => "rho",
            DimensionName::Q => "q",
            DimensionName::F => "f",
            DimensionName::Tau => "tau",
            DimensionName::Lambda => "lambda",
        }
    }
}

impl fmt::Display for DimensionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar values for the six dimensions, each in `0.0..=1.0`.
///
/// The core treats these values opaquely; only lenses give them meaning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Dimensions {
    pub psi: f64,
    pub rho: f64,
    pub q: f64,
    pub f: f64,
    pub tau: f64,
    pub lambda: f64,
}

impl Dimensions {
    /// Create a validated set of dimensions.
    pub fn new(
        psi: f64,
        rho: f64,
        q: f64,
        f: f64,
        tau: f64,
        lambda: f64,
    ) -> Result<Self, DimensionError> {
        let dimensions = Self {
            psi,
            rho,
            q,
            f,
            tau,
            lambda,
        };
        dimensions.validate()?;
        Ok(dimensions)
    }

    /// Check every value is finite and within `0.0..=1.0`.
    ///
    /// Values are never clamped: an out-of-range extractor is a caller bug
    /// and is reported rather than corrected.
    pub fn validate(&self) -> Result<(), DimensionError> {
        for (dimension, value) in self.iter() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DimensionError::OutOfRange { dimension, value });
            }
        }
        Ok(())
    }

    /// Value of a single dimension.
    pub fn get(&self, name: DimensionName) -> f64 {
        match name {
            DimensionName::Psi => self.psi,
            DimensionName::Rho => self.rho,
            DimensionName::Q => self.q,
            DimensionName::F => self.f,
            DimensionName::Tau => self.tau,
            DimensionName::Lambda => self.lambda,
        }
    }

    /// Iterate `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (DimensionName, f64)> + '_ {
        DimensionName::ALL.iter().map(move |name| (*name, self.get(*name)))
    }
}

/// The four interchangeable lenses.
///
/// Ordered alphabetically for deterministic iteration in BTreeMap.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum LensKind {
    CompassionPreservation,
    CulturalBridge,
    GriefAccumulation,
    ProtectivePresence,
}

impl LensKind {
    pub const ALL: [LensKind; 4] = [
        LensKind::CompassionPreservation,
        LensKind::CulturalBridge,
        LensKind::GriefAccumulation,
        LensKind::ProtectivePresence,
    ];

    /// Display name of the lens.
    pub fn name(&self) -> &'static str {
        match self {
            LensKind::CompassionPreservation => "Compassion Preservation Lens",
            LensKind::CulturalBridge => "Cultural Bridge Lens",
            LensKind::GriefAccumulation => "Grief Accumulation Lens",
            LensKind::ProtectivePresence => "Protective Presence Lens",
        }
    }

    /// Identifier used in configuration files and on the command line.
    pub fn slug(&self) -> &'static str {
        match self {
            LensKind::CompassionPreservation => "compassion-preservation",
            LensKind::CulturalBridge => "cultural-bridge",
            LensKind::GriefAccumulation => "grief-accumulation",
            LensKind::ProtectivePresence => "protective-presence",
        }
    }

    /// The question this lens brings to a reflection.
    pub fn focus(&self) -> &'static str {
        match self {
            LensKind::CompassionPreservation => {
                "Is compassion being spent in a way that can be sustained?"
            }
            LensKind::CulturalBridge => {
                "Which cultural assumptions shape how this loss is being communicated?"
            }
            LensKind::GriefAccumulation => {
                "Is grief accumulating as weight or compressing into wisdom?"
            }
            LensKind::ProtectivePresence => {
                "Is professional distance protecting connection or replacing it?"
            }
        }
    }
}

impl fmt::Display for LensKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error returned when a lens name cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown lens: {0} (expected one of compassion-preservation, cultural-bridge, grief-accumulation, protective-presence)")]
pub struct UnknownLens(pub String);

impl FromStr for LensKind {
    type Err = UnknownLens;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        LensKind::ALL
            .iter()
            .find(|kind| kind.slug() == normalized)
            .copied()
            .ok_or_else(|| UnknownLens(s.to_string()))
    }
}

/// Input handed to a lens.
///
/// Lenses are stateless: anything they need beyond the dimensions, including
/// accumulated grief history, arrives here as read-only data.
#[derive(Debug, Clone, Copy)]
pub struct LensRequest<'a> {
    /// Extracted dimension values
    pub dimensions: &'a Dimensions,

    /// Free-text context tags (e.g. `culture:hindu_indian`, `pediatric`)
    pub tags: &'a BTreeSet<String>,

    /// Subject's grief history, oldest first (may be empty)
    pub history: &'a [GriefEvent],

    /// The reflection the dimensions were extracted from (may be empty)
    pub text: &'a str,
}

impl<'a> LensRequest<'a> {
    /// Create a request with no history.
    pub fn new(dimensions: &'a Dimensions, tags: &'a BTreeSet<String>) -> Self {
        Self {
            dimensions,
            tags,
            history: &[],
            text: "",
        }
    }

    /// Attach a read-only history slice.
    pub fn with_history(mut self, history: &'a [GriefEvent]) -> Self {
        self.history = history;
        self
    }

    pub fn with_text(mut self, text: &'a str) -> Self {
        self.text = text;
        self
    }

    /// Check whether a context tag is present (case-insensitive).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Value of a `prefix:value` tag, if present.
    pub fn tag_value(&self, prefix: &str) -> Option<&'a str> {
        self.tags.iter().find_map(|tag| {
            let (key, value) = tag.split_once(':')?;
            (key.trim().eq_ignore_ascii_case(prefix)).then(|| value.trim())
        })
    }
}

/// Annotated pattern produced by a lens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LensReading {
    /// Which lens produced this reading
    pub lens: LensKind,

    /// Machine-readable pattern label (e.g. `protective_distance`)
    pub pattern: String,

    /// Qualitative description of the pattern
    pub description: String,

    /// Lens-specific assessment (sustainability, transformation status, ...)
    pub assessment: String,

    /// Suggested interventions or next steps
    #[serde(default)]
    pub interventions: Vec<String>,

    /// Things to hold in mind: warning signs, cultural notes, open questions
    #[serde(default)]
    pub considerations: Vec<String>,

    /// Other ways the same values could be read
    #[serde(default)]
    pub alternative_readings: Vec<String>,

    /// How clearly the dimension values support this reading
    pub confidence: f64,
}
