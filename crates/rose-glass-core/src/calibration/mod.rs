//! Calibration parsing and validation.
//!
//! A calibration is structured data: decay half-lives per clinical context,
//! severity weights, the circumstance multiplier table, the pathway list and
//! the selection rules, plus optional lens thresholds and cultural profiles.
//! It is validated once at load time and then shared immutably.

mod coverage;
mod parser;

pub use parser::{
    Calibration, CalibrationError, DecayCalibration, LensCalibration, PathwayTemplate,
    SelectionRule, SeverityCalibration, StateWeights,
};
