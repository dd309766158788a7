//! Shared calibration fixtures.
//!
//! Used by this crate's tests and by downstream crates that need a known-good
//! calibration without touching the filesystem.

/// A complete calibration with six pathways and a fully covering rule grid.
///
/// Severity bands: `[0, 0.35)`, `[0.35, 0.7)`, `[0.7, inf)`.
/// Load bands: `[0, 0.5)`, `[0.5, 1.5)`, `[1.5, inf)`.
pub const TEST_CALIBRATION_YAML: &str = r#"
calibration_version: "1.0"
name: "Test Calibration"
description: "Illustrative thresholds for tests"
decay:
  half_lives:
    general_oncology: 30days
    pediatric_oncology: 90days
    palliative_care: 21days
severity:
  intensity_weight: 0.5
  depth_weight: 0.5
  circumstance_multipliers:
    prolonged: 1.2
    pediatric: 1.3
    sudden: 1.15
    complicated: 1.1
pathways:
  - id: resilience
    label: Resilience
    prompts:
      - "What helped you continue after this loss?"
      - "What would you tell another physician facing similar loss?"
  - id: compassion
    label: Compassion
    prompts:
      - "How did this experience change your capacity for connection?"
      - "What about this loss keeps you human?"
  - id: perspective
    label: Perspective
    prompts:
      - "What does this loss illuminate about what matters?"
  - id: communication
    label: Communication
    prompts:
      - "What words mattered most to the family?"
  - id: presence
    label: Presence
    prompts:
      - "What did this patient teach you about being with suffering?"
  - id: service
    label: Service
    prompts:
      - "What can you offer others because of what you learned here?"
rules:
  - label: heavy-load-high-severity
    pathway: resilience
    load_min: 1.5
    severity_min: 0.7
  - label: high-severity
    pathway: compassion
    severity_min: 0.7
  - label: heavy-load
    pathway: perspective
    load_min: 1.5
    severity_max: 0.7
  - label: moderate-severity
    pathway: communication
    load_max: 1.5
    severity_min: 0.35
    severity_max: 0.7
  - label: low-load-low-severity
    pathway: presence
    load_max: 0.5
    severity_max: 0.35
  - label: integrating
    pathway: service
    load_min: 0.5
    load_max: 1.5
    severity_max: 0.35
"#;
