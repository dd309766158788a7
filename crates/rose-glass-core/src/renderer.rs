//! Narrative renderer.
//!
//! Formats a translation for a human reader. All decisions have already been
//! made by the lens and classifier; this module only lays them out.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

use crate::classifier::PathwaySuggestion;
use crate::types::{Dimensions, LensReading};

/// Everything the narrative shows.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub dimensions: &'a Dimensions,
    pub reading: &'a LensReading,
    pub suggestion: Option<&'a PathwaySuggestion>,
    pub uncertainty_notes: &'a [String],

    /// Overall translation confidence
    pub confidence: f64,
}

impl<'a> NarrativeInput<'a> {
    pub fn new(dimensions: &'a Dimensions, reading: &'a LensReading) -> Self {
        Self {
            dimensions,
            reading,
            suggestion: None,
            uncertainty_notes: &[],
            confidence: reading.confidence,
        }
    }

    pub fn with_suggestion(mut self, suggestion: Option<&'a PathwaySuggestion>) -> Self {
        self.suggestion = suggestion;
        self
    }

    pub fn with_uncertainty(mut self, notes: &'a [String], confidence: f64) -> Self {
        self.uncertainty_notes = notes;
        self.confidence = confidence;
        self
    }
}

/// Which optional sections to include.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderOptions {
    pub include_dimensions: bool,
    pub include_alternatives: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            include_dimensions: true,
            include_alternatives: true,
        }
    }
}

/// Render the narrative as plain text.
pub fn render(input: &NarrativeInput<'_>, options: &RenderOptions) -> String {
    let mut out = String::new();
    let reading = input.reading;

    // Writing to a String cannot fail
    let _ = writeln!(out, "ROSE GLASS TRANSLATION");
    let _ = writeln!(out, "Lens: {}", reading.lens.name());
    let _ = writeln!(out, "Pattern: {}", reading.pattern);
    let _ = writeln!(out);

    if options.include_dimensions {
        let _ = writeln!(out, "PATTERN DIMENSIONS (through this lens):");
        for (name, value) in input.dimensions.iter() {
            let _ = writeln!(out, "  {} {:<28} {:.2}", name.symbol(), name.label(), value);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "PATTERN SUMMARY:");
    let _ = writeln!(out, "{}", reading.description);
    let _ = writeln!(out);
    let _ = writeln!(out, "ASSESSMENT:");
    let _ = writeln!(out, "{}", reading.assessment);

    if let Some(suggestion) = input.suggestion {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "WISDOM PATHWAY: {} ({})",
            suggestion.pathway.label, suggestion.bucket
        );
        let _ = writeln!(
            out,
            "  Load {:.2} from {} earlier event(s), severity {:.2}",
            suggestion.load_score, suggestion.contributing_events, suggestion.focal_severity
        );
        for (i, prompt) in suggestion.prompts.iter().enumerate() {
            let _ = writeln!(out, "  {}. {}", i + 1, prompt);
        }
    }

    write_list(&mut out, "SUPPORT CONSIDERATIONS:", "•", &reading.interventions);
    write_list(&mut out, "NOTES:", "•", &reading.considerations);
    if options.include_alternatives {
        write_list(&mut out, "ALTERNATIVE READINGS:", "→", &reading.alternative_readings);
    }
    write_list(&mut out, "UNCERTAINTY NOTES:", "!", input.uncertainty_notes);

    let _ = writeln!(out);
    let _ = writeln!(out, "Translation confidence: {:.0}%", input.confidence * 100.0);
    out
}

fn write_list(out: &mut String, heading: &str, bullet: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", heading);
    for item in items {
        let _ = writeln!(out, "  {} {}", bullet, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::WisdomPathway;
    use crate::types::LensKind;

    fn reading() -> LensReading {
        LensReading {
            lens: LensKind::GriefAccumulation,
            pattern: "raw_accumulating".to_string(),
            description: "Grief appears to be accumulating.".to_string(),
            assessment: "Early transformation.".to_string(),
            interventions: vec!["Consider dedicated time for grief processing".to_string()],
            considerations: vec![],
            alternative_readings: vec!["This reading is through one lens".to_string()],
            confidence: 0.4,
        }
    }

    fn suggestion() -> PathwaySuggestion {
        PathwaySuggestion {
            subject: "dr_a".into(),
            event_id: "p1".into(),
            pathway: WisdomPathway {
                id: "compassion".to_string(),
                label: "Compassion".to_string(),
                priority: 1,
            },
            prompts: vec!["What did this family teach you?".to_string()],
            load_score: 0.25,
            focal_severity: 1.326,
            contributing_events: 1,
            bucket: "high-severity".to_string(),
        }
    }

    #[test]
    fn test_render_full_narrative() {
        let dims = Dimensions::new(0.5, 0.2, 0.7, 0.4, 0.3, 0.1).unwrap();
        let reading = reading();
        let suggestion = suggestion();
        let notes = vec!["Coherence is constructed, not discovered.".to_string()];
        let input = NarrativeInput::new(&dims, &reading)
            .with_suggestion(Some(&suggestion))
            .with_uncertainty(&notes, 0.55);

        let text = render(&input, &RenderOptions::default());
        assert!(text.contains("Lens: Grief Accumulation Lens"));
        assert!(text.contains("q Emotional Engagement"));
        assert!(text.contains("0.70"));
        assert!(text.contains("WISDOM PATHWAY: Compassion (high-severity)"));
        assert!(text.contains("  1. What did this family teach you?"));
        assert!(text.contains("ALTERNATIVE READINGS:"));
        assert!(text.contains("UNCERTAINTY NOTES:"));
        assert!(text.contains("Translation confidence: 55%"));
        assert!(!text.contains("NOTES:\n  •"));
    }

    #[test]
    fn test_render_options_hide_sections() {
        let dims = Dimensions::default();
        let reading = reading();
        let options = RenderOptions {
            include_dimensions: false,
            include_alternatives: false,
        };
        let text = render(&NarrativeInput::new(&dims, &reading), &options);
        assert!(!text.contains("PATTERN DIMENSIONS"));
        assert!(!text.contains("ALTERNATIVE READINGS"));
        assert!(!text.contains("WISDOM PATHWAY"));
        assert!(text.contains("Translation confidence: 40%"));
    }
}
