//! Cultural Bridge Lens
//!
//! Surfaces cultural assumptions in how a loss is being communicated. The
//! lens looks up the profile named by a `culture:<key>` context tag in a
//! caller-supplied table; without one it offers general considerations.
//! When the request carries the reflection text, phrasing that assumes a
//! Western default is called out.
//!
//! The same profiles back `communication_guidance` for a prognosis,
//! goals-of-care or imminent-death conversation.
//!
//! Profiles describe tendencies, not certainties. The family's actual
//! preferences can only be learned by asking them.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{alternative_readings, insufficient_reading, is_silent, signal_confidence, Lens};
use crate::extractor::{fold_apostrophes, marker_pattern};
use crate::types::{LensKind, LensReading, LensRequest};

/// Context tag prefix naming a cultural profile.
pub const CULTURE_TAG: &str = "culture";

const HUMILITY_REMINDER: &str = "These are possibilities to consider, not cultural diagnoses. \
     The family's actual preferences can only be learned by asking them.";

const ASK_THE_FAMILY: &str = "Always ask the family about their specific preferences";

const SUFFERING_EXCERPT_CHARS: usize = 200;

lazy_static! {
    static ref AUTONOMY_MARKERS: Regex = marker_pattern(&[
        "your decision",
        "you should decide",
        "what do you want",
        "it's up to you",
        "your choice",
        "your right",
    ]);
    static ref DIRECT_DISCLOSURE_MARKERS: Regex = marker_pattern(&[
        "i need to tell you",
        "you should know",
        "the truth is",
        "honestly",
        "frankly",
        "you have to understand",
    ]);
    static ref TIME_PRESSURE_MARKERS: Regex = marker_pattern(&[
        "we need to decide",
        "time is important",
        "quickly",
        "right away",
        "immediately",
        "can't wait",
    ]);
}

const QUESTIONS_FOR_ANY_FAMILY: &[&str] = &[
    "How does your family prefer to make important medical decisions together?",
    "Who would you like to be included in discussions about your loved one's care?",
    "Are there cultural, religious, or spiritual practices that are important to your family?",
    "How much information would you or your family like about what to expect?",
];

/// How medical decisions tend to be made.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStyle {
    #[default]
    Individual,
    Family,
    Elder,
    Community,
    Religious,
}

impl DecisionStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStyle::Individual => "individual",
            DecisionStyle::Family => "family",
            DecisionStyle::Elder => "elder",
            DecisionStyle::Community => "community",
            DecisionStyle::Religious => "religious",
        }
    }
}

/// Preferred way of receiving prognosis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisclosurePreference {
    #[default]
    Full,
    Graduated,
    FamilyFirst,
    Protective,
    PatientChoice,
}

impl DisclosurePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosurePreference::Full => "full",
            DisclosurePreference::Graduated => "graduated",
            DisclosurePreference::FamilyFirst => "family_first",
            DisclosurePreference::Protective => "protective",
            DisclosurePreference::PatientChoice => "patient_choice",
        }
    }
}

/// Broad family of beliefs about death and what follows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeathBeliefs {
    Reincarnation,
    HeavenHell,
    Continuation,
    Finality,
    Liberation,
    #[default]
    Unknown,
}

impl DeathBeliefs {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeathBeliefs::Reincarnation => "reincarnation",
            DeathBeliefs::HeavenHell => "heaven_hell",
            DeathBeliefs::Continuation => "continuation",
            DeathBeliefs::Finality => "finality",
            DeathBeliefs::Liberation => "liberation",
            DeathBeliefs::Unknown => "unknown",
        }
    }
}

/// Cultural factors affecting end-of-life communication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CulturalProfile {
    pub tradition: String,

    #[serde(default)]
    pub decision_style: DecisionStyle,

    #[serde(default)]
    pub disclosure_preference: DisclosurePreference,

    #[serde(default)]
    pub important_concepts: Vec<String>,

    /// Suggested phrasing keyed by situation (BTreeMap for deterministic iteration)
    #[serde(default)]
    pub suggested_language: BTreeMap<String, String>,

    #[serde(default)]
    pub avoid_language: Vec<String>,

    #[serde(default)]
    pub death_beliefs: DeathBeliefs,

    #[serde(default)]
    pub end_of_life_rituals: Vec<String>,

    #[serde(default)]
    pub ritual_timing: Option<String>,

    #[serde(default)]
    pub key_family_roles: Vec<String>,

    #[serde(default)]
    pub suffering_beliefs: Option<String>,
}

/// A default that clinical language tends to carry without saying so.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum CulturalAssumption {
    IndividualAutonomy,
    DirectDisclosure,
    TimePressure,
}

impl CulturalAssumption {
    pub fn note(&self) -> &'static str {
        match self {
            CulturalAssumption::IndividualAutonomy => {
                "Assumption of individual autonomous decision-making. \
                 Many cultures use family-collective or elder-directed models."
            }
            CulturalAssumption::DirectDisclosure => {
                "Assumption that direct disclosure to patient is preferred. \
                 Some cultures prefer family-mediated or graduated disclosure."
            }
            CulturalAssumption::TimePressure => {
                "Time pressure in decision-making. \
                 Family consultation may require more time in collective cultures."
            }
        }
    }

    fn adaptation(&self) -> &'static str {
        match self {
            CulturalAssumption::IndividualAutonomy => {
                "Consider asking: 'How does your family make important decisions together?'"
            }
            CulturalAssumption::DirectDisclosure => {
                "Consider asking: 'How would you like to receive information \
                 about your loved one's condition?'"
            }
            CulturalAssumption::TimePressure => {
                "Consider offering: 'Would your family like time to consult \
                 before making this decision?'"
            }
        }
    }
}

/// Assumptions detectable in a piece of clinical communication, in a fixed order.
pub fn detect_assumptions(text: &str) -> Vec<CulturalAssumption> {
    let text = fold_apostrophes(text);
    [
        (&*AUTONOMY_MARKERS, CulturalAssumption::IndividualAutonomy),
        (&*DIRECT_DISCLOSURE_MARKERS, CulturalAssumption::DirectDisclosure),
        (&*TIME_PRESSURE_MARKERS, CulturalAssumption::TimePressure),
    ]
    .into_iter()
    .filter(|(pattern, _)| pattern.is_match(&text))
    .map(|(_, assumption)| assumption)
    .collect()
}

/// The conversation guidance is being prepared for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationContext {
    Prognosis,
    GoalsOfCare,
    ImminentDeath,
}

impl CommunicationContext {
    pub const ALL: [CommunicationContext; 3] = [
        CommunicationContext::Prognosis,
        CommunicationContext::GoalsOfCare,
        CommunicationContext::ImminentDeath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommunicationContext::Prognosis => "prognosis",
            CommunicationContext::GoalsOfCare => "goals_of_care",
            CommunicationContext::ImminentDeath => "imminent_death",
        }
    }
}

impl fmt::Display for CommunicationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown communication context: {0} (expected one of prognosis, goals_of_care, imminent_death)")]
pub struct UnknownCommunicationContext(pub String);

impl FromStr for CommunicationContext {
    type Err = UnknownCommunicationContext;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        CommunicationContext::ALL
            .iter()
            .find(|context| context.as_str() == normalized)
            .copied()
            .ok_or_else(|| UnknownCommunicationContext(s.to_string()))
    }
}

/// Guidance for one conversation with one family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CommunicationGuidance {
    pub cultural_awareness: Vec<String>,
    pub suggested_approach: Vec<String>,
    pub suggested_language: Vec<String>,
    pub cautions: Vec<String>,
    pub questions_to_ask_family: Vec<String>,
    pub ritual_considerations: Vec<String>,
    pub critical_reminder: String,
}

impl CommunicationGuidance {
    /// Guidance when no profile is known; applies to any family.
    pub fn generic() -> Self {
        Self {
            cultural_awareness: strings(&[
                "No specific cultural profile - approach with cultural humility",
            ]),
            suggested_approach: strings(&[
                "Ask about family preferences before assuming communication style",
                "Inquire about religious or spiritual needs",
                "Ask who should be involved in discussions and decisions",
            ]),
            suggested_language: Vec::new(),
            cautions: strings(&[
                "Don't assume Western individual autonomy model",
                "Don't assume patient wants full direct disclosure",
            ]),
            questions_to_ask_family: strings(&[
                "How does your family prefer to make medical decisions together?",
                "Are there cultural or religious considerations we should know about?",
                "Who would you like to be present for important discussions?",
            ]),
            ritual_considerations: strings(&[
                "Ask about any end-of-life rituals that are important to the family",
            ]),
            critical_reminder: ASK_THE_FAMILY.to_string(),
        }
    }

    fn for_profile(profile: &CulturalProfile, context: CommunicationContext) -> Self {
        let mut guidance = Self {
            cultural_awareness: vec![
                format!("Decision-making style often: {}", profile.decision_style.as_str()),
                format!(
                    "Disclosure preference may be: {}",
                    profile.disclosure_preference.as_str()
                ),
                format!("Death beliefs context: {}", profile.death_beliefs.as_str()),
            ],
            critical_reminder: ASK_THE_FAMILY.to_string(),
            ..Self::default()
        };
        if !profile.important_concepts.is_empty() {
            guidance
                .cultural_awareness
                .push(format!("Key concepts: {}", first(&profile.important_concepts, 3)));
        }

        match context {
            CommunicationContext::Prognosis => guidance.add_prognosis(profile),
            CommunicationContext::GoalsOfCare => guidance.add_goals_of_care(profile),
            CommunicationContext::ImminentDeath => guidance.add_imminent_death(profile),
        }
        guidance
    }

    fn add_prognosis(&mut self, profile: &CulturalProfile) {
        if profile.disclosure_preference == DisclosurePreference::FamilyFirst {
            self.suggested_approach.extend(strings(&[
                "Consider meeting with family first before patient",
                "Ask: 'How does your family prefer to receive difficult news?'",
                "Allow family to determine how much patient is told",
            ]));
            self.questions_to_ask_family.extend(strings(&[
                "Who should be involved in these discussions?",
                "How much information would you like your loved one to receive directly?",
                "What is the best way for us to communicate with your family?",
            ]));
        }
        self.suggested_language
            .extend(profile.suggested_language.get("prognosis").cloned());
        self.cautions.extend(
            profile
                .avoid_language
                .iter()
                .take(3)
                .map(|phrase| format!("Consider avoiding: '{}'", phrase)),
        );
    }

    fn add_goals_of_care(&mut self, profile: &CulturalProfile) {
        if profile.decision_style == DecisionStyle::Family {
            self.suggested_approach.extend(strings(&[
                "Allow time for family consultation before decisions",
                "Ask about family hierarchy and who should be in the room",
                "Understand that decisions may take longer than Western model expects",
            ]));
        }
        if !profile.key_family_roles.is_empty() {
            self.suggested_approach.push(format!(
                "Key roles to be aware of: {}",
                first(&profile.key_family_roles, 2)
            ));
        }
        if let Some(beliefs) = &profile.suffering_beliefs {
            self.cultural_awareness
                .push(format!("Perspective on suffering: {}", excerpt(beliefs)));
            self.questions_to_ask_family.push(
                "How does your family understand suffering and what gives comfort?".to_string(),
            );
        }
    }

    fn add_imminent_death(&mut self, profile: &CulturalProfile) {
        if !profile.end_of_life_rituals.is_empty() {
            self.ritual_considerations
                .extend(profile.end_of_life_rituals.iter().take(5).cloned());
            self.suggested_approach.push(
                "Ask family about ritual preferences early enough to accommodate".to_string(),
            );
        }
        if let Some(timing) = &profile.ritual_timing {
            self.ritual_considerations
                .push(format!("Timing note: {}", timing));
        }
        for key in ["death_approaching", "transition"] {
            self.suggested_language
                .extend(profile.suggested_language.get(key).cloned());
        }
        self.questions_to_ask_family.extend(strings(&[
            "What are your wishes regarding pain medication?",
            "How important is it for your loved one to be alert?",
            "Are there specific prayers or rituals you would like to perform?",
        ]));
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn first(items: &[String], n: usize) -> String {
    items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= SUFFERING_EXCERPT_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(SUFFERING_EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

#[derive(Debug, Clone, Default)]
pub struct CulturalBridgeLens {
    profiles: BTreeMap<String, CulturalProfile>,
}

impl CulturalBridgeLens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: BTreeMap<String, CulturalProfile>) -> Self {
        Self { profiles }
    }

    pub fn profile(&self, key: &str) -> Option<&CulturalProfile> {
        self.profiles.get(&key.to_lowercase())
    }

    pub fn profile_keys(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Guidance for a conversation, specific to a profile when one is known.
    pub fn communication_guidance(
        &self,
        culture: Option<&str>,
        context: CommunicationContext,
    ) -> CommunicationGuidance {
        match culture.and_then(|key| self.profile(key)) {
            Some(profile) => CommunicationGuidance::for_profile(profile, context),
            None => CommunicationGuidance::generic(),
        }
    }

    fn specific_considerations(profile: &CulturalProfile) -> Vec<String> {
        let mut considerations = vec![
            format!("Cultural context: {}", profile.tradition),
            format!("Typical decision style: {}", profile.decision_style.as_str()),
            format!(
                "Disclosure preference often: {}",
                profile.disclosure_preference.as_str()
            ),
        ];
        if !profile.key_family_roles.is_empty() {
            considerations.push(format!(
                "Key roles: {}",
                first(&profile.key_family_roles, 2)
            ));
        }
        if let Some(beliefs) = &profile.suffering_beliefs {
            considerations.push(format!("Suffering context: {}", beliefs));
        }
        considerations
    }

    fn general_considerations() -> Vec<String> {
        [
            "Cultural context not specified; consider asking family preferences",
            "Decision-making style may be individual, family, or elder-directed",
            "Disclosure preferences vary; ask before assuming direct disclosure",
            "Time frames for decisions may need flexibility for family consultation",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn specific_adaptations(profile: &CulturalProfile) -> Vec<String> {
        let mut adaptations = Vec::new();

        if profile.decision_style == DecisionStyle::Family {
            adaptations.push("Consider inviting family members to discussions first".to_string());
        }
        if profile.disclosure_preference == DisclosurePreference::FamilyFirst {
            adaptations.push(
                "Ask family about disclosure preferences before discussing prognosis \
                 directly with patient"
                    .to_string(),
            );
        }
        for language in profile.suggested_language.values().take(2) {
            adaptations.push(format!("Consider: '{}'", language));
        }
        for avoid in profile.avoid_language.iter().take(2) {
            adaptations.push(format!("Consider avoiding: '{}'", avoid));
        }
        adaptations
    }

    /// Adaptations for the detected assumptions.
    ///
    /// With no text to inspect, the decision-making question is always offered.
    fn general_adaptations(assumptions: Option<&[CulturalAssumption]>) -> Vec<String> {
        let mut adaptations: Vec<String> = match assumptions {
            Some(found) => found.iter().map(|a| a.adaptation().to_string()).collect(),
            None => vec![CulturalAssumption::IndividualAutonomy.adaptation().to_string()],
        };
        adaptations.push("Build relationship before crisis; ask about preferences early".to_string());
        adaptations
    }
}

impl Lens for CulturalBridgeLens {
    fn kind(&self) -> LensKind {
        LensKind::CulturalBridge
    }

    fn interpret(&self, request: &LensRequest<'_>) -> LensReading {
        let d = request.dimensions;
        if is_silent(d) {
            return insufficient_reading(self.kind());
        }

        let assumptions =
            (!request.text.trim().is_empty()).then(|| detect_assumptions(request.text));
        let requested = request.tag_value(CULTURE_TAG);
        let profile = requested.and_then(|key| self.profile(key));

        let (pattern, description, mut considerations, interventions) = match (requested, profile) {
            (Some(key), Some(profile)) => (
                format!("profile:{}", key.to_lowercase()),
                format!(
                    "Reading communication through the {} profile.",
                    profile.tradition
                ),
                Self::specific_considerations(profile),
                Self::specific_adaptations(profile),
            ),
            (Some(key), None) => (
                "unknown_profile".to_string(),
                format!(
                    "No cultural profile is configured for '{}'. General considerations apply.",
                    key
                ),
                Self::general_considerations(),
                Self::general_adaptations(assumptions.as_deref()),
            ),
            (None, _) => (
                "general".to_string(),
                "No cultural context given. General considerations apply.".to_string(),
                Self::general_considerations(),
                Self::general_adaptations(assumptions.as_deref()),
            ),
        };

        match assumptions.as_deref() {
            Some([]) => considerations.push(
                "No obvious cultural assumptions detected in this sample, \
                 but cultural sensitivity should remain active."
                    .to_string(),
            ),
            Some(found) => considerations.extend(
                found
                    .iter()
                    .map(|a| format!("Possible assumption: {}", a.note())),
            ),
            None => {}
        }

        if d.lambda > 0.5 {
            considerations.push(
                "High frame ambiguity: check whether clinical language is landing as intended"
                    .to_string(),
            );
        }
        if d.f < 0.3 {
            considerations.push(
                "Community connection reads low; ask who else should be part of these \
                 conversations"
                    .to_string(),
            );
        }
        considerations.extend(QUESTIONS_FOR_ANY_FAMILY.iter().map(|q| q.to_string()));

        LensReading {
            lens: self.kind(),
            pattern,
            description,
            assessment: HUMILITY_REMINDER.to_string(),
            interventions,
            considerations,
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

    fn hindu_profile() -> CulturalProfile {
        CulturalProfile {
            tradition: "Hindu (Indian)".to_string(),
            decision_style: DecisionStyle::Family,
            disclosure_preference: DisclosurePreference::FamilyFirst,
            important_concepts: vec!["Dharma - righteous duty".to_string()],
            suggested_language: [
                ("comfort_focus", "We can focus on keeping them comfortable and present"),
                ("prognosis", "The illness is progressing beyond what medicine can reverse"),
                ("transition", "This is a transition, not an ending"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            avoid_language: vec!["There's nothing more we can do".to_string()],
            death_beliefs: DeathBeliefs::Reincarnation,
            end_of_life_rituals: vec![
                "Family may wish to read from holy texts".to_string(),
                "Lamp may be lit near patient's head".to_string(),
            ],
            ritual_timing: Some("Rituals ideally begin before death".to_string()),
            key_family_roles: vec!["Eldest son often has specific ritual duties".to_string()],
            suffering_beliefs: None,
        }
    }

    fn lens() -> CulturalBridgeLens {
        let mut profiles = BTreeMap::new();
        profiles.insert("hindu_indian".to_string(), hindu_profile());
        CulturalBridgeLens::with_profiles(profiles)
    }

    fn read(lens: &CulturalBridgeLens, tags: &[&str], f: f64) -> LensReading {
        read_text(lens, tags, f, "")
    }

    fn read_text(lens: &CulturalBridgeLens, tags: &[&str], f: f64, text: &str) -> LensReading {
        let dims = Dimensions::new(0.5, 0.4, 0.5, f, 0.3, 0.2).unwrap();
        let tags: BTreeSet<String> = tags.iter().map(|t| t.to_string()).collect();
        lens.interpret(&LensRequest::new(&dims, &tags).with_text(text))
    }

    #[test]
    fn test_profile_lookup_from_tag() {
        let reading = read(&lens(), &["culture:hindu_indian"], 0.6);
        assert_eq!(reading.pattern, "profile:hindu_indian");
        assert_eq!(reading.considerations[0], "Cultural context: Hindu (Indian)");
        assert_eq!(
            reading.interventions,
            vec![
                "Consider inviting family members to discussions first".to_string(),
                "Ask family about disclosure preferences before discussing prognosis \
                 directly with patient"
                    .to_string(),
                "Consider: 'We can focus on keeping them comfortable and present'".to_string(),
                "Consider: 'The illness is progressing beyond what medicine can reverse'"
                    .to_string(),
                "Consider avoiding: 'There's nothing more we can do'".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_profile_falls_back_to_general() {
        let reading = read(&lens(), &["culture:atlantean"], 0.6);
        assert_eq!(reading.pattern, "unknown_profile");
        assert!(reading.description.contains("atlantean"));
    }

    #[test]
    fn test_no_culture_tag() {
        let reading = read(&CulturalBridgeLens::new(), &["pediatric"], 0.6);
        assert_eq!(reading.pattern, "general");
        assert!(reading
            .considerations
            .iter()
            .any(|c| c.starts_with("How does your family prefer")));
    }

    #[test]
    fn test_low_connection_adds_note() {
        let reading = read(&CulturalBridgeLens::new(), &[], 0.1);
        assert!(reading
            .considerations
            .iter()
            .any(|c| c.contains("who else should be part")));
    }

    #[test]
    fn test_profile_deserializes_with_defaults() {
        let profile: CulturalProfile = serde_yaml::from_str("tradition: Secular").unwrap();
        assert_eq!(profile.decision_style, DecisionStyle::Individual);
        assert_eq!(profile.disclosure_preference, DisclosurePreference::Full);
    }

    #[test]
    fn test_detects_each_assumption() {
        assert_eq!(
            detect_assumptions("It\u{2019}s up to you. Honestly, we need to decide quickly."),
            vec![
                CulturalAssumption::IndividualAutonomy,
                CulturalAssumption::DirectDisclosure,
                CulturalAssumption::TimePressure,
            ]
        );
        assert_eq!(
            detect_assumptions("I NEED TO TELL YOU something."),
            vec![CulturalAssumption::DirectDisclosure]
        );
        assert!(detect_assumptions("We sat together for a while.").is_empty());
        // whole phrases only
        assert!(detect_assumptions("She was your rightful heir.").is_empty());
    }

    #[test]
    fn test_assumptions_drive_general_adaptations() {
        let reading = read_text(
            &CulturalBridgeLens::new(),
            &[],
            0.6,
            "The truth is we need to decide right away.",
        );
        assert_eq!(
            reading.interventions,
            vec![
                CulturalAssumption::DirectDisclosure.adaptation().to_string(),
                CulturalAssumption::TimePressure.adaptation().to_string(),
                "Build relationship before crisis; ask about preferences early".to_string(),
            ]
        );
        assert!(reading
            .considerations
            .iter()
            .any(|c| c.starts_with("Possible assumption: Time pressure")));
    }

    #[test]
    fn test_clean_text_notes_no_assumptions() {
        let reading = read_text(&CulturalBridgeLens::new(), &[], 0.6, "We sat together.");
        assert!(reading
            .considerations
            .iter()
            .any(|c| c.starts_with("No obvious cultural assumptions")));
        assert_eq!(reading.interventions.len(), 1);

        let silent = read(&CulturalBridgeLens::new(), &[], 0.6);
        assert!(!silent
            .considerations
            .iter()
            .any(|c| c.starts_with("No obvious cultural assumptions")));
        assert_eq!(silent.interventions.len(), 2);
    }

    #[test]
    fn test_prognosis_guidance_for_family_first_profile() {
        let guidance = lens().communication_guidance(
            Some("Hindu_Indian"),
            CommunicationContext::Prognosis,
        );
        assert_eq!(
            guidance.cultural_awareness,
            vec![
                "Decision-making style often: family".to_string(),
                "Disclosure preference may be: family_first".to_string(),
                "Death beliefs context: reincarnation".to_string(),
                "Key concepts: Dharma - righteous duty".to_string(),
            ]
        );
        assert_eq!(guidance.suggested_approach.len(), 3);
        assert_eq!(
            guidance.suggested_language,
            vec!["The illness is progressing beyond what medicine can reverse".to_string()]
        );
        assert_eq!(
            guidance.cautions,
            vec!["Consider avoiding: 'There's nothing more we can do'".to_string()]
        );
        assert!(guidance.ritual_considerations.is_empty());
        assert_eq!(guidance.critical_reminder, ASK_THE_FAMILY);
    }

    #[test]
    fn test_goals_of_care_guidance() {
        let mut profile = hindu_profile();
        profile.suffering_beliefs = Some("x".repeat(250));
        let mut profiles = BTreeMap::new();
        profiles.insert("hindu_indian".to_string(), profile);
        let lens = CulturalBridgeLens::with_profiles(profiles);

        let guidance =
            lens.communication_guidance(Some("hindu_indian"), CommunicationContext::GoalsOfCare);
        assert_eq!(guidance.suggested_approach.len(), 4);
        assert_eq!(
            guidance.suggested_approach[3],
            "Key roles to be aware of: Eldest son often has specific ritual duties"
        );
        let suffering = guidance.cultural_awareness.last().unwrap();
        assert!(suffering.starts_with("Perspective on suffering: "));
        assert!(suffering.ends_with("..."));
        assert_eq!(guidance.questions_to_ask_family.len(), 1);
    }

    #[test]
    fn test_imminent_death_guidance_lists_rituals() {
        let guidance =
            lens().communication_guidance(Some("hindu_indian"), CommunicationContext::ImminentDeath);
        assert_eq!(
            guidance.ritual_considerations,
            vec![
                "Family may wish to read from holy texts".to_string(),
                "Lamp may be lit near patient's head".to_string(),
                "Timing note: Rituals ideally begin before death".to_string(),
            ]
        );
        assert_eq!(
            guidance.suggested_language,
            vec!["This is a transition, not an ending".to_string()]
        );
        assert_eq!(guidance.questions_to_ask_family.len(), 3);
    }

    #[test]
    fn test_unknown_culture_gets_generic_guidance() {
        let generic = CommunicationGuidance::generic();
        for culture in [None, Some("atlantean")] {
            for context in CommunicationContext::ALL {
                assert_eq!(lens().communication_guidance(culture, context), generic);
            }
        }
        assert_eq!(generic.cautions.len(), 2);
    }

    #[test]
    fn test_communication_context_parsing() {
        assert_eq!(
            "goals-of-care".parse::<CommunicationContext>().unwrap(),
            CommunicationContext::GoalsOfCare
        );
        assert_eq!(
            " Imminent_Death ".parse::<CommunicationContext>().unwrap(),
            CommunicationContext::ImminentDeath
        );
        assert!("bad_news".parse::<CommunicationContext>().is_err());
    }
}
