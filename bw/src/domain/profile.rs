//! Behavior profile derived from recent user messages

use serde::{Deserialize, Serialize};

/// Suggested reply tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToneHint {
    Warm,
    #[default]
    Neutral,
    Direct,
}

/// How confident the user appears about construction topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// Preferred pace of the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreference {
    Thorough,
    #[default]
    Balanced,
    Quick,
}

/// Boolean heuristic signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BehaviorSignals {
    pub overwhelmed: bool,
    pub confused: bool,
    pub impatient: bool,
    pub engaged: bool,
}

/// Derived read of the conversation; recomputed every turn, never stored
///
/// The default is the neutral/medium/balanced profile used whenever the
/// input is empty or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorProfile {
    pub signals: BehaviorSignals,
    pub tone_hint: ToneHint,
    pub confidence_level: ConfidenceLevel,
    pub speed_preference: SpeedPreference,
    pub turn_count: usize,
}

impl BehaviorProfile {
    /// One-line directive for the prompt
    pub fn directive(&self) -> String {
        let tone = match self.tone_hint {
            ToneHint::Warm => "Be warm and reassuring; keep steps small.",
            ToneHint::Neutral => "Be factual and friendly.",
            ToneHint::Direct => "Be direct and brief; skip pleasantries.",
        };
        let depth = match self.speed_preference {
            SpeedPreference::Thorough => "The user likes detail and comparisons.",
            SpeedPreference::Balanced => "Give moderate detail.",
            SpeedPreference::Quick => "Answer in as few sentences as possible.",
        };
        let expertise = match self.confidence_level {
            ConfidenceLevel::High => "Technical vocabulary is fine.",
            ConfidenceLevel::Medium => "Explain technical terms briefly.",
            ConfidenceLevel::Low => "Avoid jargon entirely.",
        };
        format!("{} {} {}", tone, depth, expertise)
    }
}
