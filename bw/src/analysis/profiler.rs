//! Behavior profiler

use tracing::debug;

use super::lexicon::{self, BREVITY, CLARIFICATION, DISTRESS, EXPLORATORY, TECHNICAL};
use crate::domain::{
    BehaviorProfile, BehaviorSignals, ConfidenceLevel, ConversationTurn, SpeedPreference, ToneHint,
};

/// Number of most recent turns the profiler looks at
pub const PROFILE_WINDOW: usize = 10;

const OVERWHELMED_HITS: usize = 2;
const CONFUSED_HITS: usize = 3;
const IMPATIENT_HITS: usize = 2;
const ENGAGED_AVG_CHARS: usize = 100;
const TECHNICAL_HITS: usize = 1;
const FIGURE_HITS: usize = 2;
const EXPLORATORY_HITS: usize = 2;

/// Heuristic read of recent user messages
#[derive(Debug, Clone, Copy, Default)]
pub struct BehaviorProfiler;

impl BehaviorProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Profile the last [`PROFILE_WINDOW`] turns; never fails
    pub fn profile(&self, history: &[ConversationTurn]) -> BehaviorProfile {
        let start = history.len().saturating_sub(PROFILE_WINDOW);
        let messages: Vec<String> = history[start..]
            .iter()
            .filter(|t| t.is_user())
            .map(|t| t.content.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_lowercase)
            .collect();
        debug!(user_messages = messages.len(), "BehaviorProfiler::profile: called");

        if messages.is_empty() {
            return BehaviorProfile::default();
        }

        let joined = messages.join("\n");
        let total_chars: usize = messages.iter().map(|m| m.chars().count()).sum();
        let signals = BehaviorSignals {
            overwhelmed: lexicon::count_hits(&joined, &DISTRESS) >= OVERWHELMED_HITS,
            confused: lexicon::count_hits(&joined, &CLARIFICATION) >= CONFUSED_HITS,
            impatient: lexicon::count_hits(&joined, &BREVITY) >= IMPATIENT_HITS,
            engaged: total_chars / messages.len() > ENGAGED_AVG_CHARS,
        };

        let tone_hint = if signals.overwhelmed || signals.confused {
            ToneHint::Warm
        } else if signals.impatient {
            ToneHint::Direct
        } else {
            ToneHint::Neutral
        };

        let confidence_level = if lexicon::count_hits(&joined, &TECHNICAL) >= TECHNICAL_HITS {
            ConfidenceLevel::High
        } else if lexicon::count_figures(&joined) >= FIGURE_HITS {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        let speed_preference = if signals.impatient {
            SpeedPreference::Quick
        } else if lexicon::count_hits(&joined, &EXPLORATORY) >= EXPLORATORY_HITS {
            SpeedPreference::Thorough
        } else {
            SpeedPreference::Balanced
        };

        let profile = BehaviorProfile {
            signals,
            tone_hint,
            confidence_level,
            speed_preference,
            turn_count: messages.len(),
        };
        debug!(?profile, "BehaviorProfiler::profile: derived");
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(messages: &[&str]) -> Vec<ConversationTurn> {
        messages.iter().map(|m| ConversationTurn::user(*m)).collect()
    }

    #[test]
    fn test_empty_history_is_default() {
        let profile = BehaviorProfiler::new().profile(&[]);
        assert_eq!(profile, BehaviorProfile::default());
    }

    #[test]
    fn test_assistant_only_history_is_default() {
        let history = vec![ConversationTurn::assistant("Hello, how can I help?")];
        assert_eq!(BehaviorProfiler::new().profile(&history), BehaviorProfile::default());
    }

    #[test]
    fn test_overwhelmed_user_gets_warm_tone() {
        let history = users(&["This is all too much.", "I'm overwhelmed by the choices"]);
        let profile = BehaviorProfiler::new().profile(&history);
        assert!(profile.signals.overwhelmed);
        assert_eq!(profile.tone_hint, ToneHint::Warm);
        assert_eq!(profile.turn_count, 2);
    }

    #[test]
    fn test_impatient_user_is_direct_and_quick() {
        let history = users(&["Keep it short please", "Just tell me quick"]);
        let profile = BehaviorProfiler::new().profile(&history);
        assert!(profile.signals.impatient);
        assert_eq!(profile.tone_hint, ToneHint::Direct);
        assert_eq!(profile.speed_preference, SpeedPreference::Quick);
    }

    #[test]
    fn test_confidence_levels() {
        let technical = BehaviorProfiler::new().profile(&users(&["We plan a heat pump"]));
        assert_eq!(technical.confidence_level, ConfidenceLevel::High);

        let figures = BehaviorProfiler::new().profile(&users(&["Budget 300.000 € for 140 m²"]));
        assert_eq!(figures.confidence_level, ConfidenceLevel::Medium);

        let vague = BehaviorProfiler::new().profile(&users(&["hello there"]));
        assert_eq!(vague.confidence_level, ConfidenceLevel::Low);
    }

    #[test]
    fn test_exploratory_user_is_thorough() {
        let history = users(&["Can you compare the options?", "What alternative would you suggest?"]);
        let profile = BehaviorProfiler::new().profile(&history);
        assert_eq!(profile.speed_preference, SpeedPreference::Thorough);
    }

    #[test]
    fn test_engaged_on_long_messages() {
        let long = "We are renovating a 1960s house with a large garden and would like to open up the ground floor for a bigger kitchen.";
        let profile = BehaviorProfiler::new().profile(&users(&[long]));
        assert!(profile.signals.engaged);
    }

    #[test]
    fn test_only_last_window_counts() {
        let mut history = users(&["too much", "overwhelmed"]);
        history.extend(users(&["ok"; PROFILE_WINDOW]));
        let profile = BehaviorProfiler::new().profile(&history);
        assert!(!profile.signals.overwhelmed);
        assert_eq!(profile.turn_count, PROFILE_WINDOW);
    }
}
