//! Deterministic fallbacks for auto-turns
//!
//! Substituted verbatim when the model cannot produce a compliant reply.
//! Every template satisfies the auto-turn contract.

use serde_json::Value;

use super::openings::opening;
use crate::analysis::format_eur;
use crate::domain::{ArchitectEvent, Chapter, EventType};

fn amount(payload: Option<&Value>, key: &str) -> Option<f64> {
    payload.and_then(|p| p.get(key)).and_then(Value::as_f64)
}

fn chapter_title(chapter: Option<Chapter>) -> &'static str {
    chapter.map(|c| c.title()).unwrap_or("the questionnaire")
}

/// Fallback text for the event that triggered an auto-turn
pub fn fallback_text(event: &ArchitectEvent) -> String {
    let payload = event.payload.as_ref();
    let title = chapter_title(event.chapter);
    match event.event_type {
        EventType::ChapterEntered => event.chapter.and_then(opening).unwrap_or_else(|| {
            format!(
                "Context: You opened {}.\nInsight: Each chapter builds on the answers before it.\nAction: Shall we go through it step by step?",
                title
            )
        }),
        EventType::ChapterCompleted => format!(
            "Context: You completed all required answers in {}.\nInsight: Complete chapters make the later cost and risk checks reliable.\nAction: Would you like to continue with the next chapter?",
            title
        ),
        EventType::RoomAdded => {
            let count = payload.and_then(|p| p.get("count")).and_then(Value::as_u64);
            let what = match count {
                Some(n) => format!("Your plan now has {} rooms.", n),
                None => "You added a room.".to_string(),
            };
            format!(
                "Context: {}\nInsight: Every room adds floor area, and the total must stay within the buildable area.\nAction: How large should the new room be?",
                what
            )
        }
        EventType::BudgetEdited => {
            let what = match (amount(payload, "from"), amount(payload, "to")) {
                (Some(from), Some(to)) => {
                    format!("You changed the total budget from {} to {}.", format_eur(from), format_eur(to))
                }
                (None, Some(to)) => format!("You set the total budget to {}.", format_eur(to)),
                _ => "You changed the total budget.".to_string(),
            };
            format!(
                "Context: {}\nInsight: The budget decides which of your wishes remain realistic.\nAction: Shall we check your must-have wishes against the new figure?",
                what
            )
        }
        EventType::RiskIncreased => format!(
            "Context: Your latest change in {} created a new inconsistency.\nInsight: Unresolved conflicts tend to become expensive later in the project.\nAction: Shall we look at the conflict together now?",
            title
        ),
        EventType::Idle => format!(
            "Context: You have been on {} for a while.\nInsight: Open questions are easier to settle with a concrete example.\nAction: Would a short example for this chapter help?",
            title
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auto::contract;
    use crate::domain::EventSource;
    use serde_json::json;

    #[test]
    fn test_every_template_satisfies_contract() {
        let types = [
            EventType::ChapterEntered,
            EventType::ChapterCompleted,
            EventType::RoomAdded,
            EventType::BudgetEdited,
            EventType::RiskIncreased,
            EventType::Idle,
        ];
        for event_type in types {
            for chapter in [None, Some(Chapter::Budget)] {
                let event = ArchitectEvent::new(event_type, EventSource::User, chapter, None);
                let text = fallback_text(&event);
                assert!(contract::check(&text).is_empty(), "{}: {}", event_type, text);
                assert_eq!(contract::formalize(&text), text);
            }
        }
    }

    #[test]
    fn test_budget_template_cites_figures() {
        let event = ArchitectEvent::new(
            EventType::BudgetEdited,
            EventSource::User,
            Some(Chapter::Budget),
            Some(json!({"from": 200000, "to": 250000})),
        );
        let text = fallback_text(&event);
        assert!(text.contains("from €200,000 to €250,000"));
        assert!(contract::check(&text).is_empty());
    }
}
