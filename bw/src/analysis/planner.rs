//! Turn planner: the priority matrix
//!
//! Tiers are evaluated strictly in order and the first match wins:
//!
//! 1. blocking conflict      → surface_risks (guard, no patches)
//! 2. critical anticipation  → anticipate_and_guide
//! 3. warning conflict       → surface_risks (guard, patches allowed)
//! 4. high/medium anticipation → anticipate_and_guide
//! 5. message classification → fill_data | offer_alternatives | clarify

use tracing::debug;

use super::lexicon::{self, EXPLORATORY};
use crate::domain::{
    AnticipationGuidance, BehaviorProfile, ConfidenceLevel, Goal, Priority, Route, Severity, SpeedPreference,
    SystemConflict, TurnPlan,
};

/// Everything the matrix looks at
#[derive(Debug, Clone, Copy)]
pub struct PlanInput<'a> {
    pub conflicts: &'a [SystemConflict],
    pub anticipation: Option<&'a AnticipationGuidance>,
    pub profile: &'a BehaviorProfile,
    pub raw_message: &'a str,
}

/// Deterministic priority matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnPlanner;

impl TurnPlanner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, input: PlanInput<'_>) -> TurnPlan {
        debug!(
            conflicts = input.conflicts.len(),
            anticipation = ?input.anticipation.map(|a| a.priority),
            "TurnPlanner::plan: called"
        );
        let plan = self.evaluate(input);
        debug!(goal = %plan.goal, priority = plan.priority, route = ?plan.route, "TurnPlanner::plan: decided");
        plan
    }

    fn evaluate(&self, input: PlanInput<'_>) -> TurnPlan {
        let has_severity = |severity: Severity| input.conflicts.iter().any(|c| c.severity == severity);

        if has_severity(Severity::Blocking) {
            return TurnPlan {
                goal: Goal::SurfaceRisks,
                priority: 1,
                route: Route::GuardRequired,
                allow_patches: false,
                reasoning: format!(
                    "{} blocking conflict(s) must be resolved before collecting more data",
                    input.conflicts.iter().filter(|c| c.is_blocking()).count()
                ),
                system_conflicts: input.conflicts.to_vec(),
                anticipation_guidance: None,
            };
        }

        if let Some(guidance) = input.anticipation.filter(|g| g.priority == Priority::Critical) {
            return guide(2, guidance, "critical anticipation");
        }

        if has_severity(Severity::Warning) {
            return TurnPlan {
                goal: Goal::SurfaceRisks,
                priority: 3,
                route: Route::GuardRequired,
                allow_patches: true,
                reasoning: "warning-level conflicts should be raised".to_string(),
                system_conflicts: input.conflicts.to_vec(),
                anticipation_guidance: None,
            };
        }

        if let Some(guidance) = input
            .anticipation
            .filter(|g| matches!(g.priority, Priority::High | Priority::Medium))
        {
            return guide(4, guidance, "open anticipation question");
        }

        self.classify(input.raw_message, input.profile)
    }

    fn classify(&self, raw_message: &str, profile: &BehaviorProfile) -> TurnPlan {
        let lower = raw_message.to_lowercase();
        let receptive = profile.signals.engaged || profile.confidence_level >= ConfidenceLevel::Medium;

        let (goal, priority, reasoning) = if lexicon::has_data_pattern(raw_message) && receptive {
            (Goal::FillData, 5, "message carries concrete data")
        } else if lexicon::count_hits(&lower, &EXPLORATORY) > 0 || profile.speed_preference == SpeedPreference::Thorough {
            (Goal::OfferAlternatives, 6, "user is exploring options")
        } else {
            (Goal::Clarify, 7, "no concrete data or exploration detected")
        };

        TurnPlan {
            goal,
            priority,
            route: Route::Normal,
            allow_patches: true,
            reasoning: reasoning.to_string(),
            system_conflicts: Vec::new(),
            anticipation_guidance: None,
        }
    }
}

fn guide(priority: u8, guidance: &AnticipationGuidance, why: &str) -> TurnPlan {
    TurnPlan {
        goal: Goal::AnticipateAndGuide,
        priority,
        route: Route::Normal,
        allow_patches: true,
        reasoning: format!("{}: {}", why, guidance.id),
        system_conflicts: Vec::new(),
        anticipation_guidance: Some(guidance.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BehaviorSignals, Chapter, ConflictKind};

    fn conflict(severity: Severity) -> SystemConflict {
        SystemConflict {
            id: "c".to_string(),
            kind: ConflictKind::BudgetRisk,
            severity,
            description: "d".to_string(),
            affected_fields: vec![],
            affected_chapters: vec![Chapter::Budget],
            suggested_resolution: "r".to_string(),
        }
    }

    fn guidance(priority: Priority) -> AnticipationGuidance {
        AnticipationGuidance {
            id: "g".to_string(),
            priority,
            chapter: Chapter::Risks,
            question: "q?".to_string(),
            reasoning: "r".to_string(),
            related_fields: vec![],
        }
    }

    fn plan(conflicts: &[SystemConflict], anticipation: Option<&AnticipationGuidance>, message: &str) -> TurnPlan {
        TurnPlanner::new().plan(PlanInput {
            conflicts,
            anticipation,
            profile: &BehaviorProfile::default(),
            raw_message: message,
        })
    }

    #[test]
    fn test_blocking_beats_critical_anticipation() {
        let critical = guidance(Priority::Critical);
        let plan = plan(&[conflict(Severity::Blocking)], Some(&critical), "hi");
        assert_eq!(plan.goal, Goal::SurfaceRisks);
        assert_eq!(plan.route, Route::GuardRequired);
        assert!(!plan.allow_patches);
        assert_eq!(plan.priority, 1);
    }

    #[test]
    fn test_critical_anticipation_beats_warning() {
        let critical = guidance(Priority::Critical);
        let plan = plan(&[conflict(Severity::Warning)], Some(&critical), "hi");
        assert_eq!(plan.goal, Goal::AnticipateAndGuide);
        assert_eq!(plan.anticipation_guidance.unwrap().id, "g");
    }

    #[test]
    fn test_warning_allows_patches() {
        let high = guidance(Priority::High);
        let plan = plan(&[conflict(Severity::Warning), conflict(Severity::Info)], Some(&high), "hi");
        assert_eq!(plan.goal, Goal::SurfaceRisks);
        assert!(plan.allow_patches);
        assert_eq!(plan.system_conflicts.len(), 2);
    }

    #[test]
    fn test_high_anticipation() {
        let high = guidance(Priority::Medium);
        let plan = plan(&[conflict(Severity::Info)], Some(&high), "hi");
        assert_eq!(plan.goal, Goal::AnticipateAndGuide);
        assert_eq!(plan.priority, 4);
    }

    #[test]
    fn test_classification() {
        assert_eq!(plan(&[], None, "Our budget is 250.000 €").goal, Goal::FillData);
        assert_eq!(plan(&[], None, "Can you compare both options?").goal, Goal::OfferAlternatives);
        assert_eq!(plan(&[], None, "hmm").goal, Goal::Clarify);
    }

    #[test]
    fn test_data_needs_receptive_profile() {
        let unsure = BehaviorProfile {
            confidence_level: ConfidenceLevel::Low,
            signals: BehaviorSignals::default(),
            ..Default::default()
        };
        let plan = TurnPlanner::new().plan(PlanInput {
            conflicts: &[],
            anticipation: None,
            profile: &unsure,
            raw_message: "maybe 3 rooms",
        });
        assert_eq!(plan.goal, Goal::Clarify);
    }

    #[test]
    fn test_thorough_profile_offers_alternatives() {
        let thorough = BehaviorProfile {
            speed_preference: SpeedPreference::Thorough,
            ..Default::default()
        };
        let plan = TurnPlanner::new().plan(PlanInput {
            conflicts: &[],
            anticipation: None,
            profile: &thorough,
            raw_message: "tell me more",
        });
        assert_eq!(plan.goal, Goal::OfferAlternatives);
    }
}
