//! One pass over every analyzer

use serde::Serialize;
use tracing::debug;

use super::{AnticipationAdvisor, BehaviorProfiler, ConflictDetector, PlanInput, TurnPlanner};
use crate::config::DetectionConfig;
use crate::domain::{
    AnticipationGuidance, BehaviorProfile, Chapter, ConversationTurn, ProjectRecord, SystemConflict, TurnPlan,
};

/// Analyzer outputs and the plan derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnAnalysis {
    pub conflicts: Vec<SystemConflict>,
    pub anticipation: Option<AnticipationGuidance>,
    pub profile: BehaviorProfile,
    pub plan: TurnPlan,
}

/// Conflicts, anticipation, profile, then the planner
#[derive(Debug, Clone, Default)]
pub struct TurnAnalyzer {
    conflicts: ConflictDetector,
    advisor: AnticipationAdvisor,
    profiler: BehaviorProfiler,
    planner: TurnPlanner,
}

impl TurnAnalyzer {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            conflicts: ConflictDetector::new(config),
            ..Self::default()
        }
    }

    /// Analyze a snapshot in the context of `chapter`
    ///
    /// `history` should already contain the message being answered.
    pub fn analyze(
        &self,
        record: &ProjectRecord,
        chapter: Option<Chapter>,
        history: &[ConversationTurn],
        message: &str,
    ) -> TurnAnalysis {
        debug!(?chapter, history = history.len(), "TurnAnalyzer::analyze: called");
        let conflicts = self.conflicts.detect(record);
        let anticipation = self.advisor.evaluate_for(record, chapter);
        let profile = self.profiler.profile(history);
        let plan = self.planner.plan(PlanInput {
            conflicts: &conflicts,
            anticipation: anticipation.as_ref(),
            profile: &profile,
            raw_message: message,
        });
        TurnAnalysis {
            conflicts,
            anticipation,
            profile,
            plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Goal, Severity};
    use serde_json::json;

    #[test]
    fn test_blocking_conflict_drives_plan() {
        let record = ProjectRecord::new()
            .with_chapter(Chapter::Budget, json!({"totalBudget": 200000}))
            .with_chapter(
                Chapter::Wishes,
                json!({"wishes": [{"title": "Roof", "priority": "must", "estimatedCost": 230000}]}),
            );
        let analysis = TurnAnalyzer::default().analyze(&record, Some(Chapter::Budget), &[], "");
        assert_eq!(analysis.conflicts[0].severity, Severity::Blocking);
        assert_eq!(analysis.plan.goal, Goal::SurfaceRisks);
        assert!(!analysis.plan.allow_patches);
    }

    #[test]
    fn test_empty_record_clarifies() {
        let history = [ConversationTurn::user("hello")];
        let analysis = TurnAnalyzer::default().analyze(&ProjectRecord::new(), None, &history, "hello");
        assert!(analysis.conflicts.is_empty());
        assert!(analysis.anticipation.is_none());
        assert_eq!(analysis.plan.goal, Goal::Clarify);
    }
}
