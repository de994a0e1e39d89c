//! Deterministic checks over generator output

use tracing::debug;

use crate::domain::{OrchestratorResult, TurnPlan, TurnStatus};

/// Replies longer than this are flagged (soft)
const MAX_REPLY_CHARS: usize = 1200;

/// More question marks than this are flagged (soft)
const MAX_QUESTIONS: usize = 2;

/// Wording that claims the plan is fine; forbidden while a blocking conflict is open
const REASSURANCE: &[&str] = &[
    "no conflict",
    "no issues",
    "no problems",
    "no problem",
    "everything looks fine",
    "everything is fine",
    "everything looks good",
    "all good",
    "fits your budget",
    "well within budget",
    "nothing to worry",
    "keine konflikte",
    "alles in ordnung",
    "kein problem",
];

/// A validation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Output did not parse into the turn record
    Schema,
    EmptyReply,
    /// Patches present although the plan forbids them
    DisallowedPatches,
    /// Reply contradicts an open blocking conflict
    ContradictsBlocking,
    TooLong,
    TooManyQuestions,
}

impl Rule {
    /// Hard failures force a retry; soft ones are only logged
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            Self::Schema | Self::EmptyReply | Self::DisallowedPatches | Self::ContradictsBlocking
        )
    }

    /// Extra line for the corrective instruction
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Schema => Some("Return one JSON object with a string \"reply\" and an array \"patches\"."),
            Self::EmptyReply => Some("The \"reply\" must not be empty."),
            Self::DisallowedPatches => Some("\"patches\" must be an empty array."),
            Self::ContradictsBlocking => {
                Some("Do not say the project is free of problems; address the blocking conflict.")
            }
            Self::TooLong | Self::TooManyQuestions => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub rule: Rule,
    pub detail: String,
}

/// Outcome of validating one result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub violations: Vec<Violation>,
}

impl Validation {
    /// No hard violations
    pub fn is_acceptable(&self) -> bool {
        !self.violations.iter().any(|v| v.rule.is_hard())
    }

    pub fn hard(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.rule.is_hard())
    }

    pub fn soft(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| !v.rule.is_hard())
    }

    pub fn has(&self, rule: Rule) -> bool {
        self.violations.iter().any(|v| v.rule == rule)
    }
}

/// Hard/soft rule checks
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseValidator;

impl ResponseValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, result: &OrchestratorResult, plan: &TurnPlan) -> Validation {
        debug!(status = ?result.status, goal = %plan.goal, "ResponseValidator::validate: called");
        let mut violations = Vec::new();
        let mut flag = |rule: Rule, detail: String| violations.push(Violation { rule, detail });

        if result.status == TurnStatus::ParseError {
            flag(Rule::Schema, result.parse_error.clone().unwrap_or_default());
        }

        let reply = result.draft_response.trim();
        if result.status == TurnStatus::Success && reply.is_empty() {
            flag(Rule::EmptyReply, "reply is blank".to_string());
        }

        if !plan.allow_patches && !result.patches.is_empty() {
            flag(Rule::DisallowedPatches, format!("{} patch(es) on a guarded plan", result.patches.len()));
        }

        if plan.has_blocking_conflict() {
            let lower = reply.to_lowercase();
            if let Some(phrase) = REASSURANCE.iter().find(|p| lower.contains(*p)) {
                flag(Rule::ContradictsBlocking, format!("reply says \"{}\"", phrase));
            }
        }

        let length = reply.chars().count();
        if length > MAX_REPLY_CHARS {
            flag(Rule::TooLong, format!("{} characters", length));
        }

        let questions = reply.matches('?').count();
        if questions > MAX_QUESTIONS {
            flag(Rule::TooManyQuestions, format!("{} question marks", questions));
        }

        Validation { violations }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Chapter, ConflictKind, Goal, PatchEvent, Route, Severity, SystemConflict};
    use serde_json::json;

    fn result(reply: &str) -> OrchestratorResult {
        OrchestratorResult {
            status: TurnStatus::Success,
            draft_response: reply.to_string(),
            patches: vec![],
            confidence: 0.65,
            tokens_used: 10,
            parse_error: None,
            degraded: false,
            attempts: 1,
            used_trigger_ids: vec![],
            used_example_ids: vec![],
            used_nugget_ids: vec![],
        }
    }

    fn plan(blocking: bool) -> TurnPlan {
        let mut conflicts = vec![];
        if blocking {
            conflicts.push(SystemConflict {
                id: "conflict-physical_constraint".to_string(),
                kind: ConflictKind::PhysicalConstraint,
                severity: Severity::Blocking,
                description: "Rooms exceed the buildable area.".to_string(),
                affected_fields: vec![],
                affected_chapters: vec![Chapter::Rooms],
                suggested_resolution: "Reduce by 12.5 m².".to_string(),
            });
        }
        TurnPlan {
            goal: if blocking { Goal::SurfaceRisks } else { Goal::Clarify },
            priority: if blocking { 1 } else { 7 },
            route: if blocking { Route::GuardRequired } else { Route::Normal },
            allow_patches: !blocking,
            reasoning: String::new(),
            system_conflicts: conflicts,
            anticipation_guidance: None,
        }
    }

    #[test]
    fn test_clean_reply_passes() {
        let validation = ResponseValidator::new().validate(&result("What is your budget?"), &plan(false));
        assert!(validation.is_acceptable());
        assert!(validation.violations.is_empty());
    }

    #[test]
    fn test_hard_violations() {
        let validator = ResponseValidator::new();

        let mut parse_failed = result("fallback");
        parse_failed.status = TurnStatus::ParseError;
        assert!(validator.validate(&parse_failed, &plan(false)).has(Rule::Schema));

        assert!(validator.validate(&result("  "), &plan(false)).has(Rule::EmptyReply));

        let reassuring = validator.validate(&result("Everything looks fine, no problems!"), &plan(true));
        assert!(reassuring.has(Rule::ContradictsBlocking));
        assert!(!reassuring.is_acceptable());

        let mut patched = result("Noted.");
        patched.patches = vec![
            PatchEvent::from_value(&json!({"chapter": "budget", "delta": {"operation": "set", "path": "totalBudget", "value": 1}}))
                .unwrap(),
        ];
        assert!(validator.validate(&patched, &plan(true)).has(Rule::DisallowedPatches));
    }

    #[test]
    fn test_soft_violations_pass_through() {
        let validation = ResponseValidator::new().validate(&result("A? B? C?"), &plan(false));
        assert!(validation.has(Rule::TooManyQuestions));
        assert!(validation.is_acceptable());
        assert_eq!(validation.soft().count(), 1);

        let long = "x".repeat(MAX_REPLY_CHARS + 1);
        assert!(ResponseValidator::new().validate(&result(&long), &plan(false)).has(Rule::TooLong));
    }
}
