//! Bounded retry around the generator
//!
//! generator → validator → (retry ≤ max) → final. An explicit loop with a
//! counter; the last attempt is returned annotated as degraded when every
//! attempt failed validation.

use tracing::{debug, info, warn};

use super::generator::{GenerationRequest, ResponseGenerator, fallback_reply};
use super::validator::{ResponseValidator, Rule, Validation};
use crate::domain::{OrchestratorResult, TurnPlan, TurnStatus};

/// Base corrective instruction appended on every retry
pub const CORRECTIVE_INSTRUCTION: &str = "Respond using exactly the required structure.";

pub struct RetryCoordinator {
    generator: ResponseGenerator,
    validator: ResponseValidator,
    max_retries: u32,
}

impl RetryCoordinator {
    pub fn new(generator: ResponseGenerator, max_retries: u32) -> Self {
        Self {
            generator,
            validator: ResponseValidator::new(),
            max_retries,
        }
    }

    pub fn generator(&self) -> &ResponseGenerator {
        &self.generator
    }

    /// Generate until the result validates or retries run out
    pub async fn run(&self, request: GenerationRequest<'_>) -> OrchestratorResult {
        debug!(goal = %request.plan.goal, max_retries = self.max_retries, "RetryCoordinator::run: called");
        let mut corrective = request.corrective.map(str::to_string);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let mut result = self
                .generator
                .generate(GenerationRequest {
                    corrective: corrective.as_deref(),
                    ..request
                })
                .await;
            result.attempts = attempt;

            // Model failures are surfaced as-is, never retried here
            if result.status == TurnStatus::LlmError {
                return result;
            }

            let validation = self.validator.validate(&result, request.plan);
            for soft in validation.soft() {
                info!(rule = ?soft.rule, detail = %soft.detail, attempt, "RetryCoordinator: soft violation");
            }
            if validation.is_acceptable() {
                debug!(attempt, "RetryCoordinator::run: accepted");
                return result;
            }

            for hard in validation.hard() {
                warn!(
                    rule = ?hard.rule,
                    detail = %hard.detail,
                    attempt,
                    goal = %request.plan.goal,
                    output = %result.draft_response,
                    "RetryCoordinator: hard violation"
                );
            }

            if attempt > self.max_retries {
                return degrade(result, &validation, request.plan);
            }
            corrective = Some(corrective_for(&validation));
        }
    }
}

fn corrective_for(validation: &Validation) -> String {
    let mut text = CORRECTIVE_INSTRUCTION.to_string();
    for hint in validation.hard().filter_map(|v| v.rule.hint()) {
        text.push(' ');
        text.push_str(hint);
    }
    text
}

/// Last attempt, made safe to show
fn degrade(mut result: OrchestratorResult, validation: &Validation, plan: &TurnPlan) -> OrchestratorResult {
    warn!(goal = %plan.goal, attempts = result.attempts, "RetryCoordinator: retries exhausted, returning degraded result");
    result.degraded = true;
    if validation.has(Rule::DisallowedPatches) {
        result.patches.clear();
    }
    if validation.has(Rule::EmptyReply) || validation.has(Rule::ContradictsBlocking) {
        result.draft_response = fallback_reply(plan.goal).to_string();
    }
    result
}
