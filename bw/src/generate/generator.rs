//! Response generator
//!
//! Renders the prompt for a plan and a budgeted context, calls the model once
//! and turns its reply into an `OrchestratorResult`. Failures never escape as
//! errors: a broken reply becomes `parse_error` with a canned fallback, a
//! failed call becomes `llm_error` with a fixed apology.

use std::sync::Arc;

use eyre::Result;
use tracing::{debug, error, info, warn};

use super::parse::{ParsedOutput, parse_output};
use crate::config::{Config, ConfidenceConfig};
use crate::context::PrunedContext;
use crate::domain::{
    ArchitectEvent, BehaviorProfile, Goal, OrchestratorResult, PatchEvent, TurnPlan, TurnStatus,
};
use crate::frames::TurnKind;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::{
    ChapterSection, ConflictLine, FragmentLine, GuidanceLine, HistoryLine, PromptContext, PromptLoader,
};

/// Shown when the model call itself failed
pub const LLM_ERROR_REPLY: &str =
    "Sorry, I could not process that just now. Your answers are saved; please try again in a moment.";

/// Sent as the user message of a system-initiated turn
const AUTO_TURN_MESSAGE: &str = "(no message: the assistant speaks up on its own)";

const TONE_RULES: &[&str] = &[
    "Use plain language; explain technical terms unless the user uses them first.",
    "Keep the reply under 150 words.",
    "Ask at most one question.",
    "Never describe the project as free of problems while a blocking conflict is open.",
];

/// Canned reply for a goal when the model output is unusable
pub fn fallback_reply(goal: Goal) -> &'static str {
    match goal {
        Goal::SurfaceRisks => {
            "Some of your answers do not fit together yet. Please review the flagged points before we continue."
        }
        Goal::AnticipateAndGuide => {
            "There is an important point we should settle next. Shall we look at it together?"
        }
        Goal::FillData => "Thanks, I noted that. Could you confirm the values in the questionnaire?",
        Goal::OfferAlternatives => "There are several ways to approach this. Which option matters most to you?",
        Goal::Clarify => "Could you tell me a bit more about what you have in mind?",
    }
}

fn goal_instruction(goal: Goal) -> &'static str {
    match goal {
        Goal::SurfaceRisks => {
            "Explain the detected conflicts in order of severity, cite the figures given, and propose the \
             suggested resolution. Do not move on to new questions until the conflict is addressed."
        }
        Goal::AnticipateAndGuide => {
            "Raise the guidance question below and briefly say why it matters now. Do not ask anything else."
        }
        Goal::FillData => {
            "The user stated concrete values. Acknowledge them and propose patches for exactly those values."
        }
        Goal::OfferAlternatives => {
            "Compare two or three realistic options with their trade-offs and ask which direction the user prefers."
        }
        Goal::Clarify => "Ask one short question that helps the user say what they need.",
    }
}

/// Everything one generator call needs
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub plan: &'a TurnPlan,
    pub profile: &'a BehaviorProfile,
    pub context: &'a PrunedContext,
    pub kind: TurnKind,
    /// Trigger of a system-initiated turn
    pub event: Option<&'a ArchitectEvent>,
    /// Appended to the prompt on retries
    pub corrective: Option<&'a str>,
}

/// Prompt assembly, model call and output validation
#[derive(Clone)]
pub struct ResponseGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    confidence: ConfidenceConfig,
    max_tokens: u32,
    chars_per_token: usize,
}

impl ResponseGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, config: &Config) -> Self {
        debug!(model = %config.llm.model, "ResponseGenerator::new: called");
        Self {
            llm,
            prompts,
            confidence: config.confidence.clone(),
            max_tokens: config.llm.max_tokens,
            chars_per_token: config.context.chars_per_token.max(1),
        }
    }

    /// Confidence assigned to a successful reply for this plan
    pub fn goal_confidence(&self, plan: &TurnPlan, has_patches: bool) -> f64 {
        let c = &self.confidence;
        match plan.goal {
            Goal::SurfaceRisks if plan.has_blocking_conflict() => c.blocking,
            Goal::SurfaceRisks => c.warning,
            Goal::AnticipateAndGuide => c.anticipation,
            Goal::FillData if has_patches => c.fill_data,
            Goal::FillData => c.fill_data_without_patches,
            Goal::OfferAlternatives => c.alternatives,
            Goal::Clarify => c.clarify,
        }
    }

    /// Render the system prompt for a request
    pub fn build_prompt(&self, request: GenerationRequest<'_>) -> Result<String> {
        debug!(goal = %request.plan.goal, kind = ?request.kind, "ResponseGenerator::build_prompt: called");
        let ctx = request.context;
        let prompt_ctx = PromptContext {
            tone_rules: TONE_RULES.iter().map(|r| r.to_string()).collect(),
            behavior_directive: request.profile.directive(),
            goal: request.plan.goal.to_string(),
            goal_instruction: goal_instruction(request.plan.goal).to_string(),
            conflicts: ctx
                .conflicts
                .iter()
                .map(|c| ConflictLine {
                    severity: c.severity.to_string(),
                    description: c.description.clone(),
                    resolution: c.suggested_resolution.clone(),
                })
                .collect(),
            guidance: ctx
                .guidance
                .iter()
                .map(|g| GuidanceLine {
                    question: g.question.clone(),
                    reasoning: g.reasoning.clone(),
                })
                .collect(),
            focused_chapter: ctx.focused_chapter.map(|c| c.key().to_string()),
            focused_field: ctx.focused_field.clone(),
            chapters: ctx
                .pruned_chapter_answers
                .iter()
                .map(|(chapter, answers)| ChapterSection {
                    key: chapter.key().to_string(),
                    answers: serde_json::to_string_pretty(answers).unwrap_or_default(),
                })
                .collect(),
            knowledge: ctx
                .fragments
                .iter()
                .map(|f| FragmentLine {
                    id: f.id.clone(),
                    content: f.content.clone(),
                })
                .collect(),
            examples: ctx
                .examples
                .iter()
                .map(|e| FragmentLine {
                    id: e.id.clone(),
                    content: e.content.clone(),
                })
                .collect(),
            history: ctx
                .pruned_history
                .iter()
                .map(|t| HistoryLine {
                    role: if t.is_user() { "User" } else { "Assistant" }.to_string(),
                    content: t.content.clone(),
                })
                .collect(),
            allow_patches: request.plan.allow_patches,
            corrective: request.corrective.map(str::to_string),
            event_type: request.event.map(|e| e.event_type.to_string()),
            event_chapter: request.event.and_then(|e| e.chapter).map(|c| c.key().to_string()),
        };

        let template = match request.kind {
            TurnKind::Chat => "turn",
            TurnKind::Auto => "auto_turn",
        };
        self.prompts.render(template, &prompt_ctx)
    }

    /// One model call; never fails
    pub async fn generate(&self, request: GenerationRequest<'_>) -> OrchestratorResult {
        debug!(
            goal = %request.plan.goal,
            kind = ?request.kind,
            corrective = request.corrective.is_some(),
            "ResponseGenerator::generate: called"
        );
        let system_prompt = match self.build_prompt(request) {
            Ok(prompt) => prompt,
            Err(e) => {
                error!(goal = %request.plan.goal, error = %e, "ResponseGenerator: prompt rendering failed");
                return Self::llm_error(0);
            }
        };

        let user_message = match request.kind {
            TurnKind::Chat => request.context.query.clone(),
            TurnKind::Auto => AUTO_TURN_MESSAGE.to_string(),
        };
        let completion = CompletionRequest {
            system_prompt,
            messages: vec![Message::user(user_message)],
            max_tokens: self.max_tokens,
        };
        let prompt_chars = completion.char_len();

        let response = match self.llm.complete(completion).await {
            Ok(response) => response,
            Err(e) => {
                error!(goal = %request.plan.goal, kind = e.kind(), error = %e, "ResponseGenerator: model call failed");
                return Self::llm_error(0);
            }
        };

        let raw = response.content.unwrap_or_default();
        let tokens_used = match response.usage.total() {
            0 => ((prompt_chars + raw.len()) / self.chars_per_token) as u64,
            reported => reported,
        };

        match parse_output(&raw) {
            Ok(parsed) => self.accept(request.plan, parsed, tokens_used),
            Err(e) => {
                warn!(
                    goal = %request.plan.goal,
                    error = %e,
                    output = %truncate(&raw, 200),
                    "ResponseGenerator: unparseable model output"
                );
                OrchestratorResult {
                    status: TurnStatus::ParseError,
                    draft_response: fallback_reply(request.plan.goal).to_string(),
                    patches: Vec::new(),
                    confidence: self.confidence.unknown,
                    tokens_used,
                    parse_error: Some(e.to_string()),
                    degraded: false,
                    attempts: 1,
                    used_trigger_ids: Vec::new(),
                    used_example_ids: Vec::new(),
                    used_nugget_ids: Vec::new(),
                }
            }
        }
    }

    /// Validate patches and assign confidence for a parsed reply
    fn accept(&self, plan: &TurnPlan, parsed: ParsedOutput, tokens_used: u64) -> OrchestratorResult {
        let mut patches: Vec<PatchEvent> = parsed
            .patches
            .iter()
            .filter_map(|raw| match PatchEvent::from_value(raw) {
                Ok(patch) => Some(patch),
                Err(e) => {
                    warn!(error = %e, patch = %raw, "ResponseGenerator: dropping invalid patch");
                    None
                }
            })
            .collect();

        if !plan.allow_patches && !patches.is_empty() {
            info!(
                goal = %plan.goal,
                count = patches.len(),
                "ResponseGenerator: stripping patches, plan does not allow them"
            );
            patches.clear();
        }

        let confidence = self.goal_confidence(plan, !patches.is_empty());
        let requires_confirmation = confidence <= self.confidence.auto_apply_threshold;
        for patch in &mut patches {
            patch.requires_confirmation = requires_confirmation;
        }

        OrchestratorResult {
            status: TurnStatus::Success,
            draft_response: parsed.reply.trim().to_string(),
            patches,
            confidence,
            tokens_used,
            parse_error: None,
            degraded: false,
            attempts: 1,
            used_trigger_ids: parsed.used_trigger_ids,
            used_example_ids: parsed.used_example_ids,
            used_nugget_ids: parsed.used_nugget_ids,
        }
    }

    fn llm_error(tokens_used: u64) -> OrchestratorResult {
        OrchestratorResult {
            status: TurnStatus::LlmError,
            draft_response: LLM_ERROR_REPLY.to_string(),
            patches: Vec::new(),
            confidence: 0.0,
            tokens_used,
            parse_error: None,
            degraded: false,
            attempts: 1,
            used_trigger_ids: Vec::new(),
            used_example_ids: Vec::new(),
            used_nugget_ids: Vec::new(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}
