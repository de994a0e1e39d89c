//! Buildwise - turn orchestration for a guided renovation questionnaire
//!
//! Decides, for every assistant turn, what the assistant should try to
//! achieve, assembles a token-bounded context for the model, validates what
//! comes back and decides whether the system may speak on its own.
//!
//! # Core Concepts
//!
//! - **Deterministic Planning**: Conflicts and anticipation outrank the user's message
//! - **Bounded Context**: Every model call stays strictly under a token ceiling
//! - **Guarded Output**: Replies are validated, retried once, then degraded
//! - **Loop Safety**: Changes the assistant or system made never trigger turns
//!
//! # Modules
//!
//! - [`domain`] - Project record, events, plans and results
//! - [`analysis`] - Conflict detector, anticipation advisor, profiler, planner
//! - [`context`] - Context budgeter and knowledge collaborator
//! - [`generate`] - Response generator, validator and retry coordinator
//! - [`watch`] - Change watcher, trigger queue and domain event detector
//! - [`auto`] - Event router and the auto-turn output contract
//! - [`orchestrator`] - Per-project sessions and the turn engine
//! - [`frames`] - Transport frames and the broadcast bus
//! - [`llm`] - LLM client trait and Anthropic implementation
//! - [`prompts`] - Prompt templates
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod analysis;
pub mod auto;
pub mod cli;
pub mod config;
pub mod context;
pub mod domain;
pub mod frames;
pub mod generate;
pub mod llm;
pub mod orchestrator;
pub mod prompts;
pub mod watch;

// Re-export commonly used types
pub use analysis::{TurnAnalysis, TurnAnalyzer};
pub use config::{Config, LlmConfig};
pub use context::{BudgetInput, ContextBudgeter, KnowledgeSource, PrunedContext, StaticKnowledge};
pub use domain::{
    ArchitectEvent, Chapter, ChangeNotice, ConversationTurn, EventType, Goal, OrchestratorResult, Origin, PatchEvent,
    ProjectRecord, SystemConflict, TurnPlan, TurnStatus,
};
pub use frames::{FrameBus, TurnFrame, TurnKind};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use orchestrator::{AutoTurn, Orchestrator, OrchestratorError, TurnOutcome};
pub use prompts::PromptLoader;
pub use watch::{ChangeWatcher, DomainEventDetector, RequiredFields, StaticRequiredFields};
