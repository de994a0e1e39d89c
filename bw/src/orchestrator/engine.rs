//! Turn orchestration engine
//!
//! Chat turns and system-initiated turns share one pipeline:
//!
//! ```text
//! conflicts + anticipation + profile → plan → budget → generate/validate/retry → frames
//! ```
//!
//! Every stage before the model call is a synchronous pure computation over
//! an immutable snapshot. Per-project queues and gates live in the
//! registry, which is never locked across a model call.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{Mutex, Notify, broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::registry::ProjectRegistry;
use crate::analysis::{TurnAnalysis, TurnAnalyzer};
use crate::auto::{contract, fallback_text};
use crate::config::Config;
use crate::context::{BudgetInput, ContextBudgeter, KnowledgeSource, NoKnowledge};
use crate::domain::{
    ArchitectEvent, Chapter, ConversationTurn, OrchestratorResult, Origin, ProjectRecord, TurnPlan, TurnStatus,
};
use crate::frames::{FrameBus, TurnFrame, TurnKind};
use crate::generate::{CORRECTIVE_INSTRUCTION, GenerationRequest, ResponseGenerator, RetryCoordinator};
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;
use crate::watch::{ChangeWatcher, DomainEventDetector, RequiredFields, StaticRequiredFields};

/// Full-pipeline attempts for an auto-turn before the template is used
const AUTO_TURN_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrchestratorError {
    #[error("A chat turn is already in flight for project {0}")]
    Busy(String),

    #[error("Auto-turn refused for project {0}: a turn is in flight or the user has not answered yet")]
    GatesClosed(String),
}

/// A finished chat turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub plan: TurnPlan,
    pub result: OrchestratorResult,
    pub navigate_to: Option<Chapter>,
}

/// Current time on the runtime clock (honours paused test time)
fn clock() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// An auto-turn owed to a project, with the inputs captured at dequeue time
#[derive(Debug, Clone)]
struct DueTurn {
    project_id: String,
    event: ArchitectEvent,
    record: ProjectRecord,
    history: Vec<ConversationTurn>,
    focused_field: Option<String>,
}

/// A delivered system-initiated turn
#[derive(Debug, Clone)]
pub struct AutoTurn {
    pub project_id: String,
    pub event: ArchitectEvent,
    pub plan: TurnPlan,
    pub result: OrchestratorResult,
}

pub struct Orchestrator {
    watcher: ChangeWatcher,
    detector: DomainEventDetector,
    analyzer: TurnAnalyzer,
    budgeter: ContextBudgeter,
    coordinator: RetryCoordinator,
    bus: FrameBus,
    registry: Mutex<ProjectRegistry>,
    notify: Notify,
}

impl Orchestrator {
    /// Engine with in-memory collaborator defaults and embedded prompts
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        Self::with_collaborators(
            config,
            llm,
            Arc::new(NoKnowledge),
            Arc::new(StaticRequiredFields::default()),
            PromptLoader::embedded_only(),
        )
    }

    pub fn with_collaborators(
        config: Config,
        llm: Arc<dyn LlmClient>,
        knowledge: Arc<dyn KnowledgeSource>,
        required: Arc<dyn RequiredFields>,
        prompts: PromptLoader,
    ) -> Self {
        debug!(model = %config.llm.model, "Orchestrator::new: called");
        let generator = ResponseGenerator::new(llm, Arc::new(prompts), &config);
        Self {
            watcher: ChangeWatcher::new(&config.detection),
            detector: DomainEventDetector::new(&config.detection, required),
            analyzer: TurnAnalyzer::new(&config.detection),
            budgeter: ContextBudgeter::new(&config.context, knowledge),
            coordinator: RetryCoordinator::new(generator, config.retry.max_retries),
            bus: FrameBus::with_default_capacity(),
            registry: Mutex::new(ProjectRegistry::new(config)),
            notify: Notify::new(),
        }
    }

    /// Subscribe to frames of every project
    pub fn subscribe(&self) -> broadcast::Receiver<TurnFrame> {
        self.bus.subscribe()
    }

    /// Register a project with its current snapshot as baseline
    pub async fn open(&self, project_id: &str, record: &ProjectRecord) {
        self.open_at(project_id, record, clock()).await;
    }

    pub async fn open_at(&self, project_id: &str, record: &ProjectRecord, now: Instant) {
        self.registry.lock().await.get_or_create(project_id, record, now);
        self.notify.notify_one();
    }

    /// Tear down a project's queues and timers
    pub async fn close(&self, project_id: &str) -> bool {
        self.registry.lock().await.close(project_id)
    }

    pub async fn session_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn is_awaiting_user_input(&self, project_id: &str) -> bool {
        self.registry
            .lock()
            .await
            .get(project_id)
            .is_some_and(|s| s.is_awaiting_user_input())
    }

    /// Feed a new snapshot from the state owner
    ///
    /// Returns the number of change notices queued; always zero for
    /// assistant or system origins.
    pub async fn observe_change(&self, project_id: &str, next: ProjectRecord, origin: Origin) -> usize {
        self.observe_change_at(project_id, next, origin, clock()).await
    }

    pub async fn observe_change_at(&self, project_id: &str, next: ProjectRecord, origin: Origin, now: Instant) -> usize {
        debug!(%project_id, %origin, "Orchestrator::observe_change: called");
        let queued = {
            let mut registry = self.registry.lock().await;
            match registry.get_mut(project_id) {
                Some(session) => session.observe(next, origin, &self.watcher, &self.detector, now),
                None => {
                    registry.get_or_create(project_id, &next, now);
                    0
                }
            }
        };
        self.notify.notify_one();
        queued
    }

    /// Answer a chat message
    pub async fn chat_turn(
        &self,
        project_id: &str,
        record: &ProjectRecord,
        message: &str,
    ) -> Result<TurnOutcome, OrchestratorError> {
        debug!(%project_id, message_len = message.len(), "Orchestrator::chat_turn: called");
        let now = clock();
        let (prior, focused_field) = {
            let mut registry = self.registry.lock().await;
            let session = registry.get_or_create(project_id, record, now);
            let prior = session.history();
            let focused_field = session.focused_field(record.current_chapter).map(str::to_string);
            if !session.begin_chat(message, now) {
                warn!(%project_id, "Orchestrator: chat turn refused, another one is in flight");
                return Err(OrchestratorError::Busy(project_id.to_string()));
            }
            (prior, focused_field)
        };

        let mut profiled = prior.clone();
        profiled.push(ConversationTurn::user(message));
        let TurnAnalysis { plan, profile, .. } =
            self.analyzer.analyze(record, record.current_chapter, &profiled, message);

        let context = self.budgeter.budget(BudgetInput {
            plan: &plan,
            profile: &profile,
            record,
            history: &prior,
            query: message,
            focused_chapter: record.current_chapter,
            focused_field: focused_field.as_deref(),
        });
        let result = self
            .coordinator
            .run(GenerationRequest {
                plan: &plan,
                profile: &profile,
                context: &context,
                kind: TurnKind::Chat,
                event: None,
                corrective: None,
            })
            .await;

        let navigate_to = navigation(&plan, record);
        self.bus
            .emitter_for(project_id)
            .turn(TurnKind::Chat, plan.goal, None, navigate_to, &result);

        if let Some(session) = self.registry.lock().await.get_mut(project_id) {
            session.end_chat(&result.draft_response);
        }
        self.notify.notify_one();
        info!(
            %project_id,
            goal = %plan.goal,
            status = ?result.status,
            attempts = result.attempts,
            tokens = result.tokens_used,
            "Orchestrator: chat turn finished"
        );

        Ok(TurnOutcome {
            plan,
            result,
            navigate_to,
        })
    }

    /// Run one system-initiated turn for an explicit event
    pub async fn auto_turn(
        &self,
        project_id: &str,
        record: &ProjectRecord,
        event: ArchitectEvent,
    ) -> Result<AutoTurn, OrchestratorError> {
        debug!(%project_id, event_type = %event.event_type, "Orchestrator::auto_turn: called");
        let due = {
            let mut registry = self.registry.lock().await;
            let session = registry.get_or_create(project_id, record, clock());
            if session.is_chat_in_flight() {
                return Err(OrchestratorError::Busy(project_id.to_string()));
            }
            if !session.begin_auto() {
                return Err(OrchestratorError::GatesClosed(project_id.to_string()));
            }
            DueTurn {
                project_id: project_id.to_string(),
                focused_field: session
                    .focused_field(event.chapter.or(record.current_chapter))
                    .map(str::to_string),
                event,
                record: record.clone(),
                history: session.history(),
            }
        };
        Ok(self.deliver_auto(due, clock()).await)
    }

    /// Advance every session's timers and deliver the auto-turns now due
    ///
    /// Projects are delivered concurrently; a slow model call for one
    /// project does not hold back another.
    pub async fn tick(&self, now: Instant) -> Vec<AutoTurn> {
        let due = self.take_due(now).await;
        join_all(due.into_iter().map(|due| self.deliver_auto(due, now))).await
    }

    /// Advance timers and open the auto-turn gate of every project with an event due
    async fn take_due(&self, now: Instant) -> Vec<DueTurn> {
        let mut registry = self.registry.lock().await;
        let mut due = Vec::new();
        for session in registry.sessions_mut() {
            let Some(event) = session.tick(now) else {
                continue;
            };
            if !session.begin_auto() {
                warn!(project_id = %session.project_id(), event_type = %event.event_type, "Orchestrator: gates closed, dropping due event");
                continue;
            }
            let focused_field = session
                .focused_field(event.chapter.or(session.snapshot().current_chapter))
                .map(str::to_string);
            due.push(DueTurn {
                project_id: session.project_id().to_string(),
                event,
                record: session.snapshot().clone(),
                history: session.history(),
                focused_field,
            });
        }
        due
    }

    /// Earliest timer deadline across all projects
    pub async fn next_deadline(&self) -> Option<Instant> {
        self.registry.lock().await.next_deadline()
    }

    /// Drive timers until shutdown
    ///
    /// Sleeps until the earliest deadline; new input wakes the loop early so
    /// fresh deadlines are picked up. Each due auto-turn runs as its own task.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Orchestrator driver starting");
        let mut deliveries: JoinSet<AutoTurn> = JoinSet::new();
        loop {
            let deadline = self.next_deadline().await;
            let sleep = async {
                match deadline {
                    Some(d) => tokio::time::sleep_until(tokio::time::Instant::from_std(d)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = sleep => {
                    let now = clock();
                    for due in self.take_due(now).await {
                        let engine = Arc::clone(&self);
                        deliveries.spawn(async move { engine.deliver_auto(due, now).await });
                    }
                }
                Some(joined) = deliveries.join_next(), if !deliveries.is_empty() => {
                    match joined {
                        Ok(turn) => debug!(project_id = %turn.project_id, "Orchestrator::run: auto-turn finished"),
                        Err(e) => warn!(error = %e, "Orchestrator::run: auto-turn task failed"),
                    }
                }
                _ = self.notify.notified() => {
                    debug!("Orchestrator::run: woken by new input");
                }
                _ = shutdown_rx.recv() => {
                    info!(in_flight = deliveries.len(), "Orchestrator driver shutting down");
                    break;
                }
            }
        }
        while deliveries.join_next().await.is_some() {}
    }

    /// Run one auto-turn; `started` is when it left the queue
    async fn deliver_auto(&self, due: DueTurn, started: Instant) -> AutoTurn {
        let timer = tokio::time::Instant::now();
        let DueTurn {
            project_id,
            event,
            record,
            history,
            focused_field,
        } = due;
        let (plan, result) = self
            .run_auto(&record, &history, &event, focused_field.as_deref())
            .await;
        let navigate_to = navigation(&plan, &record);
        self.bus.emitter_for(&project_id).turn(
            TurnKind::Auto,
            plan.goal,
            Some(event.event_type.as_str()),
            navigate_to,
            &result,
        );

        // Completion time on the caller's clock restarts the idle period
        let finished = started + timer.elapsed();
        if let Some(session) = self.registry.lock().await.get_mut(&project_id) {
            session.end_auto(&result.draft_response, finished);
        }
        self.notify.notify_one();
        info!(
            %project_id,
            event_type = %event.event_type,
            goal = %plan.goal,
            degraded = result.degraded,
            "Orchestrator: auto-turn delivered"
        );

        AutoTurn {
            project_id,
            event,
            plan,
            result,
        }
    }

    /// Plan, generate and enforce the auto-turn contract
    async fn run_auto(
        &self,
        record: &ProjectRecord,
        history: &[ConversationTurn],
        event: &ArchitectEvent,
        focused_field: Option<&str>,
    ) -> (TurnPlan, OrchestratorResult) {
        let chapter = event.chapter.or(record.current_chapter);
        let mut corrective: Option<String> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let TurnAnalysis { mut plan, profile, .. } = self.analyzer.analyze(record, chapter, history, "");
            plan.allow_patches = false;

            let context = self.budgeter.budget(BudgetInput {
                plan: &plan,
                profile: &profile,
                record,
                history,
                query: "",
                focused_chapter: chapter,
                focused_field,
            });
            let mut result = self
                .coordinator
                .run(GenerationRequest {
                    plan: &plan,
                    profile: &profile,
                    context: &context,
                    kind: TurnKind::Auto,
                    event: Some(event),
                    corrective: corrective.as_deref(),
                })
                .await;

            let violations = match result.status {
                TurnStatus::LlmError => None,
                TurnStatus::ParseError => Some(Vec::new()),
                TurnStatus::Success => match contract::enforce(&result.draft_response) {
                    Ok(text) => {
                        result.draft_response = text;
                        return (plan, result);
                    }
                    Err(violations) => Some(violations),
                },
            };

            match violations {
                Some(violations) if attempt < AUTO_TURN_ATTEMPTS => {
                    warn!(
                        event_type = %event.event_type,
                        attempt,
                        ?violations,
                        output = %result.draft_response,
                        "Orchestrator: auto-turn contract violated, retrying"
                    );
                    corrective = Some(if violations.is_empty() {
                        CORRECTIVE_INSTRUCTION.to_string()
                    } else {
                        contract::corrective(&violations)
                    });
                }
                _ => {
                    warn!(
                        event_type = %event.event_type,
                        status = ?result.status,
                        output = %result.draft_response,
                        "Orchestrator: substituting auto-turn template"
                    );
                    result.draft_response = fallback_text(event);
                    result.patches.clear();
                    result.degraded = true;
                    return (plan, result);
                }
            }
        }
    }
}

/// Suggest another chapter when the plan's guidance points elsewhere
fn navigation(plan: &TurnPlan, record: &ProjectRecord) -> Option<Chapter> {
    plan.anticipation_guidance
        .as_ref()
        .map(|g| g.chapter)
        .filter(|c| Some(*c) != record.current_chapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventSource, EventType, Goal};
    use crate::llm::client::mock::MockLlmClient;
    use serde_json::json;
    use std::time::Duration;

    const AUTO_REPLY: &str =
        r#"{"reply": "Context: You opened the rooms.\nInsight: Room sizes must fit the plot.\nAction: Which room matters most?"}"#;

    fn engine(client: Arc<MockLlmClient>) -> Orchestrator {
        Orchestrator::new(Config::default(), client)
    }

    fn conflicted_record() -> ProjectRecord {
        ProjectRecord::new()
            .with_current_chapter(Chapter::Budget)
            .with_chapter(Chapter::Budget, json!({"totalBudget": 200000}))
            .with_chapter(
                Chapter::Wishes,
                json!({"wishes": [
                    {"title": "Heat pump", "priority": "must", "estimatedCost": 130000},
                    {"title": "New roof", "priority": "must", "estimatedCost": 100000}
                ]}),
            )
    }

    #[tokio::test]
    async fn test_chat_turn_with_blocking_conflict_emits_no_patches() {
        let reply = r#"{"reply": "Your must-have wishes exceed the budget by €30,000.", "patches": [{"chapter": "budget", "delta": {"operation": "set", "path": "totalBudget", "value": 230000}}]}"#;
        let client = Arc::new(MockLlmClient::with_texts(&[reply]));
        let engine = engine(client);
        let mut frames = engine.subscribe();

        let outcome = engine.chat_turn("p1", &conflicted_record(), "Is my plan ok?").await.unwrap();
        assert_eq!(outcome.plan.goal, Goal::SurfaceRisks);
        assert!(outcome.result.patches.is_empty());

        let first = frames.recv().await.unwrap();
        assert_eq!(first.name(), "metadata");
        let mut names = vec![first.name()];
        while let Ok(frame) = frames.try_recv() {
            names.push(frame.name());
        }
        assert_eq!(names, vec!["metadata", "text", "done"]);
    }

    #[tokio::test]
    async fn test_auto_turn_falls_back_after_contract_retry() {
        let client = Arc::new(MockLlmClient::with_texts(&[r#"{"reply": "Nice rooms!"}"#, r#"{"reply": "Still nice."}"#]));
        let engine = engine(client.clone());
        let record = ProjectRecord::new().with_current_chapter(Chapter::Rooms);
        let event = ArchitectEvent::new(EventType::ChapterEntered, EventSource::User, Some(Chapter::Rooms), None);

        let turn = engine.auto_turn("p1", &record, event).await.unwrap();
        assert_eq!(client.call_count(), 2);
        assert!(turn.result.degraded);
        assert!(contract::check(&turn.result.draft_response).is_empty());
        assert!(turn.result.draft_response.starts_with("Context: You have opened the room planning."));
        assert!(engine.is_awaiting_user_input("p1").await);

        // Awaiting input: the next auto-turn is refused
        let again = ArchitectEvent::new(EventType::Idle, EventSource::Timer, Some(Chapter::Rooms), None);
        assert_eq!(
            engine.auto_turn("p1", &record, again).await.unwrap_err(),
            OrchestratorError::GatesClosed("p1".to_string())
        );
    }

    #[tokio::test]
    async fn test_idle_tick_delivers_one_compliant_auto_turn() {
        let client = Arc::new(MockLlmClient::with_texts(&[AUTO_REPLY]));
        let engine = engine(client.clone());
        let t0 = Instant::now();
        engine
            .open_at("p1", &ProjectRecord::new().with_current_chapter(Chapter::Rooms), t0)
            .await;

        assert!(engine.tick(t0 + Duration::from_secs(29)).await.is_empty());
        assert!(engine.tick(t0 + Duration::from_secs(30)).await.is_empty());
        let delivered = engine.tick(t0 + Duration::from_secs(31)).await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event.event_type, EventType::Idle);
        assert!(!delivered[0].result.degraded);
        assert_eq!(delivered[0].result.draft_response.matches('?').count(), 1);

        // One silent period later the gate reopens without a second nudge
        assert!(engine.is_awaiting_user_input("p1").await);
        assert!(engine.tick(t0 + Duration::from_secs(61)).await.is_empty());
        assert!(!engine.is_awaiting_user_input("p1").await);
        assert!(engine.tick(t0 + Duration::from_secs(120)).await.is_empty());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_edited_field_survives_oversized_chapter_in_auto_prompt() {
        let client = Arc::new(MockLlmClient::with_texts(&[AUTO_REPLY, AUTO_REPLY]));
        let engine = engine(client.clone());
        let t0 = Instant::now();
        let log = "x".repeat(40_000);
        let record = ProjectRecord::new()
            .with_current_chapter(Chapter::Budget)
            .with_chapter(Chapter::Budget, json!({"totalBudget": 200000, "log": log}));
        engine.open_at("p1", &record, t0).await;

        let edited = record
            .clone()
            .with_chapter(Chapter::Budget, json!({"totalBudget": 200000, "log": log, "notes": "Keep the old fireplace"}));
        assert_eq!(engine.observe_change_at("p1", edited, Origin::User, t0).await, 1);

        let mut delivered = Vec::new();
        for secs in [1, 2, 30, 31] {
            delivered.extend(engine.tick(t0 + Duration::from_secs(secs)).await);
        }
        assert!(!delivered.is_empty());
        let prompts = client.system_prompts();
        assert!(prompts.iter().any(|p| p.contains("Keep the old fireplace")));
        assert!(prompts.iter().all(|p| !p.contains(&log)));
    }

    #[tokio::test]
    async fn test_assistant_edits_never_trigger_turns() {
        let client = Arc::new(MockLlmClient::with_texts(&[]));
        let engine = engine(client.clone());
        let t0 = Instant::now();
        let record = ProjectRecord::new().with_current_chapter(Chapter::Basics);
        engine.open_at("p1", &record, t0).await;

        let next = record.clone().with_current_chapter(Chapter::Budget).with_chapter(Chapter::Budget, json!({"totalBudget": 1}));
        assert_eq!(engine.observe_change_at("p1", next, Origin::Assistant, t0).await, 0);
        assert!(engine.tick(t0 + Duration::from_secs(5)).await.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_close_removes_session() {
        let engine = engine(Arc::new(MockLlmClient::with_texts(&[])));
        engine.open("p1", &ProjectRecord::new()).await;
        assert_eq!(engine.session_count().await, 1);
        assert!(engine.close("p1").await);
        assert_eq!(engine.session_count().await, 0);
    }
}
