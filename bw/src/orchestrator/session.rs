//! Per-project pipeline state

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{debug, info};

use super::idle::IdleTracker;
use crate::analysis::PROFILE_WINDOW;
use crate::auto::EventRouter;
use crate::config::Config;
use crate::domain::{ArchitectEvent, Chapter, ConversationTurn, EventSource, EventType, Origin, ProjectRecord};
use crate::watch::{ChangeWatcher, DomainEventDetector, TriggerQueue};

/// Isolated queues, timers and gates of one project
///
/// Nothing here is shared across projects.
#[derive(Debug)]
pub struct ProjectSession {
    project_id: String,
    triggers: TriggerQueue,
    router: EventRouter,
    idle: IdleTracker,
    /// Last snapshot seen, the diff baseline
    snapshot: ProjectRecord,
    /// Most recent turns only; nothing downstream reads further back
    history: VecDeque<ConversationTurn>,
    /// Field of the most recently flushed change notice
    last_edit: Option<(Chapter, String)>,
    /// Events detected from user edits, released when the notice debounce flushes
    staged: Vec<ArchitectEvent>,
    chat_in_flight: bool,
    auto_in_flight: bool,
    awaiting_user_input: bool,
}

impl ProjectSession {
    pub fn new(project_id: impl Into<String>, record: ProjectRecord, config: &Config, now: Instant) -> Self {
        let project_id = project_id.into();
        debug!(%project_id, "ProjectSession::new: called");
        let mut idle = IdleTracker::new(config.router.idle_timeout());
        idle.record_activity(now);
        Self {
            project_id,
            triggers: TriggerQueue::new(&config.trigger),
            router: EventRouter::new(&config.router),
            idle,
            snapshot: record,
            history: VecDeque::with_capacity(PROFILE_WINDOW + 1),
            last_edit: None,
            staged: Vec::new(),
            chat_in_flight: false,
            auto_in_flight: false,
            awaiting_user_input: false,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn snapshot(&self) -> &ProjectRecord {
        &self.snapshot
    }

    pub fn history(&self) -> Vec<ConversationTurn> {
        self.history.iter().cloned().collect()
    }

    /// Field the user last edited, when it belongs to `chapter`
    pub fn focused_field(&self, chapter: Option<Chapter>) -> Option<&str> {
        match &self.last_edit {
            Some((edited, path)) if Some(*edited) == chapter => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn is_chat_in_flight(&self) -> bool {
        self.chat_in_flight
    }

    pub fn is_awaiting_user_input(&self) -> bool {
        self.awaiting_user_input
    }

    pub fn pending_auto_turns(&self) -> usize {
        self.router.len()
    }

    /// Whether a system-initiated turn may start
    pub fn gates_open(&self) -> bool {
        !self.chat_in_flight && !self.auto_in_flight && !self.awaiting_user_input
    }

    /// Take in a new snapshot; only user edits enter detection
    ///
    /// Returns the number of change notices queued.
    pub fn observe(
        &mut self,
        next: ProjectRecord,
        origin: Origin,
        watcher: &ChangeWatcher,
        detector: &DomainEventDetector,
        now: Instant,
    ) -> usize {
        debug!(project_id = %self.project_id, %origin, "ProjectSession::observe: called");
        let queued = match origin {
            Origin::User => {
                let notices = watcher.diff(&self.snapshot, &next, origin);
                let events = detector.detect(&self.snapshot, &next, origin);
                if !notices.is_empty() || !events.is_empty() {
                    self.idle.record_activity(now);
                }
                if notices.is_empty() {
                    // Navigation only: nothing to debounce
                    for event in events {
                        self.router.enqueue(event, now);
                    }
                } else {
                    for event in events {
                        self.stage(event);
                    }
                }
                let count = notices.len();
                self.triggers.extend(notices, now);
                count
            }
            Origin::Assistant | Origin::System => 0,
        };
        self.snapshot = next;
        queued
    }

    /// Latest event per (type, chapter) wins
    fn stage(&mut self, event: ArchitectEvent) {
        self.staged
            .retain(|e| !(e.event_type == event.event_type && e.chapter == event.chapter));
        self.staged.push(event);
    }

    fn remember(&mut self, turn: ConversationTurn) {
        self.history.push_back(turn);
        while self.history.len() > PROFILE_WINDOW {
            self.history.pop_front();
        }
    }

    /// Open a chat turn; false when one is already running
    pub fn begin_chat(&mut self, message: &str, now: Instant) -> bool {
        if self.chat_in_flight {
            return false;
        }
        self.chat_in_flight = true;
        self.awaiting_user_input = false;
        self.idle.record_activity(now);
        self.remember(ConversationTurn::user(message));
        true
    }

    pub fn end_chat(&mut self, reply: &str) {
        self.chat_in_flight = false;
        self.remember(ConversationTurn::assistant(reply));
    }

    /// Open an auto-turn; false while any gate is closed
    pub fn begin_auto(&mut self) -> bool {
        if !self.gates_open() {
            return false;
        }
        self.auto_in_flight = true;
        true
    }

    /// A delivered auto-turn waits for the user before the next one
    ///
    /// The idle clock restarts, so one silent period later the gate reopens.
    pub fn end_auto(&mut self, reply: &str, now: Instant) {
        self.auto_in_flight = false;
        self.awaiting_user_input = true;
        self.idle.record_activity(now);
        self.remember(ConversationTurn::assistant(reply));
    }

    /// Advance timers; returns the event owed an auto-turn, if any
    pub fn tick(&mut self, now: Instant) -> Option<ArchitectEvent> {
        let flushed = self.triggers.poll(now);
        // Flushes come most recent first
        if let Some(latest) = flushed.first() {
            self.last_edit = Some((latest.chapter, latest.field_path.clone()));
            debug!(
                project_id = %self.project_id,
                notices = flushed.len(),
                field = %latest.field_path,
                staged = self.staged.len(),
                "ProjectSession::tick: notices flushed"
            );
            for event in std::mem::take(&mut self.staged) {
                self.router.enqueue(event, now);
            }
        }

        if self.idle.poll(now) {
            if self.awaiting_user_input {
                info!(project_id = %self.project_id, "ProjectSession: idle while awaiting input, clearing gate");
                self.awaiting_user_input = false;
            } else {
                let idle = ArchitectEvent::new(EventType::Idle, EventSource::Timer, self.snapshot.current_chapter, None);
                self.router.enqueue(idle, now);
            }
        }

        let gates_open = self.gates_open();
        self.router.poll(now, gates_open)
    }

    /// Earliest instant at which `tick` could do something
    ///
    /// Held router items do not count while the gates are closed.
    pub fn next_deadline(&self) -> Option<Instant> {
        let router = if self.gates_open() { self.router.deadline() } else { None };
        [self.triggers.deadline(), router, self.idle.deadline()]
            .into_iter()
            .flatten()
            .min()
    }
}
