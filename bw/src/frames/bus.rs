//! Frame Bus - pub/sub delivery of turn frames
//!
//! Uses a tokio broadcast channel so any number of transports can follow
//! the same projects. Emission never blocks the pipeline.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{TurnFrame, TurnKind};
use crate::domain::{Chapter, Goal, OrchestratorResult};

/// Default channel capacity (frames)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Central bus for turn frames of all projects
pub struct FrameBus {
    tx: broadcast::Sender<TurnFrame>,
}

impl FrameBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "FrameBus::new: creating frame bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit a frame; dropped if nobody is subscribed
    pub fn emit(&self, frame: TurnFrame) {
        debug!(frame = frame.name(), project_id = frame.project_id(), "FrameBus::emit");
        let _ = self.tx.send(frame);
    }

    /// Receive all frames emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TurnFrame> {
        debug!("FrameBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one project
    pub fn emitter_for(&self, project_id: impl Into<String>) -> FrameEmitter {
        let project_id = project_id.into();
        debug!(%project_id, "FrameBus::emitter_for: creating emitter");
        FrameEmitter {
            tx: self.tx.clone(),
            project_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FrameBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for emitting frames of one project
#[derive(Clone)]
pub struct FrameEmitter {
    tx: broadcast::Sender<TurnFrame>,
    project_id: String,
}

impl FrameEmitter {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn emit(&self, frame: TurnFrame) {
        debug!(frame = frame.name(), "FrameEmitter::emit");
        let _ = self.tx.send(frame);
    }

    /// Emit the full frame sequence for one finished turn
    pub fn turn(
        &self,
        kind: TurnKind,
        goal: Goal,
        trigger: Option<&str>,
        navigate_to: Option<Chapter>,
        result: &OrchestratorResult,
    ) {
        debug!(project_id = %self.project_id, ?kind, %goal, status = ?result.status, "FrameEmitter::turn: called");
        self.emit(TurnFrame::Metadata {
            project_id: self.project_id.clone(),
            kind,
            goal,
            status: result.status,
            confidence: result.confidence,
            tokens_used: result.tokens_used,
            degraded: result.degraded,
            trigger: trigger.map(str::to_string),
        });

        for patch in &result.patches {
            self.emit(TurnFrame::PatchProposal {
                project_id: self.project_id.clone(),
                patch: patch.clone(),
            });
        }

        if let Some(chapter) = navigate_to {
            self.emit(TurnFrame::Navigation {
                project_id: self.project_id.clone(),
                chapter,
            });
        }

        self.emit(TurnFrame::Text {
            project_id: self.project_id.clone(),
            text: result.draft_response.clone(),
        });

        if !result.is_success() {
            let message = result
                .parse_error
                .clone()
                .unwrap_or_else(|| format!("turn finished with status {:?}", result.status));
            self.emit(TurnFrame::Error {
                project_id: self.project_id.clone(),
                message,
            });
        }

        self.emit(TurnFrame::Done {
            project_id: self.project_id.clone(),
        });
    }
}
