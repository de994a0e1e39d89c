//! Frame vocabulary

use serde::{Deserialize, Serialize};

use crate::domain::{Chapter, Goal, PatchEvent, TurnStatus};

/// Whether a turn answered a chat message or was system-initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Chat,
    Auto,
}

/// One named frame of a delivered turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum TurnFrame {
    /// Opens a turn
    Metadata {
        project_id: String,
        kind: TurnKind,
        goal: Goal,
        status: TurnStatus,
        confidence: f64,
        tokens_used: u64,
        degraded: bool,
        /// Event type that triggered an auto-turn
        trigger: Option<String>,
    },
    /// A proposed patch the surface may auto-apply or ask to confirm
    PatchProposal { project_id: String, patch: PatchEvent },
    /// Suggests moving the user to another chapter
    Navigation { project_id: String, chapter: Chapter },
    /// The visible reply
    Text { project_id: String, text: String },
    /// Non-success status detail
    Error { project_id: String, message: String },
    /// Closes a turn
    Done { project_id: String },
}

impl TurnFrame {
    /// Project this frame belongs to
    pub fn project_id(&self) -> &str {
        match self {
            TurnFrame::Metadata { project_id, .. }
            | TurnFrame::PatchProposal { project_id, .. }
            | TurnFrame::Navigation { project_id, .. }
            | TurnFrame::Text { project_id, .. }
            | TurnFrame::Error { project_id, .. }
            | TurnFrame::Done { project_id } => project_id,
        }
    }

    /// Frame name for logging
    pub fn name(&self) -> &'static str {
        match self {
            TurnFrame::Metadata { .. } => "metadata",
            TurnFrame::PatchProposal { .. } => "patch_proposal",
            TurnFrame::Navigation { .. } => "navigation",
            TurnFrame::Text { .. } => "text",
            TurnFrame::Error { .. } => "error",
            TurnFrame::Done { .. } => "done",
        }
    }
}
