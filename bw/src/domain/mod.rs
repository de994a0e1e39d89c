//! Domain types for the turn orchestration engine
//!
//! Typed snapshots of the project record, conversation turns, change notices,
//! domain events, conflicts, guidance, behavior profiles, plans and results.
//! Everything here is plain data: analyzers read it, nothing here decides.

mod chapter;
mod conflict;
mod error;
mod event;
mod guidance;
mod notice;
mod patch;
mod plan;
mod priority;
mod profile;
mod record;
mod result;
mod turn;

pub use chapter::Chapter;
pub use conflict::{ConflictKind, Severity, SystemConflict};
pub use error::RuleError;
pub use event::{ArchitectEvent, EventSource, EventType};
pub use guidance::AnticipationGuidance;
pub use notice::{ChangeNotice, Origin};
pub use patch::{PatchDelta, PatchError, PatchEvent, PatchOp, apply_patch};
pub use plan::{Goal, Route, TurnPlan};
pub use priority::Priority;
pub use profile::{BehaviorProfile, BehaviorSignals, ConfidenceLevel, SpeedPreference, ToneHint};
pub use record::{ProjectRecord, ProjectType, Room, Wish, WishPriority};
pub use result::{OrchestratorResult, TurnStatus};
pub use turn::{ConversationTurn, Role};
