//! Per-project orchestration
//!
//! The registry maps project ids to isolated sessions (queues, timers,
//! gates). The engine runs the turn pipeline for chat messages and for
//! events the sessions release, and emits the resulting frames.

mod engine;
mod idle;
mod registry;
mod session;

pub use engine::{AutoTurn, Orchestrator, OrchestratorError, TurnOutcome};
pub use idle::IdleTracker;
pub use registry::ProjectRegistry;
pub use session::ProjectSession;
