//! Synchronous analyzers feeding the turn planner
//!
//! - [`ConflictDetector`] - rule checks over the whole project record
//! - [`AnticipationAdvisor`] - ordered rule table, at most one nudge
//! - [`BehaviorProfiler`] - keyword heuristics over recent user messages
//! - [`TurnPlanner`] - priority matrix producing one [`TurnPlan`](crate::domain::TurnPlan)
//! - [`TurnAnalyzer`] - all of the above in one pass
//!
//! Every analyzer catches its own rule errors and reports "no signal"
//! instead of failing the turn.

mod analyzer;
mod anticipation;
mod conflicts;
mod lexicon;
mod planner;
mod profiler;

pub use analyzer::{TurnAnalysis, TurnAnalyzer};
pub use anticipation::{AnticipationAdvisor, AnticipationRule};
pub use conflicts::{ConflictDetector, format_area, format_eur};
pub use planner::{PlanInput, TurnPlanner};
pub use profiler::{BehaviorProfiler, PROFILE_WINDOW};
