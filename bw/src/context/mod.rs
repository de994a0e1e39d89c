//! Token-bounded context assembly
//!
//! The budgeter selects state, history, conflicts, guidance and knowledge
//! per plan goal so that every model call stays strictly under the
//! configured ceiling. The behavior profile and plan metadata live in a
//! reserved floor and are never pruned; neither is the focused chapter.

mod budgeter;
mod knowledge;

pub use budgeter::{BudgetInput, ContextBudgeter, PrunedContext};
pub use knowledge::{KnowledgeEntry, KnowledgeFragment, KnowledgeSource, NoKnowledge, StaticKnowledge, WorkedExample};
