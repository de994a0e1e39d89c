//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for chat turns and
//! system-initiated turns.
//!
//! Template loading chain:
//! 1. `.buildwise/prompts/{name}.pmt` (user override)
//! 2. Embedded fallback compiled from `bw/prompts/`
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ChapterSection, ConflictLine, FragmentLine, GuidanceLine, HistoryLine, PromptContext, PromptLoader};
