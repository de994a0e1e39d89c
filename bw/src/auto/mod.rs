//! System-initiated turns
//!
//! The router decides which domain event, if any, earns an auto-turn. The
//! contract module enforces the stricter shape every delivered auto-turn
//! must have; openings and templates provide deterministic, compliant
//! fallbacks when the model cannot.

pub mod contract;
mod openings;
mod router;
mod templates;

pub use contract::{ContractViolation, enforce, formalize};
pub use openings::{ChapterOpening, OPENINGS, opening};
pub use router::EventRouter;
pub use templates::fallback_text;
