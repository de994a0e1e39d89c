//! Response generation
//!
//! The generator renders a prompt from a plan and a budgeted context, calls
//! the model and parses its structured reply. The validator checks the result
//! against the plan; the retry coordinator re-invokes the generator with a
//! corrective instruction at most `retry.max-retries` times.

mod generator;
mod parse;
mod retry;
mod validator;

pub use generator::{GenerationRequest, LLM_ERROR_REPLY, ResponseGenerator, fallback_reply};
pub use parse::{ParseError, ParsedOutput, parse_output};
pub use retry::{CORRECTIVE_INSTRUCTION, RetryCoordinator};
pub use validator::{ResponseValidator, Rule, Validation, Violation};
