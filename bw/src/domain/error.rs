//! Rule evaluation errors

use thiserror::Error;

/// Raised when a rule reads an answer that does not have the expected shape
///
/// Analyzers catch this at their own boundary and treat it as "no signal".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RuleError {
    #[error("Field {path} has unexpected type: expected {expected}")]
    WrongType { path: String, expected: &'static str },

    #[error("Field {path} is not a valid amount: {value}")]
    InvalidAmount { path: String, value: String },
}
