//! Output contract for system-initiated turns
//!
//! A delivered auto-turn must contain, in order, a `Context:` segment, an
//! `Insight:` segment and an `Action:` segment, and exactly one question
//! mark. Informal address is rewritten to the formal register before the
//! structural check runs.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Segment labels in their required order
pub const SEGMENTS: [&str; 3] = ["Context", "Insight", "Action"];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ContractViolation {
    #[error("Reply is empty")]
    Empty,

    #[error("Segment `{0}:` is missing")]
    MissingSegment(&'static str),

    #[error("Segments are not in Context, Insight, Action order")]
    SegmentOrder,

    #[error("Expected exactly one question mark, found {0}")]
    QuestionCount(usize),
}

static SEGMENT_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?mi)^\s*\**\s*(context|insight|action)\s*\**\s*:").ok());

/// Informal → formal substitutions, matched as whole words
const FORMAL_REGISTER: &[(&str, &str)] = &[
    ("du", "Sie"),
    ("dich", "Sie"),
    ("dir", "Ihnen"),
    ("dein", "Ihr"),
    ("deine", "Ihre"),
    ("deinen", "Ihren"),
    ("deinem", "Ihrem"),
    ("deiner", "Ihrer"),
    ("deines", "Ihres"),
    ("euch", "Sie"),
    ("euer", "Ihr"),
    ("eure", "Ihre"),
    ("hey", "Hello"),
    ("hi", "Hello"),
    ("gonna", "going to"),
    ("wanna", "want to"),
    ("gotta", "have to"),
    ("you guys", "you"),
];

static FORMAL_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    FORMAL_REGISTER
        .iter()
        .filter_map(|(informal, formal)| {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(informal)))
                .ok()
                .map(|re| (re, *formal))
        })
        .collect()
});

/// Rewrite informal address into the formal register
pub fn formalize(text: &str) -> String {
    FORMAL_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, (re, formal)| re.replace_all(&acc, *formal).into_owned())
}

/// Check the structural contract without rewriting
pub fn check(text: &str) -> Vec<ContractViolation> {
    debug!(len = text.len(), "contract::check: called");
    if text.trim().is_empty() {
        return vec![ContractViolation::Empty];
    }

    let mut violations = Vec::new();
    let mut positions: Vec<(usize, usize)> = Vec::new();
    if let Some(re) = SEGMENT_LABEL.as_ref() {
        for caps in re.captures_iter(text) {
            if let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) {
                let lower = label.as_str().to_lowercase();
                if let Some(idx) = SEGMENTS.iter().position(|s| s.to_lowercase() == lower) {
                    if !positions.iter().any(|(i, _)| *i == idx) {
                        positions.push((idx, whole.start()));
                    }
                }
            }
        }
    }

    for (idx, segment) in SEGMENTS.iter().enumerate() {
        if !positions.iter().any(|(i, _)| *i == idx) {
            violations.push(ContractViolation::MissingSegment(segment));
        }
    }
    if violations.is_empty() {
        let order: Vec<usize> = positions.iter().map(|(i, _)| *i).collect();
        if order != [0, 1, 2] {
            violations.push(ContractViolation::SegmentOrder);
        }
    }

    let questions = text.matches('?').count();
    if questions != 1 {
        violations.push(ContractViolation::QuestionCount(questions));
    }
    violations
}

/// Formalize then check; returns the compliant text or every violation
pub fn enforce(text: &str) -> Result<String, Vec<ContractViolation>> {
    let formal = formalize(text.trim());
    let violations = check(&formal);
    if violations.is_empty() { Ok(formal) } else { Err(violations) }
}

/// Corrective instruction for a retry after a contract violation
pub fn corrective(violations: &[ContractViolation]) -> String {
    let details: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
    format!(
        "Respond using exactly the required structure: Context:, Insight:, Action:, in that order, with exactly one question mark. Problems: {}.",
        details.join("; ")
    )
}
