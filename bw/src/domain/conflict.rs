//! System conflicts detected in the project record

use serde::{Deserialize, Serialize};

use super::Chapter;

/// Severity of a detected conflict
///
/// Ordered so that `Info < Warning < Blocking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Blocking,
}

impl Severity {
    /// Numeric rank (info=1, warning=2, blocking=3)
    pub fn rank(&self) -> u8 {
        match self {
            Self::Info => 1,
            Self::Warning => 2,
            Self::Blocking => 3,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

/// Which rule produced a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    BudgetRisk,
    MustHaveUnsatisfied,
    PhysicalConstraint,
    AmbitionMismatch,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetRisk => "budget_risk",
            Self::MustHaveUnsatisfied => "must_have_unsatisfied",
            Self::PhysicalConstraint => "physical_constraint",
            Self::AmbitionMismatch => "ambition_mismatch",
        }
    }
}

/// An inconsistency in the project record
///
/// Produced fresh on every evaluation, never persisted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemConflict {
    pub id: String,
    pub kind: ConflictKind,
    pub severity: Severity,
    pub description: String,
    pub affected_fields: Vec<String>,
    pub affected_chapters: Vec<Chapter>,
    pub suggested_resolution: String,
}

impl SystemConflict {
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}
