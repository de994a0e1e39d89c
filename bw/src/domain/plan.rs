//! Turn plan: the single decision artifact consumed downstream

use serde::{Deserialize, Serialize};

use super::{AnticipationGuidance, Severity, SystemConflict};

/// What kind of reply is owed this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    FillData,
    AnticipateAndGuide,
    SurfaceRisks,
    OfferAlternatives,
    Clarify,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FillData => "fill_data",
            Self::AnticipateAndGuide => "anticipate_and_guide",
            Self::SurfaceRisks => "surface_risks",
            Self::OfferAlternatives => "offer_alternatives",
            Self::Clarify => "clarify",
        }
    }
}

impl std::fmt::Display for Goal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Routing constraint for the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Normal,
    GuardRequired,
}

/// Output of the turn planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnPlan {
    pub goal: Goal,
    /// 1 is most urgent; mirrors the matrix tier that matched
    pub priority: u8,
    pub route: Route,
    /// Whether the generator may emit patches at all
    pub allow_patches: bool,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system_conflicts: Vec<SystemConflict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anticipation_guidance: Option<AnticipationGuidance>,
}

impl TurnPlan {
    /// Highest severity among attached conflicts
    pub fn max_severity(&self) -> Option<Severity> {
        self.system_conflicts.iter().map(|c| c.severity).max()
    }

    pub fn has_blocking_conflict(&self) -> bool {
        self.max_severity() == Some(Severity::Blocking)
    }
}
