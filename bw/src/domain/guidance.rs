//! Proactive anticipation guidance

use serde::{Deserialize, Serialize};

use super::{Chapter, Priority};

/// A proactively suggested question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnticipationGuidance {
    pub id: String,
    pub priority: Priority,
    pub chapter: Chapter,
    pub question: String,
    pub reasoning: String,
    pub related_fields: Vec<String>,
}
