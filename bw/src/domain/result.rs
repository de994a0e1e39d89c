//! Per-turn orchestration result

use serde::{Deserialize, Serialize};

use super::PatchEvent;

/// Outcome status of one generator call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Success,
    ParseError,
    LlmError,
}

/// Transient result of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorResult {
    pub status: TurnStatus,
    pub draft_response: String,
    pub patches: Vec<PatchEvent>,
    pub confidence: f64,
    pub tokens_used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    /// Set when retries were exhausted and this is the last attempt's output
    #[serde(default)]
    pub degraded: bool,
    /// Generator invocations spent on this turn (1 + retries)
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_trigger_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_example_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub used_nugget_ids: Vec<String>,
}

impl OrchestratorResult {
    pub fn is_success(&self) -> bool {
        self.status == TurnStatus::Success
    }
}
