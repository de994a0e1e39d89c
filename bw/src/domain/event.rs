//! Coarse-grained domain events raised from user edits and timers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{Chapter, Priority};

/// Kind of domain event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ChapterEntered,
    ChapterCompleted,
    RoomAdded,
    BudgetEdited,
    RiskIncreased,
    #[serde(rename = "wizard_idle", alias = "idle")]
    Idle,
}

impl EventType {
    /// Trigger name used by the auto-turn queue and its templates
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChapterEntered => "chapter_entered",
            Self::ChapterCompleted => "chapter_completed",
            Self::RoomAdded => "room_added",
            Self::BudgetEdited => "budget_edited",
            Self::RiskIncreased => "risk_increased",
            Self::Idle => "wizard_idle",
        }
    }

    /// Default delivery priority for the auto-turn queue
    pub fn default_priority(&self) -> Priority {
        match self {
            Self::RiskIncreased | Self::BudgetEdited | Self::ChapterCompleted => Priority::High,
            Self::ChapterEntered | Self::RoomAdded => Priority::Medium,
            Self::Idle => Priority::Low,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chapter_entered" => Ok(Self::ChapterEntered),
            "chapter_completed" => Ok(Self::ChapterCompleted),
            "room_added" => Ok(Self::RoomAdded),
            "budget_edited" => Ok(Self::BudgetEdited),
            "risk_increased" => Ok(Self::RiskIncreased),
            "idle" | "wizard_idle" => Ok(Self::Idle),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Derived from a user edit
    User,
    /// Raised by the idle timer
    Timer,
}

/// A domain event (ArchitectEvent)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub source: EventSource,
    pub chapter: Option<Chapter>,
    pub payload: Option<Value>,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

impl ArchitectEvent {
    /// Create an event with the type's default priority
    pub fn new(event_type: EventType, source: EventSource, chapter: Option<Chapter>, payload: Option<Value>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event_type,
            source,
            chapter,
            payload,
            priority: event_type.default_priority(),
            timestamp: Utc::now(),
        }
    }

    /// Composite key used for the rolling dedupe window
    pub fn dedupe_key(&self) -> String {
        let chapter = self.chapter.map(|c| c.key()).unwrap_or("-");
        let payload = self
            .payload
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_default();
        format!("{}|{}|{}", self.event_type.as_str(), chapter, payload)
    }
}
