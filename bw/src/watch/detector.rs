//! Domain event detection
//!
//! A pure function of two snapshots. Every rule is independent and all of
//! them run on each call; each hit is a boolean, never a probability.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use super::required::{RequiredFields, StaticRequiredFields};
use crate::analysis::ConflictDetector;
use crate::config::DetectionConfig;
use crate::domain::{
    ArchitectEvent, Chapter, EventSource, EventType, Origin, ProjectRecord, RuleError, Severity,
    SystemConflict,
};

/// Raises coarse domain events from user edits
#[derive(Clone)]
pub struct DomainEventDetector {
    required: Arc<dyn RequiredFields>,
    conflicts: ConflictDetector,
    budget_change_ratio: f64,
    budget_change_abs: f64,
}

impl Default for DomainEventDetector {
    fn default() -> Self {
        Self::new(&DetectionConfig::default(), Arc::new(StaticRequiredFields::default()))
    }
}

impl DomainEventDetector {
    pub fn new(config: &DetectionConfig, required: Arc<dyn RequiredFields>) -> Self {
        Self {
            required,
            conflicts: ConflictDetector::new(config),
            budget_change_ratio: config.budget_change_ratio,
            budget_change_abs: config.budget_change_abs,
        }
    }

    pub fn detect(&self, prev: &ProjectRecord, next: &ProjectRecord, origin: Origin) -> Vec<ArchitectEvent> {
        match origin {
            Origin::User => {}
            Origin::Assistant | Origin::System => {
                debug!(%origin, "DomainEventDetector::detect: non-user origin, ignoring");
                return Vec::new();
            }
        }

        let mut events = Vec::new();
        events.extend(self.chapter_entered(prev, next));
        events.extend(self.chapters_completed(prev, next));
        match self.budget_edited(prev, next) {
            Ok(event) => events.extend(event),
            Err(e) => warn!(error = %e, "DomainEventDetector: budget rule failed, no event"),
        }
        events.extend(self.room_added(prev, next));
        events.extend(self.risk_increased(prev, next));

        debug!(
            events = ?events.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
            "DomainEventDetector::detect: done"
        );
        events
    }

    fn chapter_entered(&self, prev: &ProjectRecord, next: &ProjectRecord) -> Option<ArchitectEvent> {
        let chapter = next.current_chapter?;
        if prev.current_chapter == Some(chapter) {
            return None;
        }
        Some(ArchitectEvent::new(
            EventType::ChapterEntered,
            EventSource::User,
            Some(chapter),
            Some(json!({ "chapter": chapter.key() })),
        ))
    }

    fn chapters_completed(&self, prev: &ProjectRecord, next: &ProjectRecord) -> Vec<ArchitectEvent> {
        Chapter::ALL
            .into_iter()
            .filter(|&c| !self.required.is_complete(prev, c) && self.required.is_complete(next, c))
            .map(|c| {
                ArchitectEvent::new(
                    EventType::ChapterCompleted,
                    EventSource::User,
                    Some(c),
                    Some(json!({ "chapter": c.key() })),
                )
            })
            .collect()
    }

    fn budget_edited(&self, prev: &ProjectRecord, next: &ProjectRecord) -> Result<Option<ArchitectEvent>, RuleError> {
        let Some(to) = next.total_budget()? else {
            return Ok(None);
        };
        let from = prev.total_budget().unwrap_or(None);

        let significant = match from {
            None => true,
            Some(from) => {
                let delta = (to - from).abs();
                let ratio = if from == 0.0 { f64::INFINITY } else { delta / from.abs() };
                delta > 0.0 && (delta > self.budget_change_abs || ratio > self.budget_change_ratio)
            }
        };
        if !significant {
            return Ok(None);
        }

        Ok(Some(ArchitectEvent::new(
            EventType::BudgetEdited,
            EventSource::User,
            Some(Chapter::Budget),
            Some(json!({ "from": from, "to": to })),
        )))
    }

    fn room_added(&self, prev: &ProjectRecord, next: &ProjectRecord) -> Option<ArchitectEvent> {
        let count = next.room_count();
        if count <= prev.room_count() {
            return None;
        }
        Some(ArchitectEvent::new(
            EventType::RoomAdded,
            EventSource::User,
            Some(Chapter::Rooms),
            Some(json!({ "count": count })),
        ))
    }

    fn risk_increased(&self, prev: &ProjectRecord, next: &ProjectRecord) -> Option<ArchitectEvent> {
        let before = self.conflicts.detect(prev);
        let after = self.conflicts.detect(next);
        let rank = |list: &[SystemConflict]| list.iter().map(|c| c.severity.rank()).max().unwrap_or(0);
        let (rank_before, rank_after) = (rank(&before), rank(&after));
        if after.len() <= before.len() && rank_after <= rank_before {
            return None;
        }

        let max_severity = after.iter().map(|c| c.severity).max().unwrap_or(Severity::Info);
        let chapter = after
            .iter()
            .find(|c| c.severity == max_severity)
            .and_then(|c| c.affected_chapters.first().copied());
        Some(ArchitectEvent::new(
            EventType::RiskIncreased,
            EventSource::User,
            chapter,
            Some(json!({ "count": after.len(), "maxSeverity": max_severity })),
        ))
    }
}
