//! "Missing required fields" collaborator

use std::collections::BTreeMap;

use crate::domain::{Chapter, ProjectRecord};

/// Read-only query for chapter completeness
///
/// The questionnaire layer owns the definition of "required"; the engine
/// only asks.
pub trait RequiredFields: Send + Sync {
    /// Required field paths (`chapter.field`) still empty in `record`
    fn missing_fields(&self, record: &ProjectRecord, chapter: Chapter) -> Vec<String>;

    fn is_complete(&self, record: &ProjectRecord, chapter: Chapter) -> bool {
        self.missing_fields(record, chapter).is_empty()
    }
}

/// Table-driven default: a fixed list of required paths per chapter
#[derive(Debug, Clone)]
pub struct StaticRequiredFields {
    table: BTreeMap<Chapter, Vec<String>>,
}

impl StaticRequiredFields {
    pub fn new(table: BTreeMap<Chapter, Vec<String>>) -> Self {
        Self { table }
    }
}

impl Default for StaticRequiredFields {
    fn default() -> Self {
        let rows: [(Chapter, &[&str]); 7] = [
            (Chapter::Basics, &["basics.projectType", "basics.location", "basics.buildableArea"]),
            (Chapter::Rooms, &["rooms.rooms"]),
            (Chapter::Wishes, &["wishes.wishes"]),
            (Chapter::Budget, &["budget.totalBudget"]),
            (Chapter::Technical, &["technical.heating"]),
            (Chapter::Sustainability, &["sustainability.energyStandard"]),
            (Chapter::Risks, &["risks.timeline"]),
        ];
        Self::new(
            rows.into_iter()
                .map(|(chapter, fields)| (chapter, fields.iter().map(|f| f.to_string()).collect()))
                .collect(),
        )
    }
}

impl RequiredFields for StaticRequiredFields {
    fn missing_fields(&self, record: &ProjectRecord, chapter: Chapter) -> Vec<String> {
        self.table
            .get(&chapter)
            .map(|fields| fields.iter().filter(|f| !record.has_value(f)).cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_fields() {
        let required = StaticRequiredFields::default();
        let record = ProjectRecord::new().with_chapter(Chapter::Basics, json!({"projectType": "renovation", "location": ""}));
        assert_eq!(
            required.missing_fields(&record, Chapter::Basics),
            vec!["basics.location".to_string(), "basics.buildableArea".to_string()]
        );
        assert!(!required.is_complete(&record, Chapter::Basics));
    }

    #[test]
    fn test_complete_chapter() {
        let required = StaticRequiredFields::default();
        let record = ProjectRecord::new().with_chapter(Chapter::Budget, json!({"totalBudget": 1}));
        assert!(required.is_complete(&record, Chapter::Budget));
    }
}
