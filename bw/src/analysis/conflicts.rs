//! Conflict detection over the full project record

use tracing::{debug, warn};

use crate::config::DetectionConfig;
use crate::domain::{Chapter, ConflictKind, ProjectRecord, RuleError, Severity, SystemConflict, WishPriority};

type ConflictRule = fn(&ConflictDetector, &ProjectRecord) -> Result<Option<SystemConflict>, RuleError>;

/// Rules in evaluation order; each yields at most one conflict
const RULES: &[(ConflictKind, ConflictRule)] = &[
    (ConflictKind::BudgetRisk, ConflictDetector::budget_risk),
    (ConflictKind::MustHaveUnsatisfied, ConflictDetector::must_have_unsatisfied),
    (ConflictKind::PhysicalConstraint, ConflictDetector::physical_constraint),
    (ConflictKind::AmbitionMismatch, ConflictDetector::ambition_mismatch),
];

/// Side-effect-free conflict rules
#[derive(Debug, Clone)]
pub struct ConflictDetector {
    ambition_factor: f64,
}

impl Default for ConflictDetector {
    fn default() -> Self {
        Self::new(&DetectionConfig::default())
    }
}

impl ConflictDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            ambition_factor: config.ambition_factor,
        }
    }

    /// Run every rule; a failing rule counts as "no conflict"
    pub fn detect(&self, record: &ProjectRecord) -> Vec<SystemConflict> {
        debug!("ConflictDetector::detect: called");
        RULES
            .iter()
            .filter_map(|(kind, rule)| match rule(self, record) {
                Ok(conflict) => conflict,
                Err(e) => {
                    warn!(rule = kind.as_str(), error = %e, "ConflictDetector::detect: rule failed, treating as no conflict");
                    None
                }
            })
            .collect()
    }

    fn budget_risk(&self, record: &ProjectRecord) -> Result<Option<SystemConflict>, RuleError> {
        let Some(budget) = record.total_budget()? else {
            return Ok(None);
        };
        let must_cost: f64 = record
            .wishes()?
            .iter()
            .filter(|w| w.priority == WishPriority::Must)
            .filter_map(|w| w.estimated_cost)
            .sum();
        if must_cost <= budget {
            return Ok(None);
        }

        let shortfall = must_cost - budget;
        debug!(%budget, %must_cost, %shortfall, "ConflictDetector::budget_risk: must-haves exceed budget");
        Ok(Some(conflict(
            ConflictKind::BudgetRisk,
            Severity::Blocking,
            format!(
                "Your must-have wishes are estimated at {} but the total budget is {}.",
                format_eur(must_cost),
                format_eur(budget)
            ),
            &["budget.totalBudget", "wishes.wishes"],
            &[Chapter::Budget, Chapter::Wishes],
            format!(
                "Close the shortfall of {}: raise the budget or move must-have wishes to a lower priority.",
                format_eur(shortfall)
            ),
        )))
    }

    fn must_have_unsatisfied(&self, record: &ProjectRecord) -> Result<Option<SystemConflict>, RuleError> {
        if record.total_budget()?.is_some() {
            return Ok(None);
        }
        let must_count = record
            .wishes()?
            .iter()
            .filter(|w| w.priority == WishPriority::Must)
            .count();
        if must_count == 0 {
            return Ok(None);
        }

        Ok(Some(conflict(
            ConflictKind::MustHaveUnsatisfied,
            Severity::Warning,
            format!(
                "You marked {} wish(es) as must-have, but no budget has been set yet.",
                must_count
            ),
            &["budget.totalBudget", "wishes.wishes"],
            &[Chapter::Budget, Chapter::Wishes],
            "Set a total budget so the must-have wishes can be checked against it.".to_string(),
        )))
    }

    fn physical_constraint(&self, record: &ProjectRecord) -> Result<Option<SystemConflict>, RuleError> {
        let Some(buildable) = record.buildable_area()? else {
            return Ok(None);
        };
        let room_area: f64 = record.rooms()?.iter().filter_map(|r| r.area).sum();
        if room_area <= buildable {
            return Ok(None);
        }

        let excess = room_area - buildable;
        debug!(%buildable, %room_area, %excess, "ConflictDetector::physical_constraint: rooms exceed area");
        Ok(Some(conflict(
            ConflictKind::PhysicalConstraint,
            Severity::Blocking,
            format!(
                "The declared rooms add up to {} but only {} of buildable area are available.",
                format_area(room_area),
                format_area(buildable)
            ),
            &["basics.buildableArea", "rooms.rooms"],
            &[Chapter::Basics, Chapter::Rooms],
            format!(
                "Reduce room sizes by {} in total or revisit the buildable area.",
                format_area(excess)
            ),
        )))
    }

    fn ambition_mismatch(&self, record: &ProjectRecord) -> Result<Option<SystemConflict>, RuleError> {
        let Some(budget) = record.total_budget()? else {
            return Ok(None);
        };
        let all_cost: f64 = record.wishes()?.iter().filter_map(|w| w.estimated_cost).sum();
        let limit = budget * self.ambition_factor;
        if all_cost <= limit {
            return Ok(None);
        }

        Ok(Some(conflict(
            ConflictKind::AmbitionMismatch,
            Severity::Warning,
            format!(
                "All wishes together are estimated at {}, more than {}x the budget of {}.",
                format_eur(all_cost),
                self.ambition_factor,
                format_eur(budget)
            ),
            &["budget.totalBudget", "wishes.wishes"],
            &[Chapter::Budget, Chapter::Wishes],
            format!(
                "Prioritise the wish list; {} of wishes would have to be cut to reach a realistic scope.",
                format_eur(all_cost - limit)
            ),
        )))
    }
}

fn conflict(
    kind: ConflictKind,
    severity: Severity,
    description: String,
    fields: &[&str],
    chapters: &[Chapter],
    suggested_resolution: String,
) -> SystemConflict {
    SystemConflict {
        id: format!("conflict-{}", kind.as_str()),
        kind,
        severity,
        description,
        affected_fields: fields.iter().map(|f| f.to_string()).collect(),
        affected_chapters: chapters.to_vec(),
        suggested_resolution,
    }
}

/// Format a euro amount as `€30,000` (rounded to whole euros)
pub fn format_eur(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-€{}", grouped)
    } else {
        format!("€{}", grouped)
    }
}

/// Format an area as `12 m²` or `12.5 m²`
pub fn format_area(area: f64) -> String {
    let rounded = (area * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{} m²", rounded as i64)
    } else {
        format!("{:.1} m²", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(budget: serde_json::Value, wishes: serde_json::Value) -> ProjectRecord {
        ProjectRecord::new()
            .with_chapter(Chapter::Budget, json!({ "totalBudget": budget }))
            .with_chapter(Chapter::Wishes, json!({ "wishes": wishes }))
    }

    #[test]
    fn test_format_eur() {
        assert_eq!(format_eur(30_000.0), "€30,000");
        assert_eq!(format_eur(999.4), "€999");
        assert_eq!(format_eur(1_234_567.0), "€1,234,567");
        assert_eq!(format_eur(0.0), "€0");
    }

    #[test]
    fn test_format_area() {
        assert_eq!(format_area(12.0), "12 m²");
        assert_eq!(format_area(12.46), "12.5 m²");
    }

    #[test]
    fn test_budget_risk_cites_shortfall() {
        let record = record(
            json!(200_000),
            json!([
                {"title": "Heat pump", "priority": "must", "estimatedCost": 130000},
                {"title": "New roof", "priority": "must", "estimatedCost": 100000},
                {"title": "Pool", "priority": "nice", "estimatedCost": 40000}
            ]),
        );
        let conflicts = ConflictDetector::default().detect(&record);
        let budget = conflicts
            .iter()
            .find(|c| c.kind == ConflictKind::BudgetRisk)
            .unwrap();
        assert_eq!(budget.severity, Severity::Blocking);
        assert!(budget.suggested_resolution.contains("€30,000"));
    }

    #[test]
    fn test_must_have_without_budget() {
        let record = ProjectRecord::new().with_chapter(
            Chapter::Wishes,
            json!({"wishes": [{"title": "Garage", "priority": "must"}]}),
        );
        let conflicts = ConflictDetector::default().detect(&record);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::MustHaveUnsatisfied);
        assert_eq!(conflicts[0].severity, Severity::Warning);
    }

    #[test]
    fn test_physical_constraint_cites_excess() {
        let record = ProjectRecord::new()
            .with_chapter(Chapter::Basics, json!({"buildableArea": 100}))
            .with_chapter(
                Chapter::Rooms,
                json!({"rooms": [{"name": "Living", "area": 70}, {"name": "Kitchen", "area": 42.5}]}),
            );
        let conflicts = ConflictDetector::default().detect(&record);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::PhysicalConstraint);
        assert!(conflicts[0].suggested_resolution.contains("12.5 m²"));
    }

    #[test]
    fn test_ambition_mismatch() {
        let record = record(
            json!(100_000),
            json!([
                {"title": "Sauna", "priority": "nice", "estimatedCost": 90000},
                {"title": "Pool", "priority": "should", "estimatedCost": 70000}
            ]),
        );
        let conflicts = ConflictDetector::default().detect(&record);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::AmbitionMismatch);
    }

    #[test]
    fn test_all_rules_can_fire_together() {
        let record = record(
            json!(100_000),
            json!([{"title": "Extension", "priority": "must", "estimatedCost": 160000}]),
        )
        .with_chapter(Chapter::Basics, json!({"buildableArea": 50}))
        .with_chapter(Chapter::Rooms, json!({"rooms": [{"name": "Hall", "area": 60}]}));
        let kinds: Vec<_> = ConflictDetector::default()
            .detect(&record)
            .into_iter()
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                ConflictKind::BudgetRisk,
                ConflictKind::PhysicalConstraint,
                ConflictKind::AmbitionMismatch
            ]
        );
    }

    #[test]
    fn test_malformed_answers_are_no_signal() {
        let record = record(json!("a lot"), json!([{"title": "Pool", "priority": "must", "estimatedCost": 1}]));
        let conflicts = ConflictDetector::default().detect(&record);
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_empty_record_has_no_conflicts() {
        assert!(ConflictDetector::default().detect(&ProjectRecord::new()).is_empty());
    }
}
