//! Project record (wizard state) snapshots
//!
//! The questionnaire layer owns the record. The engine only reads snapshots
//! and proposes patches; typed accessors below return `RuleError` when an
//! answer has an unexpected shape instead of guessing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{Chapter, RuleError, SystemConflict};

/// Full structured questionnaire answers for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Free-form answers per chapter
    pub answers: BTreeMap<Chapter, Value>,

    /// Chapter the user currently has open
    pub current_chapter: Option<Chapter>,

    /// Conflicts as last published by the state owner
    pub conflicts: Vec<SystemConflict>,
}

/// Kind of construction project, read from `basics.projectType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    NewBuild,
    Renovation,
    Extension,
    Other,
}

impl ProjectType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "new_build" | "newbuild" | "neubau" => Self::NewBuild,
            "renovation" | "sanierung" | "modernization" | "modernisierung" => Self::Renovation,
            "extension" | "anbau" | "addition" => Self::Extension,
            _ => Self::Other,
        }
    }
}

/// Priority a homeowner assigned to a wish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WishPriority {
    Must,
    Should,
    Nice,
}

/// A declared room
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub name: String,
    pub area: Option<f64>,
}

/// A declared wish with its optional cost estimate
#[derive(Debug, Clone, PartialEq)]
pub struct Wish {
    pub title: String,
    pub priority: WishPriority,
    pub estimated_cost: Option<f64>,
}

impl ProjectRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style chapter setter, mostly for tests and fixtures
    pub fn with_chapter(mut self, chapter: Chapter, answers: Value) -> Self {
        self.answers.insert(chapter, answers);
        self
    }

    /// Builder-style current chapter setter
    pub fn with_current_chapter(mut self, chapter: Chapter) -> Self {
        self.current_chapter = Some(chapter);
        self
    }

    /// Answers of one chapter
    pub fn chapter(&self, chapter: Chapter) -> Option<&Value> {
        self.answers.get(&chapter)
    }

    /// Look up a dotted field path such as `budget.totalBudget`
    ///
    /// Numeric segments index into arrays (`rooms.rooms.0.area`).
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let chapter: Chapter = segments.next()?.parse().ok()?;
        let mut current = self.answers.get(&chapter)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Whether a field is present and non-empty
    pub fn has_value(&self, path: &str) -> bool {
        match self.field(path) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
            Some(_) => true,
        }
    }

    /// Read a monetary or area amount; absent or null fields are `None`
    pub fn amount(&self, path: &str) -> Result<Option<f64>, RuleError> {
        match self.field(path) {
            None => Ok(None),
            Some(value) => parse_amount(value, path),
        }
    }

    /// Total budget in euros (`budget.totalBudget`)
    pub fn total_budget(&self) -> Result<Option<f64>, RuleError> {
        self.amount("budget.totalBudget")
    }

    /// Declared total buildable area in square metres (`basics.buildableArea`)
    pub fn buildable_area(&self) -> Result<Option<f64>, RuleError> {
        self.amount("basics.buildableArea")
    }

    /// Project type from `basics.projectType`, if answered
    pub fn project_type(&self) -> Option<ProjectType> {
        self.field("basics.projectType")
            .and_then(Value::as_str)
            .map(ProjectType::parse)
    }

    /// Declared rooms (`rooms.rooms`)
    pub fn rooms(&self) -> Result<Vec<Room>, RuleError> {
        debug!("ProjectRecord::rooms: called");
        let items = match self.field("rooms.rooms") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(RuleError::WrongType {
                    path: "rooms.rooms".to_string(),
                    expected: "array",
                });
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let path = format!("rooms.rooms.{}", idx);
                let obj = item.as_object().ok_or_else(|| RuleError::WrongType {
                    path: path.clone(),
                    expected: "object",
                })?;
                let name = obj.get("name").and_then(Value::as_str).unwrap_or("").to_string();
                let area = match obj.get("area") {
                    Some(v) => parse_amount(v, &format!("{}.area", path))?,
                    None => None,
                };
                Ok(Room { name, area })
            })
            .collect()
    }

    /// Number of declared rooms, tolerant of malformed entries
    pub fn room_count(&self) -> usize {
        self.field("rooms.rooms")
            .and_then(Value::as_array)
            .map(|items| items.len())
            .unwrap_or(0)
    }

    /// Declared wishes (`wishes.wishes`)
    pub fn wishes(&self) -> Result<Vec<Wish>, RuleError> {
        debug!("ProjectRecord::wishes: called");
        let items = match self.field("wishes.wishes") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(RuleError::WrongType {
                    path: "wishes.wishes".to_string(),
                    expected: "array",
                });
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let path = format!("wishes.wishes.{}", idx);
                let obj = item.as_object().ok_or_else(|| RuleError::WrongType {
                    path: path.clone(),
                    expected: "object",
                })?;
                let title = obj.get("title").and_then(Value::as_str).unwrap_or("").to_string();
                let priority = match obj.get("priority").and_then(Value::as_str) {
                    Some(p) if p.eq_ignore_ascii_case("must") => WishPriority::Must,
                    Some(p) if p.eq_ignore_ascii_case("should") => WishPriority::Should,
                    _ => WishPriority::Nice,
                };
                let estimated_cost = match obj.get("estimatedCost") {
                    Some(v) => parse_amount(v, &format!("{}.estimatedCost", path))?,
                    None => None,
                };
                Ok(Wish {
                    title,
                    priority,
                    estimated_cost,
                })
            })
            .collect()
    }
}

/// Parse a JSON value as an amount, accepting numbers and numeric strings
fn parse_amount(value: &Value, path: &str) -> Result<Option<f64>, RuleError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !c.is_whitespace() && *c != '€' && *c != '_')
                .collect();
            if cleaned.is_empty() {
                return Ok(None);
            }
            cleaned.parse::<f64>().map(Some).map_err(|_| RuleError::InvalidAmount {
                path: path.to_string(),
                value: s.clone(),
            })
        }
        _ => Err(RuleError::WrongType {
            path: path.to_string(),
            expected: "number",
        }),
    }
}
