//! Proposed mutations to the project record

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::{Chapter, ProjectRecord};

/// Errors for structurally invalid or inapplicable patches
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PatchError {
    #[error("Patch is not an object")]
    NotAnObject,

    #[error("Unknown chapter: {0}")]
    UnknownChapter(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Patch path is missing or empty")]
    MissingPath,

    #[error("Remove operation requires a numeric index")]
    MissingIndex,

    #[error("Path {path} does not hold {expected}")]
    NotApplicable { path: String, expected: &'static str },

    #[error("Index {index} out of bounds at {path}")]
    IndexOutOfBounds { path: String, index: usize },
}

/// Patch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Set,
    Append,
    Remove,
}

impl std::str::FromStr for PatchOp {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "append" => Ok(Self::Append),
            "remove" => Ok(Self::Remove),
            other => Err(PatchError::UnknownOperation(other.to_string())),
        }
    }
}

/// The change a patch carries; `path` is relative to the chapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDelta {
    pub operation: PatchOp,
    pub path: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// A proposed, confirmable mutation to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEvent {
    pub chapter: Chapter,
    pub delta: PatchDelta,
    pub requires_confirmation: bool,
}

impl PatchEvent {
    /// Structurally validate a raw model-proposed patch
    ///
    /// Accepts `{chapter, delta: {operation, path, value, index?}}`. The
    /// confirmation flag is assigned later from the turn confidence.
    pub fn from_value(raw: &Value) -> Result<Self, PatchError> {
        debug!("PatchEvent::from_value: called");
        let obj = raw.as_object().ok_or(PatchError::NotAnObject)?;

        let chapter_raw = obj.get("chapter").and_then(Value::as_str).unwrap_or_default();
        let chapter: Chapter = chapter_raw
            .parse()
            .map_err(|_| PatchError::UnknownChapter(chapter_raw.to_string()))?;

        let delta = obj
            .get("delta")
            .and_then(Value::as_object)
            .ok_or(PatchError::NotAnObject)?;

        let op_raw = delta.get("operation").and_then(Value::as_str).unwrap_or_default();
        let operation: PatchOp = op_raw.parse()?;

        let path = delta
            .get("path")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(PatchError::MissingPath)?
            .to_string();

        let index = match delta.get("index") {
            Some(Value::Number(n)) => n.as_u64().map(|i| i as usize),
            _ => None,
        };
        if operation == PatchOp::Remove && index.is_none() {
            debug!(%path, "PatchEvent::from_value: remove without index");
            return Err(PatchError::MissingIndex);
        }

        Ok(Self {
            chapter,
            delta: PatchDelta {
                operation,
                path,
                value: delta.get("value").cloned().unwrap_or(Value::Null),
                index,
            },
            requires_confirmation: true,
        })
    }

    /// Absolute field path (`chapter.path`)
    pub fn field_path(&self) -> String {
        format!("{}.{}", self.chapter.key(), self.delta.path)
    }
}

/// Apply an accepted patch, returning the new snapshot
///
/// Intended for the state owner; the engine itself never calls this on the
/// snapshot it is analyzing.
pub fn apply_patch(record: &ProjectRecord, patch: &PatchEvent) -> Result<ProjectRecord, PatchError> {
    debug!(field_path = %patch.field_path(), operation = ?patch.delta.operation, "apply_patch: called");
    let mut next = record.clone();
    let root = next
        .answers
        .entry(patch.chapter)
        .or_insert_with(|| Value::Object(Map::new()));

    let full_path = patch.field_path();
    let target = resolve_mut(root, &patch.delta.path, &full_path)?;

    match patch.delta.operation {
        PatchOp::Set => {
            *target = patch.delta.value.clone();
        }
        PatchOp::Append => {
            if target.is_null() {
                *target = Value::Array(Vec::new());
            }
            let items = target.as_array_mut().ok_or(PatchError::NotApplicable {
                path: full_path.clone(),
                expected: "an array",
            })?;
            items.push(patch.delta.value.clone());
        }
        PatchOp::Remove => {
            let index = patch.delta.index.ok_or(PatchError::MissingIndex)?;
            let items = target.as_array_mut().ok_or(PatchError::NotApplicable {
                path: full_path.clone(),
                expected: "an array",
            })?;
            if index >= items.len() {
                return Err(PatchError::IndexOutOfBounds { path: full_path, index });
            }
            items.remove(index);
        }
    }

    Ok(next)
}

/// Walk (and create) objects along a dotted path
fn resolve_mut<'a>(root: &'a mut Value, path: &str, full_path: &str) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for segment in path.split('.') {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment.to_string()).or_insert(Value::Null),
            Value::Array(items) => {
                let idx = segment.parse::<usize>().map_err(|_| PatchError::NotApplicable {
                    path: full_path.to_string(),
                    expected: "an object",
                })?;
                items.get_mut(idx).ok_or(PatchError::IndexOutOfBounds {
                    path: full_path.to_string(),
                    index: idx,
                })?
            }
            _ => {
                return Err(PatchError::NotApplicable {
                    path: full_path.to_string(),
                    expected: "an object",
                });
            }
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_valid_set() {
        let raw = json!({"chapter": "budget", "delta": {"operation": "set", "path": "totalBudget", "value": 250000}});
        let patch = PatchEvent::from_value(&raw).unwrap();
        assert_eq!(patch.chapter, Chapter::Budget);
        assert_eq!(patch.delta.operation, PatchOp::Set);
        assert_eq!(patch.field_path(), "budget.totalBudget");
    }

    #[test]
    fn test_from_value_rejects_unknown_chapter() {
        let raw = json!({"chapter": "garden", "delta": {"operation": "set", "path": "x", "value": 1}});
        assert_eq!(
            PatchEvent::from_value(&raw),
            Err(PatchError::UnknownChapter("garden".to_string()))
        );
    }

    #[test]
    fn test_from_value_rejects_unknown_operation() {
        let raw = json!({"chapter": "rooms", "delta": {"operation": "merge", "path": "rooms", "value": []}});
        assert!(matches!(
            PatchEvent::from_value(&raw),
            Err(PatchError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_from_value_remove_requires_index() {
        let raw = json!({"chapter": "rooms", "delta": {"operation": "remove", "path": "rooms"}});
        assert_eq!(PatchEvent::from_value(&raw), Err(PatchError::MissingIndex));

        let raw = json!({"chapter": "rooms", "delta": {"operation": "remove", "path": "rooms", "index": "1"}});
        assert_eq!(PatchEvent::from_value(&raw), Err(PatchError::MissingIndex));

        let raw = json!({"chapter": "rooms", "delta": {"operation": "remove", "path": "rooms", "index": 1}});
        assert!(PatchEvent::from_value(&raw).is_ok());
    }

    #[test]
    fn test_apply_set_creates_nested_objects() {
        let record = ProjectRecord::new();
        let patch = PatchEvent::from_value(&json!({
            "chapter": "technical",
            "delta": {"operation": "set", "path": "heating.type", "value": "heat_pump"}
        }))
        .unwrap();
        let next = apply_patch(&record, &patch).unwrap();
        assert_eq!(next.field("technical.heating.type"), Some(&json!("heat_pump")));
        assert!(record.field("technical.heating.type").is_none());
    }

    #[test]
    fn test_apply_append_and_remove() {
        let record = ProjectRecord::new().with_chapter(Chapter::Rooms, json!({"rooms": [{"name": "Kitchen"}]}));
        let append = PatchEvent::from_value(&json!({
            "chapter": "rooms",
            "delta": {"operation": "append", "path": "rooms", "value": {"name": "Office", "area": 12}}
        }))
        .unwrap();
        let next = apply_patch(&record, &append).unwrap();
        assert_eq!(next.room_count(), 2);

        let remove = PatchEvent::from_value(&json!({
            "chapter": "rooms",
            "delta": {"operation": "remove", "path": "rooms", "index": 0}
        }))
        .unwrap();
        let next = apply_patch(&next, &remove).unwrap();
        assert_eq!(next.room_count(), 1);
        assert_eq!(next.field("rooms.rooms.0.name"), Some(&json!("Office")));
    }

    #[test]
    fn test_apply_remove_out_of_bounds() {
        let record = ProjectRecord::new().with_chapter(Chapter::Rooms, json!({"rooms": []}));
        let remove = PatchEvent::from_value(&json!({
            "chapter": "rooms",
            "delta": {"operation": "remove", "path": "rooms", "index": 3}
        }))
        .unwrap();
        assert!(matches!(
            apply_patch(&record, &remove),
            Err(PatchError::IndexOutOfBounds { .. })
        ));
    }
}
