//! Structured model output parsing

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Why a model reply could not be read as the turn record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Model output is empty")]
    Empty,

    #[error("Model output is not a JSON object: {0}")]
    NotJson(String),

    #[error("Field `reply` is missing")]
    MissingReply,

    #[error("Field `reply` is not a string")]
    ReplyNotString,

    #[error("Field `patches` is not an array")]
    PatchesNotArray,
}

/// The fixed record a model reply must contain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    pub reply: String,
    /// Raw patch objects; validated separately
    pub patches: Vec<Value>,
    pub used_trigger_ids: Vec<String>,
    pub used_example_ids: Vec<String>,
    pub used_nugget_ids: Vec<String>,
}

/// Parse `{reply, patches?, usedTriggerIds?, usedExampleIds?, usedNuggetIds?}`
///
/// Tolerates surrounding prose and Markdown code fences around the object.
pub fn parse_output(raw: &str) -> Result<ParsedOutput, ParseError> {
    debug!(len = raw.len(), "parse_output: called");
    let body = extract_object(raw)?;
    let value: Value = serde_json::from_str(body).map_err(|e| ParseError::NotJson(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::NotJson("top-level value is not an object".to_string()))?;

    let reply = match obj.get("reply") {
        None | Some(Value::Null) => return Err(ParseError::MissingReply),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ParseError::ReplyNotString),
    };

    let patches = match obj.get("patches") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => return Err(ParseError::PatchesNotArray),
    };

    Ok(ParsedOutput {
        reply,
        patches,
        used_trigger_ids: string_list(obj.get("usedTriggerIds")),
        used_example_ids: string_list(obj.get("usedExampleIds")),
        used_nugget_ids: string_list(obj.get("usedNuggetIds")),
    })
}

/// Slice out the outermost `{ ... }`
fn extract_object(raw: &str) -> Result<&str, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(ParseError::NotJson("no object found".to_string())),
    }
}

/// Id lists are advisory; anything that is not a string is ignored
fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}
