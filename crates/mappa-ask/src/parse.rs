use serde::Deserialize;
use serde_json::Value;

use crate::AskError;

/// Shape the model is asked to answer with.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MessageResponse {
    /// Answer segments, in reading order.
    pub messages: Vec<String>,
}

/// JSON schema of [`MessageResponse`], trimmed to what strict structured
/// output accepts.
pub fn answer_schema() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(MessageResponse))
        .unwrap_or_else(|_| Value::Object(Default::default()));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
        map.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    schema
}

/// Turn raw model output into answer segments.
///
/// Accepts the structured object (optionally wrapped in prose or code fences)
/// or a reply that is nothing but a JSON array of strings. Anything else is
/// kept as a single plain text segment. Segments are trimmed and blank ones
/// dropped.
pub fn parse_answer(raw: &str) -> Result<Vec<String>, AskError> {
    let segments = structured_messages(raw)
        .or_else(|| bare_array(raw))
        .unwrap_or_else(|| match serde_json::from_str::<Value>(raw.trim()) {
            // A reply that is a JSON object but not ours carries no answer.
            Ok(Value::Object(_)) => Vec::new(),
            _ => vec![raw.to_string()],
        });

    let segments: Vec<String> = segments
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        Err(AskError::EmptyAnswer)
    } else {
        Ok(segments)
    }
}

/// Messages of the first balanced `{...}` in `raw` that has a `messages` field.
fn structured_messages(raw: &str) -> Option<Vec<String>> {
    balanced_objects(raw).into_iter().find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate).ok()?.get("messages")? {
            Value::Array(items) => Some(strings(items)),
            Value::String(single) => Some(vec![single.clone()]),
            _ => None,
        }
    })
}

fn bare_array(raw: &str) -> Option<Vec<String>> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::Array(items) if items.iter().all(Value::is_string) => Some(strings(&items)),
        _ => None,
    }
}

fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
        .collect()
}

/// Top-level `{...}` spans in `raw`, in order. Braces inside JSON strings do not count.
fn balanced_objects(raw: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in raw.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(&raw[s..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}
