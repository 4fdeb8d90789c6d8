use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const PRIORITY_MIN: i64 = 1;
pub const PRIORITY_MAX: i64 = 5;
/// Used when the model omits or garbles the priority; a mid-range guess
/// beats a failed triage.
pub const DEFAULT_PRIORITY: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Bug,
    Feature,
    Question,
    Documentation,
    Other,
}

impl IssueType {
    /// Case-insensitive match against the enumerated set. Anything else,
    /// including synonyms like "enhancement", coerces to `Other`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bug" => IssueType::Bug,
            "feature" => IssueType::Feature,
            "question" => IssueType::Question,
            "documentation" => IssueType::Documentation,
            _ => IssueType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Question => "question",
            IssueType::Documentation => "documentation",
            IssueType::Other => "other",
        }
    }
}

/// Canonical triage output. Only constructed by `validate`; every field is
/// present and in range by the time a value of this type exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub priority: u8,
    #[serde(rename = "issueType")]
    pub issue_type: IssueType,
    pub labels: Vec<String>,
}

/// Validate raw model output into an `AnalysisResult`.
///
/// Staged: extract a JSON object from whatever prose or fences the model
/// wrapped it in, parse it, then coerce fields with per-field recovery.
/// Only a missing summary is a hard failure; everything else is repaired.
pub fn validate(raw: &str, label_cap: usize) -> Result<AnalysisResult, ValidationError> {
    let candidate = extract_json(raw).ok_or(ValidationError::NoJsonFound)?;

    let value: Value = serde_json::from_str(candidate)
        .map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ValidationError::MalformedJson("top-level value is not an object".to_owned()))?;

    coerce(object, label_cap)
}

/// Locate the first balanced `{...}` substring, skipping braces inside JSON
/// strings. The model is told to emit bare JSON but routinely wraps it in
/// prose or code fences anyway.
fn extract_json(raw: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(rel) = raw[search_from..].find('{') {
        let start = search_from + rel;
        if let Some(len) = balanced_object_len(&raw[start..]) {
            return Some(&raw[start..start + len]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object starting at byte 0, if it closes.
fn balanced_object_len(s: &str) -> Option<usize> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// First value found under any of the given keys. Canonical names come
/// first; the rest are aliases from the original prompt schema
/// (priority_score, type, suggested_labels).
fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

fn coerce(object: &Map<String, Value>, label_cap: usize) -> Result<AnalysisResult, ValidationError> {
    let summary = field(object, &["summary"])
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ValidationError::IncompleteResult)?
        .to_owned();

    let priority = coerce_priority(field(object, &["priority", "priority_score"]));
    let issue_type = field(object, &["issueType", "issue_type", "type"])
        .and_then(Value::as_str)
        .map_or(IssueType::Other, IssueType::from_raw);
    let labels = coerce_labels(field(object, &["labels", "suggested_labels"]), label_cap);

    Ok(AnalysisResult {
        summary,
        priority,
        issue_type,
        labels,
    })
}

fn coerce_priority(value: Option<&Value>) -> u8 {
    let numeric = match value {
        Some(Value::Number(n)) => n.as_f64(),
        // "priority": "4" is recoverable drift
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(n) if n.is_finite() => {
            (n.round() as i64).clamp(PRIORITY_MIN, PRIORITY_MAX) as u8
        }
        _ => DEFAULT_PRIORITY,
    }
}

fn coerce_labels(value: Option<&Value>, label_cap: usize) -> Vec<String> {
    match value {
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .take(label_cap)
            .collect(),
        _ => Vec::new(),
    }
}
