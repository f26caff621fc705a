//! Type-checked field extraction for untrusted backend records
//!
//! Backend payloads reach the dashboard as arbitrary JSON. Every read goes through
//! this module: a field is looked up along an ordered list of candidate names and the
//! first candidate whose value has the expected JSON type wins. Anything else
//! (missing key, `null`, wrong primitive type, a record that is not an object at all)
//! is treated as absent and falls through to the next candidate, then to the default.

use serde_json::Value;

/// A Rust type that can be read out of a JSON value without coercion.
pub trait Guarded: Sized {
    /// Returns `Some` only when `value` has exactly the expected JSON type.
    fn from_json(value: &Value) -> Option<Self>;
}

impl Guarded for String {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(String::from)
    }
}

impl Guarded for u64 {
    /// Counts are non-negative; fractional values truncate toward zero.
    fn from_json(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        match value.as_f64() {
            Some(f) if f.is_finite() && f >= 0.0 => Some(f.trunc() as u64),
            _ => None,
        }
    }
}

impl Guarded for bool {
    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

/// Why a lookup ended on its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The record itself is not a JSON object.
    NotAnObject { found: &'static str },
    /// None of the candidate names is present (or all are `null`).
    Missing,
    /// At least one candidate is present but none has the expected type.
    TypeMismatch {
        field: String,
        found: &'static str,
    },
}

/// Outcome of probing a record for one canonical field.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found { field: String, value: T },
    Fallback { reason: FallbackReason },
}

impl<T> Lookup<T> {
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Lookup::Found { value, .. } => value,
            Lookup::Fallback { .. } => default,
        }
    }
}

/// Name of the JSON type of `value`, as it appears in fallback diagnostics.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Walks `candidates` in priority order and reports the first type-matching value.
pub fn probe<T: Guarded>(record: &Value, candidates: &[&str]) -> Lookup<T> {
    probe_by(record, candidates, T::from_json)
}

/// Like [`probe`] with a caller-supplied matcher, for fields whose accepted shape is
/// narrower or wider than a single JSON primitive.
pub fn probe_by<T, F>(record: &Value, candidates: &[&str], matcher: F) -> Lookup<T>
where
    F: Fn(&Value) -> Option<T>,
{
    let Some(object) = record.as_object() else {
        return Lookup::Fallback {
            reason: FallbackReason::NotAnObject {
                found: json_type_name(record),
            },
        };
    };

    let mut first_mismatch: Option<(String, &'static str)> = None;

    for name in candidates {
        let Some(value) = object.get(*name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if let Some(matched) = matcher(value) {
            return Lookup::Found {
                field: (*name).to_string(),
                value: matched,
            };
        }
        if first_mismatch.is_none() {
            first_mismatch = Some(((*name).to_string(), json_type_name(value)));
        }
    }

    let reason = match first_mismatch {
        Some((field, found)) => FallbackReason::TypeMismatch { field, found },
        None => FallbackReason::Missing,
    };
    Lookup::Fallback { reason }
}

/// Extracts a field of type `T`, returning `default` when no candidate matches.
///
/// Never panics, whatever the shape of `record`.
pub fn extract<T: Guarded>(record: &Value, candidates: &[&str], default: T) -> T {
    probe(record, candidates).unwrap_or(default)
}

/// Matcher for identifier fields: a non-empty string, or a non-negative integral number
/// rendered in decimal. Empty strings do not count as identifiers.
pub fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => n.as_u64().map(|id| id.to_string()),
        _ => None,
    }
}
