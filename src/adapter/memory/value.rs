//! JSON value semantics for in-memory execution.
//!
//! Records are `serde_json::Value`s addressed by dot-separated paths. Filter
//! comparisons are loose: numbers, numeric strings, booleans and `null`
//! compare numerically, two strings compare as strings, and a path that does
//! not resolve satisfies nothing but `= null` (and its negation).

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::ast::Literal;

/// Split a dotted path into its segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Resolve `segments` inside `record`. Array elements are addressed by index.
pub fn get_path<'v>(record: &'v Value, segments: &[String]) -> Option<&'v Value> {
    let mut current = record;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `segments`, creating intermediate objects.
pub fn set_path(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    if let Some(parent) = object_at(target, parents) {
        parent.insert(last.clone(), value);
    }
}

/// The object at `segments`, created (or replacing a scalar) as needed.
pub fn object_at<'a>(
    target: &'a mut Map<String, Value>,
    segments: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = target;
    for segment in segments {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    Some(current)
}

/// JSON type name, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => string_number(s),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn literal_number(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Null => Some(0.0),
        Literal::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        Literal::Number(n) => Some(*n),
        Literal::String(s) => string_number(s),
        Literal::Regex { .. } | Literal::Template(_) => None,
    }
}

/// Loose equality between a record value and a filter literal.
pub fn loose_eq(value: Option<&Value>, literal: &Literal) -> bool {
    match (value, literal) {
        (None | Some(Value::Null), Literal::Null) => true,
        (None | Some(Value::Null), _) | (_, Literal::Null) => false,
        (Some(Value::String(a)), Literal::String(b)) => a == b,
        (Some(Value::Bool(a)), Literal::Boolean(b)) => a == b,
        (Some(value), literal) => match (value_number(value), literal_number(literal)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Loose ordering of a record value against a filter literal. `None` means
/// the two are not comparable, so every ordering comparison is false.
pub fn loose_cmp(value: Option<&Value>, literal: &Literal) -> Option<Ordering> {
    match (value?, literal) {
        (Value::String(a), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (value, literal) => value_number(value)?.partial_cmp(&literal_number(literal)?),
    }
}

/// Text a regex is matched against.
pub fn match_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Bool(_)) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Array(_)) => 3,
        Some(Value::Object(_)) => 4,
        Some(Value::Null) => 5,
        None => 6,
    }
}

/// Ascending order used by sorting. Values of the same kind compare
/// naturally; mixed kinds order by kind, with `null` and missing values last.
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => sort_rank(a).cmp(&sort_rank(b)),
    }
}
