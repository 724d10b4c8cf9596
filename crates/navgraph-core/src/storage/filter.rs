//! Filter evaluation against stored JSON documents.

use std::cmp::Ordering;

use serde_json::Value;

use super::request::{Condition, FetchFilter};
use super::Document;

/// Evaluates a [`FetchFilter`] against documents.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Whether `doc` satisfies every condition of `filter`.
    pub fn matches(filter: &FetchFilter, doc: &Document) -> bool {
        filter.clauses().all(|(field, conditions)| {
            let value = Self::lookup(doc, field);
            conditions.iter().all(|c| Self::evaluate(c, value))
        })
    }

    /// Resolve a field, following dots into nested objects when the document
    /// has no literal key of that name.
    pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
        if let Some(v) = doc.get(path) {
            return Some(v);
        }
        let mut segments = path.split('.');
        let mut current = doc.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    fn evaluate(condition: &Condition, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            // A missing field only satisfies inequality.
            return matches!(condition, Condition::Ne(_));
        };

        match condition {
            Condition::Eq(v) => Self::values_equal(value, v),
            Condition::Ne(v) => !Self::values_equal(value, v),
            Condition::Gt(v) => Self::compare_values(value, v).is_some_and(Ordering::is_gt),
            Condition::Ge(v) => Self::compare_values(value, v).is_some_and(Ordering::is_ge),
            Condition::Lt(v) => Self::compare_values(value, v).is_some_and(Ordering::is_lt),
            Condition::Le(v) => Self::compare_values(value, v).is_some_and(Ordering::is_le),
            Condition::In(values) => values.iter().any(|v| Self::values_equal(value, v)),
            Condition::Contains(needle) => Self::string_match(value, needle, |h, n| h.contains(n)),
            Condition::StartsWith(needle) => {
                Self::string_match(value, needle, |h, n| h.starts_with(n))
            }
            Condition::EndsWith(needle) => Self::string_match(value, needle, |h, n| h.ends_with(n)),
        }
    }

    /// Equality with numbers compared by value across integer/float forms.
    fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Number(_), Value::Number(_)) => {
                Self::compare_values(a, b) == Some(Ordering::Equal)
            }
            _ => a == b,
        }
    }

    fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
            },
            (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    /// Case-insensitive string command.
    fn string_match(value: &Value, needle: &str, op: impl Fn(&str, &str) -> bool) -> bool {
        match value {
            Value::String(haystack) => op(&haystack.to_lowercase(), &needle.to_lowercase()),
            _ => false,
        }
    }
}
