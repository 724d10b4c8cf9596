//! Fetch requests and their native filter clauses.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use navgraph_lang::Operator;
use serde_json::{json, Map, Number, Value};

use crate::error::Error;
use crate::metadata::{DataType, EntityMetadata};

/// A single condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Ge(Value),
    Lt(Value),
    Le(Value),
    In(Vec<Value>),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl Condition {
    /// Mongo-style operator name, used for logging and conflict detection.
    pub fn operator_name(&self) -> &'static str {
        match self {
            Condition::Eq(_) => "$eq",
            Condition::Ne(_) => "$ne",
            Condition::Gt(_) => "$gt",
            Condition::Ge(_) => "$gte",
            Condition::Lt(_) => "$lt",
            Condition::Le(_) => "$lte",
            Condition::In(_) => "$in",
            Condition::Contains(_) => "$contains",
            Condition::StartsWith(_) => "$startsWith",
            Condition::EndsWith(_) => "$endsWith",
        }
    }

    fn operand(&self) -> Value {
        match self {
            Condition::Eq(v)
            | Condition::Ne(v)
            | Condition::Gt(v)
            | Condition::Ge(v)
            | Condition::Lt(v)
            | Condition::Le(v) => v.clone(),
            Condition::In(values) => Value::Array(values.clone()),
            Condition::Contains(s) | Condition::StartsWith(s) | Condition::EndsWith(s) => {
                Value::String(s.clone())
            }
        }
    }
}

/// Conjunction of per-field conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchFilter {
    clauses: BTreeMap<String, Vec<Condition>>,
}

impl FetchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate condition.
    ///
    /// Equality is exclusive with any other condition on the same field, and a
    /// field can carry each operator only once.
    pub fn insert(&mut self, field: &str, condition: Condition) -> Result<(), Error> {
        let existing = self.clauses.entry(field.to_string()).or_default();
        let conflict = existing.iter().any(|c| {
            matches!(c, Condition::Eq(_))
                || matches!(condition, Condition::Eq(_))
                || c.operator_name() == condition.operator_name()
        });
        if conflict {
            return Err(Error::Predicate(format!(
                "conflicting conditions on field [{field}]: {} cannot be combined with {}",
                condition.operator_name(),
                existing
                    .iter()
                    .map(Condition::operator_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        existing.push(condition);
        Ok(())
    }

    /// Restrict `field` to `values` on top of any existing conditions.
    pub fn restrict_in(&mut self, field: &str, values: Vec<Value>) {
        self.clauses
            .entry(field.to_string())
            .or_default()
            .push(Condition::In(values));
    }

    pub fn clauses(&self) -> impl Iterator<Item = (&str, &[Condition])> {
        self.clauses.iter().map(|(f, c)| (f.as_str(), c.as_slice()))
    }

    pub fn conditions(&self, field: &str) -> &[Condition] {
        self.clauses.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Render as a Mongo-style query document.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        for (field, conditions) in &self.clauses {
            let rendered = match conditions.as_slice() {
                [Condition::Eq(v)] => v.clone(),
                _ => Value::Object(
                    conditions
                        .iter()
                        .map(|c| (c.operator_name().to_string(), c.operand()))
                        .collect(),
                ),
            };
            doc.insert(field.clone(), rendered);
        }
        Value::Object(doc)
    }
}

impl fmt::Display for FetchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

/// What to fetch from which resource.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    resource_name: String,
    metadata: Arc<EntityMetadata>,
    filter: FetchFilter,
    selected: BTreeSet<String>,
}

impl FetchRequest {
    pub fn new(resource_name: impl Into<String>, metadata: Arc<EntityMetadata>) -> Self {
        Self {
            resource_name: resource_name.into(),
            metadata,
            filter: FetchFilter::new(),
            selected: BTreeSet::new(),
        }
    }

    /// Request over the entity's default resource.
    pub fn for_entity(metadata: Arc<EntityMetadata>) -> Self {
        Self::new(metadata.default_resource_name().to_string(), metadata)
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn metadata(&self) -> &Arc<EntityMetadata> {
        &self.metadata
    }

    pub fn filter(&self) -> &FetchFilter {
        &self.filter
    }

    pub fn selected_fields(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn add_select(&mut self, field: impl Into<String>) {
        self.selected.insert(field.into());
    }

    /// Add a raw condition without type coercion.
    pub fn add_condition(&mut self, field: &str, condition: Condition) -> Result<(), Error> {
        self.filter.insert(field, condition)
    }

    /// Translate a predicate into a filter condition, coercing the literal by
    /// the field's declared data type.
    pub fn add_predicate(
        &mut self,
        field: &str,
        operator: Operator,
        value: &str,
    ) -> Result<(), Error> {
        let type_name = self.metadata.data_type_name(field)?;
        let data_type = DataType::from_name(type_name).ok_or_else(|| {
            Error::Predicate(format!(
                "unknown data type [{type_name}] for field [{field}] on entity [{}]",
                self.metadata.entity_name()
            ))
        })?;

        if operator.is_string_command() && data_type != DataType::String {
            return Err(Error::Predicate(format!(
                "{operator} requires a string field, [{field}] is {type_name}"
            )));
        }
        let condition = match operator {
            Operator::SubstringOf => Condition::Contains(value.to_string()),
            Operator::StartsWith => Condition::StartsWith(value.to_string()),
            Operator::EndsWith => Condition::EndsWith(value.to_string()),
            Operator::Eq => Condition::Eq(coerce(data_type, field, value)?),
            Operator::Ne => Condition::Ne(coerce(data_type, field, value)?),
            Operator::Gt => Condition::Gt(coerce(data_type, field, value)?),
            Operator::Ge => Condition::Ge(coerce(data_type, field, value)?),
            Operator::Lt => Condition::Lt(coerce(data_type, field, value)?),
            Operator::Le => Condition::Le(coerce(data_type, field, value)?),
        };

        self.filter.insert(field, condition)
    }

    /// Join clause: `field` must be one of `values`.
    pub fn add_join_restriction(&mut self, field: &str, values: Vec<Value>) {
        self.filter.restrict_in(field, values);
    }
}

/// Coerce a literal to the JSON representation of `data_type`.
pub fn coerce(data_type: DataType, field: &str, raw: &str) -> Result<Value, Error> {
    let invalid = |expected: &str| {
        Error::Predicate(format!(
            "invalid {expected} literal [{raw}] for field [{field}]"
        ))
    };

    match data_type {
        DataType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| invalid("integer")),
        DataType::Float => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| invalid("float")),
        DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(json!(true)),
            "false" => Ok(json!(false)),
            _ => Err(invalid("boolean")),
        },
        DataType::String => Ok(Value::String(raw.to_string())),
        DataType::DateTime => normalize_datetime(raw)
            .map(Value::String)
            .ok_or_else(|| invalid("datetime")),
    }
}

/// Normalize a datetime literal to RFC 3339 in UTC.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC), plain dates,
/// and the OData `datetime'...'` wrapper around any of these.
pub fn normalize_datetime(raw: &str) -> Option<String> {
    let raw = raw
        .strip_prefix("datetime'")
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(raw);

    let utc: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        naive.and_utc()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
    };

    Some(utc.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Arc<EntityMetadata> {
        Arc::new(
            EntityMetadata::from_document(json!({"description": {
                "shortName": "Location",
                "defaultResourceName": "Locations",
                "dataProperties": [
                    {"name": "LocationID", "dataType": "Int32"},
                    {"name": "Town", "dataType": "String"},
                    {"name": "Opened", "dataType": "DateTime"},
                    {"name": "Rating", "dataType": "Double"},
                    {"name": "Blob", "dataType": "Binary"}
                ]
            }}))
            .unwrap(),
        )
    }

    #[test]
    fn test_add_predicate_coerces_integer() {
        let mut request = FetchRequest::for_entity(metadata());
        assert_eq!(request.resource_name(), "Locations");
        request
            .add_predicate("LocationID", Operator::Gt, "13000")
            .unwrap();
        assert_eq!(
            request.filter().to_document(),
            json!({"LocationID": {"$gt": 13000}})
        );
    }

    #[test]
    fn test_range_on_one_field() {
        let mut request = FetchRequest::for_entity(metadata());
        request.add_predicate("LocationID", Operator::Ge, "1").unwrap();
        request.add_predicate("LocationID", Operator::Lt, "10").unwrap();
        assert_eq!(request.filter().conditions("LocationID").len(), 2);
    }

    #[test]
    fn test_equality_is_exclusive() {
        let mut request = FetchRequest::for_entity(metadata());
        request.add_predicate("Town", Operator::Eq, "Leeds").unwrap();
        let err = request.add_predicate("Town", Operator::Ne, "York");
        assert!(matches!(err, Err(Error::Predicate(_))));

        let mut request = FetchRequest::for_entity(metadata());
        request.add_predicate("LocationID", Operator::Gt, "1").unwrap();
        assert!(request.add_predicate("LocationID", Operator::Eq, "5").is_err());
        assert!(request.add_predicate("LocationID", Operator::Gt, "2").is_err());
    }

    #[test]
    fn test_join_restriction_combines_with_equality() {
        let mut request = FetchRequest::for_entity(metadata());
        request.add_predicate("LocationID", Operator::Eq, "5").unwrap();
        request.add_join_restriction("LocationID", vec![json!(5), json!(6)]);
        assert_eq!(
            request.filter().to_document(),
            json!({"LocationID": {"$eq": 5, "$in": [5, 6]}})
        );
    }

    #[test]
    fn test_string_commands() {
        let mut request = FetchRequest::for_entity(metadata());
        request
            .add_predicate("Town", Operator::SubstringOf, "ham")
            .unwrap();
        assert_eq!(
            request.filter().conditions("Town"),
            &[Condition::Contains("ham".to_string())]
        );
        assert!(request
            .add_predicate("LocationID", Operator::StartsWith, "1")
            .is_err());
    }

    #[test]
    fn test_each_operator_maps_to_its_condition() {
        let cases = [
            (Operator::Eq, "LocationID", "5", "$eq"),
            (Operator::Ne, "LocationID", "5", "$ne"),
            (Operator::Gt, "LocationID", "5", "$gt"),
            (Operator::Ge, "LocationID", "5", "$gte"),
            (Operator::Lt, "LocationID", "5", "$lt"),
            (Operator::Le, "LocationID", "5", "$lte"),
            (Operator::SubstringOf, "Town", "ee", "$contains"),
            (Operator::StartsWith, "Town", "Le", "$startsWith"),
            (Operator::EndsWith, "Town", "ds", "$endsWith"),
        ];
        for (operator, field, value, expected) in cases {
            let mut request = FetchRequest::for_entity(metadata());
            request.add_predicate(field, operator, value).unwrap();
            let conditions = request.filter().conditions(field);
            assert_eq!(conditions.len(), 1, "{operator}");
            assert_eq!(conditions[0].operator_name(), expected, "{operator}");
        }
    }

    #[test]
    fn test_unknown_data_type_and_bad_literal() {
        let mut request = FetchRequest::for_entity(metadata());
        assert!(matches!(
            request.add_predicate("Blob", Operator::Eq, "x"),
            Err(Error::Predicate(_))
        ));
        assert!(matches!(
            request.add_predicate("LocationID", Operator::Eq, "abc"),
            Err(Error::Predicate(_))
        ));
        assert!(matches!(
            request.add_predicate("Missing", Operator::Eq, "1"),
            Err(Error::Metadata(_))
        ));
    }

    #[test]
    fn test_float_and_datetime() {
        let mut request = FetchRequest::for_entity(metadata());
        request.add_predicate("Rating", Operator::Ge, "3.5").unwrap();
        request
            .add_predicate("Opened", Operator::Lt, "datetime'2014-01-01T00:00:00'")
            .unwrap();
        assert_eq!(
            request.filter().to_document(),
            json!({
                "Opened": {"$lt": "2014-01-01T00:00:00Z"},
                "Rating": {"$gte": 3.5}
            })
        );
    }

    #[test]
    fn test_normalize_datetime() {
        assert_eq!(
            normalize_datetime("2014-06-01T12:00:00+02:00").as_deref(),
            Some("2014-06-01T10:00:00Z")
        );
        assert_eq!(
            normalize_datetime("2014-06-01").as_deref(),
            Some("2014-06-01T00:00:00Z")
        );
        assert_eq!(normalize_datetime("yesterday"), None);
    }
}
