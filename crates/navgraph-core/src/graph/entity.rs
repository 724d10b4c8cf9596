//! Entities as ordered property bags.

use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::storage::Document;

/// Shared handle to an entity. Mutation goes through `Arc::make_mut`, so a
/// collection holding the same entity never sees another collection's edits.
pub type EntityRef = Arc<Entity>;

/// Value of one entity field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain JSON value as stored.
    Value(Value),
    /// Embedded scalar navigation result; `None` serializes as `null`.
    Entity(Option<EntityRef>),
    /// Embedded collection navigation results.
    Entities(Vec<EntityRef>),
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(v) => v.serialize(serializer),
            FieldValue::Entity(Some(entity)) => entity.serialize(serializer),
            FieldValue::Entity(None) => serializer.serialize_none(),
            FieldValue::Entities(entities) => {
                let mut seq = serializer.serialize_seq(Some(entities.len()))?;
                for entity in entities {
                    seq.serialize_element(entity.as_ref())?;
                }
                seq.end()
            }
        }
    }
}

/// A record whose field set is shaped by the query at runtime.
///
/// Fields keep insertion order, which is also the serialized order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entity {
    fields: Vec<(String, FieldValue)>,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_document(doc: Document) -> Self {
        Self {
            fields: doc
                .into_iter()
                .map(|(name, value)| (name, FieldValue::Value(value)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Plain JSON value of a field; `None` for embedded entities.
    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Set a field, replacing in place or appending.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Append to a collection navigation field, creating it if needed.
    pub fn push_related(&mut self, name: &str, related: EntityRef) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, FieldValue::Entities(list))) => list.push(related),
            Some((_, other)) => *other = FieldValue::Entities(vec![related]),
            None => self
                .fields
                .push((name.to_string(), FieldValue::Entities(vec![related]))),
        }
    }

    /// Drop every field for which `keep` returns false.
    pub fn retain_fields(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.fields.retain(|(name, _)| keep(name));
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Normalized key or index value.
///
/// Floats are truncated to integers: some stores keep numeric keys as doubles,
/// and `13001.0` must join with `13001`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl IndexKey {
    /// `None` for arrays and objects, which cannot be keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(IndexKey::Null),
            Value::Bool(b) => Some(IndexKey::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(IndexKey::Int),
            Value::String(s) => Some(IndexKey::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            IndexKey::Null => Value::Null,
            IndexKey::Bool(b) => Value::Bool(*b),
            IndexKey::Int(i) => Value::from(*i),
            IndexKey::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Null => write!(f, "null"),
            IndexKey::Bool(b) => write!(f, "{b}"),
            IndexKey::Int(i) => write!(f, "{i}"),
            IndexKey::Str(s) => write!(f, "'{s}'"),
        }
    }
}
