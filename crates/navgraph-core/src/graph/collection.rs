//! Indexed, order-preserving entity container.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use serde_json::Value;

use super::entity::{Entity, EntityRef, IndexKey};
use super::node::NodeId;
use crate::error::Error;

/// Position of an entity inside a [`ResultCollection`].
pub type Slot = usize;

/// Entities keyed by primary key (deduplicating by key) or by insertion order
/// (deduplicating by identity), plus secondary indexes.
///
/// The primary key and indexes must be declared while the collection is
/// empty. Every entity added must carry the primary key and every index
/// field.
#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    node: Option<NodeId>,
    primary_key: Option<String>,
    index_names: Vec<String>,
    slots: Vec<Option<EntityRef>>,
    live: usize,
    by_primary: HashMap<IndexKey, Slot>,
    indexes: HashMap<String, BTreeMap<IndexKey, Vec<Slot>>>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty collection produced by `node`.
    pub fn for_node(node: NodeId) -> Self {
        Self {
            node: Some(node),
            ..Self::default()
        }
    }

    /// Empty collection with the same node, primary key and indexes.
    pub fn empty_like(other: &ResultCollection) -> Self {
        let mut collection = Self {
            node: other.node,
            primary_key: other.primary_key.clone(),
            ..Self::default()
        };
        for name in &other.index_names {
            collection.register_index(name);
        }
        collection
    }

    /// Copy whose membership can change without touching `self`. Entities
    /// are shared until one side mutates them.
    pub fn working_copy(&self) -> Self {
        self.clone()
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn index_names(&self) -> &[String] {
        &self.index_names
    }

    pub fn set_primary_key(&mut self, name: impl Into<String>) -> Result<(), Error> {
        let name = name.into();
        if name.is_empty() {
            return Ok(());
        }
        self.ensure_empty("set primary key", &name)?;
        self.index_names.retain(|n| *n != name);
        self.indexes.remove(&name);
        self.primary_key = Some(name);
        Ok(())
    }

    /// Declare a secondary index. The primary key and existing indexes are
    /// ignored.
    pub fn add_index(&mut self, name: &str) -> Result<(), Error> {
        self.ensure_empty("add index", name)?;
        if name.is_empty() || self.primary_key.as_deref() == Some(name) {
            return Ok(());
        }
        self.register_index(name);
        Ok(())
    }

    pub fn add_indexes<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<(), Error> {
        names.into_iter().try_for_each(|name| self.add_index(name))
    }

    fn register_index(&mut self, name: &str) {
        if !self.index_names.iter().any(|n| n == name) {
            self.index_names.push(name.to_string());
            self.indexes.insert(name.to_string(), BTreeMap::new());
        }
    }

    fn ensure_empty(&self, what: &str, name: &str) -> Result<(), Error> {
        if self.live > 0 {
            return Err(Error::CollectionInvariant(format!(
                "cannot {what} [{name}]: collection already holds {} entities",
                self.live
            )));
        }
        Ok(())
    }

    /// Normalized value of `field` on `entity`.
    pub fn index_value(&self, entity: &Entity, field: &str) -> Result<IndexKey, Error> {
        let value = entity.value(field).ok_or_else(|| {
            Error::CollectionInvariant(format!("cannot find index [{field}] in entity"))
        })?;
        IndexKey::from_value(value).ok_or_else(|| {
            Error::CollectionInvariant(format!(
                "index [{field}] has a non-scalar value: {value}"
            ))
        })
    }

    /// Add an entity. Returns `false` when it is already present.
    pub fn add(&mut self, entity: EntityRef) -> Result<bool, Error> {
        let primary = match &self.primary_key {
            Some(pk) => {
                let key = self.index_value(&entity, pk)?;
                if self.by_primary.contains_key(&key) {
                    return Ok(false);
                }
                Some(key)
            }
            None => {
                if self.iter().any(|e| Arc::ptr_eq(e, &entity)) {
                    return Ok(false);
                }
                None
            }
        };

        let keys = self
            .index_names
            .iter()
            .map(|name| self.index_value(&entity, name))
            .collect::<Result<Vec<_>, _>>()?;

        let slot = self.slots.len();
        self.slots.push(Some(entity));
        self.live += 1;
        if let Some(key) = primary {
            self.by_primary.insert(key, slot);
        }
        for (name, key) in self.index_names.iter().zip(keys) {
            if let Some(index) = self.indexes.get_mut(name) {
                index.entry(key).or_default().push(slot);
            }
        }
        Ok(true)
    }

    pub fn add_all(&mut self, entities: impl IntoIterator<Item = EntityRef>) -> Result<(), Error> {
        for entity in entities {
            self.add(entity)?;
        }
        Ok(())
    }

    /// Remove an entity, matched by primary key or else by identity.
    pub fn remove(&mut self, entity: &EntityRef) -> Result<bool, Error> {
        let slot = match &self.primary_key {
            Some(pk) => {
                let key = self.index_value(entity, pk)?;
                self.by_primary.get(&key).copied()
            }
            None => self
                .slots
                .iter()
                .position(|s| s.as_ref().is_some_and(|e| Arc::ptr_eq(e, entity))),
        };
        let Some(slot) = slot else {
            return Ok(false);
        };
        let Some(stored) = self.slots[slot].take() else {
            return Ok(false);
        };

        for name in &self.index_names {
            let key = self.index_value(&stored, name)?;
            if let Some(index) = self.indexes.get_mut(name) {
                if let Some(list) = index.get_mut(&key) {
                    list.retain(|s| *s != slot);
                    if list.is_empty() {
                        index.remove(&key);
                    }
                }
            }
        }
        if let Some(pk) = &self.primary_key {
            let key = self.index_value(&stored, pk)?;
            self.by_primary.remove(&key);
        }
        self.live -= 1;
        Ok(true)
    }

    /// Slots whose `field` equals `key`. `field` must be the primary key or a
    /// declared index.
    pub fn slots_by_index(&self, field: &str, key: &IndexKey) -> Result<Vec<Slot>, Error> {
        if self.primary_key.as_deref() == Some(field) {
            return Ok(self.by_primary.get(key).copied().into_iter().collect());
        }
        match self.indexes.get(field) {
            Some(index) => Ok(index.get(key).cloned().unwrap_or_default()),
            None => Err(Error::CollectionInvariant(format!(
                "undefined index [{field}]"
            ))),
        }
    }

    pub fn entities_by_index(&self, field: &str, key: &IndexKey) -> Result<Vec<EntityRef>, Error> {
        Ok(self
            .slots_by_index(field, key)?
            .into_iter()
            .filter_map(|slot| self.entity(slot).cloned())
            .collect())
    }

    pub fn entity(&self, slot: Slot) -> Option<&EntityRef> {
        self.slots.get(slot)?.as_ref()
    }

    /// Mutable access to a stored entity, copying it first if it is shared.
    /// Key and index fields must not be changed through this.
    pub fn entity_mut(&mut self, slot: Slot) -> Option<&mut Entity> {
        self.slots.get_mut(slot)?.as_mut().map(Arc::make_mut)
    }

    /// Distinct values of `field`, from the primary key or an index when one
    /// exists, else by scanning every entity.
    pub fn distinct_values(&self, field: &str) -> Result<Vec<Value>, Error> {
        if self.primary_key.as_deref() == Some(field) {
            return self
                .iter()
                .map(|e| self.index_value(e, field).map(|k| k.to_value()))
                .collect();
        }
        if let Some(index) = self.indexes.get(field) {
            return Ok(index
                .iter()
                .filter(|(_, slots)| !slots.is_empty())
                .map(|(key, _)| key.to_value())
                .collect());
        }

        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for entity in self.iter() {
            let key = self.index_value(entity, field)?;
            if seen.insert(key.clone()) {
                values.push(key.to_value());
            }
        }
        Ok(values)
    }

    /// Remove every entity, keeping the key and index layout.
    pub fn purge(&mut self) {
        self.slots.clear();
        self.live = 0;
        self.by_primary.clear();
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.slots.iter().flatten()
    }

    /// Live slots in insertion order.
    pub fn slots(&self) -> Vec<Slot> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.as_ref().map(|_| slot))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl Serialize for ResultCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.live))?;
        for entity in self.iter() {
            seq.serialize_element(entity.as_ref())?;
        }
        seq.end()
    }
}
