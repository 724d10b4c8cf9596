//! In-memory document store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::cursor::{Cursor, DocumentCursor};
use super::driver::Driver;
use super::request::FetchRequest;
use super::Document;
use crate::error::Error;

/// Resource name to documents, held in memory.
///
/// Cursors share a snapshot of the resource, so inserts made while a cursor is
/// open are not visible to it.
#[derive(Default)]
pub struct MemoryDriver {
    resources: RwLock<HashMap<String, Arc<Vec<Document>>>>,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object mapping resource names to document arrays.
    pub fn from_json(value: Value) -> Result<Self, Error> {
        let Value::Object(resources) = value else {
            return Err(Error::Storage(
                "memory store must be a JSON object of resource arrays".to_string(),
            ));
        };

        let driver = Self::new();
        for (resource, docs) in resources {
            let Value::Array(docs) = docs else {
                return Err(Error::Storage(format!(
                    "resource [{resource}] must be an array of documents"
                )));
            };
            for doc in docs {
                driver.insert(&resource, doc)?;
            }
        }
        Ok(driver)
    }

    /// Load a JSON fixture file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let driver = Self::from_json(serde_json::from_str(&raw)?)?;
        debug!(path = %path.display(), resources = driver.resources.read().len(), "loaded memory store");
        Ok(driver)
    }

    /// Append a document to a resource.
    pub fn insert(&self, resource: &str, doc: Value) -> Result<(), Error> {
        let Value::Object(doc) = doc else {
            return Err(Error::Storage(format!(
                "documents in [{resource}] must be JSON objects"
            )));
        };
        let mut resources = self.resources.write();
        let docs = resources.entry(resource.to_string()).or_default();
        Arc::make_mut(docs).push(doc);
        Ok(())
    }

    pub fn len(&self, resource: &str) -> usize {
        self.resources.read().get(resource).map_or(0, |d| d.len())
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    fn prepare_fetch(&self, request: &FetchRequest) -> Result<Box<dyn Cursor>, Error> {
        let docs = self
            .resources
            .read()
            .get(request.resource_name())
            .cloned()
            .unwrap_or_default();
        let source = (0..docs.len()).map(move |i| Ok::<_, Error>(docs[i].clone()));
        Ok(Box::new(DocumentCursor::new(
            Box::new(source),
            request.filter().clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::EntityMetadata;
    use crate::storage::Condition;
    use serde_json::json;

    fn request(resource: &str) -> FetchRequest {
        FetchRequest::new(resource, Arc::new(EntityMetadata::stub(resource, "memory.test")))
    }

    #[test]
    fn test_from_json_and_fetch() {
        let driver = MemoryDriver::from_json(json!({
            "Locations": [{"LocationID": 1}, {"LocationID": 2}, {"LocationID": 3}]
        }))
        .unwrap();
        assert_eq!(driver.len("Locations"), 3);

        let mut req = request("Locations");
        req.add_condition("LocationID", Condition::Ge(json!(2))).unwrap();
        let mut cursor = driver.prepare_batch_fetch(&req, 10).unwrap();
        let mut collection = crate::graph::ResultCollection::new();
        assert_eq!(cursor.next_batch(&mut collection).unwrap(), 2);
    }

    #[test]
    fn test_fetch_one() {
        let driver = MemoryDriver::new();
        driver.insert("Towns", json!({"Name": "Leeds"})).unwrap();
        driver.insert("Towns", json!({"Name": "York"})).unwrap();

        let mut req = request("Towns");
        req.add_condition("Name", Condition::Eq(json!("York"))).unwrap();
        let found = driver.fetch_one(&req).unwrap().unwrap();
        assert_eq!(found["Name"], json!("York"));

        assert!(driver.fetch_one(&request("Nations")).unwrap().is_none());
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(MemoryDriver::from_json(json!([1, 2])).is_err());
        assert!(MemoryDriver::from_json(json!({"A": [1]})).is_err());
    }
}
