//! Document store on sled: one tree per resource, JSON-encoded documents.

use std::path::Path;

use serde_json::Value;
use sled::Db;
use tracing::debug;

use super::cursor::{Cursor, DocumentCursor};
use super::driver::Driver;
use super::request::FetchRequest;
use super::Document;
use crate::error::Error;

/// Sled-backed document store.
pub struct SledDriver {
    db: Db,
}

impl SledDriver {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        debug!(path = %path.display(), "opened sled store");
        Ok(Self { db })
    }

    /// A throwaway database removed on drop.
    pub fn temporary() -> Result<Self, Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    /// Append a document to a resource. Documents keep insertion order.
    pub fn insert(&self, resource: &str, doc: &Value) -> Result<(), Error> {
        if !doc.is_object() {
            return Err(Error::Storage(format!(
                "documents in [{resource}] must be JSON objects"
            )));
        }
        let tree = self.db.open_tree(resource)?;
        let id = self.db.generate_id()?;
        tree.insert(id.to_be_bytes(), serde_json::to_vec(doc)?)?;
        Ok(())
    }

    /// Import every resource of a `{resource: [documents]}` object.
    pub fn import(&self, value: &Value) -> Result<usize, Error> {
        let resources = value.as_object().ok_or_else(|| {
            Error::Storage("import data must be a JSON object of resource arrays".to_string())
        })?;

        let mut count = 0;
        for (resource, docs) in resources {
            let docs = docs.as_array().ok_or_else(|| {
                Error::Storage(format!("resource [{resource}] must be an array of documents"))
            })?;
            for doc in docs {
                self.insert(resource, doc)?;
                count += 1;
            }
        }
        self.db.flush()?;
        Ok(count)
    }

    pub fn len(&self, resource: &str) -> Result<usize, Error> {
        Ok(self.db.open_tree(resource)?.len())
    }
}

impl Driver for SledDriver {
    fn name(&self) -> &str {
        "sled"
    }

    fn prepare_fetch(&self, request: &FetchRequest) -> Result<Box<dyn Cursor>, Error> {
        let tree = self.db.open_tree(request.resource_name())?;
        let source = tree.iter().values().map(|bytes| -> Result<Document, Error> {
            let bytes = bytes?;
            match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(doc) => Ok(doc),
                _ => Err(Error::Storage("stored document is not an object".to_string())),
            }
        });
        Ok(Box::new(DocumentCursor::new(
            Box::new(source),
            request.filter().clone(),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ResultCollection;
    use crate::metadata::EntityMetadata;
    use crate::storage::Condition;
    use serde_json::json;
    use std::sync::Arc;

    fn request(resource: &str) -> FetchRequest {
        FetchRequest::new(resource, Arc::new(EntityMetadata::stub(resource, "sled.test")))
    }

    #[test]
    fn test_import_and_batch_fetch() {
        let driver = SledDriver::temporary().unwrap();
        let imported = driver
            .import(&json!({
                "Locations": [
                    {"LocationID": 13001, "Town": "Leeds"},
                    {"LocationID": 12000, "Town": "York"},
                    {"LocationID": 13002, "Town": "Hull"}
                ]
            }))
            .unwrap();
        assert_eq!(imported, 3);
        assert_eq!(driver.len("Locations").unwrap(), 3);

        let mut req = request("Locations");
        req.add_condition("LocationID", Condition::Gt(json!(13000)))
            .unwrap();
        let mut cursor = driver.prepare_batch_fetch(&req, 1).unwrap();
        let mut collection = ResultCollection::new();
        assert_eq!(cursor.next_batch(&mut collection).unwrap(), 1);
        assert!(cursor.has_more());
        assert_eq!(cursor.next_batch(&mut collection).unwrap(), 1);
        assert!(!cursor.has_more());

        let towns: Vec<_> = collection
            .iter()
            .filter_map(|e| e.value("Town").cloned())
            .collect();
        assert_eq!(towns, vec![json!("Leeds"), json!("Hull")]);
    }

    #[test]
    fn test_persists_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let driver = SledDriver::open(dir.path()).unwrap();
            driver.insert("Towns", &json!({"Name": "Leeds"})).unwrap();
            driver.db.flush().unwrap();
        }
        let driver = SledDriver::open(dir.path()).unwrap();
        let found = driver.fetch_one(&request("Towns")).unwrap().unwrap();
        assert_eq!(found["Name"], json!("Leeds"));
    }
}
