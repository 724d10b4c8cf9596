//! Forward-only cursors over stored documents.

use std::sync::Arc;

use tracing::trace;

use super::filter::FilterEvaluator;
use super::request::FetchFilter;
use super::Document;
use crate::error::Error;
use crate::graph::{Entity, ResultCollection};

/// Forward-only document cursor.
pub trait Cursor {
    /// Next matching document, or `None` once exhausted.
    fn next_document(&mut self) -> Result<Option<Document>, Error>;

    /// Whether another document is available.
    fn has_more(&self) -> bool;
}

/// Boxed source of raw documents for [`DocumentCursor`].
pub type DocumentSource = Box<dyn Iterator<Item = Result<Document, Error>>>;

/// Applies a filter to a raw document source and keeps one match of lookahead,
/// so `has_more` is exact.
pub struct DocumentCursor {
    source: DocumentSource,
    filter: FetchFilter,
    lookahead: Option<Document>,
}

impl DocumentCursor {
    pub fn new(source: DocumentSource, filter: FetchFilter) -> Result<Self, Error> {
        let mut cursor = Self {
            source,
            filter,
            lookahead: None,
        };
        cursor.lookahead = cursor.advance()?;
        Ok(cursor)
    }

    fn advance(&mut self) -> Result<Option<Document>, Error> {
        for doc in self.source.by_ref() {
            let doc = doc?;
            if FilterEvaluator::matches(&self.filter, &doc) {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }
}

impl Cursor for DocumentCursor {
    fn next_document(&mut self) -> Result<Option<Document>, Error> {
        let Some(current) = self.lookahead.take() else {
            return Ok(None);
        };
        self.lookahead = self.advance()?;
        Ok(Some(current))
    }

    fn has_more(&self) -> bool {
        self.lookahead.is_some()
    }
}

/// Pulls documents from a cursor in bounded batches.
pub struct BatchCursor {
    inner: Box<dyn Cursor>,
    batch_size: usize,
}

impl BatchCursor {
    pub fn new(inner: Box<dyn Cursor>, batch_size: usize) -> Self {
        Self {
            inner,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Add up to `batch_size` entities to `collection`. Returns how many
    /// documents were pulled.
    pub fn next_batch(&mut self, collection: &mut ResultCollection) -> Result<usize, Error> {
        let mut pulled = 0;
        while pulled < self.batch_size {
            let Some(doc) = self.inner.next_document()? else {
                break;
            };
            collection.add(Arc::new(Entity::from_document(doc)))?;
            pulled += 1;
        }
        trace!(pulled, has_more = self.inner.has_more(), "pulled batch");
        Ok(pulled)
    }

    pub fn has_more(&self) -> bool {
        self.inner.has_more()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Condition;
    use serde_json::json;

    fn source(ids: &[i64]) -> DocumentSource {
        let docs: Vec<Document> = ids
            .iter()
            .map(|id| {
                let mut doc = Document::new();
                doc.insert("ID".to_string(), json!(id));
                doc
            })
            .collect();
        Box::new(docs.into_iter().map(Ok::<_, Error>))
    }

    #[test]
    fn test_lookahead_is_exact() {
        let mut filter = FetchFilter::new();
        filter.insert("ID", Condition::Gt(json!(2))).unwrap();
        let mut cursor = DocumentCursor::new(source(&[1, 2, 3, 4, 1]), filter).unwrap();

        assert!(cursor.has_more());
        assert_eq!(cursor.next_document().unwrap().unwrap()["ID"], json!(3));
        assert!(cursor.has_more());
        assert_eq!(cursor.next_document().unwrap().unwrap()["ID"], json!(4));
        assert!(!cursor.has_more());
        assert!(cursor.next_document().unwrap().is_none());
    }

    #[test]
    fn test_batches_are_bounded() {
        let cursor = DocumentCursor::new(source(&[1, 2, 3, 4, 5]), FetchFilter::new()).unwrap();
        let mut batch = BatchCursor::new(Box::new(cursor), 2);
        let mut collection = ResultCollection::new();
        collection.set_primary_key("ID").unwrap();

        assert_eq!(batch.next_batch(&mut collection).unwrap(), 2);
        assert_eq!(collection.len(), 2);
        assert!(batch.has_more());

        collection.purge();
        assert_eq!(batch.next_batch(&mut collection).unwrap(), 2);
        collection.purge();
        assert_eq!(batch.next_batch(&mut collection).unwrap(), 1);
        assert!(!batch.has_more());
        collection.purge();
        assert_eq!(batch.next_batch(&mut collection).unwrap(), 0);
    }
}
