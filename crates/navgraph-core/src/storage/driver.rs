//! Storage driver contract.

use super::cursor::{BatchCursor, Cursor};
use super::request::FetchRequest;
use super::Document;
use crate::error::Error;

/// A connection to one backing container.
///
/// Drivers are shared across queries, so they must be thread-safe; the
/// cursors they hand out are owned by a single query.
pub trait Driver: Send + Sync {
    /// Short driver name, e.g. `memory`.
    fn name(&self) -> &str;

    /// Open a cursor over every document of the request's resource that
    /// matches its filter.
    fn prepare_fetch(&self, request: &FetchRequest) -> Result<Box<dyn Cursor>, Error>;

    /// First matching document.
    fn fetch_one(&self, request: &FetchRequest) -> Result<Option<Document>, Error> {
        self.prepare_fetch(request)?.next_document()
    }

    /// Cursor pulling at most `batch_size` documents at a time.
    fn prepare_batch_fetch(
        &self,
        request: &FetchRequest,
        batch_size: usize,
    ) -> Result<BatchCursor, Error> {
        Ok(BatchCursor::new(self.prepare_fetch(request)?, batch_size))
    }
}
