//! Storage layer: fetch requests, cursors, and document drivers.

pub mod cursor;
pub mod driver;
pub mod filter;
pub mod manager;
pub mod memory;
pub mod request;
pub mod sled_store;

/// A stored document.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use cursor::{BatchCursor, Cursor, DocumentCursor};
pub use driver::Driver;
pub use filter::FilterEvaluator;
pub use manager::StorageManager;
pub use memory::MemoryDriver;
pub use request::{Condition, FetchFilter, FetchRequest};
pub use sled_store::SledDriver;
