//! navgraph core
//!
//! Batched join engine over navigation-property graphs. A filter such as
//! `(LocationID gt 13000) and (LookupCountys/LookupNations/Nation eq 'Wales')`
//! becomes a tree of fetch nodes, one per navigation path, each pulling
//! bounded batches from a document store. Results are joined bottom-up with
//! AND semantics and combined either by nesting related entities (expand) or
//! by flattening them into dotted columns (projection).
//!
//! ```no_run
//! use navgraph_core::{CombineMode, EngineConfig, QueryEngine, QuerySpec};
//!
//! let config = EngineConfig::load("navgraph.json")?;
//! let engine = QueryEngine::from_config(&config)?;
//! let spec = QuerySpec::new("Locations")
//!     .with_filter("(LocationID gt 13000)")
//!     .with_mode(CombineMode::Projection);
//! for batch in engine.execute(&spec)? {
//!     println!("{}", serde_json::to_string(&batch?)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod config;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod query;
pub mod storage;

pub use config::{ContainerName, DriverParams, EngineConfig, MetadataSource};
pub use error::Error;
pub use graph::{
    CombineMode, Entity, EntityRef, FetchGraph, FetchNode, FetchOutcome, FieldValue,
    GraphBuilder, NodeId, NodeState, ResultCollection,
};
pub use metadata::{EntityMetadata, MetadataManager, NavigationProperty};
pub use query::{QueryEngine, QuerySpec, ResultStream};
pub use storage::{Driver, MemoryDriver, SledDriver, StorageManager};

/// Re-export of the filter language crate.
pub use navgraph_lang as lang;
