//! Fetch graph: result collections, fetch nodes, the execution engine and the
//! result combination strategies.

mod builder;
mod collection;
mod engine;
mod entity;
mod expand;
mod node;
mod processor;
mod projection;

pub use builder::GraphBuilder;
pub use collection::{ResultCollection, Slot};
pub use engine::{FetchGraph, FetchOutcome};
pub use entity::{Entity, EntityRef, FieldValue, IndexKey};
pub use expand::ExpandProcessor;
pub use node::{FetchNode, NodeId, NodeState};
pub use processor::{CombineMode, ResultProcessor};
pub use projection::ProjectionProcessor;
