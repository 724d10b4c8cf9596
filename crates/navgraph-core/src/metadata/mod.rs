//! Entity metadata and navigation property resolution.

pub mod entity;
pub mod manager;
pub mod navigation;

pub use entity::{DataType, EntityMetadata, NavigationDefinition};
pub use manager::MetadataManager;
pub use navigation::NavigationProperty;
