//! Core error types.

use navgraph_lang::LangError;
use thiserror::Error;

/// Errors raised while building or executing a fetch graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed filter string.
    #[error(transparent)]
    Lang(#[from] LangError),

    /// Entity, navigation property, or key missing or malformed in metadata.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// A predicate that cannot be turned into a storage filter.
    #[error("invalid predicate: {0}")]
    Predicate(String),

    /// Misuse of a result collection's key/index layout.
    #[error("collection invariant violated: {0}")]
    CollectionInvariant(String),

    /// prepare/fetch protocol violation.
    #[error("invalid node state: {0}")]
    State(String),

    /// Backing store failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<navgraph_lang::ScanError> for Error {
    fn from(e: navgraph_lang::ScanError) -> Self {
        Error::Lang(e.into())
    }
}

impl From<navgraph_lang::ParseError> for Error {
    fn from(e: navgraph_lang::ParseError) -> Self {
        Error::Lang(e.into())
    }
}
