//! JSON request and response types for the HTTP gateway.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Health status.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Whether the metadata container answered.
    pub metadata_available: bool,
}

/// OData-style query string parameters.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    #[serde(rename = "$filter")]
    pub filter: Option<String>,
    /// Comma-separated property paths.
    #[serde(rename = "$select")]
    pub select: Option<String>,
    /// `expand` (default) or `projection`.
    #[serde(rename = "$mode")]
    pub mode: Option<String>,
    #[serde(rename = "$batchsize")]
    pub batch_size: Option<usize>,
}
