//! Entity set query endpoint.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use navgraph_core::{CombineMode, QuerySpec};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::AppError;
use crate::json::QueryParams;
use crate::AppState;

/// Query routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/:entity_set", get(handle_query))
}

fn query_spec(entity_set: String, params: &QueryParams) -> Result<QuerySpec, AppError> {
    let mut spec = QuerySpec::new(entity_set);
    if let Some(filter) = &params.filter {
        spec = spec.with_filter(filter.clone());
    }
    if let Some(select) = &params.select {
        spec = spec.with_select(select);
    }
    if let Some(mode) = &params.mode {
        spec = spec.with_mode(mode.parse::<CombineMode>()?);
    }
    if let Some(batch_size) = params.batch_size {
        spec = spec.with_batch_size(batch_size);
    }
    Ok(spec)
}

/// Run the query to completion and answer with every matching entity.
async fn handle_query(
    State(state): State<AppState>,
    Path(entity_set): Path<String>,
    Query(params): Query<QueryParams>,
) -> Result<Json<Vec<Value>>, AppError> {
    let spec = query_spec(entity_set, &params)?;
    debug!(entity_set = %spec.entity_set, filter = ?spec.filter, mode = %spec.mode, "query received");

    // The engine pulls from storage synchronously.
    let engine = state.engine.clone();
    let entity_set = spec.entity_set.clone();
    let rows = tokio::task::spawn_blocking(move || engine.collect(&spec))
        .await?
        .map_err(|e| AppError::from_engine(e, params.filter.as_deref()))?;

    let body = rows
        .iter()
        .map(|entity| serde_json::to_value(entity.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    info!(entity_set = %entity_set, rows = body.len(), "query answered");
    Ok(Json(body))
}
