//! Query runner: filter string in, stream of result batches out.

use std::sync::Arc;

use navgraph_lang::{parse_filter, parse_select};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Error;
use crate::graph::{CombineMode, EntityRef, FetchGraph, FetchOutcome, GraphBuilder, ResultCollection};
use crate::metadata::MetadataManager;
use crate::storage::StorageManager;

/// One logical query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Default resource name of the root entity, e.g. `Locations`.
    pub entity_set: String,
    /// Filter string; empty or `None` fetches everything.
    pub filter: Option<String>,
    /// Selected property paths.
    pub select: Vec<String>,
    /// Overrides the configured batch size.
    pub batch_size: Option<usize>,
    pub mode: CombineMode,
}

impl QuerySpec {
    pub fn new(entity_set: impl Into<String>) -> Self {
        Self {
            entity_set: entity_set.into(),
            filter: None,
            select: Vec::new(),
            batch_size: None,
            mode: CombineMode::default(),
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Comma-separated select list, `/` or `%2F` separated paths.
    pub fn with_select(mut self, select: &str) -> Self {
        self.select = parse_select(select);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_mode(mut self, mode: CombineMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Owns the shared metadata and storage managers and runs queries against
/// them. Each query gets its own graph.
pub struct QueryEngine {
    metadata: Arc<MetadataManager>,
    storage: Arc<StorageManager>,
    batch_size: usize,
}

impl QueryEngine {
    pub fn from_config(config: &EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::new(config, Arc::new(StorageManager::new(config))))
    }

    /// Engine over an existing storage manager, e.g. one with drivers
    /// registered by hand.
    pub fn new(config: &EngineConfig, storage: Arc<StorageManager>) -> Self {
        Self {
            metadata: Arc::new(MetadataManager::new(config, storage.clone())),
            storage,
            batch_size: config.batch_size,
        }
    }

    pub fn metadata(&self) -> &Arc<MetadataManager> {
        &self.metadata
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Parse the filter and build an unprepared graph.
    pub fn build_graph(&self, spec: &QuerySpec) -> Result<FetchGraph, Error> {
        let predicates = match spec.filter.as_deref().map(str::trim) {
            Some(filter) if !filter.is_empty() => parse_filter(filter)?,
            _ => Vec::new(),
        };
        let batch_size = spec.batch_size.unwrap_or(self.batch_size);
        if batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".to_string()));
        }

        debug!(
            entity_set = %spec.entity_set,
            predicates = predicates.len(),
            mode = %spec.mode,
            batch_size,
            "building query graph"
        );
        GraphBuilder::new(
            &self.metadata,
            self.storage.clone(),
            spec.mode.processor(),
            batch_size,
        )
        .build(&spec.entity_set, &predicates, &spec.select)
    }

    /// Build, prepare, and stream the query.
    pub fn execute(&self, spec: &QuerySpec) -> Result<ResultStream, Error> {
        let mut graph = self.build_graph(spec)?;
        graph.prepare_root()?;
        Ok(ResultStream::new(graph))
    }

    /// Run the query to completion, concatenating every batch.
    pub fn collect(&self, spec: &QuerySpec) -> Result<Vec<EntityRef>, Error> {
        let mut rows = Vec::new();
        for batch in self.execute(spec)? {
            rows.extend(batch?.iter().cloned());
        }
        info!(entity_set = %spec.entity_set, rows = rows.len(), "query complete");
        Ok(rows)
    }
}

/// Non-empty result batches of a prepared graph, in fetch order.
///
/// Retries transparently while the graph reports pending work. Stops after
/// the graph is exhausted or the first error.
pub struct ResultStream {
    graph: FetchGraph,
    finished: bool,
    batches: usize,
    rows: usize,
    polls: usize,
}

impl ResultStream {
    fn new(graph: FetchGraph) -> Self {
        Self {
            graph,
            finished: false,
            batches: 0,
            rows: 0,
            polls: 0,
        }
    }

    pub fn graph(&self) -> &FetchGraph {
        &self.graph
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Rows returned so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `fetch` calls made so far, pending ones included.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Iterator for ResultStream {
    type Item = Result<ResultCollection, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            self.polls += 1;
            match self.graph.fetch() {
                Ok(FetchOutcome::Batch(batch)) if batch.is_empty() => continue,
                Ok(FetchOutcome::Batch(batch)) => {
                    self.batches += 1;
                    self.rows += batch.len();
                    return Some(Ok(batch));
                }
                Ok(FetchOutcome::Pending) => continue,
                Ok(FetchOutcome::Exhausted) => {
                    debug!(batches = self.batches, rows = self.rows, polls = self.polls, "stream exhausted");
                    self.finished = true;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DriverParams;
    use serde_json::json;

    fn config(dir: &std::path::Path) -> EngineConfig {
        let metadata = dir.join("metadata.json");
        let data = dir.join("data.json");
        std::fs::write(
            &metadata,
            json!({"Entities": [{"description": {
                "shortName": "Location", "defaultResourceName": "Locations",
                "key": {"propertyRef": {"name": "LocationID"}},
                "dataProperties": [{"name": "LocationID", "dataType": "Int32"}]
            }}]})
            .to_string(),
        )
        .unwrap();
        std::fs::write(
            &data,
            json!({"Locations": [{"LocationID": 1}, {"LocationID": 2}, {"LocationID": 3}]})
                .to_string(),
        )
        .unwrap();

        EngineConfig::default()
            .with_driver("memory.metadata", DriverParams::with_path(metadata))
            .with_driver("memory.crm", DriverParams::with_path(data))
            .with_default_container("memory.crm")
            .with_batch_size(2)
    }

    #[test]
    fn test_stream_from_config_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = QueryEngine::from_config(&config(dir.path())).unwrap();

        let mut stream = engine
            .execute(&QuerySpec::new("Locations").with_filter("(LocationID ge 2)"))
            .unwrap();
        let batch = stream.next().unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(stream.next().is_none());
        assert_eq!(stream.batches(), 1);
        assert_eq!(stream.rows(), 2);
    }

    #[test]
    fn test_collect_without_filter() {
        let dir = tempfile::tempdir().unwrap();
        let engine = QueryEngine::from_config(&config(dir.path())).unwrap();
        let rows = engine.collect(&QuerySpec::new("Locations")).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_filter_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let engine = QueryEngine::from_config(&config(dir.path())).unwrap();
        let spec = QuerySpec::new("Locations").with_filter("(LocationID gt 1) or (LocationID lt 0)");
        assert!(matches!(engine.execute(&spec), Err(Error::Lang(_))));

        let spec = QuerySpec::new("Locations").with_batch_size(0);
        assert!(matches!(engine.execute(&spec), Err(Error::Config(_))));

        assert!(matches!(
            engine.execute(&QuerySpec::new("Nowhere")),
            Err(Error::Metadata(_))
        ));
    }
}
