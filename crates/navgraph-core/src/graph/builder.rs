//! Builds a fetch graph from predicates and selected paths.

use std::collections::HashMap;
use std::sync::Arc;

use navgraph_lang::{split_path, Predicate, PATH_SEPARATOR};
use tracing::debug;

use super::engine::FetchGraph;
use super::node::{FetchNode, NodeId};
use super::processor::ResultProcessor;
use crate::error::Error;
use crate::metadata::{EntityMetadata, MetadataManager, NavigationProperty};
use crate::storage::{FetchRequest, StorageManager};

/// What to do with the node a path resolves to.
enum PendingOp<'a> {
    AddPredicate(&'a Predicate),
    AddSelect,
}

/// Maps property paths onto a tree of fetch nodes, one node per distinct
/// navigation path prefix.
pub struct GraphBuilder<'m> {
    metadata: &'m MetadataManager,
    storage: Arc<StorageManager>,
    processor: Box<dyn ResultProcessor>,
    batch_size: usize,
    nodes: Vec<FetchNode>,
    paths: HashMap<String, NodeId>,
}

impl<'m> GraphBuilder<'m> {
    pub fn new(
        metadata: &'m MetadataManager,
        storage: Arc<StorageManager>,
        processor: Box<dyn ResultProcessor>,
        batch_size: usize,
    ) -> Self {
        Self {
            metadata,
            storage,
            processor,
            batch_size,
            nodes: Vec::new(),
            paths: HashMap::new(),
        }
    }

    /// Build the graph rooted at `root_resource`.
    pub fn build(
        mut self,
        root_resource: &str,
        predicates: &[Predicate],
        select: &[String],
    ) -> Result<FetchGraph, Error> {
        let root_metadata = self
            .metadata
            .metadata_for_default_resource_name(root_resource)?;
        let root = self.create_node(root_resource.to_string(), root_metadata)?;

        for predicate in predicates {
            self.apply_to_path(root, &predicate.property, PendingOp::AddPredicate(predicate))?;
        }
        for path in select {
            self.apply_to_path(root, path, PendingOp::AddSelect)?;
        }

        debug!(
            root = root_resource,
            nodes = self.nodes.len(),
            predicates = predicates.len(),
            select = select.len(),
            "built fetch graph"
        );
        Ok(FetchGraph::new(
            self.nodes,
            self.storage,
            self.processor,
            self.batch_size,
        ))
    }

    fn apply_to_path(&mut self, root: NodeId, path: &str, op: PendingOp<'_>) -> Result<(), Error> {
        let (navigation, field) = split_path(path);
        let node = self.resolve_navigation(root, &navigation)?;
        let request = &mut self.nodes[node.0].base_request;
        match op {
            PendingOp::AddPredicate(predicate) => {
                request.add_predicate(field, predicate.operator, &predicate.value)
            }
            PendingOp::AddSelect => {
                request.add_select(field);
                Ok(())
            }
        }
    }

    /// Walk navigation hops from `root`, creating nodes for unseen prefixes.
    fn resolve_navigation(&mut self, root: NodeId, hops: &[&str]) -> Result<NodeId, Error> {
        let mut current = root;
        let mut path = self.nodes[root.0].path.clone();

        for hop in hops {
            path.push(PATH_SEPARATOR);
            path.push_str(hop);
            if let Some(existing) = self.paths.get(&path) {
                current = *existing;
                continue;
            }

            let host = self.nodes[current.0].base_request.metadata().clone();
            let navigation = self.metadata.navigation_property(host.entity_name(), hop)?;
            let target = self.metadata.metadata_for_entity(&navigation.related_entity)?;
            let child = self.create_node(path.clone(), target)?;
            self.add_child(current, child, navigation)?;
            current = child;
        }
        Ok(current)
    }

    fn create_node(&mut self, path: String, metadata: Arc<EntityMetadata>) -> Result<NodeId, Error> {
        if self.paths.contains_key(&path) {
            return Err(Error::State(format!(
                "cannot create node at path [{path}] for resource [{}]: already exists",
                metadata.default_resource_name()
            )));
        }
        let id = NodeId(self.nodes.len());
        let node = FetchNode::new(id, path.clone(), FetchRequest::for_entity(metadata))?;
        self.nodes.push(node);
        self.paths.insert(path, id);
        Ok(id)
    }

    fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        navigation: Arc<NavigationProperty>,
    ) -> Result<(), Error> {
        debug!(
            parent = %self.nodes[parent.0].path,
            child = %self.nodes[child.0].path,
            navigation = %navigation,
            "linked fetch node"
        );
        self.nodes[parent.0].results.add_index(&navigation.host_key)?;
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].attach(parent, navigation)
    }
}
