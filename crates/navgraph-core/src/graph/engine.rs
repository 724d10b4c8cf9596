//! The fetch node state machine.
//!
//! A graph is driven from its root: [`FetchGraph::prepare_root`] opens the
//! root cursor, then [`FetchGraph::fetch`] is called until it returns
//! [`FetchOutcome::Exhausted`]. Each call does a bounded amount of work: at
//! most one batch pull per node on the active path plus one combination pass.
//!
//! Non-leaf nodes join their children in declaration order. Child `0` is
//! prepared from the node's current batch; child `i` from the node's batch
//! narrowed to the entities that joined with child `i - 1`'s last results.
//! That narrowing is what gives sibling branches AND semantics.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use super::collection::ResultCollection;
use super::node::{FetchNode, NodeId, NodeState};
use super::processor::ResultProcessor;
use crate::error::Error;
use crate::metadata::NavigationProperty;
use crate::storage::StorageManager;

/// Result of one [`FetchGraph::fetch`] call.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Combined results for this round. Call `fetch` again for more.
    Batch(ResultCollection),
    /// Nothing this time, but the node is not done. Call `fetch` again.
    Pending,
    /// Everything matching the last `prepare` input has been returned.
    Exhausted,
}

enum Walk {
    Results,
    Pending,
    Exhausted,
}

/// Arena of fetch nodes plus the collaborators they share.
pub struct FetchGraph {
    nodes: Vec<FetchNode>,
    storage: Arc<StorageManager>,
    processor: Box<dyn ResultProcessor>,
    batch_size: usize,
}

impl FetchGraph {
    pub(crate) fn new(
        nodes: Vec<FetchNode>,
        storage: Arc<StorageManager>,
        processor: Box<dyn ResultProcessor>,
        batch_size: usize,
    ) -> Self {
        Self {
            nodes,
            storage,
            processor,
            batch_size,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &FetchNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FetchNode> {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_for_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.path == path).map(|n| n.id)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.node(id).is_root()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Node state. With `check_children`, a non-leaf node whose own cursor is
    /// exhausted only counts as complete once every child is complete too.
    pub fn node_state(&self, id: NodeId, check_children: bool) -> NodeState {
        let node = self.node(id);
        let own = node.cursor_state();
        if check_children
            && own == NodeState::Complete
            && node
                .children
                .iter()
                .any(|child| self.node_state(*child, false) != NodeState::Complete)
        {
            return NodeState::Ready;
        }
        own
    }

    /// Navigation property of the node that produced `collection`.
    pub fn navigation_of(
        &self,
        collection: &ResultCollection,
    ) -> Result<&Arc<NavigationProperty>, Error> {
        let id = collection.node().ok_or_else(|| {
            Error::CollectionInvariant("result collection has no owning node".to_string())
        })?;
        self.node(id).navigation().ok_or_else(|| {
            Error::CollectionInvariant(format!(
                "node [{}] has no navigation property",
                self.node(id).path
            ))
        })
    }

    /// Selected fields of the subtree at `id`, namespaced by navigation
    /// property path relative to it, e.g. `LookupCountys.LookupNations.Nation`.
    pub fn select_fields(&self, id: NodeId) -> Vec<String> {
        let mut fields = Vec::new();
        self.collect_select_fields(id, "", &mut fields);
        fields
    }

    fn collect_select_fields(&self, id: NodeId, namespace: &str, fields: &mut Vec<String>) {
        let node = self.node(id);
        let prefix = match (&node.navigation, namespace.is_empty()) {
            (Some(nav), true) => nav.name.clone(),
            (Some(nav), false) => format!("{namespace}.{}", nav.name),
            (None, _) => namespace.to_string(),
        };

        for field in node.base_request.selected_fields() {
            fields.push(if prefix.is_empty() {
                field.clone()
            } else {
                format!("{prefix}.{field}")
            });
        }
        for child in &node.children {
            self.collect_select_fields(*child, &prefix, fields);
        }
    }

    /// Open the root cursor.
    pub fn prepare_root(&mut self) -> Result<(), Error> {
        self.open(self.root(), None)
    }

    /// Open the cursor of `id`, restricted to entities joining with `input`
    /// when the node has a parent.
    pub fn prepare(&mut self, id: NodeId, input: &ResultCollection) -> Result<(), Error> {
        let join_values = match &self.node(id).navigation {
            Some(nav) => Some(input.distinct_values(&nav.host_key)?),
            None => None,
        };
        self.open(id, join_values)
    }

    fn open(&mut self, id: NodeId, join_values: Option<Vec<Value>>) -> Result<(), Error> {
        let node = self.node(id);
        if node.cursor_state() != NodeState::Unready {
            return Err(Error::State(format!(
                "{} node error: prepare called with an active batch cursor",
                node.name()
            )));
        }

        let mut request = node.base_request.clone();
        if let (Some(nav), Some(values)) = (&node.navigation, join_values) {
            trace!(node = node.name(), key = %nav.related_key, count = values.len(), "join restriction");
            request.add_join_restriction(&nav.related_key, values);
        }
        let mut cursor = self.storage.prepare_batch_fetch(&request, self.batch_size)?;

        let node = &mut self.nodes[id.0];
        node.results.purge();
        node.child_results.clear();
        if !node.children.is_empty() {
            // Children need this node's first batch to join against.
            let pulled = cursor.next_batch(&mut node.results)?;
            debug!(node = node.name(), pulled, "prepared parent node");
        } else {
            debug!(node = node.name(), "prepared leaf node");
        }
        node.cursor = Some(cursor);
        Ok(())
    }

    /// Fetch the next round from the root.
    pub fn fetch(&mut self) -> Result<FetchOutcome, Error> {
        self.fetch_node(self.root())
    }

    /// Fetch the next round from `id`.
    pub fn fetch_node(&mut self, id: NodeId) -> Result<FetchOutcome, Error> {
        let node = self.node(id);
        if node.cursor.is_none() {
            return Err(Error::State(format!(
                "{} node error: fetch called with no cursor",
                node.name()
            )));
        }

        if node.is_leaf() {
            return match self.fetch_leaf(id)? {
                FetchOutcome::Batch(batch) if self.is_root(id) => Ok(FetchOutcome::Batch(
                    self.processor.combine(self, id, &[], &batch)?,
                )),
                outcome => Ok(outcome),
            };
        }

        match self.walk_children(id)? {
            Walk::Pending => Ok(FetchOutcome::Pending),
            Walk::Results => {
                let node = self.node(id);
                let combined =
                    self.processor
                        .combine(self, id, &node.child_results, &node.results)?;
                debug!(node = node.name(), rows = combined.len(), "combined child results");
                Ok(FetchOutcome::Batch(combined))
            }
            Walk::Exhausted => {
                if self.node(id).cursor_state() == NodeState::Complete {
                    debug!(node = self.node(id).name(), "node completed, purging");
                    self.purge(id);
                    return Ok(FetchOutcome::Exhausted);
                }

                let node = &mut self.nodes[id.0];
                node.results.purge();
                if let Some(cursor) = node.cursor.as_mut() {
                    let pulled = cursor.next_batch(&mut node.results)?;
                    debug!(node = node.name(), pulled, "pulled next parent batch");
                }
                self.purge_child_nodes(id);
                Ok(FetchOutcome::Pending)
            }
        }
    }

    fn fetch_leaf(&mut self, id: NodeId) -> Result<FetchOutcome, Error> {
        let node = &mut self.nodes[id.0];
        let Some(cursor) = node.cursor.as_mut() else {
            return Err(Error::State(format!(
                "{} node error: fetch called with no cursor",
                node.base_request.resource_name()
            )));
        };
        if !cursor.has_more() {
            trace!(node = node.base_request.resource_name(), "leaf complete");
            return Ok(FetchOutcome::Exhausted);
        }

        node.results.purge();
        let pulled = cursor.next_batch(&mut node.results)?;
        debug!(node = node.base_request.resource_name(), pulled, "leaf fetch");
        if node.results.is_empty() {
            Ok(FetchOutcome::Pending)
        } else {
            Ok(FetchOutcome::Batch(node.results.clone()))
        }
    }

    /// Drive children until every one has results for the current round,
    /// one of them asks to be called again, or the walk backs out past the
    /// first child.
    fn walk_children(&mut self, id: NodeId) -> Result<Walk, Error> {
        let count = self.node(id).children.len();
        // Resume at the child that was pending, or pull the last child's next
        // batch after a completed round. Children after the resume point
        // have been retired and are prepared again from fresh input.
        let mut index = self.node(id).child_results.len().min(count - 1) as isize;

        loop {
            if index < 0 {
                return Ok(Walk::Exhausted);
            }
            let i = index as usize;
            if i >= count {
                return Ok(Walk::Results);
            }
            let child = self.node(id).children[i];

            match self.node_state(child, true) {
                NodeState::Complete => {
                    self.retire_child(id, child, i);
                    index -= 1;
                    continue;
                }
                NodeState::Unready => {
                    let join_values = self.child_join_values(id, i)?;
                    self.open(child, Some(join_values))?;
                }
                NodeState::Ready => {}
            }

            match self.fetch_node(child)? {
                FetchOutcome::Batch(results) => {
                    let node = &mut self.nodes[id.0];
                    node.child_results.truncate(i);
                    node.child_results.push(results);
                    index += 1;
                }
                FetchOutcome::Pending => {
                    // Results from child `i` onward are stale; resume at `i`.
                    self.nodes[id.0].child_results.truncate(i);
                    return Ok(Walk::Pending);
                }
                FetchOutcome::Exhausted => {
                    // Earlier siblings may still have batches that produce
                    // more input for this child.
                    self.retire_child(id, child, i);
                    index -= 1;
                }
            }
        }
    }

    fn retire_child(&mut self, id: NodeId, child: NodeId, position: usize) {
        debug!(node = self.node(id).name(), child = self.node(child).name(), "child complete, purging");
        self.purge(child);
        self.nodes[id.0].child_results.truncate(position);
    }

    /// Join values for preparing child `position` of `id`.
    fn child_join_values(&self, id: NodeId, position: usize) -> Result<Vec<Value>, Error> {
        let node = self.node(id);
        let child = self.node(node.children[position]);
        let nav = child.navigation.as_ref().ok_or_else(|| {
            Error::State(format!("child node [{}] has no navigation property", child.path))
        })?;

        if position == 0 {
            return node.results.distinct_values(&nav.host_key);
        }
        let previous = node.child_results.get(position - 1).ok_or_else(|| {
            Error::State(format!(
                "{} node error: no results for child {} while preparing child {position}",
                node.name(),
                position - 1
            ))
        })?;
        self.filter_by_child_results(&node.results, previous)?
            .distinct_values(&nav.host_key)
    }

    /// Entities of `base` that join with at least one entity of `filter`.
    pub fn filter_by_child_results(
        &self,
        base: &ResultCollection,
        filter: &ResultCollection,
    ) -> Result<ResultCollection, Error> {
        let nav = self.navigation_of(filter)?;
        let mut filtered = ResultCollection::empty_like(base);
        for entity in filter.iter() {
            let key = filter.index_value(entity, &nav.related_key)?;
            filtered.add_all(base.entities_by_index(&nav.host_key, &key)?)?;
        }
        Ok(filtered)
    }

    /// Drop the cursor of `id` and purge every descendant.
    pub fn purge(&mut self, id: NodeId) {
        trace!(node = self.node(id).name(), "purge");
        self.nodes[id.0].cursor = None;
        self.purge_child_nodes(id);
    }

    /// Clear accumulated child results and purge every child, keeping this
    /// node's own cursor.
    pub fn purge_child_nodes(&mut self, id: NodeId) {
        let node = &mut self.nodes[id.0];
        node.child_results.clear();
        let children = node.children.clone();
        for child in children {
            self.purge(child);
        }
    }
}
