//! Fetch nodes: one per resource reached by a navigation path.

use std::fmt;
use std::sync::Arc;

use super::collection::ResultCollection;
use crate::error::Error;
use crate::metadata::NavigationProperty;
use crate::storage::{BatchCursor, FetchRequest};

/// Index of a node in its graph's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cursor state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// No cursor: never prepared, or purged.
    Unready,
    /// Cursor open with more batches to pull.
    Ready,
    /// Cursor open and exhausted.
    Complete,
}

/// One vertex of the execution tree.
pub struct FetchNode {
    pub(crate) id: NodeId,
    pub(crate) path: String,
    pub(crate) base_request: FetchRequest,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) navigation: Option<Arc<NavigationProperty>>,
    pub(crate) results: ResultCollection,
    pub(crate) cursor: Option<BatchCursor>,
    pub(crate) child_results: Vec<ResultCollection>,
}

impl FetchNode {
    pub(crate) fn new(id: NodeId, path: String, base_request: FetchRequest) -> Result<Self, Error> {
        let mut results = ResultCollection::for_node(id);
        if let Some(pk) = base_request.metadata().primary_key()? {
            results.set_primary_key(pk)?;
        }
        Ok(Self {
            id,
            path,
            base_request,
            children: Vec::new(),
            parent: None,
            navigation: None,
            results,
            cursor: None,
            child_results: Vec::new(),
        })
    }

    /// Link to the parent. The node's results are indexed by the related key
    /// so the parent can join against them.
    pub(crate) fn attach(
        &mut self,
        parent: NodeId,
        navigation: Arc<NavigationProperty>,
    ) -> Result<(), Error> {
        self.results.add_index(&navigation.related_key)?;
        self.parent = Some(parent);
        self.navigation = Some(navigation);
        Ok(())
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Path from the root resource, e.g. `Locations/LookupCountys`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resource this node fetches from.
    pub fn name(&self) -> &str {
        self.base_request.resource_name()
    }

    pub fn base_request(&self) -> &FetchRequest {
        &self.base_request
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn navigation(&self) -> Option<&Arc<NavigationProperty>> {
        self.navigation.as_ref()
    }

    pub fn results(&self) -> &ResultCollection {
        &self.results
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// State of this node's own cursor.
    pub fn cursor_state(&self) -> NodeState {
        match &self.cursor {
            None => NodeState::Unready,
            Some(cursor) if cursor.has_more() => NodeState::Ready,
            Some(_) => NodeState::Complete,
        }
    }
}

impl fmt::Debug for FetchNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchNode")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("filter", &self.base_request.filter().to_document())
            .field("children", &self.children)
            .field("state", &self.cursor_state())
            .field("results", &self.results.len())
            .finish()
    }
}
