//! Combination of a node's results with its children's results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::collection::ResultCollection;
use super::engine::FetchGraph;
use super::expand::ExpandProcessor;
use super::node::NodeId;
use super::projection::ProjectionProcessor;
use crate::error::Error;
use crate::metadata::NavigationProperty;

/// Merges one round of child results into a node's current batch.
///
/// `children` holds one collection per child node, in child order. The
/// node's own collection must not be modified: the node may combine it again
/// with the next round of child results.
pub trait ResultProcessor: Send + Sync {
    fn combine(
        &self,
        graph: &FetchGraph,
        node: NodeId,
        children: &[ResultCollection],
        node_results: &ResultCollection,
    ) -> Result<ResultCollection, Error>;
}

/// Move every entity of `working` that joins with some entity of `child`
/// into `combined`.
pub(crate) fn move_joined(
    navigation: &NavigationProperty,
    child: &ResultCollection,
    working: &mut ResultCollection,
    combined: &mut ResultCollection,
) -> Result<(), Error> {
    for entity in child.iter() {
        let key = child.index_value(entity, &navigation.related_key)?;
        for matched in working.entities_by_index(&navigation.host_key, &key)? {
            combined.add(matched.clone())?;
            working.remove(&matched)?;
        }
    }
    Ok(())
}

/// Shape of the combined output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineMode {
    /// Related entities nested under navigation property fields.
    #[default]
    Expand,
    /// Related fields flattened into `navigation.field` columns, one row per
    /// combination.
    Projection,
}

impl CombineMode {
    pub fn processor(self) -> Box<dyn ResultProcessor> {
        match self {
            CombineMode::Expand => Box::new(ExpandProcessor),
            CombineMode::Projection => Box::new(ProjectionProcessor),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CombineMode::Expand => "expand",
            CombineMode::Projection => "projection",
        }
    }
}

impl FromStr for CombineMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expand" => Ok(CombineMode::Expand),
            "projection" | "project" => Ok(CombineMode::Projection),
            other => Err(Error::Config(format!(
                "unknown combine mode [{other}], expected expand or projection"
            ))),
        }
    }
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
