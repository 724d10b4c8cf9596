//! Nested combination: related entities are embedded under their navigation
//! property name.

use super::collection::ResultCollection;
use super::engine::FetchGraph;
use super::entity::FieldValue;
use super::node::NodeId;
use super::processor::{move_joined, ResultProcessor};
use crate::error::Error;

/// Embeds child results into node entities.
///
/// Node entities are kept only when they join with the last child's results,
/// which carry the most restrictive filter. Earlier children are then
/// embedded into the kept entities: scalar navigation as an entity or `null`,
/// collection navigation as an array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpandProcessor;

impl ResultProcessor for ExpandProcessor {
    fn combine(
        &self,
        graph: &FetchGraph,
        _node: NodeId,
        children: &[ResultCollection],
        node_results: &ResultCollection,
    ) -> Result<ResultCollection, Error> {
        let mut working = node_results.working_copy();
        let Some((last, rest)) = children.split_last() else {
            return Ok(working);
        };

        let mut combined = ResultCollection::empty_like(node_results);
        let nav = graph.navigation_of(last)?;
        move_joined(nav, last, &mut working, &mut combined)?;

        for related in last.iter() {
            let key = last.index_value(related, &nav.related_key)?;
            for slot in combined.slots_by_index(&nav.host_key, &key)? {
                let Some(entity) = combined.entity_mut(slot) else {
                    continue;
                };
                if !nav.is_scalar {
                    entity.push_related(&nav.name, related.clone());
                } else if !matches!(entity.get(&nav.name), Some(FieldValue::Entity(Some(_)))) {
                    entity.set(nav.name.clone(), FieldValue::Entity(Some(related.clone())));
                }
            }
        }

        for child in rest.iter().rev() {
            let nav = graph.navigation_of(child)?;
            for slot in combined.slots() {
                let Some(entity) = combined.entity(slot) else {
                    continue;
                };
                let key = combined.index_value(entity, &nav.host_key)?;
                let matches = child.entities_by_index(&nav.related_key, &key)?;
                let value = if nav.is_scalar {
                    FieldValue::Entity(matches.into_iter().next())
                } else {
                    FieldValue::Entities(matches)
                };
                if let Some(entity) = combined.entity_mut(slot) {
                    entity.set(nav.name.clone(), value);
                }
            }
        }

        Ok(combined)
    }
}
