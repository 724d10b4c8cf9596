//! Flattened combination: related fields become `navigation.field` columns.

use std::collections::HashSet;
use std::sync::Arc;

use super::collection::ResultCollection;
use super::engine::FetchGraph;
use super::entity::Entity;
use super::node::NodeId;
use super::processor::{move_joined, ResultProcessor};
use crate::error::Error;
use crate::metadata::NavigationProperty;

/// Denormalizes child results into node rows.
///
/// A node entity joining with several child entities produces one row per
/// match, each a copy of the row as it was before the match was merged in.
/// Several rows may therefore share a primary key, so the output indexes the
/// key without deduplicating on it. At the root, rows are cut down to the
/// selected fields of the whole graph when any were selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionProcessor;

impl ResultProcessor for ProjectionProcessor {
    fn combine(
        &self,
        graph: &FetchGraph,
        node: NodeId,
        children: &[ResultCollection],
        node_results: &ResultCollection,
    ) -> Result<ResultCollection, Error> {
        let mut working = node_results.working_copy();
        let Some(last) = children.last() else {
            return strip_to_selection(graph, node, working);
        };

        let mut seeded = ResultCollection::for_node(node);
        if let Some(pk) = node_results.primary_key() {
            seeded.add_index(pk)?;
        }
        seeded.add_indexes(node_results.index_names().iter().map(String::as_str))?;
        move_joined(graph.navigation_of(last)?, last, &mut working, &mut seeded)?;

        let navigations = children
            .iter()
            .map(|child| graph.navigation_of(child))
            .collect::<Result<Vec<_>, _>>()?;

        let mut combined = ResultCollection::empty_like(&seeded);
        for source in seeded.iter() {
            let mut rows = vec![source.as_ref().clone()];
            for (child, nav) in children.iter().zip(&navigations) {
                rows = fan_out(rows, child, nav)?;
            }
            for row in rows {
                combined.add(Arc::new(row))?;
            }
        }

        strip_to_selection(graph, node, combined)
    }
}

/// Merge matching child entities into each row, one output row per match.
/// Rows without a match pass through unchanged.
fn fan_out(
    rows: Vec<Entity>,
    child: &ResultCollection,
    nav: &NavigationProperty,
) -> Result<Vec<Entity>, Error> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let key = child.index_value(&row, &nav.host_key)?;
        let matches = child.entities_by_index(&nav.related_key, &key)?;
        if matches.is_empty() {
            out.push(row);
            continue;
        }
        for related in &matches {
            let mut merged = row.clone();
            import_fields(&mut merged, &nav.name, related);
            out.push(merged);
        }
    }
    Ok(out)
}

fn import_fields(target: &mut Entity, namespace: &str, source: &Entity) {
    for (name, value) in source.fields() {
        target.set(format!("{namespace}.{name}"), value.clone());
    }
}

fn strip_to_selection(
    graph: &FetchGraph,
    node: NodeId,
    collection: ResultCollection,
) -> Result<ResultCollection, Error> {
    if !graph.is_root(node) {
        return Ok(collection);
    }
    let fields = graph.select_fields(node);
    if fields.is_empty() {
        return Ok(collection);
    }

    let keep: HashSet<&str> = fields.iter().map(String::as_str).collect();
    let mut stripped = ResultCollection::for_node(node);
    for entity in collection.iter() {
        let mut row = entity.as_ref().clone();
        row.retain_fields(|name| keep.contains(name));
        stripped.add(Arc::new(row))?;
    }
    Ok(stripped)
}
