//! Graph construction module

use crate::config::GraphConfig;
use crate::error::GraphError;
use crate::graph::{EdgeRecord, NodeId, WeightedGraph};
use rayon::prelude::*;

/// Node sets smaller than this are resolved on the calling thread
const PARALLEL_ROW_THRESHOLD: usize = 1000;

/// Source of pairwise weights for graph construction.
///
/// The lookup may be direction-dependent; returning `None` means the pair
/// cannot be resolved at all, which aborts the build.
pub trait WeightLookup {
    fn weight(&self, from: NodeId, to: NodeId) -> Option<f64>;
}

impl<F> WeightLookup for F
where
    F: Fn(NodeId, NodeId) -> Option<f64>,
{
    fn weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        self(from, to)
    }
}

/// Builds a `WeightedGraph` from a node set and a weight lookup.
///
/// For an unordered pair `{u, v}` only `weight(u, v)` with `u < v` is
/// consulted: iteration runs over ascending node ids and the first direction
/// encountered is canonical. An asymmetric lookup therefore always resolves
/// to its upper-triangle value. Pairs weighing exactly zero are not edges.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    include_self_loops: bool,
}

impl GraphBuilder {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            include_self_loops: config.include_self_loops,
        }
    }

    /// Keep diagonal entries as self-loops instead of dropping them
    pub fn with_self_loops(mut self, include: bool) -> Self {
        self.include_self_loops = include;
        self
    }

    /// Build the graph, aborting on the first pair (in canonical order) that
    /// fails to resolve
    pub fn build<W>(&self, nodes: &[NodeId], lookup: &W) -> Result<WeightedGraph, GraphError>
    where
        W: WeightLookup + Sync,
    {
        let mut ids = nodes.to_vec();
        ids.sort_unstable();
        ids.dedup();

        if ids.len() < nodes.len() {
            log::debug!("Dropped {} duplicate node ids", nodes.len() - ids.len());
        }

        // Rows come back in index order either way, so the edge order matches
        let rows: Vec<Result<Vec<EdgeRecord>, GraphError>> = if ids.len() < PARALLEL_ROW_THRESHOLD {
            (0..ids.len()).map(|row| self.resolve_row(&ids, row, lookup)).collect()
        } else {
            log::debug!("Resolving {} rows in parallel", ids.len());
            (0..ids.len())
                .into_par_iter()
                .map(|row| self.resolve_row(&ids, row, lookup))
                .collect()
        };

        let mut edges = Vec::new();
        for row in rows {
            edges.extend(row?);
        }

        log::debug!("Built graph with {} nodes and {} edges", ids.len(), edges.len());

        Ok(WeightedGraph::from_canonical(ids, edges))
    }

    /// Resolve every pair (ids[row], v) with v >= ids[row]
    fn resolve_row<W>(&self, ids: &[NodeId], row: usize, lookup: &W) -> Result<Vec<EdgeRecord>, GraphError>
    where
        W: WeightLookup,
    {
        let source = ids[row];
        let start = if self.include_self_loops { row } else { row + 1 };
        let mut edges = Vec::new();

        for &target in &ids[start..] {
            let weight = lookup
                .weight(source, target)
                .ok_or(GraphError::MissingWeight { from: source, to: target })?;

            if !weight.is_finite() || weight < 0.0 {
                return Err(GraphError::InvalidWeight {
                    from: source,
                    to: target,
                    weight,
                });
            }

            if weight > 0.0 {
                edges.push(EdgeRecord { source, target, weight });
            }
        }

        Ok(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn table(entries: &[(NodeId, NodeId, f64)]) -> HashMap<(NodeId, NodeId), f64> {
        entries.iter().map(|&(u, v, w)| ((u, v), w)).collect()
    }

    #[test]
    fn test_build_uses_ascending_direction() {
        // (1, 2) and (2, 1) disagree; the u < v value wins
        let weights = table(&[(1, 2, 5.0), (2, 1, 7.0)]);
        let lookup = |u: NodeId, v: NodeId| Some(weights.get(&(u, v)).copied().unwrap_or(0.0));

        let graph = GraphBuilder::default().build(&[2, 1], &lookup).unwrap();

        assert_eq!(graph.nodes(), &[1, 2]);
        assert_eq!(graph.edges(), &[EdgeRecord { source: 1, target: 2, weight: 5.0 }]);
    }

    #[test]
    fn test_build_skips_zero_weights_and_diagonal() {
        let weights = table(&[(1, 1, 9.0), (1, 2, 0.0), (1, 3, 2.0), (2, 3, 4.0)]);
        let lookup = |u: NodeId, v: NodeId| Some(weights.get(&(u, v)).copied().unwrap_or(0.0));

        let graph = GraphBuilder::default().build(&[1, 2, 3], &lookup).unwrap();

        let pairs: Vec<_> = graph.edges().iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs, vec![(1, 3), (2, 3)]);
        assert_eq!(graph.self_loop(0), 0.0);
    }

    #[test]
    fn test_build_with_self_loops() {
        let weights = table(&[(1, 1, 9.0), (1, 2, 3.0)]);
        let lookup = |u: NodeId, v: NodeId| Some(weights.get(&(u, v)).copied().unwrap_or(0.0));

        let graph = GraphBuilder::default()
            .with_self_loops(true)
            .build(&[1, 2], &lookup)
            .unwrap();

        let pairs: Vec<_> = graph.edges().iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs, vec![(1, 1), (1, 2)]);
        assert_eq!(graph.self_loop(0), 9.0);
        assert_eq!(graph.degree(0), 21.0);
    }

    #[test]
    fn test_missing_weight_names_the_pair() {
        let lookup = |u: NodeId, v: NodeId| if (u, v) == (2, 3) { None } else { Some(1.0) };

        let err = GraphBuilder::default().build(&[1, 2, 3], &lookup).unwrap_err();

        assert_eq!(err, GraphError::MissingWeight { from: 2, to: 3 });
    }

    #[test]
    fn test_negative_weight_is_rejected() {
        let lookup = |_: NodeId, _: NodeId| Some(-1.0);

        let err = GraphBuilder::default().build(&[1, 2], &lookup).unwrap_err();

        assert!(matches!(err, GraphError::InvalidWeight { from: 1, to: 2, .. }));
    }

    #[test]
    fn test_parallel_rows_keep_canonical_order() {
        let nodes: Vec<NodeId> = (0..1200).rev().collect();
        let lookup = |u: NodeId, v: NodeId| Some(if v == u + 1 { 1.0 } else { 0.0 });

        let graph = GraphBuilder::default().build(&nodes, &lookup).unwrap();

        assert_eq!(graph.edge_count(), 1199);
        assert!(graph
            .edges()
            .windows(2)
            .all(|w| (w[0].source, w[0].target) < (w[1].source, w[1].target)));
    }

    #[test]
    fn test_empty_node_set() {
        let lookup = |_: NodeId, _: NodeId| Some(1.0);

        let graph = GraphBuilder::default().build(&[], &lookup).unwrap();

        assert!(graph.is_empty());
    }
}
