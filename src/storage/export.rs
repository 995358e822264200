//! Partition grouping and edge export

use crate::cluster::{CommunityClassMap, Partition};
use crate::graph::{EdgeRecord, WeightedGraph};

/// Bucket nodes by community.
///
/// The number of buckets is `max(community) + 1`; members keep ascending
/// node order. An empty partition yields an empty map.
pub fn group(partition: &Partition) -> CommunityClassMap {
    let mut classes: CommunityClassMap = (0..partition.community_count())
        .map(|community| (community, Vec::new()))
        .collect();

    // Partition nodes are ascending, so pushes keep each bucket sorted
    for (node, community) in partition.iter() {
        classes.entry(community).or_default().push(node);
    }

    classes
}

/// One record per graph edge in canonical construction order, unfiltered
pub fn emit_edges(graph: &WeightedGraph) -> Vec<EdgeRecord> {
    graph.edges().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeId};
    use std::collections::HashSet;

    #[test]
    fn test_group_preserves_node_order() {
        let partition =
            Partition::from_assignments(vec![40, 10, 30, 20, 50], vec![0, 1, 0, 2, 1]).unwrap();

        let classes = group(&partition);

        assert_eq!(classes.len(), 3);
        assert_eq!(classes[&0], vec![30, 40]);
        assert_eq!(classes[&1], vec![10, 50]);
        assert_eq!(classes[&2], vec![20]);
    }

    #[test]
    fn test_group_count_is_derived_not_fixed() {
        let nodes: Vec<NodeId> = (0..12).collect();
        let communities: Vec<usize> = (0..12).collect();
        let partition = Partition::from_assignments(nodes, communities).unwrap();

        assert_eq!(group(&partition).len(), 12);
    }

    #[test]
    fn test_group_empty() {
        assert!(group(&Partition::default()).is_empty());
    }

    #[test]
    fn test_emit_edges_one_per_pair() {
        let lookup = |u: NodeId, v: NodeId| Some((u + v) as f64);
        let graph = GraphBuilder::default().build(&[1, 2, 3, 4], &lookup).unwrap();

        let edges = emit_edges(&graph);

        assert_eq!(edges.len(), 6);
        let pairs: HashSet<(NodeId, NodeId)> = edges.iter().map(|e| (e.source, e.target)).collect();
        assert_eq!(pairs.len(), 6);
        assert!(edges.iter().all(|e| e.source < e.target));
        assert_eq!(edges[0], EdgeRecord { source: 1, target: 2, weight: 3.0 });
    }
}
