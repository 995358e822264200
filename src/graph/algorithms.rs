//! Graph algorithms for analysis

use crate::graph::WeightedGraph;
use petgraph::algo::connected_components;
use petgraph::graph::UnGraph;

/// Convert to a petgraph undirected graph; node indices match graph positions
pub fn to_petgraph(graph: &WeightedGraph) -> UnGraph<u64, f64> {
    let mut pg = UnGraph::with_capacity(graph.node_count(), graph.edge_count());
    let indices: Vec<_> = graph.nodes().iter().map(|&id| pg.add_node(id)).collect();

    for edge in graph.edges() {
        if let (Some(u), Some(v)) = (graph.index_of(edge.source), graph.index_of(edge.target)) {
            pg.add_edge(indices[u], indices[v], edge.weight);
        }
    }

    pg
}

/// Number of connected components; isolated nodes count as their own
pub fn count_components(graph: &WeightedGraph) -> usize {
    if graph.is_empty() {
        return 0;
    }

    let components = connected_components(&to_petgraph(graph));
    log::debug!("Graph has {} connected components", components);
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    #[test]
    fn test_components_with_isolated_node() {
        let lookup = |u: u64, v: u64| Some(if (u, v) == (1, 2) || (u, v) == (3, 4) { 1.0 } else { 0.0 });
        let graph = GraphBuilder::default().build(&[1, 2, 3, 4, 5], &lookup).unwrap();

        assert_eq!(count_components(&graph), 3);
    }

    #[test]
    fn test_petgraph_conversion_keeps_weights() {
        let lookup = |_: u64, _: u64| Some(2.5);
        let graph = GraphBuilder::default().build(&[7, 8, 9], &lookup).unwrap();

        let pg = to_petgraph(&graph);

        assert_eq!(pg.node_count(), 3);
        assert_eq!(pg.edge_count(), 3);
        assert!(pg.edge_weights().all(|&w| w == 2.5));
    }

    #[test]
    fn test_empty_graph_has_no_components() {
        assert_eq!(count_components(&WeightedGraph::empty()), 0);
    }
}
