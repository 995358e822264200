//! Compressed weighted undirected graph

use crate::graph::NodeId;
use serde::{Deserialize, Serialize};
use std::mem;

/// A single weighted connection, the exchange record handed to consumers.
///
/// `source < target` for every edge except self-loops, where both are equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
}

impl EdgeRecord {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Weighted undirected graph in compressed sparse row form.
///
/// Nodes are kept in ascending `NodeId` order and addressed internally by
/// their position. Every unordered pair appears at most once in `edges`; the
/// adjacency arrays hold both directions. Self-loops live in `self_loops`
/// and are never listed as neighbors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedGraph {
    /// Node identifiers, ascending
    nodes: Vec<NodeId>,

    /// Edges in canonical (source, target) order
    edges: Vec<EdgeRecord>,

    /// Self-loop weight per node (0.0 when absent)
    self_loops: Vec<f64>,

    /// offsets[i] to offsets[i+1] is the neighbor range of node i
    offsets: Vec<usize>,

    /// Concatenated neighbor positions, ascending within each node
    neighbors: Vec<u32>,

    /// Edge weight parallel to `neighbors`
    weights: Vec<f64>,
}

impl WeightedGraph {
    /// Assemble a graph from ascending unique nodes and canonically ordered edges.
    ///
    /// Every edge endpoint must be one of `nodes`.
    pub(crate) fn from_canonical(nodes: Vec<NodeId>, edges: Vec<EdgeRecord>) -> Self {
        let node_count = nodes.len();
        let position = |id: NodeId| {
            nodes
                .binary_search(&id)
                .unwrap_or_else(|_| panic!("edge endpoint {} is not a graph node", id))
        };

        let mut self_loops = vec![0.0; node_count];
        let mut degrees = vec![0usize; node_count];
        let mut pairs = Vec::with_capacity(edges.len());

        for edge in &edges {
            let (u, v) = (position(edge.source), position(edge.target));
            if u == v {
                self_loops[u] += edge.weight;
                continue;
            }
            degrees[u] += 1;
            degrees[v] += 1;
            pairs.push((u, v, edge.weight));
        }

        let mut offsets = Vec::with_capacity(node_count + 1);
        offsets.push(0);
        let mut offset = 0;
        for &degree in &degrees {
            offset += degree;
            offsets.push(offset);
        }

        // Edges are sorted by source, so each list fills in ascending order
        let mut neighbors = vec![0u32; offset];
        let mut weights = vec![0.0; offset];
        let mut cursor = offsets[..node_count].to_vec();
        for (u, v, w) in pairs {
            neighbors[cursor[u]] = v as u32;
            weights[cursor[u]] = w;
            cursor[u] += 1;
            neighbors[cursor[v]] = u as u32;
            weights[cursor[v]] = w;
            cursor[v] += 1;
        }

        Self {
            nodes,
            edges,
            self_loops,
            offsets,
            neighbors,
            weights,
        }
    }

    /// Graph with no nodes and no edges
    pub fn empty() -> Self {
        Self::from_canonical(Vec::new(), Vec::new())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges, self-loops included
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    /// Position of a node in `nodes()`
    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.nodes.binary_search(&node).ok()
    }

    /// Neighbor positions and weights of the node at `index`
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[index]..self.offsets[index + 1];
        self.neighbors[range.clone()]
            .iter()
            .zip(&self.weights[range])
            .map(|(&n, &w)| (n as usize, w))
    }

    pub fn self_loop(&self, index: usize) -> f64 {
        self.self_loops[index]
    }

    /// Weighted degree; a self-loop counts twice
    pub fn degree(&self, index: usize) -> f64 {
        let range = self.offsets[index]..self.offsets[index + 1];
        self.weights[range].iter().sum::<f64>() + 2.0 * self.self_loops[index]
    }

    /// Total edge weight `m`
    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    /// Estimate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        mem::size_of::<Self>()
            + self.nodes.capacity() * mem::size_of::<NodeId>()
            + self.edges.capacity() * mem::size_of::<EdgeRecord>()
            + self.self_loops.capacity() * mem::size_of::<f64>()
            + self.offsets.capacity() * mem::size_of::<usize>()
            + self.neighbors.capacity() * mem::size_of::<u32>()
            + self.weights.capacity() * mem::size_of::<f64>()
    }
}
