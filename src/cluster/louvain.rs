//! Louvain community detection
//!
//! Greedy multilevel modularity optimization:
//!
//! 1. **Local moving**: every node starts alone. Nodes are visited in
//!    ascending order and moved to the neighboring community with the
//!    largest strictly positive modularity gain, lowest community id on
//!    ties. Passes repeat until nothing moves or the gain of a pass drops
//!    below `min_modularity_gain`.
//! 2. **Aggregation**: each community becomes a super-node. Inter-community
//!    weights are summed; intra-community weight becomes the super-node's
//!    self-weight, which counts towards degree and internal weight but is
//!    never a neighbor during local moves.
//! 3. Repeat until a level produces as many communities as it has nodes.
//!
//! Modularity: `Q = (1/2m) * sum_ij [A_ij - gamma * k_i * k_j / 2m] * delta(c_i, c_j)`.

use crate::cluster::metrics;
use crate::cluster::observer::{NoopObserver, ProgressObserver};
use crate::cluster::{renumber, Partition};
use crate::config::DetectorConfig;
use crate::graph::WeightedGraph;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smallest modularity gain that justifies moving a node
const MIN_MOVE_GAIN: f64 = 1e-12;

/// Statistics for one level of the hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    /// Nodes (or super-nodes) at this level
    pub nodes: usize,

    /// Communities found at this level
    pub communities: usize,

    /// Modularity after each local-moving pass
    pub pass_modularity: Vec<f64>,

    /// False when the pass cap stopped the level
    pub converged: bool,
}

/// Observable record of a detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub levels: Vec<LevelStats>,

    /// Modularity of the final partition on the input graph
    pub modularity: f64,

    pub pass_cap_hit: bool,

    pub level_cap_hit: bool,
}

impl DetectionStats {
    pub fn total_passes(&self) -> usize {
        self.levels.iter().map(|l| l.pass_modularity.len()).sum()
    }
}

/// Result of a detection run
#[derive(Debug, Clone)]
pub struct Detection {
    pub partition: Partition,
    pub stats: DetectionStats,
}

/// Louvain community detector
#[derive(Debug, Clone)]
pub struct Louvain {
    resolution: f64,
    max_passes: usize,
    max_levels: usize,
    min_modularity_gain: f64,
}

impl Louvain {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            resolution: config.resolution,
            max_passes: config.max_passes,
            max_levels: config.max_levels,
            min_modularity_gain: config.min_modularity_gain,
        }
    }

    /// Higher values produce smaller communities
    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Local-moving passes allowed per level
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Detect communities without progress reporting
    pub fn detect(&self, graph: &WeightedGraph) -> Detection {
        self.detect_with_observer(graph, &mut NoopObserver)
    }

    /// Detect communities, reporting checkpoints to `observer`
    pub fn detect_with_observer<O>(&self, graph: &WeightedGraph, observer: &mut O) -> Detection
    where
        O: ProgressObserver + ?Sized,
    {
        let node_count = graph.node_count();
        let mut stats = DetectionStats::default();

        if node_count == 0 {
            log::warn!("Graph has no nodes, returning an empty partition");
            observer.on_finish(&stats);
            return Detection {
                partition: Partition::default(),
                stats,
            };
        }

        let mut level = Level::from_graph(graph);
        let two_m = level.total_degree();

        if two_m <= 0.0 {
            log::info!("Graph has no edges, every node is its own community");
            let singletons: Vec<usize> = (0..node_count).collect();
            observer.on_finish(&stats);
            return Detection {
                partition: Partition::canonical(graph.nodes().to_vec(), &singletons),
                stats,
            };
        }

        // Original node position -> node of the current level
        let mut membership: Vec<usize> = (0..node_count).collect();

        for index in 0..self.max_levels {
            let (labels, mut level_stats) = self.move_nodes(&level, two_m, index, observer);
            let (labels, count) = renumber(&labels);
            level_stats.communities = count;

            observer.on_level(index, level.node_count(), count);

            if !level_stats.converged {
                log::warn!(
                    "Level {} stopped at the cap of {} passes before converging",
                    index, self.max_passes
                );
                stats.pass_cap_hit = true;
            }
            stats.levels.push(level_stats);

            for node in membership.iter_mut() {
                *node = labels[*node];
            }

            if count == level.node_count() {
                break;
            }

            level = level.aggregate(&labels, count);

            if index + 1 == self.max_levels {
                log::warn!("Stopped at the cap of {} aggregation levels", self.max_levels);
                stats.level_cap_hit = true;
            }
        }

        let partition = Partition::canonical(graph.nodes().to_vec(), &membership);
        stats.modularity = metrics::modularity(graph, &partition, self.resolution);
        observer.on_finish(&stats);

        Detection { partition, stats }
    }

    /// Local-moving phase on one level; returns raw labels (node-indexed ids)
    fn move_nodes<O>(
        &self,
        level: &Level,
        two_m: f64,
        index: usize,
        observer: &mut O,
    ) -> (Vec<usize>, LevelStats)
    where
        O: ProgressObserver + ?Sized,
    {
        let node_count = level.node_count();
        let mut labels: Vec<usize> = (0..node_count).collect();
        let mut totals = level.degrees.clone();
        let mut links: BTreeMap<usize, f64> = BTreeMap::new();
        let mut modularity = level.modularity(&labels, node_count, self.resolution, two_m);

        let mut stats = LevelStats {
            nodes: node_count,
            ..LevelStats::default()
        };

        for pass in 0..self.max_passes {
            let mut moves = 0;

            for node in 0..node_count {
                let current = labels[node];
                let degree = level.degrees[node];

                links.clear();
                for (neighbor, weight) in level.neighbors(node) {
                    *links.entry(labels[neighbor]).or_insert(0.0) += weight;
                }

                // Take the node out before scoring so staying is a candidate too
                totals[current] -= degree;

                let score = |community: usize, k_in: f64| {
                    k_in - self.resolution * totals[community] * degree / two_m
                };
                let stay = score(current, links.get(&current).copied().unwrap_or(0.0));

                let mut best = current;
                let mut best_gain = MIN_MOVE_GAIN;
                for (&community, &k_in) in &links {
                    if community == current {
                        continue;
                    }
                    // Score difference scaled to a modularity difference
                    let gain = 2.0 * (score(community, k_in) - stay) / two_m;
                    if gain > best_gain {
                        best_gain = gain;
                        best = community;
                    }
                }

                totals[best] += degree;
                if best != current {
                    labels[node] = best;
                    moves += 1;
                }
            }

            let next = level.modularity(&labels, node_count, self.resolution, two_m);
            stats.pass_modularity.push(next);
            observer.on_pass(index, pass, moves, next);

            let gain = next - modularity;
            modularity = next;

            if moves == 0 || gain < self.min_modularity_gain {
                stats.converged = true;
                break;
            }
        }

        (labels, stats)
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Self::new(&DetectorConfig::default())
    }
}

/// One level of the hierarchy in compressed sparse row form
#[derive(Debug, Clone)]
struct Level {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
    weights: Vec<f64>,

    /// A_ii: twice the internal edge weight a super-node stands for
    self_weights: Vec<f64>,

    degrees: Vec<f64>,
}

impl Level {
    fn from_graph(graph: &WeightedGraph) -> Self {
        let node_count = graph.node_count();
        let mut offsets = Vec::with_capacity(node_count + 1);
        let mut neighbors = Vec::new();
        let mut weights = Vec::new();

        offsets.push(0);
        for node in 0..node_count {
            for (neighbor, weight) in graph.neighbors(node) {
                neighbors.push(neighbor);
                weights.push(weight);
            }
            offsets.push(neighbors.len());
        }

        let self_weights = (0..node_count).map(|i| 2.0 * graph.self_loop(i)).collect();

        Self::assemble(offsets, neighbors, weights, self_weights)
    }

    fn assemble(
        offsets: Vec<usize>,
        neighbors: Vec<usize>,
        weights: Vec<f64>,
        self_weights: Vec<f64>,
    ) -> Self {
        let degrees = self_weights
            .iter()
            .enumerate()
            .map(|(node, &own)| own + weights[offsets[node]..offsets[node + 1]].iter().sum::<f64>())
            .collect();

        Self {
            offsets,
            neighbors,
            weights,
            self_weights,
            degrees,
        }
    }

    fn node_count(&self) -> usize {
        self.self_weights.len()
    }

    fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[node]..self.offsets[node + 1];
        self.neighbors[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    /// `2m`, invariant across levels
    fn total_degree(&self) -> f64 {
        self.degrees.iter().sum()
    }

    fn modularity(&self, labels: &[usize], count: usize, resolution: f64, two_m: f64) -> f64 {
        let mut inside = vec![0.0; count];
        let mut totals = vec![0.0; count];

        for node in 0..self.node_count() {
            let community = labels[node];
            totals[community] += self.degrees[node];
            inside[community] += self.self_weights[node];
            for (neighbor, weight) in self.neighbors(node) {
                if labels[neighbor] == community {
                    inside[community] += weight;
                }
            }
        }

        inside
            .iter()
            .zip(&totals)
            .map(|(&inner, &total)| inner / two_m - resolution * (total / two_m).powi(2))
            .sum()
    }

    /// Collapse each community (labels in `0..count`) into a super-node
    fn aggregate(&self, labels: &[usize], count: usize) -> Level {
        let mut self_weights = vec![0.0; count];
        let mut links: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];

        for node in 0..self.node_count() {
            let community = labels[node];
            self_weights[community] += self.self_weights[node];
            for (neighbor, weight) in self.neighbors(node) {
                let other = labels[neighbor];
                if other == community {
                    // Seen from both endpoints, so this adds up to twice the edge
                    self_weights[community] += weight;
                } else {
                    *links[community].entry(other).or_insert(0.0) += weight;
                }
            }
        }

        let mut offsets = Vec::with_capacity(count + 1);
        let mut neighbors = Vec::new();
        let mut weights = Vec::new();

        offsets.push(0);
        for community_links in links {
            for (other, weight) in community_links {
                neighbors.push(other);
                weights.push(weight);
            }
            offsets.push(neighbors.len());
        }

        Self::assemble(offsets, neighbors, weights, self_weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, NodeId};
    use std::collections::HashMap;

    fn graph_from(nodes: &[NodeId], edges: &[(NodeId, NodeId, f64)]) -> WeightedGraph {
        let table: HashMap<(NodeId, NodeId), f64> = edges
            .iter()
            .flat_map(|&(u, v, w)| [((u, v), w), ((v, u), w)])
            .collect();
        let lookup = |u: NodeId, v: NodeId| Some(table.get(&(u, v)).copied().unwrap_or(0.0));
        GraphBuilder::default()
            .with_self_loops(true)
            .build(nodes, &lookup)
            .unwrap()
    }

    fn clique(nodes: &[NodeId], weight: f64) -> Vec<(NodeId, NodeId, f64)> {
        let mut edges = Vec::new();
        for (i, &u) in nodes.iter().enumerate() {
            for &v in &nodes[i + 1..] {
                edges.push((u, v, weight));
            }
        }
        edges
    }

    #[derive(Default)]
    struct Recorder {
        passes: Vec<(usize, usize, f64)>,
        levels: usize,
        finished: bool,
    }

    impl ProgressObserver for Recorder {
        fn on_pass(&mut self, level: usize, pass: usize, _moves: usize, modularity: f64) {
            self.passes.push((level, pass, modularity));
        }

        fn on_level(&mut self, _level: usize, _nodes: usize, _communities: usize) {
            self.levels += 1;
        }

        fn on_finish(&mut self, _stats: &DetectionStats) {
            self.finished = true;
        }
    }

    #[test]
    fn test_two_weighted_pairs() {
        let graph = graph_from(
            &[1, 2, 3, 4],
            &[(1, 2, 10.0), (3, 4, 10.0), (1, 3, 1.0), (2, 4, 1.0)],
        );

        let detection = Louvain::default().detect(&graph);
        let p = &detection.partition;

        assert_eq!(p.assignments(), &[0, 0, 1, 1]);
        assert_eq!(p.community_count(), 2);
        // Q = 2 * (20/44 - (22/44)^2)
        assert!((detection.stats.modularity - (40.0 / 44.0 - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_triangle_is_one_community() {
        let graph = graph_from(&[0, 1, 2], &clique(&[0, 1, 2], 1.0));

        let detection = Louvain::default().detect(&graph);

        assert_eq!(detection.partition.assignments(), &[0, 0, 0]);
    }

    #[test]
    fn test_two_cliques_with_bridge() {
        let mut edges = clique(&[0, 1, 2], 1.0);
        edges.extend(clique(&[3, 4, 5], 1.0));
        edges.push((2, 3, 1.0));
        let graph = graph_from(&[0, 1, 2, 3, 4, 5], &edges);

        let detection = Louvain::default().detect(&graph);

        assert_eq!(detection.partition.assignments(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_ring_of_cliques() {
        let groups: Vec<Vec<NodeId>> = (0..4).map(|g| (g * 5..g * 5 + 5).collect()).collect();
        let mut edges = Vec::new();
        for group in &groups {
            edges.extend(clique(group, 1.0));
        }
        for g in 0..4 {
            edges.push((groups[g][4], groups[(g + 1) % 4][0], 1.0));
        }
        let nodes: Vec<NodeId> = (0..20).collect();
        let graph = graph_from(&nodes, &edges);

        let p = Louvain::default().detect(&graph).partition;

        assert_eq!(p.community_count(), 4);
        for group in &groups {
            let first = p.community_of(group[0]);
            assert!(group.iter().all(|&n| p.community_of(n) == first));
        }
    }

    #[test]
    fn test_isolated_nodes_stay_apart() {
        let graph = graph_from(&[5, 6, 7], &[]);

        let detection = Louvain::default().detect(&graph);

        assert_eq!(detection.partition.assignments(), &[0, 1, 2]);
        assert_eq!(detection.stats.modularity, 0.0);
        assert!(detection.stats.levels.is_empty());
    }

    #[test]
    fn test_empty_graph() {
        let detection = Louvain::default().detect(&WeightedGraph::empty());

        assert!(detection.partition.is_empty());
        assert_eq!(detection.partition.community_count(), 0);
    }

    #[test]
    fn test_components_never_share_a_community() {
        let graph = graph_from(&[1, 2, 3, 4, 9], &[(1, 2, 1.0), (3, 4, 1.0)]);

        let p = Louvain::default().detect(&graph).partition;

        assert_eq!(p.community_of(1), p.community_of(2));
        assert_eq!(p.community_of(3), p.community_of(4));
        assert_ne!(p.community_of(1), p.community_of(3));
        assert_eq!(p.community_count(), 3);
    }

    #[test]
    fn test_deterministic() {
        let mut edges = clique(&[0, 1, 2, 3], 2.0);
        edges.extend(clique(&[4, 5, 6, 7], 1.5));
        edges.extend([(0, 4, 0.5), (3, 7, 0.5), (2, 5, 0.25)]);
        let graph = graph_from(&(0..8).collect::<Vec<_>>(), &edges);
        let louvain = Louvain::default();

        let first = louvain.detect(&graph);
        let second = louvain.detect(&graph);

        assert_eq!(first.partition, second.partition);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_modularity_never_decreases_within_a_level() {
        let mut edges = clique(&[0, 1, 2, 3, 4], 1.0);
        edges.extend(clique(&[5, 6, 7, 8], 3.0));
        edges.extend([(4, 5, 1.0), (0, 8, 0.5), (2, 7, 0.2)]);
        let graph = graph_from(&(0..9).collect::<Vec<_>>(), &edges);

        let detection = Louvain::default().detect(&graph);

        for level in &detection.stats.levels {
            for w in level.pass_modularity.windows(2) {
                assert!(w[1] >= w[0] - 1e-12);
            }
        }
        let last = detection.stats.levels.last().unwrap().pass_modularity.last().unwrap();
        assert!((last - detection.stats.modularity).abs() < 1e-9);
    }

    #[test]
    fn test_pass_cap_is_not_an_error() {
        let graph = graph_from(
            &[1, 2, 3, 4],
            &[(1, 2, 10.0), (3, 4, 10.0), (1, 3, 1.0), (2, 4, 1.0)],
        );

        let detection = Louvain::default().with_max_passes(1).detect(&graph);

        assert!(detection.stats.pass_cap_hit);
        assert!(!detection.stats.levels[0].converged);
        assert_eq!(detection.partition.len(), 4);
    }

    #[test]
    fn test_self_loop_counts_towards_degree() {
        // Path 1-2-3; a heavy self-loop on 1 pushes 2 towards 3
        let edges = [(1, 1, 10.0), (1, 2, 1.0), (2, 3, 1.0)];
        let with_loop = graph_from(&[1, 2, 3], &edges);
        let table: HashMap<(NodeId, NodeId), f64> = edges.iter().map(|&(u, v, w)| ((u, v), w)).collect();
        let lookup = |u: NodeId, v: NodeId| Some(table.get(&(u, v)).copied().unwrap_or(0.0));
        let without_loop = GraphBuilder::default().build(&[1, 2, 3], &lookup).unwrap();

        let p = Louvain::default().detect(&with_loop).partition;
        assert_ne!(p.community_of(1), p.community_of(2));
        assert_eq!(p.community_of(2), p.community_of(3));

        let p = Louvain::default().detect(&without_loop).partition;
        assert_eq!(p.community_count(), 1);
    }

    #[test]
    fn test_high_resolution_splits_more() {
        let mut edges = clique(&[0, 1, 2, 3], 1.0);
        edges.extend(clique(&[4, 5, 6, 7], 1.0));
        edges.push((3, 4, 1.0));
        let graph = graph_from(&(0..8).collect::<Vec<_>>(), &edges);

        let coarse = Louvain::default().with_resolution(0.01).detect(&graph).partition;
        let fine = Louvain::default().detect(&graph).partition;

        assert!(coarse.community_count() < fine.community_count());
    }

    #[test]
    fn test_aggregation_preserves_modularity() {
        let mut edges = clique(&[0, 1, 2], 1.0);
        edges.extend(clique(&[3, 4, 5], 2.0));
        edges.push((2, 3, 1.0));
        let graph = graph_from(&(0..6).collect::<Vec<_>>(), &edges);
        let level = Level::from_graph(&graph);
        let two_m = level.total_degree();
        let labels = vec![0, 0, 0, 1, 1, 1];

        let before = level.modularity(&labels, 2, 1.0, two_m);
        let coarse = level.aggregate(&labels, 2);
        let after = coarse.modularity(&[0, 1], 2, 1.0, two_m);

        assert!((before - after).abs() < 1e-12);
        assert!((coarse.total_degree() - two_m).abs() < 1e-12);
        assert_eq!(coarse.neighbors(0).collect::<Vec<_>>(), vec![(1, 1.0)]);
        assert_eq!(coarse.self_weights, vec![6.0, 12.0]);
    }

    #[test]
    fn test_observer_sees_every_pass() {
        let graph = graph_from(&[1, 2, 3, 4], &[(1, 2, 10.0), (3, 4, 10.0), (1, 3, 1.0)]);
        let mut recorder = Recorder::default();

        let detection = Louvain::default().detect_with_observer(&graph, &mut recorder);

        assert_eq!(recorder.passes.len(), detection.stats.total_passes());
        assert_eq!(recorder.levels, detection.stats.levels.len());
        assert!(recorder.finished);
    }
}
