//! Partition quality and community statistics

use crate::cluster::{CommunityId, Partition};
use crate::graph::WeightedGraph;
use serde::{Deserialize, Serialize};

/// Per-community figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityStats {
    pub id: CommunityId,

    pub size: usize,

    /// Sum of edge weights with both endpoints inside (self-loops included)
    pub internal_weight: f64,

    /// Sum of member degrees
    pub total_degree: f64,

    /// Internal edges / potential edges; singletons have density 1
    pub density: f64,
}

/// Distribution of community sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Modularity of `partition` on `graph` with resolution `gamma`.
///
/// Nodes of the graph missing from the partition are treated as singletons.
pub fn modularity(graph: &WeightedGraph, partition: &Partition, resolution: f64) -> f64 {
    let two_m = 2.0 * graph.total_weight();
    if two_m <= 0.0 {
        return 0.0;
    }

    let labels = labels_for(graph, partition);
    let count = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut inside = vec![0.0; count];
    let mut totals = vec![0.0; count];

    for (node, &community) in labels.iter().enumerate() {
        totals[community] += graph.degree(node);
        inside[community] += 2.0 * graph.self_loop(node);
        for (neighbor, weight) in graph.neighbors(node) {
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

/// Size, internal weight, degree and density of every community
pub fn community_stats(graph: &WeightedGraph, partition: &Partition) -> Vec<CommunityStats> {
    let labels = labels_for(graph, partition);
    let count = labels.iter().copied().max().map_or(0, |m| m + 1);

    let mut stats: Vec<CommunityStats> = (0..count)
        .map(|id| CommunityStats {
            id,
            size: 0,
            internal_weight: 0.0,
            total_degree: 0.0,
            density: 1.0,
        })
        .collect();
    let mut internal_edges = vec![0usize; count];

    for (node, &community) in labels.iter().enumerate() {
        let entry = &mut stats[community];
        entry.size += 1;
        entry.total_degree += graph.degree(node);
        entry.internal_weight += graph.self_loop(node);
        for (neighbor, weight) in graph.neighbors(node) {
            // Count each internal edge from its lower endpoint only
            if neighbor > node && labels[neighbor] == community {
                entry.internal_weight += weight;
                internal_edges[community] += 1;
            }
        }
    }

    for (entry, &edges) in stats.iter_mut().zip(&internal_edges) {
        if entry.size > 1 {
            let potential = entry.size * (entry.size - 1) / 2;
            entry.density = edges as f64 / potential as f64;
        }
    }

    stats
}

/// Summarize community sizes; `None` for an empty partition
pub fn size_summary(stats: &[CommunityStats]) -> Option<SizeSummary> {
    if stats.is_empty() {
        return None;
    }

    let sizes: Vec<f64> = stats.iter().map(|s| s.size as f64).collect();
    let (mean, std_dev) = mean_and_std_dev(&sizes);

    Some(SizeSummary {
        count: stats.len(),
        min: stats.iter().map(|s| s.size).min().unwrap_or(0),
        max: stats.iter().map(|s| s.size).max().unwrap_or(0),
        mean,
        std_dev,
    })
}

/// Sample standard deviation; 0 for a single value
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    use statrs::statistics::Statistics;

    let std_dev = if values.len() > 1 { values.std_dev() } else { 0.0 };
    (values.mean(), std_dev)
}

/// Community label per graph position; unassigned nodes get fresh labels
fn labels_for(graph: &WeightedGraph, partition: &Partition) -> Vec<CommunityId> {
    let mut next = partition.community_count();
    graph
        .nodes()
        .iter()
        .map(|&id| {
            partition.community_of(id).unwrap_or_else(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}
