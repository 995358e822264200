//! End-to-end detection: matrix -> graph -> partition -> exports

use crate::cluster::{CommunityClassMap, Detection, LogObserver, Louvain, Partition};
use crate::config::Config;
use crate::data::{load_matrix, CoMatrix};
use crate::graph::{EdgeRecord, GraphBuilder, WeightedGraph};
use crate::storage;
use anyhow::{Context, Result};
use std::path::Path;

/// Everything produced by one detection run
#[derive(Debug, Clone)]
pub struct Report {
    pub graph: WeightedGraph,
    pub detection: Detection,
    pub classes: CommunityClassMap,
    pub edges: Vec<EdgeRecord>,
}

/// Build the graph, detect communities and derive the exports
pub fn run(matrix: &CoMatrix, config: &Config) -> Result<Report> {
    let graph = GraphBuilder::new(&config.graph).build(matrix.ids(), matrix)?;

    log::info!(
        "Built graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    log::info!(
        "Graph memory usage: {:.2} MB",
        graph.memory_usage() as f64 / (1024.0 * 1024.0)
    );

    let detection = Louvain::new(&config.detector).detect_with_observer(&graph, &mut LogObserver);

    log::info!(
        "Found {} communities, modularity {:.6}",
        detection.partition.community_count(),
        detection.stats.modularity
    );

    let classes = export_classes(&detection.partition);
    let edges = storage::emit_edges(&graph);

    Ok(Report {
        graph,
        detection,
        classes,
        edges,
    })
}

/// Partition and edge list for a co-occurrence matrix
pub fn detect_communities(matrix: &CoMatrix, config: &Config) -> Result<(Partition, Vec<EdgeRecord>)> {
    let report = run(matrix, config)?;
    Ok((report.detection.partition, report.edges))
}

/// Group a partition into its community class map
pub fn export_classes(partition: &Partition) -> CommunityClassMap {
    storage::group(partition)
}

/// Load one matrix file, detect, and save all exports under `output_dir`
pub fn process_file(path: &Path, output_dir: &Path, config: &Config) -> Result<Report> {
    let matrix = load_matrix(path, &config.matrix)
        .with_context(|| format!("loading {}", path.display()))?;

    let report = run(&matrix, config).with_context(|| format!("detecting on {}", path.display()))?;

    storage::save_results(&report, config, output_dir)?;

    Ok(report)
}
