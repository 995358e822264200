//! Results persistence module
//!
//! Writes the exchange files the map renderer reads: the class map as
//! `node_per_class.json` / `node_per_class.bin` and the edge list as
//! `node_edge.csv` (`source,target,value`).

pub mod export;

use crate::cluster::metrics;
use crate::cluster::CommunityClassMap;
use crate::config::Config;
use crate::graph::algorithms::count_components;
use crate::pipeline::Report;
use anyhow::Result;
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub use export::{emit_edges, group};

pub const CLASSES_JSON: &str = "node_per_class.json";
pub const CLASSES_BIN: &str = "node_per_class.bin";
pub const EDGES_CSV: &str = "node_edge.csv";
pub const PARTITION_CSV: &str = "partition.csv";
pub const SUMMARY_JSON: &str = "summary.json";

/// Save a detection report to the specified directory
pub fn save_results(report: &Report, config: &Config, output_dir: &Path) -> Result<()> {
    log::info!(
        "Saving {} communities to {}",
        report.classes.len(),
        output_dir.display()
    );

    fs::create_dir_all(output_dir)?;

    save_classes(&report.classes, output_dir)?;
    save_edges(report, output_dir)?;
    save_partition(report, output_dir)?;
    save_summary(report, config, output_dir)?;

    log::info!("Results saved successfully");

    Ok(())
}

/// Read back a class map written by `save_results`
pub fn load_classes(output_dir: &Path) -> Result<CommunityClassMap> {
    let file = File::open(output_dir.join(CLASSES_BIN))?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

fn save_classes(classes: &CommunityClassMap, output_dir: &Path) -> Result<()> {
    log::debug!("Saving class map");

    let file = File::create(output_dir.join(CLASSES_JSON))?;
    serde_json::to_writer_pretty(BufWriter::new(file), classes)?;

    let file = File::create(output_dir.join(CLASSES_BIN))?;
    bincode::serialize_into(BufWriter::new(file), classes)?;

    Ok(())
}

fn save_edges(report: &Report, output_dir: &Path) -> Result<()> {
    log::debug!("Saving {} edges", report.edges.len());

    let mut file = BufWriter::new(File::create(output_dir.join(EDGES_CSV))?);
    writeln!(file, "source,target,value")?;
    for edge in &report.edges {
        writeln!(file, "{},{},{}", edge.source, edge.target, edge.weight)?;
    }
    file.flush()?;

    Ok(())
}

fn save_partition(report: &Report, output_dir: &Path) -> Result<()> {
    let mut file = BufWriter::new(File::create(output_dir.join(PARTITION_CSV))?);
    writeln!(file, "node_id,community")?;
    for (node, community) in report.detection.partition.iter() {
        writeln!(file, "{},{}", node, community)?;
    }
    file.flush()?;

    Ok(())
}

fn save_summary(report: &Report, config: &Config, output_dir: &Path) -> Result<()> {
    log::debug!("Saving summary information");

    let graph = &report.graph;
    let stats = &report.detection.stats;
    let communities = metrics::community_stats(graph, &report.detection.partition);
    let sizes = metrics::size_summary(&communities);

    let summary = json!({
        "graph_stats": {
            "node_count": graph.node_count(),
            "edge_count": graph.edge_count(),
            "self_loop_count": graph.edges().iter().filter(|e| e.is_self_loop()).count(),
            "total_weight": graph.total_weight(),
            "connected_components": count_components(graph),
        },
        "detection": {
            "community_count": report.detection.partition.community_count(),
            "modularity": stats.modularity,
            "levels": stats.levels.len(),
            "total_passes": stats.total_passes(),
            "pass_cap_hit": stats.pass_cap_hit,
            "level_cap_hit": stats.level_cap_hit,
            "level_stats": stats.levels,
        },
        "community_sizes": sizes,
        "communities": communities,
        "config": config,
    });

    let mut file = File::create(output_dir.join(SUMMARY_JSON))?;
    file.write_all(to_string_pretty(&summary)?.as_bytes())?;

    Ok(())
}
