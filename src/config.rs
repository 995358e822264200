//! Configuration management for the community detector

use serde::{Deserialize, Serialize};

/// How co-occurrence tables are read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Name of the column holding the row node ids
    pub id_column: String,

    /// Extra columns to ignore (e.g. a written-out index)
    pub skip_columns: Vec<String>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            id_column: "start_station_id".to_string(),
            skip_columns: Vec::new(),
        }
    }
}

/// How the weighted graph is built from the table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Keep diagonal entries as self-loops
    pub include_self_loops: bool,
}

/// Tuning for the multilevel modularity optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Resolution (gamma); 1.0 is classic modularity
    pub resolution: f64,

    /// Local-moving passes allowed per level before giving up on convergence
    pub max_passes: usize,

    /// Aggregation levels allowed
    pub max_levels: usize,

    /// A pass improving modularity by less than this ends the level
    pub min_modularity_gain: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_passes: 100,
            max_levels: 32,
            min_modularity_gain: 1e-7,
        }
    }
}

/// Default configuration for a full detection run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub matrix: MatrixConfig,
    pub graph: GraphConfig,
    pub detector: DetectorConfig,
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(matrix: MatrixConfig, graph: GraphConfig, detector: DetectorConfig) -> Self {
        Self {
            matrix,
            graph,
            detector,
        }
    }
}
