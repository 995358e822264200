//! Co-occurrence matrix loading

use crate::config::MatrixConfig;
use crate::error::MatrixError;
use crate::graph::{NodeId, WeightLookup};
use itertools::Itertools;
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Dense pairwise weight table between nodes.
///
/// Rows and columns are both indexed by position in the ascending `ids`
/// list. Values are non-negative and finite but need not be symmetric.
#[derive(Debug, Clone, PartialEq)]
pub struct CoMatrix {
    ids: Vec<NodeId>,
    weights: Array2<f64>,
}

impl CoMatrix {
    /// Build from explicit `(from, to, weight)` entries; unlisted pairs weigh 0
    pub fn from_entries<I>(ids: &[NodeId], entries: I) -> Result<Self, MatrixError>
    where
        I: IntoIterator<Item = (NodeId, NodeId, f64)>,
    {
        let ids = sorted_unique(ids.to_vec(), "node id")?;
        let mut weights = Array2::zeros((ids.len(), ids.len()));

        for (from, to, weight) in entries {
            let (row, col) = match (ids.binary_search(&from), ids.binary_search(&to)) {
                (Ok(row), Ok(col)) => (row, col),
                _ => {
                    return Err(MatrixError::Malformed(format!(
                        "entry ({}, {}) refers to an unknown node",
                        from, to
                    )))
                }
            };
            check_weight(weight, from, to)?;
            weights[[row, col]] = weight;
        }

        Ok(Self { ids, weights })
    }

    /// Parse a table with one id column and one weight column per node id
    pub fn from_dataframe(df: &DataFrame, config: &MatrixConfig) -> Result<Self, MatrixError> {
        let id_column = config.id_column.as_str();
        if df.column(id_column).is_err() {
            return Err(MatrixError::Malformed(format!(
                "missing identifier column '{}'",
                id_column
            )));
        }

        let row_ids = parse_id_column(df, id_column)?;
        let ids = sorted_unique(row_ids.clone(), "row id")?;

        // Columns without a matching row are ignored, as is anything not labelled by a node id
        let mut weight_columns = Vec::new();
        for name in df.get_column_names() {
            let name = name.as_str();
            if name == id_column || config.skip_columns.iter().any(|s| s == name) {
                continue;
            }
            match parse_node_label(name) {
                Some(id) if ids.binary_search(&id).is_ok() => {
                    weight_columns.push((name.to_string(), id))
                }
                Some(id) => log::warn!("Ignoring column '{}': node {} has no row", name, id),
                None => log::warn!("Ignoring column '{}': not labelled by a node id", name),
            }
        }

        let col_ids: Vec<NodeId> = weight_columns.iter().map(|(_, id)| *id).collect();
        sorted_unique(col_ids.clone(), "column id")?;
        check_square(&row_ids, &col_ids)?;

        let mut weights = Array2::zeros((ids.len(), ids.len()));
        let row_positions: Vec<usize> = row_ids
            .iter()
            .map(|id| ids.binary_search(id).unwrap_or_default())
            .collect();

        for (name, to) in &weight_columns {
            let col = ids.binary_search(to).unwrap_or_default();
            let series = df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;

            for (r, value) in series.f64()?.into_iter().enumerate() {
                let from = row_ids[r];
                let weight = value.ok_or_else(|| {
                    MatrixError::Malformed(format!("missing or non-numeric weight at ({}, {})", from, to))
                })?;
                check_weight(weight, from, *to)?;
                weights[[row_positions[r], col]] = weight;
            }
        }

        log::debug!("Parsed {}x{} co-occurrence matrix", ids.len(), ids.len());

        Ok(Self { ids, weights })
    }

    /// Node ids, ascending
    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Weight of the directed entry (from, to); `None` if either id is unknown
    pub fn weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        let row = self.ids.binary_search(&from).ok()?;
        let col = self.ids.binary_search(&to).ok()?;
        Some(self.weights[[row, col]])
    }

    pub fn is_symmetric(&self) -> bool {
        self.weights == self.weights.t()
    }
}

impl WeightLookup for CoMatrix {
    fn weight(&self, from: NodeId, to: NodeId) -> Option<f64> {
        CoMatrix::weight(self, from, to)
    }
}

/// Load a co-occurrence table from a CSV or Parquet file
pub fn load_matrix(path: &Path, config: &MatrixConfig) -> Result<CoMatrix, MatrixError> {
    log::info!("Reading co-occurrence matrix: {}", path.display());

    if !path.exists() {
        return Err(MatrixError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("file not found: {}", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let df = match extension.as_deref() {
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        Some("parquet") | Some("pq") => ParquetReader::new(File::open(path)?).finish()?,
        _ => return Err(MatrixError::UnsupportedFormat(path.display().to_string())),
    };

    log::debug!("Table shape: {:?}", df.shape());

    let matrix = CoMatrix::from_dataframe(&df, config)?;
    if matrix.is_empty() {
        log::warn!("{} holds no stations", path.display());
    } else if !matrix.is_symmetric() {
        log::debug!("Matrix is asymmetric, upper-triangle values will be used");
    }

    log::info!("Loaded co-occurrence matrix over {} nodes", matrix.len());

    Ok(matrix)
}

/// Parse a column label such as `"12"` or `"12.0"` into a node id
pub fn parse_node_label(label: &str) -> Option<NodeId> {
    let label = label.trim();
    if let Ok(id) = label.parse::<NodeId>() {
        return Some(id);
    }

    let value = label.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= NodeId::MAX as f64 {
        Some(value as NodeId)
    } else {
        None
    }
}

/// Integer id columns are read exactly; float columns must hold integral values
fn parse_id_column(df: &DataFrame, name: &str) -> Result<Vec<NodeId>, MatrixError> {
    let column = df.column(name)?.as_materialized_series();
    let invalid = |row: usize| {
        MatrixError::Malformed(format!(
            "row {} has an invalid identifier in '{}'",
            row, name
        ))
    };

    if column.dtype().is_integer() {
        // Negative values become null in the cast
        let series = column.cast(&DataType::UInt64)?;
        return series
            .u64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| value.ok_or_else(|| invalid(row)))
            .collect();
    }

    let series = column.cast(&DataType::Float64)?;
    series
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as NodeId),
            _ => Err(invalid(row)),
        })
        .collect()
}

fn sorted_unique(mut ids: Vec<NodeId>, what: &str) -> Result<Vec<NodeId>, MatrixError> {
    ids.sort_unstable();
    if let Some(dup) = ids.iter().duplicates().next() {
        return Err(MatrixError::Malformed(format!("duplicated {} {}", what, dup)));
    }
    Ok(ids)
}

/// Every row id needs a weight column
fn check_square(row_ids: &[NodeId], col_ids: &[NodeId]) -> Result<(), MatrixError> {
    let cols: HashSet<NodeId> = col_ids.iter().copied().collect();

    if let Some(id) = row_ids.iter().find(|id| !cols.contains(id)) {
        return Err(MatrixError::Malformed(format!("node {} has a row but no column", id)));
    }
    Ok(())
}

fn check_weight(weight: f64, from: NodeId, to: NodeId) -> Result<(), MatrixError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(MatrixError::Malformed(format!(
            "weight {} at ({}, {}) is not a non-negative number",
            weight, from, to
        )))
    }
}
