//! Error types for the loading, graph and partition layers

use crate::graph::NodeId;
use thiserror::Error;

/// Errors raised while loading a co-occurrence table
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The table is not a well-formed square co-occurrence matrix
    #[error("malformed co-occurrence matrix: {0}")]
    Malformed(String),

    /// The file extension is not one we know how to read
    #[error("unsupported matrix format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read matrix: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Errors raised while building a weighted graph
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    /// The weight lookup could not resolve a required pair
    #[error("missing weight for pair ({from}, {to})")]
    MissingWeight { from: NodeId, to: NodeId },

    /// The weight lookup returned a negative or non-finite value
    #[error("invalid weight {weight} for pair ({from}, {to})")]
    InvalidWeight {
        from: NodeId,
        to: NodeId,
        weight: f64,
    },
}

/// Errors raised when a raw assignment does not form a valid partition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error("expected {expected} assignments, got {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("node {0} is assigned more than once")]
    DuplicateNode(NodeId),

    /// Community ids must be exactly 0..K with no gaps
    #[error("community id {0} is unused, ids must be contiguous")]
    Gap(usize),
}
