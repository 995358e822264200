//! Core library functions for station community detection

pub mod config;
pub mod error;
pub mod data;
pub mod graph;
pub mod cluster;
pub mod storage;
pub mod pipeline;

pub use anyhow::{Result, anyhow};
pub use pipeline::{detect_communities, export_classes};
