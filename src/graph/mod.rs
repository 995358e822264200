//! Graph representation and algorithms module

pub mod weighted;
pub mod builder;
pub mod algorithms;

pub use builder::{GraphBuilder, WeightLookup};
pub use weighted::{EdgeRecord, WeightedGraph};

/// Opaque identifier of a station or other entity
pub type NodeId = u64;
