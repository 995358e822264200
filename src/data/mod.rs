//! Input tables

pub mod matrix;

pub use matrix::{load_matrix, CoMatrix};
