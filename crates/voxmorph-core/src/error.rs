//! Error types for voxmorph-core
//!
//! Provides a unified error type for the in-memory data structures of the
//! pipeline: volume shapes, the flattened view and the CSR matrix.

use thiserror::Error;

/// voxmorph-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// A volume dimension is zero or overflows `usize`
    #[error("invalid volume dimensions: {x}x{y}x{z}")]
    InvalidDimension { x: usize, y: usize, z: usize },

    /// Element count disagrees with the shape it is supposed to fill
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for voxmorph-core operations
pub type Result<T> = std::result::Result<T, Error>;
