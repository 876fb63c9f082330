//! Error types for voxmorph-block

use thiserror::Error;
use voxmorph_io::IoError;

/// Errors that can occur while planning or running a blocked filter
#[derive(Debug, Error)]
pub enum BlockError {
    /// Block count or geometry cannot be partitioned into consistent slabs
    #[error("planning error: {0}")]
    Planning(String),

    /// A slab's extracted element count disagrees with its sub-volume shape
    #[error("shape mismatch in slab {slab}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        slab: usize,
        expected: usize,
        actual: usize,
    },

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Artifact I/O error
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Morphology error, including unsupported operation names
    #[error("morphology error: {0}")]
    Morph(#[from] voxmorph_morph::MorphError),

    /// Core data structure error
    #[error("core error: {0}")]
    Core(#[from] voxmorph_core::Error),
}

impl BlockError {
    /// Whether this error reports a missing artifact
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlockError::Io(e) if e.is_not_found())
    }

    /// Whether the caller may recover, e.g. by recomputing an artifact.
    ///
    /// Every other error is fatal for the run.
    pub fn is_recoverable(&self) -> bool {
        self.is_not_found()
    }
}

/// Result type for blocked filtering
pub type BlockResult<T> = Result<T, BlockError>;
