//! I/O error types
//!
//! Provides a unified error type for all artifact I/O: the input volume,
//! the compressed matrix, the output stream and the merged volume.
//! `NotFound` is kept apart from other I/O failures because a missing
//! artifact is recoverable: the caller may recompute it.

use std::path::PathBuf;
use thiserror::Error;

/// Error type for artifact I/O.
#[derive(Error, Debug)]
pub enum IoError {
    /// A required artifact does not exist
    #[error("artifact not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// Standard I/O error (permission denied, disk full, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file format is valid but not supported here
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The artifact is structurally invalid
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A compressed section failed to inflate
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Artifact byte length disagrees with the expected shape
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Volume shape on disk disagrees with the caller-supplied shape
    #[error("shape mismatch: expected {expected:?}, found {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// An error from the core library
    #[error("core error: {0}")]
    Core(#[from] voxmorph_core::Error),
}

impl IoError {
    /// Whether this error reports a missing artifact
    pub fn is_not_found(&self) -> bool {
        matches!(self, IoError::NotFound { .. })
    }
}

/// Convenience alias for I/O results.
pub type IoResult<T> = Result<T, IoError>;

/// Map an open failure to `NotFound` when the file is missing.
pub(crate) fn open_error(path: &std::path::Path, err: std::io::Error) -> IoError {
    if err.kind() == std::io::ErrorKind::NotFound {
        IoError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        IoError::Io(err)
    }
}
