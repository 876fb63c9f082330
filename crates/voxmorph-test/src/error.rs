//! Error types for the test framework

use thiserror::Error;

/// Errors that can occur while preparing regression fixtures
#[derive(Debug, Error)]
pub enum TestError {
    /// Failed to write a fixture volume
    #[error("failed to write volume '{path}': {message}")]
    VolumeWrite { path: String, message: String },

    /// Failed to read back a volume
    #[error("failed to read volume '{path}': {message}")]
    VolumeRead { path: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
