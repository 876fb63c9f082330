//! voxmorph-core - Basic data structures for blocked volume morphology
//!
//! This crate provides the in-memory structures shared by the pipeline:
//!
//! - [`VolumeShape`] - Dimensions of a dense `(X, Y, Z)` volume
//! - [`FlattenedView`] - Zero-copy `(Z, X*Y)` matrix view of a volume
//! - [`CsrMatrix`] - Row-compressed encoding of the flattened view
//! - [`MemoryProbe`] - Diagnostic sink sampled at pipeline checkpoints

pub mod csr;
pub mod error;
pub mod flatten;
pub mod probe;
pub mod shape;

pub use csr::CsrMatrix;
pub use error::{Error, Result};
pub use flatten::{FlattenedView, flatten};
pub use probe::{
    Checkpoint, MemoryProbe, MemorySample, MemorySummary, NullProbe, RecordingProbe,
    SystemMemoryProbe,
};
pub use shape::VolumeShape;
