//! voxmorph-io - Artifact I/O for blocked volume morphology
//!
//! - [`VolumeSource`] - read-only memory-mapped input volume (`.npy`)
//! - [`CompressedStore`] - persisted CSR matrix
//! - [`OutputStream`] / [`ClosedStream`] - append-only slab stream
//! - [`VolumeAssembler`] - merged volume written from a closed stream
//!
//! Every function returns [`IoResult`]; a missing artifact is reported as
//! [`IoError::NotFound`] so callers can decide to recompute it.

pub mod assemble;
mod error;
pub mod npy;
pub mod source;
pub mod store;
pub mod stream;

pub use assemble::VolumeAssembler;
pub use error::{IoError, IoResult};
pub use npy::NpyHeader;
pub use source::{VolumeSource, write_volume};
pub use store::CompressedStore;
pub use stream::{ClosedStream, OutputStream};
