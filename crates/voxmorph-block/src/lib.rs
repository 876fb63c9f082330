//! voxmorph-block - Blocked morphology over volumes larger than memory
//!
//! A volume of shape `(X, Y, Z)` is flattened to a `(Z, X*Y)` matrix, stored
//! row-compressed, and filtered one X slab at a time. Slabs overlap by a
//! halo of `g` layers so that every kept voxel sees its full neighbourhood;
//! the halo is trimmed before the slab is appended to the output stream.
//!
//! - [`BlockPlanner`] / [`BlockPlan`] / [`Slab`] - column ranges per slab
//! - [`BlockProcessor`] - extract, reshape, filter, trim, append
//! - [`PipelineConfig`] - input, geometry, working directory, halo
//! - [`Pipeline`] - the full chain from input volume to merged volume

pub mod config;
mod error;
pub mod pipeline;
pub mod plan;
pub mod process;

pub use config::{PipelineConfig, WORK_DIR_ENV};
pub use error::{BlockError, BlockResult};
pub use pipeline::Pipeline;
pub use plan::{BlockPlan, BlockPlanner, DEFAULT_HALO, Slab};
pub use process::BlockProcessor;
