//! voxmorph - Blocked grey-scale morphology for large 3D volumes
//!
//! A volume too large to filter in memory is flattened, stored in
//! row-compressed form and dilated or eroded one overlapping X slab at a
//! time. The filtered slabs are streamed to disk and merged into a single
//! `.npy` volume identical to the whole-volume result.
//!
//! # Example
//!
//! ```no_run
//! use voxmorph::block::{Pipeline, PipelineConfig};
//! use voxmorph::morph::StructuringElement;
//! use voxmorph::{NullProbe, VolumeShape};
//!
//! let shape = VolumeShape::new(512, 512, 256).unwrap();
//! let config = PipelineConfig::new("volume.npy", shape).with_work_dir("work");
//! let sel = StructuringElement::cube(3).unwrap();
//! let mut pipeline = Pipeline::new(config, sel, NullProbe).unwrap();
//! let merged = pipeline.run(8, "grey_dilation").unwrap();
//! println!("wrote {}", merged.display());
//! ```

// Re-export core types (shared by every stage)
pub use voxmorph_core::*;

// Re-export stage crates as modules to avoid name conflicts
pub use voxmorph_block as block;
pub use voxmorph_io as io;
pub use voxmorph_morph as morph;
