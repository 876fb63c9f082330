//! voxmorph-morph - Morphological operators for 3D volumes
//!
//! This crate provides the operator applied to each slab of a blocked run:
//!
//! - Structuring elements (bricks, crosses, balls, arbitrary footprints and
//!   non-flat weighted elements)
//! - Grayscale dilation and erosion with reflected boundaries
//! - [`MorphOp`], the operator selector parsed from an operation name

mod error;
pub mod grayscale;
pub mod op;
pub mod sel;

pub use error::{MorphError, MorphResult};
pub use grayscale::{dilate_volume, erode_volume};
pub use op::MorphOp;
pub use sel::{SelOffset, StructuringElement};
