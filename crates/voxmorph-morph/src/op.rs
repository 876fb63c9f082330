//! Operator selection
//!
//! Blocked filtering supports exactly two operators. They share one code
//! path: the block processor only ever calls [`MorphOp::apply`].

use crate::grayscale::{dilate_volume, erode_volume};
use crate::sel::StructuringElement;
use crate::{MorphError, MorphResult};
use ndarray::{Array3, ArrayView3};
use std::fmt;
use std::str::FromStr;

/// Morphological operator applied to every slab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorphOp {
    /// Grey-scale dilation
    Dilate,
    /// Grey-scale erosion
    Erode,
}

impl MorphOp {
    /// Canonical operator name (`grey_dilation` / `grey_erosion`)
    pub fn name(&self) -> &'static str {
        match self {
            MorphOp::Dilate => "grey_dilation",
            MorphOp::Erode => "grey_erosion",
        }
    }

    /// Present participle for progress messages
    pub fn verb(&self) -> &'static str {
        match self {
            MorphOp::Dilate => "dilation",
            MorphOp::Erode => "erosion",
        }
    }

    /// Apply the operator to a whole volume.
    pub fn apply(
        &self,
        volume: ArrayView3<'_, f32>,
        sel: &StructuringElement,
    ) -> MorphResult<Array3<f32>> {
        match self {
            MorphOp::Dilate => dilate_volume(volume, sel),
            MorphOp::Erode => erode_volume(volume, sel),
        }
    }
}

impl FromStr for MorphOp {
    type Err = MorphError;

    /// Parse `grey_dilation` / `dilate` or `grey_erosion` / `erode`.
    fn from_str(s: &str) -> MorphResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grey_dilation" | "gray_dilation" | "dilate" | "dilation" => Ok(MorphOp::Dilate),
            "grey_erosion" | "gray_erosion" | "erode" | "erosion" => Ok(MorphOp::Erode),
            _ => Err(MorphError::UnsupportedOperation(s.to_string())),
        }
    }
}

impl fmt::Display for MorphOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
