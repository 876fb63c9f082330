//! Flattened 2D view of a volume
//!
//! Reinterprets a row-major `(X, Y, Z)` volume as a `(Z, X*Y)` matrix without
//! copying: element `(z, x*Y + y)` of the view is element `(x, y, z)` of the
//! volume. Columns therefore enumerate spatial positions X-then-Y, which is
//! the order the block planner relies on when it cuts column ranges into
//! X slabs.

use crate::error::{Error, Result};
use crate::shape::VolumeShape;

/// Zero-copy `(Z, X*Y)` view over volume data
#[derive(Debug, Clone, Copy)]
pub struct FlattenedView<'a> {
    data: &'a [f32],
    shape: VolumeShape,
}

impl<'a> FlattenedView<'a> {
    /// Number of matrix rows (`Z`)
    #[inline]
    pub fn rows(&self) -> usize {
        self.shape.z()
    }

    /// Number of matrix columns (`X * Y`)
    #[inline]
    pub fn cols(&self) -> usize {
        self.shape.columns()
    }

    /// Shape of the underlying volume
    #[inline]
    pub fn volume_shape(&self) -> VolumeShape {
        self.shape
    }

    /// Get element `(row, col)`, or `None` when out of range
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows() || col >= self.cols() {
            return None;
        }
        Some(self.data[col * self.rows() + row])
    }

    /// Iterate one matrix row as `(col, value)` pairs in column order
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + 'a {
        let rows = self.rows();
        let data = self.data;
        (0..self.cols()).map(move |col| (col, data[col * rows + row]))
    }
}

/// Flatten a row-major volume into a `(Z, X*Y)` view.
///
/// # Errors
///
/// Returns `Error::ShapeMismatch` if `data` does not hold exactly
/// `shape.len()` elements.
///
/// # Examples
///
/// ```
/// use voxmorph_core::{VolumeShape, flatten};
///
/// let shape = VolumeShape::new(2, 3, 4).unwrap();
/// let data: Vec<f32> = (0..24).map(|v| v as f32).collect();
/// let view = flatten(&data, shape).unwrap();
/// assert_eq!((view.rows(), view.cols()), (4, 6));
/// // volume (1, 2, 3) sits at row 3, column 1*3 + 2
/// assert_eq!(view.get(3, 5), Some(23.0));
/// ```
pub fn flatten(data: &[f32], shape: VolumeShape) -> Result<FlattenedView<'_>> {
    if data.len() != shape.len() {
        return Err(Error::ShapeMismatch {
            expected: shape.len(),
            actual: data.len(),
        });
    }
    Ok(FlattenedView { data, shape })
}
