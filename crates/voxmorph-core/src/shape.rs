//! Volume geometry
//!
//! A volume is a dense row-major 3D array with X the slowest-varying axis.
//! The flattened matrix used for compression has one column per `(x, y)`
//! position, so advancing X by one moves `y` columns: that distance is the
//! column-group width.

use crate::error::{Error, Result};

/// Dimensions `(x, y, z)` of a dense volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeShape {
    x: usize,
    y: usize,
    z: usize,
}

impl VolumeShape {
    /// Create a shape, rejecting zero dimensions and element counts that
    /// overflow `usize`.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxmorph_core::VolumeShape;
    ///
    /// let shape = VolumeShape::new(30, 10, 4).unwrap();
    /// assert_eq!(shape.len(), 1200);
    /// assert_eq!(shape.columns(), 300);
    /// assert!(VolumeShape::new(0, 10, 4).is_err());
    /// ```
    pub fn new(x: usize, y: usize, z: usize) -> Result<Self> {
        if x == 0 || y == 0 || z == 0 {
            return Err(Error::InvalidDimension { x, y, z });
        }
        x.checked_mul(y)
            .and_then(|xy| xy.checked_mul(z))
            .ok_or(Error::InvalidDimension { x, y, z })?;
        Ok(Self { x, y, z })
    }

    /// Create a shape from a `[x, y, z]` array
    pub fn from_dims(dims: [usize; 3]) -> Result<Self> {
        Self::new(dims[0], dims[1], dims[2])
    }

    #[inline]
    pub fn x(&self) -> usize {
        self.x
    }

    #[inline]
    pub fn y(&self) -> usize {
        self.y
    }

    #[inline]
    pub fn z(&self) -> usize {
        self.z
    }

    /// Dimensions as `[x, y, z]`
    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        [self.x, self.y, self.z]
    }

    /// Total number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.x * self.y * self.z
    }

    /// Always false: a shape has no zero dimension.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Size of the volume in bytes when stored as `f32`
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.len() * std::mem::size_of::<f32>()
    }

    /// Column count of the flattened `(z, x*y)` matrix
    #[inline]
    pub fn columns(&self) -> usize {
        self.x * self.y
    }

    /// Number of flattened columns spanned by one step along X
    #[inline]
    pub fn column_group_width(&self) -> usize {
        self.y
    }

    /// Number of elements in one X layer (a `y * z` plane)
    #[inline]
    pub fn layer_len(&self) -> usize {
        self.y * self.z
    }
}

impl std::fmt::Display for VolumeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
