//! Structuring element for 3D morphology
//!
//! A structuring element defines the neighborhood used by dilation and
//! erosion. It is a small `(dx, dy, dz)` grid with a footprint (which cells
//! take part) and, for non-flat elements, an additive weight per cell. The
//! origin is the cell `(dx / 2, dy / 2, dz / 2)`.

use crate::{MorphError, MorphResult};
use ndarray::ArrayView3;

/// One footprint cell relative to the origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelOffset {
    pub dx: isize,
    pub dy: isize,
    pub dz: isize,
    /// Additive weight (0 for flat elements)
    pub weight: f32,
}

/// 3D structuring element
#[derive(Debug, Clone, PartialEq)]
pub struct StructuringElement {
    dims: [usize; 3],
    footprint: Vec<bool>,
    weights: Option<Vec<f32>>,
    name: Option<String>,
}

impl StructuringElement {
    /// Create a flat element from a row-major footprint.
    ///
    /// # Errors
    ///
    /// Returns `MorphError::InvalidSel` if a dimension is zero, the footprint
    /// length does not match `dims`, or no cell is set.
    pub fn from_footprint(dims: [usize; 3], footprint: Vec<bool>) -> MorphResult<Self> {
        check_dims(dims, footprint.len())?;
        if !footprint.iter().any(|&hit| hit) {
            return Err(MorphError::InvalidSel(
                "footprint has no set cells".to_string(),
            ));
        }
        Ok(Self {
            dims,
            footprint,
            weights: None,
            name: None,
        })
    }

    /// Create a non-flat element: every cell takes part and its weight is
    /// added (dilation) or subtracted (erosion).
    pub fn non_flat(dims: [usize; 3], weights: Vec<f32>) -> MorphResult<Self> {
        check_dims(dims, weights.len())?;
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(MorphError::InvalidSel(
                "weights must be finite".to_string(),
            ));
        }
        Ok(Self {
            dims,
            footprint: vec![true; weights.len()],
            weights: Some(weights),
            name: None,
        })
    }

    /// Create a flat element from a boolean array.
    pub fn from_array(footprint: ArrayView3<'_, bool>) -> MorphResult<Self> {
        let (dx, dy, dz) = footprint.dim();
        Self::from_footprint([dx, dy, dz], footprint.iter().copied().collect())
    }

    /// Create a rectangular "brick" element with every cell set
    pub fn brick(dx: usize, dy: usize, dz: usize) -> MorphResult<Self> {
        let mut sel = Self::from_footprint([dx, dy, dz], vec![true; dx * dy * dz])?;
        sel.set_name(format!("brick{dx}x{dy}x{dz}"));
        Ok(sel)
    }

    /// Create a cubic brick of edge `size`
    pub fn cube(size: usize) -> MorphResult<Self> {
        Self::brick(size, size, size)
    }

    /// Create the 6-connected 3x3x3 cross (centre plus face neighbours)
    pub fn cross() -> MorphResult<Self> {
        let mut footprint = vec![false; 27];
        for (x, y, z) in [
            (1, 1, 1),
            (0, 1, 1),
            (2, 1, 1),
            (1, 0, 1),
            (1, 2, 1),
            (1, 1, 0),
            (1, 1, 2),
        ] {
            footprint[(x * 3 + y) * 3 + z] = true;
        }
        let mut sel = Self::from_footprint([3, 3, 3], footprint)?;
        sel.set_name("cross");
        Ok(sel)
    }

    /// Create a digital ball of the given radius
    pub fn ball(radius: usize) -> MorphResult<Self> {
        let d = 2 * radius + 1;
        let r = radius as isize;
        let mut footprint = Vec::with_capacity(d * d * d);
        for x in -r..=r {
            for y in -r..=r {
                for z in -r..=r {
                    footprint.push(x * x + y * y + z * z <= r * r);
                }
            }
        }
        let mut sel = Self::from_footprint([d, d, d], footprint)?;
        sel.set_name(format!("ball{radius}"));
        Ok(sel)
    }

    /// Grid dimensions `[dx, dy, dz]`
    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Origin cell `[dx / 2, dy / 2, dz / 2]`
    #[inline]
    pub fn origin(&self) -> [usize; 3] {
        [self.dims[0] / 2, self.dims[1] / 2, self.dims[2] / 2]
    }

    /// Whether the element has additive weights
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.weights.is_none()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Count the number of footprint cells
    pub fn hit_count(&self) -> usize {
        self.footprint.iter().filter(|&&hit| hit).count()
    }

    /// Footprint cells relative to the origin
    pub fn offsets(&self) -> Vec<SelOffset> {
        let [_, dy, dz] = self.dims;
        let [ox, oy, oz] = self.origin();
        self.footprint
            .iter()
            .enumerate()
            .filter(|(_, hit)| **hit)
            .map(|(idx, _)| {
                let x = idx / (dy * dz);
                let y = (idx / dz) % dy;
                let z = idx % dz;
                SelOffset {
                    dx: x as isize - ox as isize,
                    dy: y as isize - oy as isize,
                    dz: z as isize - oz as isize,
                    weight: self.weights.as_ref().map_or(0.0, |w| w[idx]),
                }
            })
            .collect()
    }

    /// Largest distance from the origin reached along each axis
    ///
    /// A blocked filter needs at least `reach()[0]` halo layers along X for
    /// its result to match the whole-volume result.
    pub fn reach(&self) -> [usize; 3] {
        self.offsets().iter().fold([0; 3], |acc, o| {
            [
                acc[0].max(o.dx.unsigned_abs()),
                acc[1].max(o.dy.unsigned_abs()),
                acc[2].max(o.dz.unsigned_abs()),
            ]
        })
    }
}

fn check_dims(dims: [usize; 3], len: usize) -> MorphResult<()> {
    if dims.contains(&0) {
        return Err(MorphError::InvalidSel(format!(
            "zero dimension in {dims:?}"
        )));
    }
    let expected = dims[0] * dims[1] * dims[2];
    if len != expected {
        return Err(MorphError::InvalidSel(format!(
            "{len} cells given for dims {dims:?} ({expected} expected)"
        )));
    }
    Ok(())
}
