//! Slab planning
//!
//! Cuts the `C = X * Y` columns of the flattened matrix into `n` overlapping
//! column ranges, one per slab of X layers. Every interior slab boundary
//! gets `g` halo layers on each side; the first slab has only a trailing
//! halo and the last only a leading one, so no range reaches outside
//! `[0, C)`.
//!
//! # Algorithm
//!
//! With `jump = C / n`, column-group width `w = Y` and halo width `h = g * w`:
//!
//! ```text
//! start = 0, end = jump + h
//! for each slab i:
//!     emit [start, end)
//!     start = end - 2h
//!     end   = end + jump          (i <  n - 2)
//!     end   = end + jump - h      (i == n - 2, the last slab has no trailing halo)
//! ```
//!
//! The final `end` must land on `C`; the plan is rejected otherwise.

use crate::{BlockError, BlockResult};
use std::ops::Range;
use voxmorph_core::VolumeShape;

/// Halo depth in X layers used when none is configured
pub const DEFAULT_HALO: usize = 3;

/// One planned unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slab {
    /// Position in the output order
    pub index: usize,
    /// First matrix column (inclusive)
    pub start: usize,
    /// Last matrix column (exclusive)
    pub end: usize,
    /// X layers in the extracted sub-volume, halo included
    pub n_splits: usize,
    /// Halo layers before the slab's own layers
    pub lead_halo: usize,
    /// Halo layers after the slab's own layers
    pub trail_halo: usize,
}

impl Slab {
    /// Number of matrix columns in the range
    #[inline]
    pub fn columns(&self) -> usize {
        self.end - self.start
    }

    /// Layers of the sub-volume that survive trimming
    #[inline]
    pub fn keep_range(&self) -> Range<usize> {
        self.lead_halo..self.n_splits - self.trail_halo
    }

    /// Number of layers this slab contributes to the output
    #[inline]
    pub fn kept_layers(&self) -> usize {
        self.n_splits - self.lead_halo - self.trail_halo
    }

    /// Whether the slab carries any halo to trim
    #[inline]
    pub fn has_halo(&self) -> bool {
        self.lead_halo > 0 || self.trail_halo > 0
    }
}

/// Ordered slabs covering a whole volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPlan {
    shape: VolumeShape,
    halo: usize,
    slabs: Vec<Slab>,
}

impl BlockPlan {
    /// Slabs in output order
    #[inline]
    pub fn slabs(&self) -> &[Slab] {
        &self.slabs
    }

    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.slabs.len()
    }

    /// Halo depth in X layers
    #[inline]
    pub fn halo(&self) -> usize {
        self.halo
    }

    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    /// Matrix columns per X layer
    #[inline]
    pub fn column_group_width(&self) -> usize {
        self.shape.column_group_width()
    }
}

/// Plans slabs for one volume geometry
#[derive(Debug, Clone, Copy)]
pub struct BlockPlanner {
    shape: VolumeShape,
    halo: usize,
}

impl BlockPlanner {
    pub fn new(shape: VolumeShape, halo: usize) -> Self {
        Self { shape, halo }
    }

    /// Plan `n_blocks` slabs over a matrix of `columns` columns.
    ///
    /// # Errors
    ///
    /// Returns `BlockError::Planning` if `n_blocks` is zero or exceeds X,
    /// if `columns` is not `X * Y`, if a block would hold fewer layers than
    /// the halo, or if the slab ranges do not tile `[0, columns)` exactly in
    /// whole column groups.
    pub fn plan(&self, columns: usize, n_blocks: usize) -> BlockResult<BlockPlan> {
        let w = self.shape.column_group_width();
        let nx = self.shape.x();
        let g = self.halo;

        if n_blocks == 0 {
            return Err(BlockError::Planning(
                "block count must be positive".to_string(),
            ));
        }
        if columns != nx * w {
            return Err(BlockError::Planning(format!(
                "matrix has {columns} columns but volume {} needs {} columns of width {w}",
                self.shape,
                nx * w
            )));
        }
        if n_blocks > nx {
            return Err(BlockError::Planning(format!(
                "{n_blocks} blocks requested for {nx} X layers"
            )));
        }

        if n_blocks == 1 {
            let slab = Slab {
                index: 0,
                start: 0,
                end: columns,
                n_splits: nx,
                lead_halo: 0,
                trail_halo: 0,
            };
            log::debug!("single block spans all {columns} columns");
            return Ok(BlockPlan {
                shape: self.shape,
                halo: g,
                slabs: vec![slab],
            });
        }

        let layers = nx / n_blocks;
        if layers < g {
            return Err(BlockError::Planning(format!(
                "each of {n_blocks} blocks holds {layers} X layers, fewer than the halo of {g}"
            )));
        }

        let jump = columns / n_blocks;
        let h = g * w;
        let mut start = 0usize;
        let mut end = jump + h;
        let mut slabs = Vec::with_capacity(n_blocks);

        for i in 0..n_blocks {
            let lead_halo = if i == 0 { 0 } else { g };
            let trail_halo = if i == n_blocks - 1 { 0 } else { g };
            let width = end.checked_sub(start).filter(|&c| c > 0).ok_or_else(|| {
                BlockError::Planning(format!("slab {i} has empty range {start}..{end}"))
            })?;
            if width % w != 0 {
                return Err(BlockError::Planning(format!(
                    "slab {i} spans {width} columns, not a whole number of {w}-column groups"
                )));
            }
            let n_splits = width / w;
            if n_splits != layers + lead_halo + trail_halo {
                return Err(BlockError::Planning(format!(
                    "slab {i} spans {n_splits} layers, expected {}",
                    layers + lead_halo + trail_halo
                )));
            }
            log::debug!("slab {i}: columns {start}..{end}, {n_splits} layers");
            slabs.push(Slab {
                index: i,
                start,
                end,
                n_splits,
                lead_halo,
                trail_halo,
            });

            if i + 1 < n_blocks {
                start = end.checked_sub(2 * h).ok_or_else(|| {
                    BlockError::Planning(format!("slab {} would start before column 0", i + 1))
                })?;
                end = if i == n_blocks - 2 {
                    end + jump - h
                } else {
                    end + jump
                };
            }
        }

        if end != columns {
            return Err(BlockError::Planning(format!(
                "final slab ends at column {end}, not at {columns}: {nx} X layers do not split into {n_blocks} blocks"
            )));
        }

        Ok(BlockPlan {
            shape: self.shape,
            halo: g,
            slabs,
        })
    }
}
