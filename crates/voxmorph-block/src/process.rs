//! Per-slab processing
//!
//! Each slab goes through the same steps, strictly in index order:
//!
//! 1. densify its column range of the CSR matrix (X leading)
//! 2. reshape into an `(n_splits, Y, Z)` sub-volume
//! 3. apply the operator to the whole sub-volume, halo included
//! 4. trim the halo layers
//! 5. append the remaining layers to the output stream
//!
//! Only one slab is resident at a time.

use crate::plan::{BlockPlan, Slab};
use crate::{BlockError, BlockResult};
use ndarray::{Array3, s};
use voxmorph_core::{Checkpoint, CsrMatrix, MemoryProbe};
use voxmorph_io::OutputStream;
use voxmorph_morph::{MorphOp, StructuringElement};

/// Runs one operator over every slab of a plan
pub struct BlockProcessor<'a> {
    matrix: &'a CsrMatrix,
    plan: &'a BlockPlan,
    sel: &'a StructuringElement,
    op: MorphOp,
}

impl<'a> BlockProcessor<'a> {
    /// Bind a matrix, plan and operator.
    ///
    /// # Errors
    ///
    /// Returns `BlockError::Core` if the matrix is not the `(Z, X*Y)`
    /// flattening of the planned volume, and `BlockError::Planning` if the
    /// structuring element reaches further along X than the plan's halo.
    pub fn new(
        matrix: &'a CsrMatrix,
        plan: &'a BlockPlan,
        sel: &'a StructuringElement,
        op: MorphOp,
    ) -> BlockResult<Self> {
        let shape = plan.shape();
        if matrix.rows() != shape.z() || matrix.cols() != shape.columns() {
            return Err(voxmorph_core::Error::ShapeMismatch {
                expected: shape.len(),
                actual: matrix.rows() * matrix.cols(),
            }
            .into());
        }
        let reach = sel.reach()[0];
        if plan.n_blocks() > 1 && reach > plan.halo() {
            return Err(BlockError::Planning(format!(
                "structuring element reaches {reach} layers along X, halo is {}",
                plan.halo()
            )));
        }
        Ok(Self {
            matrix,
            plan,
            sel,
            op,
        })
    }

    #[inline]
    pub fn op(&self) -> MorphOp {
        self.op
    }

    /// Extract, reshape and filter one slab, returning the untrimmed result.
    pub fn filter_slab(
        &self,
        slab: &Slab,
        probe: &mut dyn MemoryProbe,
    ) -> BlockResult<Array3<f32>> {
        let shape = self.plan.shape();

        let block = self.matrix.extract_columns(slab.start, slab.end)?;
        log::debug!(
            "slab {}: extracted columns {}..{} ({} values)",
            slab.index,
            slab.start,
            slab.end,
            block.len()
        );
        probe.record(Checkpoint::Extract(slab.index));

        let dim = (slab.n_splits, shape.y(), shape.z());
        let expected = dim.0 * dim.1 * dim.2;
        let actual = block.len();
        if actual != expected {
            return Err(BlockError::ShapeMismatch {
                slab: slab.index,
                expected,
                actual,
            });
        }
        let sub = Array3::from_shape_vec(dim, block).map_err(|_| BlockError::ShapeMismatch {
            slab: slab.index,
            expected,
            actual,
        })?;
        log::debug!("slab {}: reshaped to {:?}", slab.index, sub.dim());
        probe.record(Checkpoint::Reshape(slab.index));

        let filtered = self.op.apply(sub.view(), self.sel)?;
        log::debug!("slab {}: {} done", slab.index, self.op.verb());
        probe.record(Checkpoint::Filter(slab.index));

        Ok(filtered)
    }

    /// Process one slab and append its trimmed layers to `stream`.
    ///
    /// Returns the number of values appended.
    pub fn process_slab(
        &self,
        slab: &Slab,
        stream: &mut OutputStream,
        probe: &mut dyn MemoryProbe,
    ) -> BlockResult<u64> {
        let filtered = self.filter_slab(slab, probe)?;

        let trimmed = filtered.slice(s![slab.keep_range(), .., ..]);
        log::debug!(
            "slab {}: trimmed {} leading and {} trailing layers",
            slab.index,
            slab.lead_halo,
            slab.trail_halo
        );
        probe.record(Checkpoint::Trim(slab.index));

        let appended = stream.append(trimmed.iter().copied())?;
        probe.record(Checkpoint::Append(slab.index));
        log::info!(
            "block {}/{}: {} shape {:?}",
            slab.index + 1,
            self.plan.n_blocks(),
            self.op.verb(),
            trimmed.dim()
        );
        Ok(appended)
    }

    /// Process every slab of the plan in order.
    ///
    /// Returns the total number of values appended, which equals `X*Y*Z`.
    pub fn run(
        &self,
        stream: &mut OutputStream,
        probe: &mut dyn MemoryProbe,
    ) -> BlockResult<u64> {
        let mut total = 0u64;
        for slab in self.plan.slabs() {
            total += self.process_slab(slab, stream, probe)?;
        }
        let expected = self.plan.shape().len() as u64;
        if total != expected {
            return Err(voxmorph_core::Error::ShapeMismatch {
                expected: expected as usize,
                actual: total as usize,
            }
            .into());
        }
        Ok(total)
    }
}
