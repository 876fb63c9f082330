//! End-to-end blocked morphology
//!
//! A [`Pipeline`] owns the mapped input volume and runs the stages of a
//! blocked filter against the artifacts under its working directory:
//!
//! ```text
//! volume --convert_to_2d--> view --compressed_storage--> CRS.vxz
//! CRS.vxz --load_compressed--> matrix --morphology--> binary --merge_blocks--> Merged.npy
//! ```
//!
//! Each stage can also be called on its own, e.g. to compress once and
//! reuse the artifact across several filter runs.

use crate::config::PipelineConfig;
use crate::plan::BlockPlanner;
use crate::process::BlockProcessor;
use crate::BlockResult;
use std::fs;
use std::path::PathBuf;
use voxmorph_core::{
    Checkpoint, CsrMatrix, FlattenedView, MemoryProbe, MemorySummary, NullProbe, flatten,
};
use voxmorph_io::{
    ClosedStream, CompressedStore, IoError, OutputStream, VolumeAssembler, VolumeSource,
};
use voxmorph_morph::{MorphOp, StructuringElement};

/// Blocked morphology over one input volume
pub struct Pipeline<P: MemoryProbe = NullProbe> {
    config: PipelineConfig,
    sel: StructuringElement,
    source: VolumeSource,
    store: CompressedStore,
    probe: P,
}

impl<P: MemoryProbe> Pipeline<P> {
    /// Validate `config` and map its input volume.
    ///
    /// # Errors
    ///
    /// Returns `BlockError::Config` for an invalid configuration and
    /// `BlockError::Io` if the input cannot be mapped or has a different
    /// shape than configured.
    pub fn new(config: PipelineConfig, sel: StructuringElement, mut probe: P) -> BlockResult<Self> {
        config.validate()?;
        let source = VolumeSource::open(&config.input, config.shape)?;
        let store = CompressedStore::new(config.compressed_path());
        probe.record(Checkpoint::Construction);
        log::info!(
            "mapped {} with shape {}",
            source.path().display(),
            source.shape()
        );
        Ok(Self {
            config,
            sel,
            source,
            store,
            probe,
        })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[inline]
    pub fn structuring_element(&self) -> &StructuringElement {
        &self.sel
    }

    #[inline]
    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn into_probe(self) -> P {
        self.probe
    }

    /// Zero-copy `(Z, X*Y)` view of the mapped volume
    pub fn convert_to_2d(&self) -> BlockResult<FlattenedView<'_>> {
        let view = flatten(self.source.data(), self.config.shape)?;
        log::debug!("flattened to {}x{}", view.rows(), view.cols());
        Ok(view)
    }

    /// Build the CSR encoding of `view` and persist it.
    ///
    /// The output directory is created alongside the artifact.
    pub fn compressed_storage(&self, view: &FlattenedView<'_>) -> BlockResult<CsrMatrix> {
        let matrix = CsrMatrix::from_view(view);
        self.store.compress(&matrix)?;
        if let Some(output_dir) = self.config.stream_path().parent() {
            fs::create_dir_all(output_dir).map_err(IoError::from)?;
        }
        CompressedStore::footprint(&matrix);
        Ok(matrix)
    }

    /// Reload the persisted matrix.
    ///
    /// # Errors
    ///
    /// A missing artifact is reported as a recoverable not-found error; see
    /// [`BlockError::is_recoverable`](crate::BlockError::is_recoverable).
    pub fn load_compressed(&mut self) -> BlockResult<CsrMatrix> {
        let matrix = self.store.decompress()?;
        let shape = self.config.shape;
        if matrix.rows() != shape.z() || matrix.cols() != shape.columns() {
            return Err(voxmorph_core::Error::ShapeMismatch {
                expected: shape.len(),
                actual: matrix.rows() * matrix.cols(),
            }
            .into());
        }
        self.probe.record(Checkpoint::Load);
        Ok(matrix)
    }

    /// Filter `matrix` slab by slab into the output stream.
    ///
    /// The slabs are planned before the stream is opened. If any slab
    /// fails, the partially written stream is deleted.
    pub fn morphology(
        &mut self,
        matrix: &CsrMatrix,
        n_blocks: usize,
        op: MorphOp,
    ) -> BlockResult<ClosedStream> {
        let plan = BlockPlanner::new(self.config.shape, self.config.halo)
            .plan(matrix.cols(), n_blocks)?;
        let processor = BlockProcessor::new(matrix, &plan, &self.sel, op)?;
        log::info!(
            "{} with {} in {} blocks",
            op.verb(),
            self.sel.name().unwrap_or("structuring element"),
            plan.n_blocks()
        );

        let mut stream = OutputStream::create(self.config.stream_path())?;
        self.probe.record(Checkpoint::StreamOpen);
        processor.run(&mut stream, &mut self.probe)?;
        Ok(stream.finish()?)
    }

    /// Write the closed stream as the merged volume.
    pub fn merge_blocks(&mut self, stream: &ClosedStream) -> BlockResult<PathBuf> {
        let merged =
            VolumeAssembler::new(self.config.shape).assemble(stream, self.config.merged_path())?;
        self.probe.record(Checkpoint::Merge);
        Ok(merged)
    }

    /// Run every stage for operator `op_name` over `n_blocks` slabs.
    ///
    /// The operator name is checked before any artifact is touched.
    /// Returns the merged volume path.
    pub fn run(&mut self, n_blocks: usize, op_name: &str) -> BlockResult<PathBuf> {
        let op: MorphOp = op_name.parse()?;
        {
            let view = self.convert_to_2d()?;
            self.compressed_storage(&view)?;
        }
        let matrix = self.load_compressed()?;
        let stream = self.morphology(&matrix, n_blocks, op)?;
        drop(matrix);
        let merged = self.merge_blocks(&stream)?;
        if let Some(summary) = self.memory_summary() {
            log::info!("{summary}");
        }
        Ok(merged)
    }

    /// Start-versus-average free memory over the samples taken so far
    pub fn memory_summary(&self) -> Option<MemorySummary> {
        self.probe.summary()
    }
}
