//! Pipeline configuration
//!
//! All artifacts of a run live under one working directory:
//!
//! ```text
//! <work>/compressed/CRS.vxz   persisted CSR matrix
//! <work>/output/binary        raw slab stream
//! <work>/output/Merged.npy    merged result volume
//! ```
//!
//! # Environment Variables
//!
//! - `VOXMORPH_WORK_DIR`: working directory used when none is given

use crate::plan::DEFAULT_HALO;
use crate::{BlockError, BlockResult};
use std::path::{Path, PathBuf};
use voxmorph_core::VolumeShape;

/// Environment variable naming the default working directory
pub const WORK_DIR_ENV: &str = "VOXMORPH_WORK_DIR";

const COMPRESSED_DIR: &str = "compressed";
const COMPRESSED_FILE: &str = "CRS.vxz";
const OUTPUT_DIR: &str = "output";
const STREAM_FILE: &str = "binary";
const MERGED_FILE: &str = "Merged.npy";

/// Settings for one blocked morphology run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Input `.npy` volume
    pub input: PathBuf,
    /// Expected volume dimensions
    pub shape: VolumeShape,
    /// Root of all artifacts
    pub work_dir: PathBuf,
    /// Halo depth in X layers
    pub halo: usize,
}

impl PipelineConfig {
    /// Configuration with the working directory taken from the environment
    /// and the default halo.
    pub fn new<P: Into<PathBuf>>(input: P, shape: VolumeShape) -> Self {
        Self {
            input: input.into(),
            shape,
            work_dir: Self::work_dir_from_env(),
            halo: DEFAULT_HALO,
        }
    }

    pub fn with_work_dir<P: Into<PathBuf>>(mut self, work_dir: P) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_halo(mut self, halo: usize) -> Self {
        self.halo = halo;
        self
    }

    /// `VOXMORPH_WORK_DIR` if set and non-empty, otherwise `.`
    pub fn work_dir_from_env() -> PathBuf {
        match std::env::var(WORK_DIR_ENV) {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        }
    }

    /// Check that the configuration can describe a run.
    ///
    /// # Errors
    ///
    /// Returns `BlockError::Config` if the input path is empty or the
    /// working directory exists but is not a directory. Whether the halo
    /// fits is decided per block count by the planner.
    pub fn validate(&self) -> BlockResult<()> {
        if self.input.as_os_str().is_empty() {
            return Err(BlockError::Config("input path is empty".to_string()));
        }
        if self.work_dir.exists() && !self.work_dir.is_dir() {
            return Err(BlockError::Config(format!(
                "work directory {} is not a directory",
                self.work_dir.display()
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Path of the persisted CSR matrix
    pub fn compressed_path(&self) -> PathBuf {
        self.work_dir.join(COMPRESSED_DIR).join(COMPRESSED_FILE)
    }

    /// Path of the raw slab stream
    pub fn stream_path(&self) -> PathBuf {
        self.work_dir.join(OUTPUT_DIR).join(STREAM_FILE)
    }

    /// Path of the merged `.npy` volume
    pub fn merged_path(&self) -> PathBuf {
        self.work_dir.join(OUTPUT_DIR).join(MERGED_FILE)
    }
}
