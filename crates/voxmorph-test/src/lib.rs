//! voxmorph-test - Regression test helpers for voxmorph
//!
//! Provides the pieces the integration tests share:
//!
//! - [`RegParams`] - comparison bookkeeping that reports every failure
//! - [`scratch_dir`] - a fresh per-test working directory under `tests/regout`
//! - [`synthetic_volume`] / [`write_test_volume`] - deterministic fixtures
//!
//! # Usage
//!
//! ```ignore
//! use voxmorph_test::{RegParams, VolumePattern, scratch_dir, write_test_volume};
//!
//! let dir = scratch_dir("blockmorph");
//! let mut rp = RegParams::new("blockmorph");
//! rp.compare_volumes(&expected, &actual);
//! assert!(rp.cleanup());
//! ```

mod error;
mod params;

pub use error::{TestError, TestResult};
pub use params::RegParams;

use std::fs;
use std::path::{Path, PathBuf};
use voxmorph_core::VolumeShape;

/// Get the path to the workspace root
fn workspace_root() -> PathBuf {
    // voxmorph-test is at crates/voxmorph-test, so go up two directories
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Get the path to the regout (regression output) directory
pub fn regout_dir() -> PathBuf {
    workspace_root().join("tests/regout")
}

/// Create an empty working directory for one test
///
/// Any leftovers from a previous run under the same name are removed, so
/// each test starts without artifacts. Names must be unique per test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = regout_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    let _ = fs::create_dir_all(&dir);
    dir
}

/// Content of a synthetic fixture volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumePattern {
    /// All zeros
    Zeros,
    /// Every element nonzero and distinct
    Dense,
    /// Mostly zero with isolated bright voxels
    Sparse,
    /// Deterministic pseudo-random values in `[0, 256)` with many zeros
    Noise,
}

/// Generate a deterministic row-major volume
pub fn synthetic_volume(shape: VolumeShape, pattern: VolumePattern) -> Vec<f32> {
    let [nx, ny, nz] = shape.dims();
    let mut data = Vec::with_capacity(shape.len());
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let idx = ((x * ny + y) * nz + z) as u64;
                let value = match pattern {
                    VolumePattern::Zeros => 0.0,
                    VolumePattern::Dense => 1.0 + (x * 100 + y * 10 + z) as f32,
                    VolumePattern::Sparse => {
                        if (x * 7 + y * 3 + z) % 11 == 0 {
                            (1 + x + y + z) as f32
                        } else {
                            0.0
                        }
                    }
                    VolumePattern::Noise => {
                        let h = mix(idx);
                        if h % 3 == 0 { 0.0 } else { (h % 256) as f32 }
                    }
                };
                data.push(value);
            }
        }
    }
    data
}

/// splitmix64 finalizer
fn mix(mut v: u64) -> u64 {
    v = v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    v = (v ^ (v >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    v = (v ^ (v >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    v ^ (v >> 31)
}

/// Write a synthetic volume to `dir/name` as `.npy`
///
/// Returns the file path and the generated data.
pub fn write_test_volume(
    dir: &Path,
    name: &str,
    shape: VolumeShape,
    pattern: VolumePattern,
) -> TestResult<(PathBuf, Vec<f32>)> {
    let path = dir.join(name);
    let data = synthetic_volume(shape, pattern);
    voxmorph_io::write_volume(&path, shape, &data).map_err(|e| TestError::VolumeWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok((path, data))
}

/// Read a `.npy` volume fully into memory
pub fn read_volume(path: &Path) -> TestResult<(VolumeShape, Vec<f32>)> {
    let source = voxmorph_io::VolumeSource::open_any(path).map_err(|e| TestError::VolumeRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok((source.shape(), source.data().to_vec()))
}
