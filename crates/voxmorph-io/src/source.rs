//! Memory-mapped input volume
//!
//! The input volume is never read into resident memory: the `.npy` file is
//! mapped read-only and exposed as a borrowed `&[f32]`. Pages are faulted in
//! lazily as the flattener walks them.

use crate::error::open_error;
use crate::npy::{self, NpyHeader};
use crate::{IoError, IoResult};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use voxmorph_core::VolumeShape;

/// Read-only mapped `(X, Y, Z)` `f32` volume
#[derive(Debug)]
pub struct VolumeSource {
    path: PathBuf,
    shape: VolumeShape,
    header: NpyHeader,
    mmap: Mmap,
}

impl VolumeSource {
    /// Map `path` and check it holds a volume of `expected` shape.
    ///
    /// # Errors
    ///
    /// - `IoError::NotFound` if the file does not exist
    /// - `IoError::InvalidData` / `IoError::UnsupportedFormat` for a header
    ///   that is malformed or not a C-order `<f4` array
    /// - `IoError::ShapeMismatch` if the stored shape differs from `expected`
    /// - `IoError::SizeMismatch` if the file is shorter than its header says
    pub fn open<P: AsRef<Path>>(path: P, expected: VolumeShape) -> IoResult<Self> {
        let source = Self::open_any(path)?;
        if source.shape != expected {
            return Err(IoError::ShapeMismatch {
                expected: expected.dims().to_vec(),
                actual: source.header.shape.clone(),
            });
        }
        Ok(source)
    }

    /// Map `path`, taking the volume shape from the file header.
    pub fn open_any<P: AsRef<Path>>(path: P) -> IoResult<Self> {
        let path = path.as_ref();
        if cfg!(target_endian = "big") {
            return Err(IoError::UnsupportedFormat(
                "mapping little-endian volumes requires a little-endian host".to_string(),
            ));
        }
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        // SAFETY: the mapping is read-only and the pipeline never writes the
        // input volume; concurrent external modification is outside its model.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = npy::read_header(&mmap)?;
        header.require_f32_c_order()?;
        let shape = match header.shape.as_slice() {
            &[x, y, z] => VolumeShape::new(x, y, z)?,
            other => {
                return Err(IoError::InvalidData(format!(
                    "expected a 3D volume, found shape {other:?}"
                )));
            }
        };

        let expected_len = (header.data_offset + shape.byte_len()) as u64;
        if (mmap.len() as u64) < expected_len {
            return Err(IoError::SizeMismatch {
                expected: expected_len,
                actual: mmap.len() as u64,
            });
        }
        let bytes = &mmap[header.data_offset..header.data_offset + shape.byte_len()];
        bytemuck::try_cast_slice::<u8, f32>(bytes).map_err(|e| {
            IoError::InvalidData(format!("volume data is not f32 aligned: {e:?}"))
        })?;

        log::info!("mapped volume {} with shape {}", path.display(), shape);
        Ok(VolumeSource {
            path: path.to_path_buf(),
            shape,
            header,
            mmap,
        })
    }

    /// Volume elements in row-major order
    pub fn data(&self) -> &[f32] {
        let offset = self.header.data_offset;
        // Alignment and length were checked in `open_any`.
        bytemuck::cast_slice(&self.mmap[offset..offset + self.shape.byte_len()])
    }

    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed `.npy` header
    #[inline]
    pub fn header(&self) -> &NpyHeader {
        &self.header
    }
}

/// Write a dense volume as a `.npy` file, creating parent directories.
///
/// # Errors
///
/// Returns `IoError::Core` with a shape mismatch if `data` does not hold
/// `shape.len()` elements.
pub fn write_volume<P: AsRef<Path>>(path: P, shape: VolumeShape, data: &[f32]) -> IoResult<()> {
    use std::io::{BufWriter, Write};

    if data.len() != shape.len() {
        return Err(voxmorph_core::Error::ShapeMismatch {
            expected: shape.len(),
            actual: data.len(),
        }
        .into());
    }
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    npy::write_header(&mut writer, &shape.dims())?;
    for value in data {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmorph_test::scratch_dir;

    #[test]
    fn test_write_then_map() {
        let dir = scratch_dir("source_write_then_map");
        let shape = VolumeShape::new(3, 2, 2).unwrap();
        let data: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        let path = dir.join("vol.npy");
        write_volume(&path, shape, &data).unwrap();

        let source = VolumeSource::open(&path, shape).unwrap();
        assert_eq!(source.shape(), shape);
        assert_eq!(source.data(), data.as_slice());
        assert_eq!(source.header().data_offset % 64, 0);
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let dir = scratch_dir("source_missing");
        let shape = VolumeShape::new(1, 1, 1).unwrap();
        let err = VolumeSource::open(dir.join("absent.npy"), shape).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_open_shape_mismatch() {
        let dir = scratch_dir("source_shape_mismatch");
        let shape = VolumeShape::new(2, 2, 2).unwrap();
        let path = dir.join("vol.npy");
        write_volume(&path, shape, &[1.0; 8]).unwrap();

        let other = VolumeShape::new(4, 2, 1).unwrap();
        assert!(matches!(
            VolumeSource::open(&path, other),
            Err(IoError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_open_truncated_file() {
        let dir = scratch_dir("source_truncated");
        let shape = VolumeShape::new(2, 2, 2).unwrap();
        let path = dir.join("vol.npy");
        write_volume(&path, shape, &[1.0; 8]).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            VolumeSource::open(&path, shape),
            Err(IoError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_write_volume_rejects_wrong_length() {
        let dir = scratch_dir("source_wrong_length");
        let shape = VolumeShape::new(2, 2, 2).unwrap();
        assert!(matches!(
            write_volume(dir.join("vol.npy"), shape, &[0.0; 3]),
            Err(IoError::Core(_))
        ));
    }
}
