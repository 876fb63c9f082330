//! Merged volume assembly
//!
//! Reinterprets a closed output stream as an `(X, Y, Z)` volume and persists
//! it as `.npy`. The stream already holds the final row-major order, so this
//! is a header plus a straight copy through a read-only mapping.

use crate::error::open_error;
use crate::npy;
use crate::stream::ClosedStream;
use crate::{IoError, IoResult};
use memmap2::Mmap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use voxmorph_core::VolumeShape;

/// Bytes copied per write while assembling
const COPY_CHUNK: usize = 1 << 20;

/// Writes a closed output stream as the merged volume
#[derive(Debug, Clone)]
pub struct VolumeAssembler {
    shape: VolumeShape,
}

impl VolumeAssembler {
    pub fn new(shape: VolumeShape) -> Self {
        Self { shape }
    }

    #[inline]
    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    /// Write `stream` as an `.npy` volume at `output`.
    ///
    /// The volume is written beside `output` and renamed into place, so a
    /// failed write leaves any earlier merged volume intact.
    ///
    /// # Errors
    ///
    /// - `IoError::NotFound` if the stream file is missing
    /// - `IoError::SizeMismatch` if the stream length is not
    ///   `X * Y * Z * 4` bytes
    pub fn assemble<P: AsRef<Path>>(&self, stream: &ClosedStream, output: P) -> IoResult<PathBuf> {
        let output = output.as_ref();
        let file = File::open(stream.path()).map_err(|e| open_error(stream.path(), e))?;
        let actual = file.metadata()?.len();
        let expected = self.shape.byte_len() as u64;
        if actual != expected {
            return Err(IoError::SizeMismatch { expected, actual });
        }

        // SAFETY: the stream is closed and nothing writes it while it is mapped.
        let mmap = unsafe { Mmap::map(&file)? };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = output.with_extension("tmp");
        if let Err(e) = self.write_npy(&tmp, &mmap) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, output)?;

        log::info!(
            "blocks merged to {} with shape {}",
            output.display(),
            self.shape
        );
        Ok(output.to_path_buf())
    }

    fn write_npy(&self, path: &Path, body: &[u8]) -> IoResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        npy::write_header(&mut writer, &self.shape.dims())?;
        for chunk in body.chunks(COPY_CHUNK) {
            writer.write_all(chunk)?;
        }
        let file = writer.into_inner().map_err(|e| IoError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }
}
