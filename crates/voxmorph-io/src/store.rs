//! Compressed matrix artifact
//!
//! Persists a [`CsrMatrix`] as a single file so a later run can reload it
//! without touching the input volume again.
//!
//! # Format
//!
//! ```text
//! VXCSR\x01
//! rows: u64 LE, cols: u64 LE, nnz: u64 LE
//! data section:    <compressed_len: u64 LE> <zlib stream of nnz f32 LE>
//! indptr section:  <compressed_len: u64 LE> <zlib stream of rows+1 u64 LE>
//! indices section: <compressed_len: u64 LE> <zlib stream of nnz u64 LE>
//! ```

use crate::error::open_error;
use crate::{IoError, IoResult};
use miniz_oxide::deflate::compress_to_vec_zlib;
use miniz_oxide::inflate::decompress_to_vec_zlib_with_limit;
use std::fs;
use std::path::{Path, PathBuf};
use voxmorph_core::CsrMatrix;

/// Artifact magic
const CSR_MAGIC: &[u8; 6] = b"VXCSR\x01";

/// zlib level for section streams
const COMPRESSION_LEVEL: u8 = 6;

/// Compressed matrix store at a fixed location
#[derive(Debug, Clone)]
pub struct CompressedStore {
    path: PathBuf,
}

impl CompressedStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an artifact currently exists at the store location
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Encode `matrix` and write it to the store location.
    ///
    /// Parent directories are created as needed and any prior artifact is
    /// replaced. The file is written beside the target and renamed into
    /// place, so a failed write never leaves a truncated artifact behind.
    ///
    /// Returns the artifact size in bytes.
    pub fn compress(&self, matrix: &CsrMatrix) -> IoResult<u64> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut out = Vec::new();
        out.extend_from_slice(CSR_MAGIC);
        for v in [matrix.rows(), matrix.cols(), matrix.nnz()] {
            out.extend_from_slice(&(v as u64).to_le_bytes());
        }

        let data: Vec<u8> = matrix.data().iter().flat_map(|v| v.to_le_bytes()).collect();
        let indptr: Vec<u8> = matrix.indptr().iter().flat_map(|v| v.to_le_bytes()).collect();
        let indices: Vec<u8> = matrix.indices().iter().flat_map(|v| v.to_le_bytes()).collect();
        for section in [&data, &indptr, &indices] {
            let packed = compress_to_vec_zlib(section, COMPRESSION_LEVEL);
            out.extend_from_slice(&(packed.len() as u64).to_le_bytes());
            out.extend_from_slice(&packed);
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &out)?;
        fs::rename(&tmp, &self.path)?;
        log::info!(
            "wrote compressed matrix {} ({} bytes, {} stored entries)",
            self.path.display(),
            out.len(),
            matrix.nnz()
        );
        Ok(out.len() as u64)
    }

    /// Reload the matrix from the store location.
    ///
    /// # Errors
    ///
    /// Returns `IoError::NotFound` (logged as a warning) if no artifact
    /// exists; the caller may recompute it. Corrupt artifacts yield
    /// `IoError::InvalidData` or `IoError::DecodeError`.
    pub fn decompress(&self) -> IoResult<CsrMatrix> {
        let bytes = fs::read(&self.path).map_err(|e| open_error(&self.path, e));
        let bytes = match bytes {
            Ok(b) => b,
            Err(e) => {
                if e.is_not_found() {
                    log::warn!("cannot open {}", self.path.display());
                }
                return Err(e);
            }
        };

        let mut reader = SectionReader::new(&bytes);
        if reader.take(CSR_MAGIC.len())? != CSR_MAGIC {
            return Err(IoError::InvalidData(format!(
                "{} is not a compressed matrix",
                self.path.display()
            )));
        }
        let rows = reader.read_u64()? as usize;
        let cols = reader.read_u64()? as usize;
        let nnz = reader.read_u64()? as usize;

        let data = reader.read_section(nnz, 4)?;
        let indptr = reader.read_section(rows.saturating_add(1), 8)?;
        let indices = reader.read_section(nnz, 8)?;

        let data = data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let indptr = indptr.chunks_exact(8).map(le_u64).collect();
        let indices = indices.chunks_exact(8).map(le_u64).collect();

        let matrix = CsrMatrix::from_parts(rows, cols, data, indptr, indices)?;
        log::info!(
            "loaded compressed matrix {} ({}x{}, {} stored entries)",
            self.path.display(),
            rows,
            cols,
            nnz
        );
        Ok(matrix)
    }

    /// In-memory size of the encoded matrix in bytes, logged in GB.
    pub fn footprint(matrix: &CsrMatrix) -> usize {
        let bytes = matrix.footprint();
        log::info!("CSR memory size = {} GB", bytes as f64 / 1e9);
        bytes
    }
}

fn le_u64(c: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(c);
    u64::from_le_bytes(buf)
}

/// Cursor over the artifact bytes
struct SectionReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> IoResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                IoError::InvalidData(format!(
                    "compressed matrix truncated at byte {}",
                    self.pos
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u64(&mut self) -> IoResult<u64> {
        Ok(le_u64(self.take(8)?))
    }

    /// Inflate one section holding `count` elements of `width` bytes.
    fn read_section(&mut self, count: usize, width: usize) -> IoResult<Vec<u8>> {
        let packed_len = self.read_u64()? as usize;
        let packed = self.take(packed_len)?;
        let expected = count.checked_mul(width).ok_or_else(|| {
            IoError::InvalidData(format!("section of {count} elements overflows"))
        })?;
        // One byte of slack so an empty section still has room to report Done.
        let raw = decompress_to_vec_zlib_with_limit(packed, expected.saturating_add(1))
            .map_err(|e| IoError::DecodeError(format!("zlib: {e:?}")))?;
        if raw.len() != expected {
            return Err(IoError::SizeMismatch {
                expected: expected as u64,
                actual: raw.len() as u64,
            });
        }
        Ok(raw)
    }
}
