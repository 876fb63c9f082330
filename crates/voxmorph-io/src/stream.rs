//! Append-only output stream
//!
//! Filtered slabs are concatenated into one raw little-endian `f32` file.
//! The stream has no addressing: the position of each slab in the final
//! volume is its position in the file, so slabs must be appended in order.
//!
//! The stream is a two-state type. [`OutputStream`] is the single writer;
//! [`OutputStream::finish`] consumes it and yields a [`ClosedStream`], the
//! only handle the assembler accepts. A writer dropped without `finish`
//! belongs to an aborted run and deletes its partial file.

use crate::error::open_error;
use crate::{IoError, IoResult};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const ELEMENT_SIZE: u64 = std::mem::size_of::<f32>() as u64;

/// Open, append-only writer of filtered slabs
#[derive(Debug)]
pub struct OutputStream {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    elements: u64,
}

impl OutputStream {
    /// Create (or truncate) the stream file, creating parent directories.
    pub fn create<P: Into<PathBuf>>(path: P) -> IoResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        log::debug!("opened output stream {}", path.display());
        Ok(OutputStream {
            path,
            writer: Some(BufWriter::new(file)),
            elements: 0,
        })
    }

    /// Append values in order.
    ///
    /// Returns the number of elements appended.
    pub fn append<I>(&mut self, values: I) -> IoResult<u64>
    where
        I: IntoIterator<Item = f32>,
    {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| IoError::InvalidData("output stream already closed".to_string()))?;
        let mut count = 0u64;
        for value in values {
            writer.write_all(&value.to_le_bytes())?;
            count += 1;
        }
        self.elements += count;
        Ok(count)
    }

    /// Elements appended so far
    #[inline]
    pub fn elements(&self) -> u64 {
        self.elements
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, sync and close the stream.
    pub fn finish(mut self) -> IoResult<ClosedStream> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| IoError::Io(e.into_error()))?;
            file.sync_all()?;
        }
        log::info!(
            "closed output stream {} ({} elements)",
            self.path.display(),
            self.elements
        );
        Ok(ClosedStream {
            path: std::mem::take(&mut self.path),
            elements: self.elements,
        })
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            drop(writer);
            match fs::remove_file(&self.path) {
                Ok(()) => log::warn!("discarded partial output stream {}", self.path.display()),
                Err(e) => log::warn!(
                    "failed to discard partial output stream {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
    }
}

/// A finished output stream, safe to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedStream {
    path: PathBuf,
    elements: u64,
}

impl ClosedStream {
    /// Adopt a stream file written by an earlier run.
    ///
    /// # Errors
    ///
    /// Returns `IoError::NotFound` if the file does not exist and
    /// `IoError::InvalidData` if its length is not a whole number of `f32`.
    pub fn from_existing<P: Into<PathBuf>>(path: P) -> IoResult<Self> {
        let path = path.into();
        let len = fs::metadata(&path).map_err(|e| open_error(&path, e))?.len();
        if len % ELEMENT_SIZE != 0 {
            return Err(IoError::InvalidData(format!(
                "stream {} has {} bytes, not a whole number of f32",
                path.display(),
                len
            )));
        }
        Ok(ClosedStream {
            path,
            elements: len / ELEMENT_SIZE,
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Elements written to the stream
    #[inline]
    pub fn elements(&self) -> u64 {
        self.elements
    }

    /// Expected byte length of the stream file
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.elements * ELEMENT_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmorph_test::scratch_dir;

    #[test]
    fn test_append_and_finish() {
        let dir = scratch_dir("stream_append_finish");
        let mut stream = OutputStream::create(dir.join("output/binary")).unwrap();
        assert_eq!(stream.append([1.0, 2.0]).unwrap(), 2);
        assert_eq!(stream.append(vec![3.5]).unwrap(), 1);
        assert_eq!(stream.elements(), 3);

        let closed = stream.finish().unwrap();
        assert_eq!(closed.elements(), 3);
        assert_eq!(closed.byte_len(), 12);
        let bytes = fs::read(closed.path()).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[8..], &3.5f32.to_le_bytes());
    }

    #[test]
    fn test_dropped_stream_is_discarded() {
        let dir = scratch_dir("stream_dropped");
        let path = dir.join("binary");
        {
            let mut stream = OutputStream::create(&path).unwrap();
            stream.append([1.0; 16]).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = scratch_dir("stream_truncates");
        let path = dir.join("binary");
        fs::write(&path, [0u8; 40]).unwrap();
        let closed = OutputStream::create(&path).unwrap().finish().unwrap();
        assert_eq!(closed.elements(), 0);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_from_existing() {
        let dir = scratch_dir("stream_from_existing");
        let path = dir.join("binary");
        assert!(ClosedStream::from_existing(&path).unwrap_err().is_not_found());

        fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(
            ClosedStream::from_existing(&path),
            Err(IoError::InvalidData(_))
        ));

        fs::write(&path, [0u8; 8]).unwrap();
        assert_eq!(ClosedStream::from_existing(&path).unwrap().elements(), 2);
    }
}
