//! NPY array header codec
//!
//! Volumes and merged results are stored as `.npy` files so they interoperate
//! with NumPy tooling. Only little-endian `f32` (`<f4`) C-order arrays are
//! supported.
//!
//! # Format
//!
//! ```text
//! \x93NUMPY <major u8> <minor u8> <header_len: u16 LE (v1) | u32 LE (v2, v3)>
//! {'descr': '<f4', 'fortran_order': False, 'shape': (X, Y, Z), }   (space padded, '\n')
//! <raw array data>
//! ```
//!
//! Writers pad the header so the data starts on a 64-byte boundary.

use crate::{IoError, IoResult};
use std::io::Write;

/// NPY magic prefix
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// dtype descriptor for little-endian `f32`
pub const F32_DESCR: &str = "<f4";

/// Alignment of the data section produced by [`write_header`]
const HEADER_ALIGN: usize = 64;

/// Parsed NPY header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpyHeader {
    /// dtype descriptor, e.g. `<f4`
    pub descr: String,
    /// Whether the array is stored in Fortran (column-major) order
    pub fortran_order: bool,
    /// Array dimensions
    pub shape: Vec<usize>,
    /// Byte offset of the array data within the file
    pub data_offset: usize,
}

impl NpyHeader {
    /// Number of elements described by the shape
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Check that the header describes a C-order little-endian `f32` array.
    pub fn require_f32_c_order(&self) -> IoResult<()> {
        if self.descr != F32_DESCR {
            return Err(IoError::UnsupportedFormat(format!(
                "dtype {} (only {F32_DESCR} is supported)",
                self.descr
            )));
        }
        if self.fortran_order {
            return Err(IoError::UnsupportedFormat(
                "Fortran-order arrays are not supported".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse the header at the start of an NPY file.
///
/// # Errors
///
/// Returns `IoError::InvalidData` for a missing magic, a truncated header or
/// a dictionary lacking `descr`, `fortran_order` or `shape`.
pub fn read_header(bytes: &[u8]) -> IoResult<NpyHeader> {
    if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
        return Err(IoError::InvalidData("missing NPY magic".to_string()));
    }
    let major = bytes[6];
    let (header_len, prefix_len) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err(IoError::InvalidData("truncated NPY header".to_string()));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => {
            return Err(IoError::UnsupportedFormat(format!(
                "NPY format version {v}"
            )));
        }
    };

    let data_offset = prefix_len + header_len;
    if bytes.len() < data_offset {
        return Err(IoError::InvalidData(format!(
            "NPY header claims {header_len} bytes but file has {}",
            bytes.len() - prefix_len
        )));
    }
    let text = std::str::from_utf8(&bytes[prefix_len..data_offset])
        .map_err(|e| IoError::InvalidData(format!("NPY header is not text: {e}")))?;

    let descr = dict_value(text, "descr")
        .and_then(parse_quoted)
        .ok_or_else(|| IoError::InvalidData("NPY header lacks 'descr'".to_string()))?;
    let fortran_order = match dict_value(text, "fortran_order") {
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        _ => {
            return Err(IoError::InvalidData(
                "NPY header lacks 'fortran_order'".to_string(),
            ));
        }
    };
    let shape = dict_value(text, "shape")
        .and_then(parse_tuple)
        .ok_or_else(|| IoError::InvalidData("NPY header lacks 'shape'".to_string()))?;

    Ok(NpyHeader {
        descr: descr.to_string(),
        fortran_order,
        shape,
        data_offset,
    })
}

/// Write a version 1.0 header for a C-order `<f4` array of `shape`.
///
/// Returns the number of bytes written, which is the data offset.
pub fn write_header<W: Write>(writer: &mut W, shape: &[usize]) -> IoResult<usize> {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    let shape_text = match dims.len() {
        1 => format!("({},)", dims[0]),
        _ => format!("({})", dims.join(", ")),
    };
    let mut dict =
        format!("{{'descr': '{F32_DESCR}', 'fortran_order': False, 'shape': {shape_text}, }}");

    // magic(6) + version(2) + len(2) + dict + padding + '\n'
    let unpadded = 10 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict.extend(std::iter::repeat_n(' ', padding));
    dict.push('\n');

    let header_len = u16::try_from(dict.len()).map_err(|_| {
        IoError::UnsupportedFormat(format!("NPY header of {} bytes", dict.len()))
    })?;
    writer.write_all(NPY_MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(dict.as_bytes())?;
    Ok(10 + dict.len())
}

/// Text following `'key':` in a header dictionary
fn dict_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let pos = quoted
        .iter()
        .find_map(|k| text.find(k.as_str()).map(|p| p + k.len()))?;
    let rest = text[pos..].trim_start();
    rest.strip_prefix(':').map(str::trim_start)
}

fn parse_quoted(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let inner = &value[1..];
    inner.find(quote).map(|end| &inner[..end])
}

fn parse_tuple(value: &str) -> Option<Vec<usize>> {
    let inner = value.strip_prefix('(')?;
    let inner = &inner[..inner.find(')')?];
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse().ok())
        .collect()
}
