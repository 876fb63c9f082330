//! Compressed sparse row matrix
//!
//! `CsrMatrix` holds the flattened volume between the compression step and
//! block processing. It is only a memory-footprint reduction: an entry is
//! stored whenever its bit pattern differs from `+0.0`, so `-0.0`, NaN and
//! every other value come back bit-for-bit.
//!
//! # Memory Layout
//!
//! - `data[k]` is the k-th stored value
//! - `indices[k]` is its column
//! - `indptr[r]..indptr[r + 1]` is the range of `data` belonging to row `r`,
//!   with column indices strictly increasing inside the range

use crate::error::{Error, Result};
use crate::flatten::FlattenedView;

/// Row-compressed `f32` matrix
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
    indptr: Vec<u64>,
    indices: Vec<u64>,
}

impl CsrMatrix {
    /// Encode a flattened volume.
    pub fn from_view(view: &FlattenedView<'_>) -> Self {
        let rows = view.rows();
        let cols = view.cols();
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(rows + 1);
        indptr.push(0u64);

        for row in 0..rows {
            for (col, value) in view.row(row) {
                if is_stored(value) {
                    data.push(value);
                    indices.push(col as u64);
                }
            }
            indptr.push(data.len() as u64);
        }

        log::debug!(
            "encoded {}x{} matrix with {} stored entries",
            rows,
            cols,
            data.len()
        );
        CsrMatrix {
            rows,
            cols,
            data,
            indptr,
            indices,
        }
    }

    /// Encode a dense row-major `rows x cols` slice.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeMismatch` if `dense.len() != rows * cols`.
    pub fn from_dense(rows: usize, cols: usize, dense: &[f32]) -> Result<Self> {
        if dense.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                expected: rows * cols,
                actual: dense.len(),
            });
        }
        let mut data = Vec::new();
        let mut indices = Vec::new();
        let mut indptr = Vec::with_capacity(rows + 1);
        indptr.push(0u64);
        for row in 0..rows {
            let values = &dense[row * cols..(row + 1) * cols];
            for (col, &value) in values.iter().enumerate() {
                if is_stored(value) {
                    data.push(value);
                    indices.push(col as u64);
                }
            }
            indptr.push(data.len() as u64);
        }
        Ok(CsrMatrix {
            rows,
            cols,
            data,
            indptr,
            indices,
        })
    }

    /// Assemble a matrix from its raw arrays, validating the structure.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `indptr` has the wrong length, is
    /// not monotone, does not end at `data.len()`, or if a row's column
    /// indices are out of range or not strictly increasing.
    pub fn from_parts(
        rows: usize,
        cols: usize,
        data: Vec<f32>,
        indptr: Vec<u64>,
        indices: Vec<u64>,
    ) -> Result<Self> {
        if indptr.len() != rows + 1 {
            return Err(Error::InvalidParameter(format!(
                "indptr length {} != rows + 1 = {}",
                indptr.len(),
                rows + 1
            )));
        }
        if data.len() != indices.len() {
            return Err(Error::InvalidParameter(format!(
                "data length {} != indices length {}",
                data.len(),
                indices.len()
            )));
        }
        if indptr[0] != 0 || indptr[rows] != data.len() as u64 {
            return Err(Error::InvalidParameter(format!(
                "indptr must span 0..{}, got {}..{}",
                data.len(),
                indptr[0],
                indptr[rows]
            )));
        }
        for row in 0..rows {
            let (lo, hi) = (indptr[row], indptr[row + 1]);
            if lo > hi || hi > data.len() as u64 {
                return Err(Error::InvalidParameter(format!(
                    "indptr decreases at row {row}"
                )));
            }
            let cols_in_row = &indices[lo as usize..hi as usize];
            if cols_in_row.iter().any(|&c| c >= cols as u64) {
                return Err(Error::InvalidParameter(format!(
                    "column index out of range in row {row}"
                )));
            }
            if cols_in_row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::InvalidParameter(format!(
                    "column indices not strictly increasing in row {row}"
                )));
            }
        }
        Ok(CsrMatrix {
            rows,
            cols,
            data,
            indptr,
            indices,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of stored entries
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn indptr(&self) -> &[u64] {
        &self.indptr
    }

    #[inline]
    pub fn indices(&self) -> &[u64] {
        &self.indices
    }

    /// Memory size of the encoded arrays in bytes
    /// (values + row pointers + column indices).
    pub fn footprint(&self) -> usize {
        std::mem::size_of_val(self.data.as_slice())
            + std::mem::size_of_val(self.indptr.as_slice())
            + std::mem::size_of_val(self.indices.as_slice())
    }

    /// Get element `(row, col)`; unstored entries read as `0.0`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let (cols, values) = self.row_slices(row);
        let value = match cols.binary_search(&(col as u64)) {
            Ok(k) => values[k],
            Err(_) => 0.0,
        };
        Some(value)
    }

    /// Densify columns `[start, end)`, transposed so the column index leads.
    ///
    /// The result has `(end - start) * rows` elements and element
    /// `(c - start) * rows + r` holds matrix entry `(r, c)`. For a flattened
    /// volume this is the row-major `(x, y, z)` layout of the X layers the
    /// column range covers.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` for an empty range and
    /// `Error::IndexOutOfBounds` if `end > cols`.
    pub fn extract_columns(&self, start: usize, end: usize) -> Result<Vec<f32>> {
        if start >= end {
            return Err(Error::InvalidParameter(format!(
                "empty column range {start}..{end}"
            )));
        }
        if end > self.cols {
            return Err(Error::IndexOutOfBounds {
                index: end - 1,
                len: self.cols,
            });
        }

        let width = end - start;
        let mut block = vec![0.0f32; width * self.rows];
        for row in 0..self.rows {
            let (cols, values) = self.row_slices(row);
            let lo = cols.partition_point(|&c| c < start as u64);
            let hi = cols.partition_point(|&c| c < end as u64);
            for k in lo..hi {
                let local = cols[k] as usize - start;
                block[local * self.rows + row] = values[k];
            }
        }
        Ok(block)
    }

    /// Densify the whole matrix in row-major order.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0f32; self.rows * self.cols];
        for row in 0..self.rows {
            let (cols, values) = self.row_slices(row);
            for (&c, &v) in cols.iter().zip(values) {
                dense[row * self.cols + c as usize] = v;
            }
        }
        dense
    }

    fn row_slices(&self, row: usize) -> (&[u64], &[f32]) {
        let lo = self.indptr[row] as usize;
        let hi = self.indptr[row + 1] as usize;
        (&self.indices[lo..hi], &self.data[lo..hi])
    }
}

/// Matrices compare by shape, structure and value bit patterns, so two
/// encodings holding NaN at the same position are equal.
impl PartialEq for CsrMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
            && self.cols == other.cols
            && self.indptr == other.indptr
            && self.indices == other.indices
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

#[inline]
fn is_stored(value: f32) -> bool {
    value.to_bits() != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::shape::VolumeShape;

    #[test]
    fn test_from_dense_layout() {
        let dense = [0.0, 1.0, 0.0, 2.0, 0.0, 3.0];
        let m = CsrMatrix::from_dense(2, 3, &dense).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.indptr(), &[0, 1, 3]);
        assert_eq!(m.indices(), &[1, 0, 2]);
        assert_eq!(m.data(), &[1.0, 2.0, 3.0]);
        assert_eq!(m.get(1, 2), Some(3.0));
        assert_eq!(m.get(0, 0), Some(0.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.to_dense(), dense.to_vec());
    }

    #[test]
    fn test_footprint_counts_all_arrays() {
        let m = CsrMatrix::from_dense(2, 2, &[1.0, 0.0, 0.0, 4.0]).unwrap();
        // 2 values * 4 + 3 row pointers * 8 + 2 indices * 8
        assert_eq!(m.footprint(), 8 + 24 + 16);
    }

    #[test]
    fn test_all_zero_matrix() {
        let m = CsrMatrix::from_dense(3, 4, &[0.0; 12]).unwrap();
        assert_eq!(m.nnz(), 0);
        assert_eq!(m.indptr(), &[0, 0, 0, 0]);
        assert_eq!(m.to_dense(), vec![0.0; 12]);
    }

    #[test]
    fn test_negative_zero_and_nan_are_kept() {
        let dense = [-0.0, f32::NAN, 0.0, 1.5];
        let m = CsrMatrix::from_dense(1, 4, &dense).unwrap();
        assert_eq!(m.nnz(), 3);
        let back = m.to_dense();
        for (a, b) in back.iter().zip(&dense) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        assert_eq!(m, m.clone());
    }

    #[test]
    fn test_extract_columns_transposes() {
        // volume (3, 2, 2): flattened columns are (x, y) pairs
        let shape = VolumeShape::new(3, 2, 2).unwrap();
        let volume: Vec<f32> = (1..=12).map(|v| v as f32).collect();
        let view = flatten(&volume, shape).unwrap();
        let m = CsrMatrix::from_view(&view);
        assert_eq!((m.rows(), m.cols()), (2, 6));

        // columns 2..6 are X layers 1 and 2 in volume order
        let block = m.extract_columns(2, 6).unwrap();
        assert_eq!(block, volume[4..].to_vec());

        let whole = m.extract_columns(0, 6).unwrap();
        assert_eq!(whole, volume);
    }

    #[test]
    fn test_extract_columns_bounds() {
        let m = CsrMatrix::from_dense(1, 4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(matches!(
            m.extract_columns(2, 2),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            m.extract_columns(0, 5),
            Err(Error::IndexOutOfBounds { index: 4, len: 4 })
        ));
    }

    #[test]
    fn test_from_parts_validation() {
        assert!(CsrMatrix::from_parts(1, 2, vec![1.0], vec![0, 1], vec![1]).is_ok());
        // wrong indptr length
        assert!(CsrMatrix::from_parts(2, 2, vec![1.0], vec![0, 1], vec![1]).is_err());
        // column out of range
        assert!(CsrMatrix::from_parts(1, 2, vec![1.0], vec![0, 1], vec![2]).is_err());
        // unsorted columns
        assert!(
            CsrMatrix::from_parts(1, 3, vec![1.0, 2.0], vec![0, 2], vec![2, 1]).is_err()
        );
        // indptr not ending at nnz
        assert!(CsrMatrix::from_parts(1, 2, vec![1.0], vec![0, 0], vec![1]).is_err());
    }
}
