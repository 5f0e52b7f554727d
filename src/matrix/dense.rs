//! Row-major dense matrices for the multi-column product path

use std::ops::{Index, IndexMut};

use num_complex::Complex64;
use num_traits::Zero;

/// A dense complex matrix in row-major order.
///
/// Serves both as the root-side global operand and as a rank's row block;
/// the distribution routines slice and reassemble it by whole rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    /// Number of rows
    pub n_rows: usize,

    /// Number of columns
    pub n_cols: usize,

    /// Row-major storage (size: n_rows * n_cols)
    pub data: Vec<Complex64>,
}

impl DenseMatrix {
    /// Creates a matrix from row-major data
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != n_rows * n_cols`.
    pub fn new(n_rows: usize, n_cols: usize, data: Vec<Complex64>) -> Self {
        assert_eq!(data.len(), n_rows * n_cols, "data must be n_rows * n_cols long");
        Self { n_rows, n_cols, data }
    }

    /// Creates a zero-filled matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            data: vec![Complex64::zero(); n_rows * n_cols],
        }
    }

    /// Row `i` as a slice
    pub fn row(&self, i: usize) -> &[Complex64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Row `i` as a mutable slice
    pub fn row_mut(&mut self, i: usize) -> &mut [Complex64] {
        &mut self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Copies the rows `range` out into a new matrix
    pub fn row_block(&self, range: std::ops::Range<usize>) -> DenseMatrix {
        let data = self.data[range.start * self.n_cols..range.end * self.n_cols].to_vec();
        DenseMatrix::new(range.len(), self.n_cols, data)
    }
}

impl Index<(usize, usize)> for DenseMatrix {
    type Output = Complex64;

    fn index(&self, (i, j): (usize, usize)) -> &Complex64 {
        &self.data[i * self.n_cols + j]
    }
}

impl IndexMut<(usize, usize)> for DenseMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Complex64 {
        &mut self.data[i * self.n_cols + j]
    }
}
