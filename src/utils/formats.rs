//! Conversions between the root-side global CSR and sprs matrices
//!
//! Upstream loaders commonly hand over `sprs` matrices; these helpers move
//! the raw storage across without going through a third format.

use num_complex::Complex64;
use sprs::CsMat;

use crate::matrix::CsrMatrix;

/// Converts a global CSR matrix to a sprs `CsMat`
pub fn to_sprs(matrix: &CsrMatrix) -> CsMat<Complex64> {
    CsMat::new(
        (matrix.n_rows, matrix.n_cols),
        matrix.row_ptr.clone(),
        matrix.col_idx.clone(),
        matrix.values.clone(),
    )
}

/// Converts a sprs matrix (any storage order) to a global CSR matrix
pub fn from_sprs(matrix: CsMat<Complex64>) -> CsrMatrix {
    let matrix = if matrix.is_csr() {
        matrix
    } else {
        matrix.to_csr()
    };

    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();

    CsrMatrix::new(shape.0, shape.1, indptr, indices, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn sprs_roundtrip_preserves_structure() {
        let original = CsrMatrix::new(
            3,
            3,
            vec![0, 2, 3, 5],
            vec![0, 1, 1, 0, 2],
            vec![c(1.0, 0.5), c(2.0, 0.0), c(3.0, -1.0), c(4.0, 0.0), c(5.0, 2.0)],
        );

        let sprs_mat = to_sprs(&original);
        let roundtrip = from_sprs(sprs_mat);

        assert_eq!(roundtrip.n_rows, original.n_rows);
        assert_eq!(roundtrip.n_cols, original.n_cols);
        assert_eq!(roundtrip.row_ptr, original.row_ptr);
        assert_eq!(roundtrip.col_idx, original.col_idx);
        assert_eq!(roundtrip.values, original.values);
    }
}
