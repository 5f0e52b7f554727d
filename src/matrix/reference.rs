//! Serial dense reference kernels
//!
//! Simple but correct baselines the distributed kernels are validated
//! against on small cases. Not optimized; correctness only.

use num_complex::Complex64;
use num_traits::Zero;

use crate::matrix::{CsrMatrix, DenseMatrix};

/// Densifies a global CSR matrix
pub fn dense_from_csr(a: &CsrMatrix) -> DenseMatrix {
    let mut out = DenseMatrix::zeros(a.n_rows, a.n_cols);
    for i in 0..a.n_rows {
        for (j, &value) in a.row_iter(i) {
            out[(i, j)] += value;
        }
    }
    out
}

/// Dense matrix-vector product `A · u`
pub fn dense_matvec(a: &DenseMatrix, u: &[Complex64]) -> Vec<Complex64> {
    assert_eq!(a.n_cols, u.len(), "operand length must match the column count");
    let mut out = vec![Complex64::zero(); a.n_rows];
    for i in 0..a.n_rows {
        let mut acc = Complex64::zero();
        for (j, &x) in u.iter().enumerate() {
            acc += a[(i, j)] * x;
        }
        out[i] = acc;
    }
    out
}

/// Dense matrix-matrix product `A · B`
pub fn dense_matmul(a: &DenseMatrix, b: &DenseMatrix) -> DenseMatrix {
    assert_eq!(a.n_cols, b.n_rows, "inner dimensions must agree");
    let mut out = DenseMatrix::zeros(a.n_rows, b.n_cols);
    for i in 0..a.n_rows {
        for k in 0..a.n_cols {
            let aik = a[(i, k)];
            for j in 0..b.n_cols {
                out[(i, j)] += aik * b[(k, j)];
            }
        }
    }
    out
}

/// Dense powered product `A^n · B` for `n >= 1`
pub fn dense_power_apply(a: &DenseMatrix, n: usize, b: &DenseMatrix) -> DenseMatrix {
    assert!(n >= 1, "power must be at least 1");
    let mut out = dense_matmul(a, b);
    for _ in 1..n {
        out = dense_matmul(a, &out);
    }
    out
}

/// Dense conjugate transpose
pub fn dense_dagger(a: &DenseMatrix) -> DenseMatrix {
    let mut out = DenseMatrix::zeros(a.n_cols, a.n_rows);
    for i in 0..a.n_rows {
        for j in 0..a.n_cols {
            out[(j, i)] = a[(i, j)].conj();
        }
    }
    out
}
