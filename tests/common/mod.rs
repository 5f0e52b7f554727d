//! Shared fixtures for the distributed integration tests
//!
//! Every rank in a `ThreadComm` cluster rebuilds the same global objects
//! from the same seed, so tests can compare local results against a full
//! serial reference without shipping test data between ranks.

#![allow(dead_code)]

use num_complex::Complex64;
use qwalk::CsrMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Random complex vector, deterministic in the seed.
pub fn random_vector(n: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect()
}

/// Random sparse matrix with `nnz_per_row` distinct columns per row.
pub fn random_sparse(n: usize, nnz_per_row: usize, seed: u64) -> CsrMatrix {
    assert!(nnz_per_row <= n);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut entries = Vec::with_capacity(n * nnz_per_row);
    for row in 0..n {
        let mut cols = Vec::with_capacity(nnz_per_row);
        while cols.len() < nnz_per_row {
            let col = rng.gen_range(0..n);
            if !cols.contains(&col) {
                cols.push(col);
            }
        }
        for col in cols {
            entries.push((row, col, c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))));
        }
    }
    CsrMatrix::from_triplets(n, n, &entries)
}

/// Random Hermitian sparse matrix: real diagonal plus conjugate-mirrored
/// off-diagonal pairs.
pub fn random_hermitian(n: usize, off_diagonal_pairs: usize, seed: u64) -> CsrMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut entries = Vec::with_capacity(n + 2 * off_diagonal_pairs);
    for i in 0..n {
        entries.push((i, i, c(rng.gen_range(-1.0..1.0), 0.0)));
    }
    for _ in 0..off_diagonal_pairs {
        let i = rng.gen_range(0..n - 1);
        let j = rng.gen_range(i + 1..n);
        let value = c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        entries.push((i, j, value));
        entries.push((j, i, value.conj()));
    }
    CsrMatrix::from_triplets(n, n, &entries)
}

/// Euclidean norm of a complex vector.
pub fn norm(v: &[Complex64]) -> f64 {
    v.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
}

/// Asserts `got` matches `want` to `tol` relative to `scale`.
pub fn assert_close(got: &[Complex64], want: &[Complex64], scale: f64, tol: f64) {
    assert_eq!(got.len(), want.len());
    for (k, (g, w)) in got.iter().zip(want).enumerate() {
        let err = (g - w).norm();
        assert!(
            err <= tol * scale.max(1.0),
            "entry {k}: got {g}, want {w}, err {err:e}"
        );
    }
}
