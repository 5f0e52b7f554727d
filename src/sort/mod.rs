//! Hybrid sort kernels for CSR rows and redistributed triples
//!
//! Two parallel families: [`sort_pairs`] orders the `(column, value)` run of
//! a single CSR row, and [`sort_triples`] orders the `(new-row, column,
//! value)` runs the conjugate transpose redistributes. Both are recursive
//! merge sorts that fall back to insertion sort at spans of
//! [`SORT_INSERTION_THRESHOLD`] or less, merging through a scratch copy of
//! the left half. Both are stable: entries with equal keys keep their
//! original order, which the transpose relies on to preserve per-source
//! arrival order within a row.

use num_complex::Complex64;

use crate::constants::SORT_INSERTION_THRESHOLD;
use crate::matrix::DistCsrMatrix;

/// Sorts a `(key, value)` run in place, ascending by key, stable.
pub fn sort_pairs(keys: &mut [usize], values: &mut [Complex64]) {
    debug_assert_eq!(keys.len(), values.len());
    let len = keys.len();
    if len <= SORT_INSERTION_THRESHOLD {
        insertion_pairs(keys, values);
        return;
    }
    let mid = len / 2;
    {
        let (kl, kr) = keys.split_at_mut(mid);
        let (vl, vr) = values.split_at_mut(mid);
        sort_pairs(kl, vl);
        sort_pairs(kr, vr);
    }
    merge_pairs(keys, values, mid);
}

/// Sorts a `(key, second, value)` run in place, ascending by key only,
/// stable.
pub fn sort_triples(keys: &mut [usize], seconds: &mut [usize], values: &mut [Complex64]) {
    debug_assert_eq!(keys.len(), seconds.len());
    debug_assert_eq!(keys.len(), values.len());
    let len = keys.len();
    if len <= SORT_INSERTION_THRESHOLD {
        insertion_triples(keys, seconds, values);
        return;
    }
    let mid = len / 2;
    {
        let (kl, kr) = keys.split_at_mut(mid);
        let (sl, sr) = seconds.split_at_mut(mid);
        let (vl, vr) = values.split_at_mut(mid);
        sort_triples(kl, sl, vl);
        sort_triples(kr, sr, vr);
    }
    merge_triples(keys, seconds, values, mid);
}

/// Sorts every local row's columns ascending.
///
/// Must run once after construction and again after the conjugate
/// transpose, before the next reconciliation.
pub fn sort_csr(a: &mut DistCsrMatrix) {
    let offset = a.row_ptr[0];
    for i in 0..a.row_ptr.len() - 1 {
        let lo = a.row_ptr[i] - offset;
        let hi = a.row_ptr[i + 1] - offset;
        sort_pairs(&mut a.col_idx[lo..hi], &mut a.values[lo..hi]);
    }
}

fn insertion_pairs(keys: &mut [usize], values: &mut [Complex64]) {
    for i in 1..keys.len() {
        let key = keys[i];
        let value = values[i];
        let mut j = i;
        while j > 0 && keys[j - 1] > key {
            keys[j] = keys[j - 1];
            values[j] = values[j - 1];
            j -= 1;
        }
        keys[j] = key;
        values[j] = value;
    }
}

fn insertion_triples(keys: &mut [usize], seconds: &mut [usize], values: &mut [Complex64]) {
    for i in 1..keys.len() {
        let key = keys[i];
        let second = seconds[i];
        let value = values[i];
        let mut j = i;
        while j > 0 && keys[j - 1] > key {
            keys[j] = keys[j - 1];
            seconds[j] = seconds[j - 1];
            values[j] = values[j - 1];
            j -= 1;
        }
        keys[j] = key;
        seconds[j] = second;
        values[j] = value;
    }
}

// Copy the left half to scratch, then merge scratch and the right half back
// into place from the front. The write cursor never overtakes the right
// cursor, so no element is clobbered before it is consumed.
fn merge_pairs(keys: &mut [usize], values: &mut [Complex64], mid: usize) {
    let scratch_keys = keys[..mid].to_vec();
    let scratch_values = values[..mid].to_vec();
    let (mut left, mut right, mut write) = (0, mid, 0);
    while left < mid && right < keys.len() {
        if scratch_keys[left] <= keys[right] {
            keys[write] = scratch_keys[left];
            values[write] = scratch_values[left];
            left += 1;
        } else {
            keys[write] = keys[right];
            values[write] = values[right];
            right += 1;
        }
        write += 1;
    }
    while left < mid {
        keys[write] = scratch_keys[left];
        values[write] = scratch_values[left];
        left += 1;
        write += 1;
    }
}

fn merge_triples(keys: &mut [usize], seconds: &mut [usize], values: &mut [Complex64], mid: usize) {
    let scratch_keys = keys[..mid].to_vec();
    let scratch_seconds = seconds[..mid].to_vec();
    let scratch_values = values[..mid].to_vec();
    let (mut left, mut right, mut write) = (0, mid, 0);
    while left < mid && right < keys.len() {
        if scratch_keys[left] <= keys[right] {
            keys[write] = scratch_keys[left];
            seconds[write] = scratch_seconds[left];
            values[write] = scratch_values[left];
            left += 1;
        } else {
            keys[write] = keys[right];
            seconds[write] = seconds[right];
            values[write] = values[right];
            right += 1;
        }
        write += 1;
    }
    while left < mid {
        keys[write] = scratch_keys[left];
        seconds[write] = scratch_seconds[left];
        values[write] = scratch_values[left];
        left += 1;
        write += 1;
    }
}
