//! Distribute and gather primitives for vectors, dense matrices and CSR
//! structures
//!
//! All routines are collective over the communicator and operate relative to
//! a named root rank and a partition table. The root passes the global
//! object; other ranks pass `None` and receive their row block. Gathers are
//! the mirror image: every rank contributes its block and the root returns
//! the assembled object.

use log::debug;
use num_complex::Complex64;
use num_traits::Zero;

use crate::comm::Communicator;
use crate::constants::{TAG_MATRIX_SLICE, TAG_VECTOR_SLICE};
use crate::error::{Error, Result};
use crate::matrix::{CsrMatrix, DenseMatrix, DistCsrMatrix, PartitionTable};

fn require_global<T>(global: Option<T>, routine: &str) -> Result<T> {
    global.ok_or_else(|| Error::state(format!("root rank entered {routine} without the global data")))
}

/// Distributes a dense vector from `root`, returning each rank's row slice.
///
/// The root sends every other rank its slice and keeps its own; a barrier
/// ends the routine so no rank races ahead with a partial operand.
pub fn distribute_dense_vector<C: Communicator>(
    global: Option<&[Complex64]>,
    table: &PartitionTable,
    root: usize,
    comm: &C,
) -> Result<Vec<Complex64>> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();

    let local = if rank == root {
        let vec = require_global(global, "distribute_dense_vector")?;
        if vec.len() != table.rows() {
            return Err(Error::ShapeMismatch {
                what: "global vector length",
                expected: table.rows(),
                found: vec.len(),
            });
        }
        for peer in 0..comm.size() {
            if peer != root {
                comm.send(&vec[table.range(peer)], peer, TAG_VECTOR_SLICE)?;
            }
        }
        vec[table.range(rank)].to_vec()
    } else {
        let mut slice = vec![Complex64::zero(); table.row_count(rank)];
        comm.recv(&mut slice, root, TAG_VECTOR_SLICE)?;
        slice
    };

    comm.barrier()?;
    Ok(local)
}

/// Gathers per-rank row slices into the full vector on `root`.
///
/// Returns `Some` on the root, `None` elsewhere.
pub fn gather_dense_vector<C: Communicator>(
    local: &[Complex64],
    table: &PartitionTable,
    root: usize,
    comm: &C,
) -> Result<Option<Vec<Complex64>>> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    if local.len() != table.row_count(rank) {
        return Err(Error::ShapeMismatch {
            what: "local vector slice length",
            expected: table.row_count(rank),
            found: local.len(),
        });
    }

    let counts = table.counts();
    let displs = table.displs();
    if rank == root {
        let mut full = vec![Complex64::zero(); table.rows()];
        comm.gatherv(local, &mut full, &counts, &displs, root)?;
        Ok(Some(full))
    } else {
        comm.gatherv(local, &mut [], &counts, &displs, root)?;
        Ok(None)
    }
}

/// Distributes a global CSR matrix from `root` into per-rank row blocks.
///
/// Dimensions and the structural tag are broadcast first. The row pointers
/// are scattered with a one-element overlap between adjacent ranks so each
/// rank holds its inclusive upper bound and can size its nonzero arrays
/// locally; the root derives the per-rank nonzero lengths by diffing the
/// row pointers at the partition boundaries.
pub fn distribute_csr<C: Communicator>(
    global: Option<&CsrMatrix>,
    table: &PartitionTable,
    root: usize,
    comm: &C,
) -> Result<DistCsrMatrix> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    let size = comm.size();
    let is_root = rank == root;

    let matrix = if is_root {
        let m = require_global(global, "distribute_csr")?;
        if m.n_rows != table.rows() {
            return Err(Error::ShapeMismatch {
                what: "global matrix row count",
                expected: table.rows(),
                found: m.n_rows,
            });
        }
        Some(m)
    } else {
        None
    };

    let mut dims = [0u64; 2];
    let mut tag = [0u8; 2];
    if let Some(m) = matrix {
        dims = [m.n_rows as u64, m.n_cols as u64];
        tag = m.structure;
    }
    comm.broadcast(&mut dims, root)?;
    comm.broadcast(&mut tag, root)?;
    let (n_rows, n_cols) = (dims[0] as usize, dims[1] as usize);

    // Row pointers, one element of overlap between adjacent ranks.
    let ptr_counts: Vec<usize> = (0..size).map(|r| table.row_count(r) + 1).collect();
    let ptr_displs = table.displs();
    let mut row_ptr = vec![0usize; table.row_count(rank) + 1];
    let empty: &[usize] = &[];
    comm.scatterv(
        matrix.map_or(empty, |m| m.row_ptr.as_slice()),
        &ptr_counts,
        &ptr_displs,
        &mut row_ptr,
        root,
    )?;

    // Each rank sizes its own arrays from the received pointer slice; the
    // root's counts come from the same boundaries on the global pointers.
    let local_nnz = row_ptr[row_ptr.len() - 1] - row_ptr[0];
    let (val_counts, val_displs) = if is_root {
        let m = matrix.expect("checked above");
        let counts: Vec<usize> = (0..size)
            .map(|r| m.row_ptr[table.range(r).end] - m.row_ptr[table.range(r).start])
            .collect();
        let displs: Vec<usize> = (0..size).map(|r| m.row_ptr[table.first_row(r)]).collect();
        (counts, displs)
    } else {
        (Vec::new(), Vec::new())
    };

    let mut col_idx = vec![0usize; local_nnz];
    comm.scatterv(
        matrix.map_or(empty, |m| m.col_idx.as_slice()),
        &val_counts,
        &val_displs,
        &mut col_idx,
        root,
    )?;

    let empty_vals: &[Complex64] = &[];
    let mut values = vec![Complex64::zero(); local_nnz];
    comm.scatterv(
        matrix.map_or(empty_vals, |m| m.values.as_slice()),
        &val_counts,
        &val_displs,
        &mut values,
        root,
    )?;

    debug!("rank {rank}: received {local_nnz} nonzeros over {} rows", row_ptr.len() - 1);

    let mut block = DistCsrMatrix::new(
        n_rows,
        n_cols,
        table.first_row(rank),
        row_ptr,
        col_idx,
        values,
    );
    block.structure = tag;
    Ok(block)
}

/// Distributes a dense matrix from `root` as row blocks.
pub fn distribute_dense_matrix<C: Communicator>(
    global: Option<&DenseMatrix>,
    table: &PartitionTable,
    root: usize,
    comm: &C,
) -> Result<DenseMatrix> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    let is_root = rank == root;

    let matrix = if is_root {
        let m = require_global(global, "distribute_dense_matrix")?;
        if m.n_rows != table.rows() {
            return Err(Error::ShapeMismatch {
                what: "global matrix row count",
                expected: table.rows(),
                found: m.n_rows,
            });
        }
        Some(m)
    } else {
        None
    };

    let mut cols = [0u64; 1];
    if let Some(m) = matrix {
        cols = [m.n_cols as u64];
    }
    comm.broadcast(&mut cols, root)?;
    let n_cols = cols[0] as usize;

    let counts: Vec<usize> = table.counts().iter().map(|&c| c * n_cols).collect();
    let displs: Vec<usize> = table.displs().iter().map(|&d| d * n_cols).collect();
    let mut data = vec![Complex64::zero(); table.row_count(rank) * n_cols];
    let empty: &[Complex64] = &[];
    comm.scatterv(
        matrix.map_or(empty, |m| m.data.as_slice()),
        &counts,
        &displs,
        &mut data,
        root,
    )?;

    Ok(DenseMatrix::new(table.row_count(rank), n_cols, data))
}

/// Gathers per-rank row blocks into the full dense matrix on `root`.
///
/// The root receives blocks in whatever order they arrive and places each
/// by its sender's partition range, so senders do not serialise behind one
/// another. A barrier ends the routine. Returns `Some` on the root, `None`
/// elsewhere.
pub fn gather_dense_matrix<C: Communicator>(
    local: &DenseMatrix,
    table: &PartitionTable,
    root: usize,
    comm: &C,
) -> Result<Option<DenseMatrix>> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    let size = comm.size();
    if local.n_rows != table.row_count(rank) {
        return Err(Error::ShapeMismatch {
            what: "local matrix block rows",
            expected: table.row_count(rank),
            found: local.n_rows,
        });
    }

    if rank != root {
        comm.send(&local.data, root, TAG_MATRIX_SLICE)?;
        comm.barrier()?;
        return Ok(None);
    }

    let n_cols = local.n_cols;
    let mut full = DenseMatrix::zeros(table.rows(), n_cols);
    let own = table.range(root);
    full.data[own.start * n_cols..own.end * n_cols].copy_from_slice(&local.data);

    let mut seen = vec![false; size];
    seen[root] = true;
    for _ in 0..size - 1 {
        let (src, data): (usize, Vec<Complex64>) = comm.recv_any(TAG_MATRIX_SLICE)?;
        if seen[src] {
            return Err(Error::transport(format!("duplicate matrix block from rank {src}")));
        }
        seen[src] = true;
        let expected = table.row_count(src) * n_cols;
        if data.len() != expected {
            return Err(Error::ShapeMismatch {
                what: "gathered matrix block length",
                expected,
                found: data.len(),
            });
        }
        let start = table.first_row(src) * n_cols;
        full.data[start..start + expected].copy_from_slice(&data);
    }

    comm.barrier()?;
    Ok(Some(full))
}
