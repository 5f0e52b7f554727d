//! Communication-plan builder
//!
//! Inspects a row block's sparsity structure once and precomputes exactly
//! which remote operand entries each rank must send and receive during a
//! product, plus a remap of the column indices into the extended operand
//! buffer. After reconciliation a product is a single `alltoallv` and a
//! branch-free local loop; the plan is reused across thousands of products
//! and stays valid until the sparsity pattern changes.

use log::debug;

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::matrix::{DistCsrMatrix, PartitionTable};
use crate::utils::exclusive_prefix;

/// Precomputed send/receive schedule and column remap for one row block.
///
/// All counts and displacements are per peer rank, in elements. `send_index`
/// holds the *local* positions (within this rank's owned rows) to gather
/// outgoing values from, concatenated in peer order. `local_cols` parallels
/// the block's `col_idx`: entry `k` is the extended-buffer slot the product
/// loop dereferences for nonzero `k`, below `local_rows` for owned columns
/// and at `local_rows + i` for the `i`-th received entry.
///
/// Repeated references to the same remote column are *not* deduplicated;
/// each occurrence gets its own remap slot and its own wire transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommPlan {
    /// Entries this rank receives from each peer during a product
    pub recv_counts: Vec<usize>,

    /// Displacements of each peer's block in the receive buffer
    pub recv_displs: Vec<usize>,

    /// Entries this rank sends to each peer during a product
    pub send_counts: Vec<usize>,

    /// Displacements of each peer's block in the send buffer
    pub send_displs: Vec<usize>,

    /// Local positions to gather outgoing values from, in peer order
    pub send_index: Vec<usize>,

    /// Extended-buffer slot for every local nonzero, parallel to `col_idx`
    pub local_cols: Vec<usize>,

    /// Total entries received per product
    pub total_recv: usize,

    /// Total entries sent per product
    pub total_send: usize,
}

/// Builds the communication plan for `a` and attaches it.
///
/// Requires strictly ascending column indices within every local row (run
/// [`sort_csr`](crate::sort::sort_csr) first); fails with
/// [`Error::OrderingViolation`] otherwise. Every rank must call this
/// collectively with the same table.
///
/// # Arguments
///
/// * `a` - The row block to reconcile; the plan is stored on it
/// * `table` - The partition table the matrix was distributed with
/// * `comm` - The communicator
pub fn reconcile_communications<C: Communicator>(
    a: &mut DistCsrMatrix,
    table: &PartitionTable,
    comm: &C,
) -> Result<()> {
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    if a.first_row != table.first_row(rank) {
        return Err(Error::ShapeMismatch {
            what: "block first row vs partition",
            expected: table.first_row(rank),
            found: a.first_row,
        });
    }
    if a.local_rows() != table.row_count(rank) {
        return Err(Error::ShapeMismatch {
            what: "block row count vs partition",
            expected: table.row_count(rank),
            found: a.local_rows(),
        });
    }

    let local_rows = a.local_rows();
    let lo = a.first_row;
    let hi = lo + local_rows;

    for i in 0..local_rows {
        let span = a.local_span(i);
        if a.col_idx[span].windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::OrderingViolation { row: lo + i });
        }
    }

    let size = comm.size();

    // Classify receives: every reference to a column outside the owned row
    // range must be fetched from the rank owning it.
    let mut recv_counts = vec![0usize; size];
    for &col in &a.col_idx {
        if col < lo || col >= hi {
            recv_counts[table.owner(col)] += 1;
        }
    }
    let recv_displs = exclusive_prefix(&recv_counts);
    let total_recv: usize = recv_counts.iter().sum();

    // Second scan: fill the per-owner request lists and remap every column
    // to its extended-buffer slot. Owned columns address the front of the
    // buffer directly; remote columns address the slot the alltoallv will
    // deliver their value into.
    let mut wanted = vec![0usize; total_recv];
    let mut local_cols = Vec::with_capacity(a.col_idx.len());
    let mut cursor = vec![0usize; size];
    for &col in &a.col_idx {
        if col >= lo && col < hi {
            local_cols.push(col - lo);
        } else {
            let owner = table.owner(col);
            let slot = recv_displs[owner] + cursor[owner];
            cursor[owner] += 1;
            wanted[slot] = col;
            local_cols.push(local_rows + slot);
        }
    }

    // Exchange counts, then the request lists themselves. What each peer
    // asked this rank for comes back as global row indices; store them as
    // local gather positions.
    let mut send_counts = vec![0usize; size];
    comm.alltoall_usize(&recv_counts, &mut send_counts)?;
    let send_displs = exclusive_prefix(&send_counts);
    let total_send: usize = send_counts.iter().sum();

    let mut requested = vec![0usize; total_send];
    comm.alltoallv(
        &wanted,
        &recv_counts,
        &recv_displs,
        &mut requested,
        &send_counts,
        &send_displs,
    )?;

    let mut send_index = Vec::with_capacity(total_send);
    for &global in &requested {
        if global < lo || global >= hi {
            return Err(Error::transport(
                "peer requested an operand row outside this rank's partition",
            ));
        }
        send_index.push(global - lo);
    }

    debug!(
        "reconciled rank {rank}: {} nonzeros, {total_recv} received, {total_send} sent",
        a.nnz()
    );

    a.plan = Some(CommPlan {
        recv_counts,
        recv_displs,
        send_counts,
        send_displs,
        send_index,
        local_cols,
        total_recv,
        total_send,
    });
    Ok(())
}
