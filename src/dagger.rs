//! Distributed conjugate transpose
//!
//! Redistributes every nonzero to the rank owning its new row, without ever
//! materialising the matrix on a single rank: expand local rows to triples,
//! route each triple by the partition owner of its column, exchange, then
//! regroup by new row and rebuild the row pointers. The same partition
//! table describes both the input and the output.

use log::debug;
use num_complex::Complex64;
use num_traits::Zero;

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::matrix::{DistCsrMatrix, PartitionTable};
use crate::sort::sort_triples;
use crate::utils::exclusive_prefix;

/// Conjugate transpose of a distributed square matrix.
///
/// The result carries no communication plan; run
/// [`sort_csr`](crate::sort::sort_csr) and then
/// [`reconcile_communications`](crate::plan::reconcile_communications) on it
/// before the next product; columns within a row are grouped but not
/// sorted on return.
///
/// # Arguments
///
/// * `a` - The row block to transpose
/// * `table` - Partition table shared by input and output
/// * `comm` - The communicator
pub fn csr_dagger<C: Communicator>(
    a: &DistCsrMatrix,
    table: &PartitionTable,
    comm: &C,
) -> Result<DistCsrMatrix> {
    if a.n_rows != a.n_cols {
        return Err(Error::UnsquareDagger {
            rows: a.n_rows,
            cols: a.n_cols,
        });
    }
    table.check_ranks(comm.size())?;
    let rank = comm.rank();
    if a.first_row != table.first_row(rank) || a.local_rows() != table.row_count(rank) {
        return Err(Error::ShapeMismatch {
            what: "block rows vs partition",
            expected: table.row_count(rank),
            found: a.local_rows(),
        });
    }

    let size = comm.size();
    let lo = a.first_row;
    let local_nnz = a.nnz();

    // Each nonzero (row, col, v) becomes (col, row, conj v) owned by the
    // rank whose row range contains col.
    let mut send_counts = vec![0usize; size];
    for &col in &a.col_idx {
        send_counts[table.owner(col)] += 1;
    }
    let send_displs = exclusive_prefix(&send_counts);

    let mut rows_out = vec![0usize; local_nnz];
    let mut cols_out = vec![0usize; local_nnz];
    let mut vals_out = vec![Complex64::zero(); local_nnz];
    let mut cursor = send_displs.clone();
    for i in 0..a.local_rows() {
        let row = lo + i;
        for j in a.local_span(i) {
            let col = a.col_idx[j];
            let dest = table.owner(col);
            let slot = cursor[dest];
            cursor[dest] += 1;
            cols_out[slot] = col;
            rows_out[slot] = row;
            vals_out[slot] = a.values[j].conj();
        }
    }

    // Count exchange, then the per-rank share of the transposed nonzero
    // stream so every rank learns its new global element offset.
    let mut recv_counts = vec![0usize; size];
    comm.alltoall_usize(&send_counts, &mut recv_counts)?;
    let recv_displs = exclusive_prefix(&recv_counts);
    let total_in: usize = recv_counts.iter().sum();

    let mut per_rank_nnz = vec![0usize; size];
    comm.allgather_usize(total_in, &mut per_rank_nnz)?;
    let nnz_offset: usize = per_rank_nnz[..rank].iter().sum();

    // Three parallel exchanges: incoming columns are the new rows, incoming
    // rows the new columns.
    let mut new_rows = vec![0usize; total_in];
    let mut new_cols = vec![0usize; total_in];
    let mut new_vals = vec![Complex64::zero(); total_in];
    comm.alltoallv(
        &cols_out,
        &send_counts,
        &send_displs,
        &mut new_rows,
        &recv_counts,
        &recv_displs,
    )?;
    comm.alltoallv(
        &rows_out,
        &send_counts,
        &send_displs,
        &mut new_cols,
        &recv_counts,
        &recv_displs,
    )?;
    comm.alltoallv(
        &vals_out,
        &send_counts,
        &send_displs,
        &mut new_vals,
        &recv_counts,
        &recv_displs,
    )?;

    // Group each new row's entries together; stability keeps per-source
    // arrival order within a row.
    sort_triples(&mut new_rows, &mut new_cols, &mut new_vals);

    // Row pointers: histogram over the local row range, prefix-summed from
    // this rank's global element offset.
    let local_rows = table.row_count(rank);
    let mut row_ptr = vec![0usize; local_rows + 1];
    row_ptr[0] = nnz_offset;
    for &row in &new_rows {
        debug_assert!(row >= lo && row < lo + local_rows);
        row_ptr[row - lo + 1] += 1;
    }
    for i in 0..local_rows {
        row_ptr[i + 1] += row_ptr[i];
    }

    debug!(
        "dagger rank {rank}: {local_nnz} nonzeros out, {total_in} in, element offset {nnz_offset}"
    );

    let mut transposed = DistCsrMatrix::new(
        a.n_rows,
        a.n_cols,
        lo,
        row_ptr,
        new_cols,
        new_vals,
    );
    transposed.structure = a.structure;
    Ok(transposed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SingleComm;
    use crate::matrix::CsrMatrix;
    use crate::sort::sort_csr;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn non_square_input_is_rejected() {
        let global = CsrMatrix::zeros(2, 3);
        let table = PartitionTable::new(2, 1);
        let block = DistCsrMatrix::from_global(&global, &table, 0);
        let err = csr_dagger(&block, &table, &SingleComm).unwrap_err();
        assert!(matches!(err, Error::UnsquareDagger { rows: 2, cols: 3 }));
    }

    #[test]
    fn single_rank_dagger_transposes_and_conjugates() {
        // A = [0 (1+2i); 0 3] => A† = [0 0; (1-2i) 3]
        let global = CsrMatrix::from_triplets(
            2,
            2,
            &[(0, 1, c(1.0, 2.0)), (1, 1, c(3.0, 0.0))],
        );
        let table = PartitionTable::new(2, 1);
        let block = DistCsrMatrix::from_global(&global, &table, 0);
        let mut out = csr_dagger(&block, &table, &SingleComm).unwrap();
        sort_csr(&mut out);

        assert_eq!(out.row_ptr, vec![0, 0, 2]);
        assert_eq!(out.col_idx, vec![0, 1]);
        assert_eq!(out.values, vec![c(1.0, -2.0), c(3.0, 0.0)]);
        assert!(out.plan().is_none());
    }

    #[test]
    fn single_rank_dagger_is_an_involution() {
        let global = CsrMatrix::from_triplets(
            3,
            3,
            &[
                (0, 2, c(1.0, -1.0)),
                (1, 0, c(2.0, 0.5)),
                (2, 1, c(0.0, 4.0)),
                (2, 2, c(-1.0, 0.0)),
            ],
        );
        let table = PartitionTable::new(3, 1);
        let block = DistCsrMatrix::from_global(&global, &table, 0);

        let mut once = csr_dagger(&block, &table, &SingleComm).unwrap();
        sort_csr(&mut once);
        let mut twice = csr_dagger(&once, &table, &SingleComm).unwrap();
        sort_csr(&mut twice);

        assert_eq!(twice.row_ptr, block.row_ptr);
        assert_eq!(twice.col_idx, block.col_idx);
        assert_eq!(twice.values, block.values);
    }
}
