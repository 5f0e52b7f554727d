//! Multi-rank conjugate-transpose scenarios

mod common;

use common::{c, random_hermitian, random_sparse};
use qwalk::{csr_dagger, sort_csr, Communicator, CsrMatrix, DistCsrMatrix, PartitionTable, ThreadComm};

#[test]
fn shift_dagger_over_three_ranks() {
    // Transposing the cyclic shift moves each entry to the mirrored
    // position; every rank ends with exactly one nonzero in its single row.
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(3, 3);
        let global = CsrMatrix::from_triplets(
            3,
            3,
            &[(0, 1, c(1.0, 0.0)), (1, 2, c(1.0, 0.0)), (2, 0, c(1.0, 0.0))],
        );
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);

        let mut out = csr_dagger(&a, &table, &comm).unwrap();
        sort_csr(&mut out);

        // A† has nonzeros at (1,0), (2,1), (0,2), all ones.
        let rank = comm.rank();
        assert_eq!(out.local_rows(), 1);
        assert_eq!(out.row_ptr[1] - out.row_ptr[0], 1);
        assert_eq!(out.nnz_offset(), rank);
        let expected_col = (rank + 2) % 3;
        assert_eq!(out.col_idx, vec![expected_col]);
        assert_eq!(out.values, vec![c(1.0, 0.0)]);
    });
}

#[test]
fn dagger_twice_restores_the_matrix_bit_exactly() {
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(30, 3);
        let global = random_sparse(30, 4, 0xDA66E7);
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);

        let mut once = csr_dagger(&a, &table, &comm).unwrap();
        sort_csr(&mut once);
        let mut twice = csr_dagger(&once, &table, &comm).unwrap();
        sort_csr(&mut twice);

        assert_eq!(twice.row_ptr, a.row_ptr);
        assert_eq!(twice.col_idx, a.col_idx);
        assert_eq!(twice.values, a.values);
    });
}

#[test]
fn hermitian_matrix_is_its_own_dagger() {
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(100, 3);
        let global = random_hermitian(100, 150, 0x5EED);
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);

        let mut out = csr_dagger(&a, &table, &comm).unwrap();
        sort_csr(&mut out);

        assert_eq!(out.row_ptr, a.row_ptr);
        assert_eq!(out.col_idx, a.col_idx);
        assert_eq!(out.values, a.values);
    });
}

#[test]
fn transposed_element_counts_redistribute_consistently() {
    // The transposed nonzero stream must still hold every entry exactly
    // once: global counts are conserved and the per-rank offsets chain.
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(20, 3);
        let global = random_sparse(20, 3, 0x1234);
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);

        let out = csr_dagger(&a, &table, &comm).unwrap();
        let total = comm.allreduce_sum_usize(out.nnz()).unwrap();
        assert_eq!(total, global.nnz());
        assert_eq!(
            out.row_ptr[out.local_rows()] - out.nnz_offset(),
            out.nnz()
        );
    });
}
