//! Multi-rank powered dense-block product scenarios

mod common;

use common::{assert_close, c, norm, random_sparse, random_vector};
use qwalk::{
    dense_from_csr, dense_power_apply, distribute_dense_matrix, gather_dense_matrix,
    reconcile_communications, sort_csr, spmm, Communicator, CsrMatrix, DenseMatrix, DistCsrMatrix,
    Error, PartitionTable, SingleComm, ThreadComm,
};

#[test]
fn squared_diagonal_scales_the_block_by_four() {
    // diag(2)^2 times a 4x2 block of unit entries: every entry quadruples.
    ThreadComm::spawn_cluster(2, |comm| {
        let table = PartitionTable::new(4, 2);
        let global = CsrMatrix::from_triplets(
            4,
            4,
            &[
                (0, 0, c(2.0, 0.0)),
                (1, 1, c(2.0, 0.0)),
                (2, 2, c(2.0, 0.0)),
                (3, 3, c(2.0, 0.0)),
            ],
        );
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);
        reconcile_communications(&mut a, &table, &comm).unwrap();

        let mut b_global = DenseMatrix::zeros(4, 2);
        for row in 0..4 {
            b_global[(row, row % 2)] = c(1.0, 0.0);
        }
        let root_b = (comm.rank() == 0).then_some(&b_global);
        let b = distribute_dense_matrix(root_b, &table, 0, &comm).unwrap();
        let mut out = DenseMatrix::zeros(b.n_rows, b.n_cols);
        spmm(&a, 2, &b, &table, &mut out, &comm).unwrap();

        if let Some(full) = gather_dense_matrix(&out, &table, 0, &comm).unwrap() {
            for row in 0..4 {
                assert_eq!(full[(row, row % 2)], c(4.0, 0.0));
                assert_eq!(full[(row, (row + 1) % 2)], c(0.0, 0.0));
            }
        }
    });
}

#[test]
fn powered_product_matches_the_dense_reference() {
    ThreadComm::spawn_cluster(3, |comm| {
        let n = 12;
        let table = PartitionTable::new(n, 3);
        let global = random_sparse(n, 3, 0xBEEF);
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);
        reconcile_communications(&mut a, &table, &comm).unwrap();

        // Four columns of random operand data.
        let b_cols = 4;
        let b_data = random_vector(n * b_cols, 31);
        let b_global = DenseMatrix::new(n, b_cols, b_data);
        let b = b_global.row_block(table.range(comm.rank()));
        let mut out = DenseMatrix::zeros(b.n_rows, b.n_cols);
        spmm(&a, 3, &b, &table, &mut out, &comm).unwrap();

        let reference = dense_power_apply(&dense_from_csr(&global), 3, &b_global);
        let expected = reference.row_block(table.range(comm.rank()));
        let scale = norm(&reference.data);
        assert_close(&out.data, &expected.data, scale, 1e-10);
    });
}

#[test]
fn single_application_equals_the_plain_product() {
    ThreadComm::spawn_cluster(2, |comm| {
        let n = 9;
        let table = PartitionTable::new(n, 2);
        let global = random_sparse(n, 2, 3);
        let mut a = DistCsrMatrix::from_global(&global, &table, comm.rank());
        sort_csr(&mut a);
        reconcile_communications(&mut a, &table, &comm).unwrap();

        let b_global = DenseMatrix::new(n, 2, random_vector(n * 2, 8));
        let b = b_global.row_block(table.range(comm.rank()));
        let mut out = DenseMatrix::zeros(b.n_rows, b.n_cols);
        spmm(&a, 1, &b, &table, &mut out, &comm).unwrap();

        let reference = dense_power_apply(&dense_from_csr(&global), 1, &b_global);
        let expected = reference.row_block(table.range(comm.rank()));
        let scale = norm(&reference.data);
        assert_close(&out.data, &expected.data, scale, 1e-10);
    });
}

#[test]
fn powering_a_rectangular_matrix_is_rejected() {
    let table = PartitionTable::new(2, 1);
    let global = CsrMatrix::zeros(2, 3);
    let a = DistCsrMatrix::from_global(&global, &table, 0);
    let b = DenseMatrix::zeros(2, 1);
    let mut out = DenseMatrix::zeros(2, 1);
    let err = spmm(&a, 2, &b, &table, &mut out, &SingleComm).unwrap_err();
    assert!(matches!(err, Error::StateMisuse { .. }));
}
