//! Distribution and gathering round-trips over the in-process cluster

mod common;

use common::{random_sparse, random_vector};
use qwalk::{
    distribute_csr, distribute_dense_matrix, distribute_dense_vector, gather_dense_matrix,
    gather_dense_vector, Communicator, DenseMatrix, DistCsrMatrix, PartitionTable, ThreadComm,
};

#[test]
fn vector_round_trip_over_three_ranks() {
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(11, 3);
        let global = random_vector(11, 99);
        let root_vec = (comm.rank() == 0).then_some(global.as_slice());
        let local = distribute_dense_vector(root_vec, &table, 0, &comm).unwrap();
        assert_eq!(local, global[table.range(comm.rank())].to_vec());

        let gathered = gather_dense_vector(&local, &table, 0, &comm).unwrap();
        match (comm.rank(), gathered) {
            (0, Some(full)) => assert_eq!(full, global),
            (0, None) => panic!("root must receive the gathered vector"),
            (_, None) => {}
            (_, Some(_)) => panic!("non-root must not receive the gathered vector"),
        }
    });
}

#[test]
fn vector_round_trip_with_a_non_zero_root() {
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(7, 3);
        let global = random_vector(7, 4);
        let root = 2;
        let root_vec = (comm.rank() == root).then_some(global.as_slice());
        let local = distribute_dense_vector(root_vec, &table, root, &comm).unwrap();
        let gathered = gather_dense_vector(&local, &table, root, &comm).unwrap();
        if comm.rank() == root {
            assert_eq!(gathered.unwrap(), global);
        }
    });
}

#[test]
fn matrix_round_trip_over_two_ranks() {
    ThreadComm::spawn_cluster(2, |comm| {
        let table = PartitionTable::new(7, 2);
        let global = DenseMatrix::new(7, 3, random_vector(21, 55));
        let root_mat = (comm.rank() == 0).then_some(&global);
        let local = distribute_dense_matrix(root_mat, &table, 0, &comm).unwrap();
        assert_eq!(local, global.row_block(table.range(comm.rank())));

        let gathered = gather_dense_matrix(&local, &table, 0, &comm).unwrap();
        if comm.rank() == 0 {
            assert_eq!(gathered.unwrap(), global);
        }
    });
}

#[test]
fn distributed_csr_matches_the_locally_sliced_block() {
    ThreadComm::spawn_cluster(3, |comm| {
        let table = PartitionTable::new(10, 3);
        let global = random_sparse(10, 3, 0xFEED);
        let root_matrix = (comm.rank() == 0).then_some(&global);
        let via_comm = distribute_csr(root_matrix, &table, 0, &comm).unwrap();
        let direct = DistCsrMatrix::from_global(&global, &table, comm.rank());
        assert_eq!(via_comm, direct);
    });
}

#[test]
fn csr_distribution_keeps_the_structural_tag() {
    ThreadComm::spawn_cluster(2, |comm| {
        let table = PartitionTable::new(6, 2);
        let mut global = random_sparse(6, 2, 77);
        global.structure = *b"QW";
        let root_matrix = (comm.rank() == 0).then_some(&global);
        let block = distribute_csr(root_matrix, &table, 0, &comm).unwrap();
        assert_eq!(block.structure, *b"QW");
    });
}
