//! # QWALK: distributed sparse kernels for quantum stochastic walk simulation
//!
//! This library is the inner engine of a quantum-stochastic-walk simulator:
//! it multiplies a large complex sparse matrix in compressed-sparse-row form
//! by dense vectors or column blocks, repeatedly, across a message-passing
//! group. The outer simulator evaluates a matrix exponential by iterating
//! these products against Krylov or Taylor expansions, so everything here is
//! built around paying the setup costs once and streaming products after.
//!
//! ## Components
//!
//! 1. **Partition planner**: maps the global row range onto ranks, remainder
//!    rows going to the high-rank end so row counts differ by at most one.
//!
//! 2. **Distribution primitives**: scatter and gather dense vectors, dense
//!    matrices and CSR structures relative to a root rank.
//!
//! 3. **Communication reconciliation**: a one-time pass over the sparsity
//!    structure that precomputes exactly which remote operand entries each
//!    rank sends and receives, and remaps column indices into an extended
//!    operand buffer so the product loop needs no runtime branch.
//!
//! 4. **Product kernels**: an iterated mat-vec series exposing every
//!    intermediate step, and a powered dense-block product.
//!
//! 5. **Conjugate transpose**: redistributes nonzeros to the ranks owning
//!    their new rows without materialising the matrix anywhere.
//!
//! Communication goes through the [`Communicator`] trait; backends cover a
//! single process, an in-process threaded group for tests and single-node
//! runs, and MPI behind the `mpi-comm` feature.
//!
//! Indices are zero-based throughout.
//!
//! ## Usage
//!
//! A one-rank product (multi-rank runs look identical, with the
//! communicator swapped):
//!
//! ```
//! use num_complex::Complex64;
//! use qwalk::{
//!     reconcile_communications, sort_csr, spmv_series, CsrMatrix, DistCsrMatrix,
//!     PartitionTable, SeriesCache, SingleComm,
//! };
//!
//! let comm = SingleComm;
//! let table = PartitionTable::new(3, 1);
//!
//! let global = CsrMatrix::identity(3);
//! let mut local = DistCsrMatrix::from_global(&global, &table, 0);
//! sort_csr(&mut local);
//! reconcile_communications(&mut local, &table, &comm)?;
//!
//! let u: Vec<Complex64> = (1..=3).map(|k| Complex64::new(k as f64, 0.0)).collect();
//! let mut v = vec![Complex64::new(0.0, 0.0); 3];
//! let mut cache = SeriesCache::new();
//! spmv_series(&local, &u, &table, 1, 1, 1, &mut v, &mut cache, &comm)?;
//!
//! assert_eq!(v, u);
//! # Ok::<(), qwalk::Error>(())
//! ```

pub mod comm;
pub mod constants;
pub mod dagger;
pub mod distribute;
pub mod error;
pub mod matrix;
pub mod plan;
pub mod product;
pub mod sort;
pub mod utils;

// Re-export primary components
pub use comm::{CommScalar, Communicator, SingleComm, ThreadComm};
#[cfg(feature = "mpi-comm")]
pub use comm::MpiComm;
pub use dagger::csr_dagger;
pub use distribute::{
    distribute_csr, distribute_dense_matrix, distribute_dense_vector, gather_dense_matrix,
    gather_dense_vector,
};
pub use error::{Error, Result};
pub use matrix::{
    dense_dagger, dense_from_csr, dense_matmul, dense_matvec, dense_power_apply, CsrMatrix,
    DenseMatrix, DistCsrMatrix, PartitionTable,
};
pub use plan::{reconcile_communications, CommPlan};
pub use product::{spmm, spmv_series, SeriesCache};
pub use sort::{sort_csr, sort_pairs, sort_triples};
pub use utils::{from_sprs, to_sprs};

/// Version information for the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
