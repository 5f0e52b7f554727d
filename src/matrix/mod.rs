// Matrix data structures: partition table, CSR formats, dense blocks

pub mod csr;
pub mod dense;
pub mod partition;
pub mod reference;

pub use csr::{CsrMatrix, DistCsrMatrix};
pub use dense::DenseMatrix;
pub use partition::PartitionTable;
pub use reference::{dense_dagger, dense_from_csr, dense_matmul, dense_matvec, dense_power_apply};
