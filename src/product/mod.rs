//! Distributed sparse products
//!
//! Both kernels run the same three stages per application: stage owned
//! operand entries into the extended buffer, exchange the remote entries the
//! communication plan prescribes through a single `alltoallv`, then run a
//! branch-free local accumulation through the plan's column remap. There is
//! no overlap of communication and computation.
//!
//! The iterated mat-vec product exposes every intermediate application so
//! the caller can fold each step into its Krylov or Taylor accumulation,
//! reusing one explicitly-passed [`SeriesCache`] across the whole series
//! instead of reallocating per step.

use num_complex::Complex64;
use num_traits::Zero;

use crate::comm::Communicator;
use crate::error::{Error, Result};
use crate::matrix::{DenseMatrix, DistCsrMatrix, PartitionTable};
use crate::plan::CommPlan;

/// Workspace for an iterated mat-vec series.
///
/// Follows a three-phase lifecycle: the first step of a series allocates,
/// intermediate steps reuse, the final step releases. The sentinel
/// invocation of [`spmv_series`] (`first_step == 0 && last_step == 0`)
/// releases unconditionally and succeeds from any state, so a caller can
/// always reset before starting over with a differently-shaped matrix.
#[derive(Debug, Default)]
pub struct SeriesCache {
    extended: Vec<Complex64>,
    send_values: Vec<Complex64>,
    recv_values: Vec<Complex64>,
    active: bool,
}

impl SeriesCache {
    /// Creates an empty, inactive workspace
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all buffers and deactivates the workspace
    pub fn release(&mut self) {
        self.extended = Vec::new();
        self.send_values = Vec::new();
        self.recv_values = Vec::new();
        self.active = false;
    }

    fn allocate(&mut self, extended_len: usize, send_len: usize, recv_len: usize) {
        self.extended = vec![Complex64::zero(); extended_len];
        self.send_values = vec![Complex64::zero(); send_len];
        self.recv_values = vec![Complex64::zero(); recv_len];
        self.active = true;
    }
}

fn require_plan<'a>(a: &'a DistCsrMatrix) -> Result<&'a CommPlan> {
    a.plan().ok_or_else(|| {
        Error::state("matrix has no communication plan; run reconcile_communications first")
    })
}

/// One step of the iterated product `v = A · u`, reusing `cache` across the
/// series.
///
/// Steps are numbered `first_step..=last_step` (1-based by convention) and
/// must be invoked in order; `step == first_step` (re)allocates the cache,
/// `step == last_step` releases it. Calling with `first_step == 0 &&
/// last_step == 0` is the reset sentinel: the cache is released and the
/// call returns without touching the matrix or the communicator.
///
/// # Arguments
///
/// * `a` - Reconciled row block
/// * `u` - This rank's slice of the input vector
/// * `table` - Partition table
/// * `first_step`, `step`, `last_step` - Position within the series
/// * `v` - This rank's slice of the output vector
/// * `cache` - Series workspace, owned by the caller
/// * `comm` - The communicator
#[allow(clippy::too_many_arguments)]
pub fn spmv_series<C: Communicator>(
    a: &DistCsrMatrix,
    u: &[Complex64],
    table: &PartitionTable,
    first_step: usize,
    step: usize,
    last_step: usize,
    v: &mut [Complex64],
    cache: &mut SeriesCache,
    comm: &C,
) -> Result<()> {
    if first_step == 0 && last_step == 0 {
        cache.release();
        return Ok(());
    }
    if step < first_step || step > last_step {
        return Err(Error::state(format!(
            "series step {step} outside [{first_step}, {last_step}]"
        )));
    }

    table.check_ranks(comm.size())?;
    let plan = require_plan(a)?;
    let local_rows = a.local_rows();
    if u.len() != local_rows {
        return Err(Error::ShapeMismatch {
            what: "input slice length",
            expected: local_rows,
            found: u.len(),
        });
    }
    if v.len() != local_rows {
        return Err(Error::ShapeMismatch {
            what: "output slice length",
            expected: local_rows,
            found: v.len(),
        });
    }

    let extended_len = local_rows + plan.total_recv;
    if step == first_step {
        cache.allocate(extended_len, plan.total_send, plan.total_recv);
    } else if !cache.active || cache.extended.len() != extended_len {
        return Err(Error::state(
            "series cache does not match this matrix; restart the series",
        ));
    }

    // Stage owned entries, gather outgoing values, exchange, append receives.
    cache.extended[..local_rows].copy_from_slice(u);
    for (slot, &pos) in plan.send_index.iter().enumerate() {
        cache.send_values[slot] = cache.extended[pos];
    }
    comm.alltoallv(
        &cache.send_values,
        &plan.send_counts,
        &plan.send_displs,
        &mut cache.recv_values,
        &plan.recv_counts,
        &plan.recv_displs,
    )?;
    cache.extended[local_rows..].copy_from_slice(&cache.recv_values);

    // The remap guarantees each dereference lands on the right slot whether
    // the column is owned or received.
    let offset = a.nnz_offset();
    for i in 0..local_rows {
        let mut acc = Complex64::zero();
        for j in a.row_ptr[i] - offset..a.row_ptr[i + 1] - offset {
            acc += a.values[j] * cache.extended[plan.local_cols[j]];
        }
        v[i] = acc;
    }

    if step == last_step {
        cache.release();
    }
    Ok(())
}

/// Powered distributed product `C = A^power · B` for a dense row-slice `B`.
///
/// The extended buffer is two-dimensional (`local rows + received` by
/// `B`'s column count) and the exchange runs once per column of `B`.
/// Between power iterations the freshly computed `C` is copied back into
/// the owned rows of the extended buffer.
///
/// # Arguments
///
/// * `a` - Reconciled row block; must be square when `power > 1`
/// * `power` - Number of applications, at least 1
/// * `b` - This rank's row slice of the operand
/// * `table` - Partition table
/// * `c` - This rank's row slice of the result, same shape as `b`
/// * `comm` - The communicator
pub fn spmm<C: Communicator>(
    a: &DistCsrMatrix,
    power: usize,
    b: &DenseMatrix,
    table: &PartitionTable,
    c: &mut DenseMatrix,
    comm: &C,
) -> Result<()> {
    if power == 0 {
        return Err(Error::state("powered product needs power >= 1"));
    }
    if power > 1 && a.n_rows != a.n_cols {
        return Err(Error::state(format!(
            "powered product needs a square matrix, got {}x{}",
            a.n_rows, a.n_cols
        )));
    }
    table.check_ranks(comm.size())?;
    let plan = require_plan(a)?;
    let local_rows = a.local_rows();
    if b.n_rows != local_rows {
        return Err(Error::ShapeMismatch {
            what: "operand block rows",
            expected: local_rows,
            found: b.n_rows,
        });
    }
    if c.n_rows != local_rows || c.n_cols != b.n_cols {
        return Err(Error::ShapeMismatch {
            what: "result block shape",
            expected: local_rows * b.n_cols,
            found: c.n_rows * c.n_cols,
        });
    }

    let n_cols = b.n_cols;
    let mut extended = DenseMatrix::zeros(local_rows + plan.total_recv, n_cols);
    extended.data[..local_rows * n_cols].copy_from_slice(&b.data);
    let mut send_values = vec![Complex64::zero(); plan.total_send];
    let mut recv_values = vec![Complex64::zero(); plan.total_recv];

    for iteration in 0..power {
        if iteration > 0 {
            extended.data[..local_rows * n_cols].copy_from_slice(&c.data);
        }
        for col in 0..n_cols {
            for (slot, &pos) in plan.send_index.iter().enumerate() {
                send_values[slot] = extended[(pos, col)];
            }
            comm.alltoallv(
                &send_values,
                &plan.send_counts,
                &plan.send_displs,
                &mut recv_values,
                &plan.recv_counts,
                &plan.recv_displs,
            )?;
            for (slot, &value) in recv_values.iter().enumerate() {
                extended[(local_rows + slot, col)] = value;
            }
        }

        let offset = a.nnz_offset();
        for i in 0..local_rows {
            c.row_mut(i).fill(Complex64::zero());
            for j in a.row_ptr[i] - offset..a.row_ptr[i + 1] - offset {
                let value = a.values[j];
                let src = plan.local_cols[j];
                for col in 0..n_cols {
                    c[(i, col)] += value * extended[(src, col)];
                }
            }
        }
    }
    Ok(())
}
