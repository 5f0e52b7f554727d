//! Communication backend abstraction for the distributed kernels
//!
//! The process launcher is external to this crate: callers obtain a
//! communicator from whatever bootstrap they use and hand it to the kernels
//! through the [`Communicator`] trait. The trait exposes exactly the
//! collectives the kernels need; every method is a synchronisation point and
//! must be entered by all ranks in identical order with consistent shapes.
//!
//! Three backends are provided:
//!
//! - [`SingleComm`]: the single-process degenerate case; collectives are
//!   local copies and point-to-point transfers are errors.
//! - [`ThreadComm`]: an in-process cluster of rank endpoints connected by
//!   byte channels. Deterministic and dependency-free; this is what the
//!   integration tests run the multi-rank scenarios on.
//! - `MpiComm`: the production backend over the `mpi` crate, available
//!   behind the `mpi-comm` cargo feature.

pub mod single;
pub mod threaded;

#[cfg(feature = "mpi-comm")]
pub mod mpi;

pub use single::SingleComm;
pub use threaded::ThreadComm;

#[cfg(feature = "mpi-comm")]
pub use mpi::MpiComm;

use crate::error::Result;

/// Scalar types that can cross a communicator.
///
/// Buffers are reinterpreted as plain-old-data bytes at the wire, so any
/// implementor must be `Pod`. Ranks are assumed homogeneous (same word size
/// and endianness), which holds for the message-passing clusters this crate
/// targets.
pub trait CommScalar: bytemuck::Pod + Send + Sync + 'static {}

impl CommScalar for u8 {}
impl CommScalar for i32 {}
impl CommScalar for u64 {}
impl CommScalar for usize {}
impl CommScalar for f64 {}
impl CommScalar for num_complex::Complex64 {}

/// The collectives consumed by the distributed kernels.
///
/// Variable-count operations take per-rank `counts` and `displs` arrays of
/// length `size()`, expressed in elements of `T`. For rooted operations the
/// count arrays are read only on the root; non-root ranks may pass empty
/// slices where documented.
pub trait Communicator {
    /// This process's rank within the group
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn size(&self) -> usize;

    /// Block until every rank has entered the barrier
    fn barrier(&self) -> Result<()>;

    /// Broadcast `buf` from `root` to every rank
    fn broadcast<T: CommScalar>(&self, buf: &mut [T], root: usize) -> Result<()>;

    /// Blocking send of `buf` to `dest` under `tag`
    fn send<T: CommScalar>(&self, buf: &[T], dest: usize, tag: i32) -> Result<()>;

    /// Blocking receive from `source` under `tag`; the message must match
    /// `buf.len()` exactly
    fn recv<T: CommScalar>(&self, buf: &mut [T], source: usize, tag: i32) -> Result<()>;

    /// Blocking probe-style receive from any rank under `tag`, returning the
    /// source rank and the message sized by the sender
    fn recv_any<T: CommScalar>(&self, tag: i32) -> Result<(usize, Vec<T>)>;

    /// Scatter variable-sized blocks of `send` from `root`.
    ///
    /// `counts`/`displs` are read only on the root; every rank receives
    /// exactly `recv.len()` elements.
    fn scatterv<T: CommScalar>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [T],
        root: usize,
    ) -> Result<()>;

    /// Gather variable-sized blocks into `recv` on `root`.
    ///
    /// `counts`/`displs` describe the layout of `recv` and are read only on
    /// the root; `recv` is ignored on other ranks.
    fn gatherv<T: CommScalar>(
        &self,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<()>;

    /// Exchange one `usize` with every rank: `recv[s]` receives what rank
    /// `s` placed in `send[self.rank()]`
    fn alltoall_usize(&self, send: &[usize], recv: &mut [usize]) -> Result<()>;

    /// Exchange variable-sized blocks with every rank
    #[allow(clippy::too_many_arguments)]
    fn alltoallv<T: CommScalar>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) -> Result<()>;

    /// Gather one `usize` from every rank onto every rank
    fn allgather_usize(&self, value: usize, recv: &mut [usize]) -> Result<()>;

    /// Sum one `usize` across all ranks, result on every rank
    fn allreduce_sum_usize(&self, value: usize) -> Result<usize>;
}
