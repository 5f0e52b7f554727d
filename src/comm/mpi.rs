//! MPI communication backend over the `mpi` crate (rsmpi)
//!
//! Available behind the `mpi-comm` cargo feature so the default build has no
//! MPI library requirement. Typed buffers cross the wire as plain-old-data
//! bytes; counts use MPI's native `i32`, so a single message is limited to
//! `i32::MAX` bytes per peer, which the row-block partition keeps far away
//! from in practice.
//!
//! rsmpi installs the standard `MPI_ERRORS_ARE_FATAL` handler, so a failing
//! collective aborts the run inside the MPI library; `Error::Transport` here
//! covers the consistency checks this wrapper performs itself.

use bytemuck::Zeroable;
use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;
use mpi::Count;

use crate::comm::{CommScalar, Communicator};
use crate::error::{Error, Result};

/// Communicator over `MPI_COMM_WORLD`.
pub struct MpiComm {
    _universe: Universe,
    world: SimpleCommunicator,
}

impl MpiComm {
    /// Initialise MPI and wrap the world communicator.
    ///
    /// The MPI environment is finalised when the returned value is dropped,
    /// so exactly one `MpiComm` should exist per process.
    pub fn initialize() -> Result<Self> {
        let universe = mpi::initialize()
            .ok_or_else(|| Error::transport("MPI is unavailable or already initialised"))?;
        let world = universe.world();
        Ok(MpiComm {
            _universe: universe,
            world,
        })
    }
}

fn byte_counts<T>(counts: &[usize]) -> Result<Vec<Count>> {
    let width = std::mem::size_of::<T>();
    counts
        .iter()
        .map(|&c| {
            Count::try_from(c * width)
                .map_err(|_| Error::transport("per-peer message exceeds the MPI count range"))
        })
        .collect()
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn barrier(&self) -> Result<()> {
        self.world.barrier();
        Ok(())
    }

    fn broadcast<T: CommScalar>(&self, buf: &mut [T], root: usize) -> Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buf);
        self.world.process_at_rank(root as Count).broadcast_into(bytes);
        Ok(())
    }

    fn send<T: CommScalar>(&self, buf: &[T], dest: usize, tag: i32) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(buf);
        self.world
            .process_at_rank(dest as Count)
            .send_with_tag(bytes, tag);
        Ok(())
    }

    fn recv<T: CommScalar>(&self, buf: &mut [T], source: usize, tag: i32) -> Result<()> {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(buf);
        let status = self
            .world
            .process_at_rank(source as Count)
            .receive_into_with_tag(bytes, tag);
        let got = status.count(u8::equivalent_datatype()) as usize;
        if got != std::mem::size_of_val(buf) {
            return Err(Error::transport(format!(
                "message of {got} bytes does not fit a buffer of {} bytes",
                std::mem::size_of_val(buf)
            )));
        }
        Ok(())
    }

    fn recv_any<T: CommScalar>(&self, tag: i32) -> Result<(usize, Vec<T>)> {
        let (bytes, status): (Vec<u8>, _) =
            self.world.any_process().receive_vec_with_tag(tag);
        let width = std::mem::size_of::<T>();
        if bytes.len() % width != 0 {
            return Err(Error::transport("message length is not a whole element count"));
        }
        let mut out = vec![T::zeroed(); bytes.len() / width];
        bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(&bytes);
        Ok((status.source_rank() as usize, out))
    }

    fn scatterv<T: CommScalar>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [T],
        root: usize,
    ) -> Result<()> {
        let root_process = self.world.process_at_rank(root as Count);
        let recv_bytes: &mut [u8] = bytemuck::cast_slice_mut(recv);
        if self.rank() == root {
            let send_bytes: &[u8] = bytemuck::cast_slice(send);
            let counts = byte_counts::<T>(counts)?;
            let displs = byte_counts::<T>(displs)?;
            let partition = Partition::new(send_bytes, &counts[..], &displs[..]);
            root_process.scatter_varcount_into_root(&partition, recv_bytes);
        } else {
            root_process.scatter_varcount_into(recv_bytes);
        }
        Ok(())
    }

    fn gatherv<T: CommScalar>(
        &self,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<()> {
        let root_process = self.world.process_at_rank(root as Count);
        let send_bytes: &[u8] = bytemuck::cast_slice(send);
        if self.rank() == root {
            let recv_bytes: &mut [u8] = bytemuck::cast_slice_mut(recv);
            let counts = byte_counts::<T>(counts)?;
            let displs = byte_counts::<T>(displs)?;
            let mut partition = PartitionMut::new(recv_bytes, &counts[..], &displs[..]);
            root_process.gather_varcount_into_root(send_bytes, &mut partition);
        } else {
            root_process.gather_varcount_into(send_bytes);
        }
        Ok(())
    }

    fn alltoall_usize(&self, send: &[usize], recv: &mut [usize]) -> Result<()> {
        let send: Vec<u64> = send.iter().map(|&v| v as u64).collect();
        let mut out = vec![0u64; recv.len()];
        self.world.all_to_all_into(&send[..], &mut out[..]);
        for (slot, v) in recv.iter_mut().zip(out) {
            *slot = v as usize;
        }
        Ok(())
    }

    fn alltoallv<T: CommScalar>(
        &self,
        send: &[T],
        send_counts: &[usize],
        send_displs: &[usize],
        recv: &mut [T],
        recv_counts: &[usize],
        recv_displs: &[usize],
    ) -> Result<()> {
        let send_bytes: &[u8] = bytemuck::cast_slice(send);
        let recv_bytes: &mut [u8] = bytemuck::cast_slice_mut(recv);
        let scounts = byte_counts::<T>(send_counts)?;
        let sdispls = byte_counts::<T>(send_displs)?;
        let rcounts = byte_counts::<T>(recv_counts)?;
        let rdispls = byte_counts::<T>(recv_displs)?;
        let outbound = Partition::new(send_bytes, &scounts[..], &sdispls[..]);
        let mut inbound = PartitionMut::new(recv_bytes, &rcounts[..], &rdispls[..]);
        self.world.all_to_all_varcount_into(&outbound, &mut inbound);
        Ok(())
    }

    fn allgather_usize(&self, value: usize, recv: &mut [usize]) -> Result<()> {
        let mut out = vec![0u64; recv.len()];
        self.world.all_gather_into(&(value as u64), &mut out[..]);
        for (slot, v) in recv.iter_mut().zip(out) {
            *slot = v as usize;
        }
        Ok(())
    }

    fn allreduce_sum_usize(&self, value: usize) -> Result<usize> {
        let mut total = 0u64;
        self.world
            .all_reduce_into(&(value as u64), &mut total, SystemOperation::sum());
        Ok(total as usize)
    }
}
