//! Single-process communication backend
//!
//! The `P = 1` degenerate case: collectives reduce to local copies and no
//! peer exists for point-to-point transfers. The distributed kernels run
//! unchanged on this backend, which is how serial callers (and doc tests)
//! use the crate.

use crate::comm::{CommScalar, Communicator};
use crate::error::{Error, Result};

/// Communicator for a group of exactly one process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleComm;

impl SingleComm {
    fn check_root(&self, root: usize) -> Result<()> {
        if root != 0 {
            return Err(Error::transport(format!(
                "root rank {root} does not exist in a single-process group"
            )));
        }
        Ok(())
    }
}

impl Communicator for SingleComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn broadcast<T: CommScalar>(&self, _buf: &mut [T], root: usize) -> Result<()> {
        self.check_root(root)
    }

    fn send<T: CommScalar>(&self, _buf: &[T], _dest: usize, _tag: i32) -> Result<()> {
        Err(Error::transport(
            "point-to-point send within a single-process group",
        ))
    }

    fn recv<T: CommScalar>(&self, _buf: &mut [T], _source: usize, _tag: i32) -> Result<()> {
        Err(Error::transport(
            "point-to-point receive within a single-process group",
        ))
    }

    fn recv_any<T: CommScalar>(&self, _tag: i32) -> Result<(usize, Vec<T>)> {
        Err(Error::transport(
            "point-to-point receive within a single-process group",
        ))
    }

    fn scatterv<T: CommScalar>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [T],
        root: usize,
    ) -> Result<()> {
        self.check_root(root)?;
        let (count, displ) = (counts[0], displs[0]);
        if recv.len() != count {
            return Err(Error::transport("scatterv receive length mismatch"));
        }
        recv.copy_from_slice(&send[displ..displ + count]);
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
        self.check_root(root)?;
        let (count, displ) = (counts[0], displs[0]);
        if send.len() != count {
            return Err(Error::transport("gatherv send length mismatch"));
        }
        recv[displ..displ + count].copy_from_slice(send);
        Ok(())
    }

    fn alltoall_usize(&self, send: &[usize], recv: &mut [usize]) -> Result<()> {
        recv[0] = send[0];
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
        if send_counts[0] != recv_counts[0] {
            return Err(Error::transport("alltoallv count mismatch"));
        }
        let n = send_counts[0];
        recv[recv_displs[0]..recv_displs[0] + n]
            .copy_from_slice(&send[send_displs[0]..send_displs[0] + n]);
        Ok(())
    }

    fn allgather_usize(&self, value: usize, recv: &mut [usize]) -> Result<()> {
        recv[0] = value;
        Ok(())
    }

    fn allreduce_sum_usize(&self, value: usize) -> Result<usize> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scatterv_copies_the_single_block() {
        let comm = SingleComm;
        let send = vec![1.0f64, 2.0, 3.0];
        let mut recv = vec![0.0f64; 3];
        comm.scatterv(&send, &[3], &[0], &mut recv, 0).unwrap();
        assert_eq!(recv, send);
    }

    #[test]
    fn point_to_point_has_no_peers() {
        let comm = SingleComm;
        assert!(comm.send(&[0.0f64], 0, 0).is_err());
        assert!(comm.recv(&mut [0.0f64], 0, 0).is_err());
    }

    #[test]
    fn allreduce_is_identity() {
        let comm = SingleComm;
        assert_eq!(comm.allreduce_sum_usize(42).unwrap(), 42);
    }
}
