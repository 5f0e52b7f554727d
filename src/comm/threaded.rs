//! In-process multi-rank communication backend
//!
//! `ThreadComm` connects N rank endpoints through byte channels, giving a
//! deterministic message-passing group inside one process. Collectives are
//! built from eager point-to-point sends plus rank-ordered receives, so the
//! ordering discipline is the same as on a real cluster: every rank must
//! enter each collective in identical program order.
//!
//! The integration tests drive every multi-rank scenario through this
//! backend under plain `cargo test`; it also serves as a single-node group
//! for callers without an MPI installation. Receives time out rather than
//! hang, so a rank that dies mid-collective surfaces as a transport error
//! on its peers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

use bytemuck::Zeroable;

use crate::comm::{CommScalar, Communicator};
use crate::error::{Error, Result};

/// How long a receive waits before reporting a lost peer
const RECV_TIMEOUT: Duration = Duration::from_secs(30);

// Internal tags for collective traffic. User tags stay below this range.
const COLL_BASE: i32 = 0x7100;
const COLL_BARRIER: i32 = COLL_BASE;
const COLL_BCAST: i32 = COLL_BASE + 1;
const COLL_SCATTERV: i32 = COLL_BASE + 2;
const COLL_GATHERV: i32 = COLL_BASE + 3;
const COLL_ALLTOALL: i32 = COLL_BASE + 4;
const COLL_ALLTOALLV: i32 = COLL_BASE + 5;
const COLL_ALLGATHER: i32 = COLL_BASE + 6;

struct Packet {
    src: usize,
    tag: i32,
    bytes: Vec<u8>,
}

/// One rank's endpoint in an in-process message-passing group.
///
/// Endpoints are created together by [`ThreadComm::cluster`] and each moved
/// onto its own thread; [`ThreadComm::spawn_cluster`] does both in one call.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    peers: Vec<Sender<Packet>>,
    inbox: Receiver<Packet>,
    stash: RefCell<VecDeque<Packet>>,
}

impl ThreadComm {
    /// Create the endpoints of a `size`-rank group.
    pub fn cluster(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a communicator needs at least one rank");
        let mut senders = Vec::with_capacity(size);
        let mut inboxes = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = channel();
            senders.push(tx);
            inboxes.push(rx);
        }
        inboxes
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| ThreadComm {
                rank,
                size,
                peers: senders.clone(),
                inbox,
                stash: RefCell::new(VecDeque::new()),
            })
            .collect()
    }

    /// Run `f` once per rank, each on its own thread, and join them all.
    ///
    /// A panic on any rank is re-raised on the caller after the remaining
    /// threads finish or time out.
    pub fn spawn_cluster<F>(size: usize, f: F)
    where
        F: Fn(ThreadComm) + Send + Sync,
    {
        let comms = ThreadComm::cluster(size);
        std::thread::scope(|scope| {
            let f = &f;
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| scope.spawn(move || f(comm)))
                .collect();
            let mut panic = None;
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic.get_or_insert(payload);
                }
            }
            if let Some(payload) = panic {
                std::panic::resume_unwind(payload);
            }
        });
    }

    fn send_bytes(&self, dest: usize, tag: i32, bytes: Vec<u8>) -> Result<()> {
        if dest >= self.size {
            return Err(Error::transport(format!(
                "destination rank {dest} outside group of size {}",
                self.size
            )));
        }
        self.peers[dest]
            .send(Packet {
                src: self.rank,
                tag,
                bytes,
            })
            .map_err(|_| Error::transport(format!("rank {dest} has left the group")))
    }

    /// Pull the earliest packet matching `src` (or any source) and `tag`,
    /// stashing non-matching arrivals for later calls.
    fn recv_match(&self, src: Option<usize>, tag: i32) -> Result<Packet> {
        let matches = |p: &Packet| p.tag == tag && src.map_or(true, |s| p.src == s);
        {
            let mut stash = self.stash.borrow_mut();
            if let Some(pos) = stash.iter().position(matches) {
                return Ok(stash.remove(pos).expect("position came from the stash"));
            }
        }
        loop {
            let packet = self
                .inbox
                .recv_timeout(RECV_TIMEOUT)
                .map_err(|_| Error::transport("timed out waiting for a peer message"))?;
            if matches(&packet) {
                return Ok(packet);
            }
            self.stash.borrow_mut().push_back(packet);
        }
    }

    fn recv_into<T: CommScalar>(&self, src: usize, tag: i32, out: &mut [T]) -> Result<()> {
        let packet = self.recv_match(Some(src), tag)?;
        write_bytes_into(&packet.bytes, out)
    }
}

fn as_bytes<T: CommScalar>(src: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(src).to_vec()
}

// The typed buffer is viewed as bytes (never the reverse), so the copy is
// free of alignment hazards regardless of how the Vec<u8> was allocated.
fn write_bytes_into<T: CommScalar>(bytes: &[u8], out: &mut [T]) -> Result<()> {
    let expected = std::mem::size_of_val(out);
    if bytes.len() != expected {
        return Err(Error::transport(format!(
            "message of {} bytes does not fit a buffer of {} bytes",
            bytes.len(),
            expected
        )));
    }
    bytemuck::cast_slice_mut::<T, u8>(out).copy_from_slice(bytes);
    Ok(())
}

fn bytes_to_vec<T: CommScalar>(bytes: &[u8]) -> Result<Vec<T>> {
    let width = std::mem::size_of::<T>();
    if bytes.len() % width != 0 {
        return Err(Error::transport("message length is not a whole element count"));
    }
    let mut out = vec![T::zeroed(); bytes.len() / width];
    write_bytes_into(bytes, &mut out)?;
    Ok(out)
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn barrier(&self) -> Result<()> {
        // Token fan-in to rank 0, then fan-out.
        if self.rank == 0 {
            for src in 1..self.size {
                self.recv_match(Some(src), COLL_BARRIER)?;
            }
            for dest in 1..self.size {
                self.send_bytes(dest, COLL_BARRIER, Vec::new())?;
            }
        } else {
            self.send_bytes(0, COLL_BARRIER, Vec::new())?;
            self.recv_match(Some(0), COLL_BARRIER)?;
        }
        Ok(())
    }

    fn broadcast<T: CommScalar>(&self, buf: &mut [T], root: usize) -> Result<()> {
        if self.rank == root {
            for dest in 0..self.size {
                if dest != root {
                    self.send_bytes(dest, COLL_BCAST, as_bytes(buf))?;
                }
            }
        } else {
            self.recv_into(root, COLL_BCAST, buf)?;
        }
        Ok(())
    }

    fn send<T: CommScalar>(&self, buf: &[T], dest: usize, tag: i32) -> Result<()> {
        self.send_bytes(dest, tag, as_bytes(buf))
    }

    fn recv<T: CommScalar>(&self, buf: &mut [T], source: usize, tag: i32) -> Result<()> {
        self.recv_into(source, tag, buf)
    }

    fn recv_any<T: CommScalar>(&self, tag: i32) -> Result<(usize, Vec<T>)> {
        let packet = self.recv_match(None, tag)?;
        Ok((packet.src, bytes_to_vec(&packet.bytes)?))
    }

    fn scatterv<T: CommScalar>(
        &self,
        send: &[T],
        counts: &[usize],
        displs: &[usize],
        recv: &mut [T],
        root: usize,
    ) -> Result<()> {
        if self.rank == root {
            for dest in 0..self.size {
                let block = &send[displs[dest]..displs[dest] + counts[dest]];
                if dest == root {
                    write_bytes_into(&as_bytes(block), recv)?;
                } else {
                    self.send_bytes(dest, COLL_SCATTERV, as_bytes(block))?;
                }
            }
            Ok(())
        } else {
            self.recv_into(root, COLL_SCATTERV, recv)
        }
    }

    fn gatherv<T: CommScalar>(
        &self,
        send: &[T],
        recv: &mut [T],
        counts: &[usize],
        displs: &[usize],
        root: usize,
    ) -> Result<()> {
        if self.rank == root {
            for src in 0..self.size {
                let block = &mut recv[displs[src]..displs[src] + counts[src]];
                if src == root {
                    write_bytes_into(&as_bytes(send), block)?;
                } else {
                    self.recv_into(src, COLL_GATHERV, block)?;
                }
            }
            Ok(())
        } else {
            self.send_bytes(root, COLL_GATHERV, as_bytes(send))
        }
    }

    fn alltoall_usize(&self, send: &[usize], recv: &mut [usize]) -> Result<()> {
        if send.len() != self.size || recv.len() != self.size {
            return Err(Error::transport("alltoall buffers must have one slot per rank"));
        }
        for dest in 0..self.size {
            if dest != self.rank {
                self.send_bytes(dest, COLL_ALLTOALL, as_bytes(&send[dest..dest + 1]))?;
            }
        }
        recv[self.rank] = send[self.rank];
        for src in 0..self.size {
            if src != self.rank {
                self.recv_into(src, COLL_ALLTOALL, &mut recv[src..src + 1])?;
            }
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
        for dest in 0..self.size {
            if dest != self.rank {
                let block = &send[send_displs[dest]..send_displs[dest] + send_counts[dest]];
                self.send_bytes(dest, COLL_ALLTOALLV, as_bytes(block))?;
            }
        }
        if send_counts[self.rank] != recv_counts[self.rank] {
            return Err(Error::transport("alltoallv self block count mismatch"));
        }
        let own = &send[send_displs[self.rank]..send_displs[self.rank] + send_counts[self.rank]];
        let own_bytes = as_bytes(own);
        write_bytes_into(
            &own_bytes,
            &mut recv[recv_displs[self.rank]..recv_displs[self.rank] + recv_counts[self.rank]],
        )?;
        for src in 0..self.size {
            if src != self.rank {
                let block = &mut recv[recv_displs[src]..recv_displs[src] + recv_counts[src]];
                self.recv_into(src, COLL_ALLTOALLV, block)?;
            }
        }
        Ok(())
    }

    fn allgather_usize(&self, value: usize, recv: &mut [usize]) -> Result<()> {
        if recv.len() != self.size {
            return Err(Error::transport("allgather buffer must have one slot per rank"));
        }
        for dest in 0..self.size {
            if dest != self.rank {
                self.send_bytes(dest, COLL_ALLGATHER, as_bytes(&[value]))?;
            }
        }
        recv[self.rank] = value;
        for src in 0..self.size {
            if src != self.rank {
                self.recv_into(src, COLL_ALLGATHER, &mut recv[src..src + 1])?;
            }
        }
        Ok(())
    }

    fn allreduce_sum_usize(&self, value: usize) -> Result<usize> {
        let mut all = vec![0usize; self.size];
        self.allgather_usize(value, &mut all)?;
        Ok(all.iter().sum())
    }
}
