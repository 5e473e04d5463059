//! Collective communication between cooperating workers
//!
//! Weight loading is the only operation that talks to other workers. It needs
//! two blocking collectives: an integer broadcast for the error flag and a
//! broadcast of floating-point arrays for the parameters.
//!
//! [`SingleProcess`] serves runs without a distributed group. [`ThreadComm`]
//! runs a group of workers as threads of one process.

use std::sync::{Arc, Barrier, Mutex, PoisonError};

use crate::real::Real;

/// Rank of the worker that reads shared input streams.
pub const COORDINATOR_RANK: usize = 0;

/// Group of workers taking part in collective operations.
pub trait Communicator {
    /// Rank of this worker within the group.
    fn rank(&self) -> usize;

    /// Number of workers in the group.
    fn size(&self) -> usize;

    /// Blocking broadcast of an integer flag from `root` to every worker.
    fn broadcast_flag(&self, flag: &mut i32, root: usize);

    /// Blocking broadcast of `data` from `root` to every worker.
    ///
    /// All workers pass slices of the same length.
    fn broadcast_reals<T: Real>(&self, data: &mut [T], root: usize);

    /// Whether this worker is [`COORDINATOR_RANK`].
    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }
}

/// A group of one worker. Broadcasts leave their arguments unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn broadcast_flag(&self, _flag: &mut i32, _root: usize) {}

    fn broadcast_reals<T: Real>(&self, _data: &mut [T], _root: usize) {}
}

#[derive(Debug)]
struct Shared {
    barrier: Barrier,
    flag: Mutex<i32>,
    payload: Mutex<Vec<f64>>,
}

/// One worker of an in-process group.
///
/// Every worker of the group must take part in each collective call, in the
/// same order, from its own thread.
#[derive(Debug, Clone)]
pub struct ThreadComm {
    rank: usize,
    size: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// Create the `size` endpoints of a new group, indexed by rank.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            barrier: Barrier::new(size),
            flag: Mutex::new(0),
            payload: Mutex::new(Vec::new()),
        });

        (0..size)
            .map(|rank| ThreadComm {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_flag(&self, flag: &mut i32, root: usize) {
        if self.rank == root {
            *self.shared.flag.lock().unwrap_or_else(PoisonError::into_inner) = *flag;
        }
        self.shared.barrier.wait();

        if self.rank != root {
            *flag = *self.shared.flag.lock().unwrap_or_else(PoisonError::into_inner);
        }
        // Nobody may overwrite the slot before every worker has read it.
        self.shared.barrier.wait();
    }

    fn broadcast_reals<T: Real>(&self, data: &mut [T], root: usize) {
        if self.rank == root {
            let mut payload = self
                .shared
                .payload
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            payload.clear();
            payload.extend(data.iter().map(|value| value.to_f64()));
        }
        self.shared.barrier.wait();

        if self.rank != root {
            let payload = self
                .shared
                .payload
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for (value, &sent) in data.iter_mut().zip(payload.iter()) {
                *value = T::from_f64(sent);
            }
        }
        self.shared.barrier.wait();
    }
}
