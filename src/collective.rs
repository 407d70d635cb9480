// Variant Forest
// Copyright (C) 2023 Krzysztof Piwoński <piwonski.kris@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The collective-communication primitive and a concrete,
//! in-process transport realizing "a group of cooperating worker processes"
//! as OS threads.
//!
//! Grounded on `random_forest.rs`'s `thread::scope` + `mpsc::channel`
//! worker-pool pattern, repurposed here from "one thread per tree" to "one
//! thread per rank", synchronized at each collective call by a reusable
//! [`std::sync::Barrier`] instead of a work-stealing channel.

use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TrainError};

/// A reliable collective-communication primitive.
///
/// Implementations must guarantee that `broadcast` delivers root's value
/// bytewise-identically to every rank, and that `gather` delivers, at root,
/// the values from every rank in rank order. Non-root callers of `gather`
/// get an empty vector back; only root needs the full list.
pub trait Collective {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn broadcast<T>(&self, value: T, root: usize) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone;

    fn gather<T>(&self, value: T, root: usize) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone;
}

struct SharedState {
    barrier: Barrier,
    slots: Mutex<Vec<Option<Vec<u8>>>>,
}

/// A [`Collective`] realized over OS threads within a single process, one
/// thread per rank, synchronized by a shared reusable barrier. Payloads cross
/// the "wire" via `bincode`, exactly as they would across real processes;
/// this transport exercises the serialization contract, not just the
/// in-memory types.
pub struct ThreadCollective {
    shared: Arc<SharedState>,
    rank: usize,
    size: usize,
}

impl Collective for ThreadCollective {
    #[inline]
    fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }

    fn broadcast<T>(&self, value: T, root: usize) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        if self.rank == root {
            let bytes = bincode::serialize(&value).map_err(|e| TrainError::Collective {
                rank: self.rank,
                reason: e.to_string(),
            })?;
            self.shared.slots.lock().unwrap()[root] = Some(bytes);
        }
        self.shared.barrier.wait();

        let bytes = self.shared.slots.lock().unwrap()[root].clone().ok_or_else(|| TrainError::Collective {
            rank: self.rank,
            reason: "broadcast root produced no payload".to_string(),
        })?;
        let result = if self.rank == root {
            value
        } else {
            bincode::deserialize(&bytes).map_err(|e| TrainError::Collective {
                rank: self.rank,
                reason: e.to_string(),
            })?
        };

        self.shared.barrier.wait();
        Ok(result)
    }

    fn gather<T>(&self, value: T, root: usize) -> Result<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let bytes = bincode::serialize(&value).map_err(|e| TrainError::Collective {
            rank: self.rank,
            reason: e.to_string(),
        })?;
        self.shared.slots.lock().unwrap()[self.rank] = Some(bytes);
        self.shared.barrier.wait();

        let result = if self.rank == root {
            let slots = self.shared.slots.lock().unwrap();
            let mut gathered = Vec::with_capacity(self.size);
            for slot in slots.iter() {
                let bytes = slot.as_ref().ok_or_else(|| TrainError::Collective {
                    rank: self.rank,
                    reason: "gather: a rank produced no payload".to_string(),
                })?;
                gathered.push(bincode::deserialize(bytes).map_err(|e| TrainError::Collective {
                    rank: self.rank,
                    reason: e.to_string(),
                })?);
            }
            gathered
        } else {
            Vec::new()
        };

        self.shared.barrier.wait();
        Ok(result)
    }
}

/// Spawns `size` worker threads, each running `body` with its own
/// [`ThreadCollective`] handle, and returns the per-rank results in rank
/// order once every thread has finished.
///
/// This is the crate's stand-in for launching a group of cooperating worker
/// processes: each closure invocation plays the role of one worker's
/// main loop.
pub fn run_worker_group<T, F>(size: usize, body: F) -> Vec<T>
where
    T: Send,
    F: Fn(ThreadCollective) -> T + Sync,
{
    assert!(size >= 1, "worker group size must be at least 1");
    let shared = Arc::new(SharedState { barrier: Barrier::new(size), slots: Mutex::new(vec![None; size]) });

    thread::scope(|scope| {
        let handles: Vec<_> = (0..size)
            .map(|rank| {
                let shared = Arc::clone(&shared);
                let body = &body;
                scope.spawn(move || body(ThreadCollective { shared, rank, size }))
            })
            .collect();

        handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
    })
}
