//! Versioned work snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::work::{AuxBlock, PrimaryBlock, Work};

/// One generation of work.
///
/// The primary block and the aux block it commits to are always published
/// together, so a reader never pairs a template with another generation's
/// aux candidate.
#[derive(Debug)]
pub struct WorkSnapshot {
    pub generation: u64,
    pub job_id: String,
    pub primary: PrimaryBlock,
    pub aux: Option<AuxBlock>,
    pub work: Work,
}

/// The most recent snapshots, newest first.
///
/// Readers clone an `Arc` and drop the lock before doing any work.
#[derive(Debug)]
pub struct WorkCache {
    snapshots: RwLock<VecDeque<Arc<WorkSnapshot>>>,
    retained: usize,
}

impl WorkCache {
    /// Keep at most `retained` generations (at least one).
    pub fn new(retained: usize) -> Self {
        let retained = retained.max(1);
        Self {
            snapshots: RwLock::new(VecDeque::with_capacity(retained)),
            retained,
        }
    }

    pub fn current(&self) -> Option<Arc<WorkSnapshot>> {
        self.snapshots.read().front().cloned()
    }

    /// Find the snapshot that issued `job_id`.
    pub fn find(&self, job_id: &str) -> Option<Arc<WorkSnapshot>> {
        self.snapshots
            .read()
            .iter()
            .find(|snapshot| snapshot.job_id == job_id)
            .cloned()
    }

    /// Generation the next snapshot should carry.
    pub fn next_generation(&self) -> u64 {
        self.current().map_or(1, |snapshot| snapshot.generation + 1)
    }

    /// Publish a snapshot as current, evicting the oldest beyond the
    /// retention window.
    pub fn publish(&self, snapshot: WorkSnapshot) -> Arc<WorkSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut snapshots = self.snapshots.write();
        snapshots.push_front(snapshot.clone());
        snapshots.truncate(self.retained);
        snapshot
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}
