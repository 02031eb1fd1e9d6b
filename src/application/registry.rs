//! Table of running transcoders keyed by stream id.
//!
//! Mutated from request handlers (insert, bulk drain) and from exit
//! observers (remove), so every operation takes the lock exactly once.

use crate::domain::jobs::{StreamId, StreamJob, StreamStatus};
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StreamRegistry {
    jobs: Mutex<HashMap<StreamId, StreamJob>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and insert a job while holding the table lock.
    ///
    /// Whatever `make` spawns cannot observe the table until the job is in it,
    /// so an observer whose process dies instantly still finds its entry.
    /// An existing job under the same id is returned to the caller.
    pub fn insert_with<F>(&self, id: StreamId, make: F) -> Option<StreamJob>
    where
        F: FnOnce() -> StreamJob,
    {
        let mut jobs = self.jobs.lock();
        let job = make();
        debug_assert_eq!(job.id, id);
        jobs.insert(id, job)
    }

    pub fn remove(&self, id: &StreamId) -> Option<StreamJob> {
        self.jobs.lock().remove(id)
    }

    /// Take every job out, leaving the table empty.
    pub fn drain(&self) -> Vec<StreamJob> {
        self.jobs.lock().drain().map(|(_, job)| job).collect()
    }

    pub fn contains(&self, id: &StreamId) -> bool {
        self.jobs.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    pub fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.jobs.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Status of every job, oldest first.
    pub fn snapshot(&self) -> Vec<StreamStatus> {
        let mut statuses: Vec<StreamStatus> =
            self.jobs.lock().values().map(StreamStatus::from).collect();
        statuses.sort_by(|a, b| a.started_at.cmp(&b.started_at).then(a.id.cmp(&b.id)));
        statuses
    }
}
