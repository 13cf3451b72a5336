//! Job store abstraction and its in-process implementation.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::jobs::model::{Job, JobUpdate};

/// Registry of job lifecycle state.
///
/// The orchestrator only talks to jobs through this trait, so a durable
/// implementation can replace [`InMemoryJobStore`] without touching it.
pub trait JobStore: Send + Sync {
    /// Inserts a fresh queued job.
    fn create(&self, id: &str) -> Job;

    /// Returns the job, or `None` if it is unknown or already evicted.
    fn get(&self, id: &str) -> Option<Job>;

    /// Merges `update` into the job.
    ///
    /// Returns `None` for an unknown id. Updates to a terminal job are
    /// ignored and the frozen job is returned.
    fn update(&self, id: &str, update: JobUpdate) -> Option<Job>;

    /// Removes the job, returning whether anything was removed.
    fn delete(&self, id: &str) -> bool;

    /// Removes terminal jobs whose completion is older than the retention
    /// window at `now`. Returns the number of evicted jobs.
    fn sweep_expired(&self, now: DateTime<Utc>) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `RwLock<HashMap>` backed job store.
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<String, Job>>,
    retention: TimeDelta,
}

impl InMemoryJobStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention: TimeDelta::from_std(retention).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn retention(&self) -> TimeDelta {
        self.retention
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, id: &str) -> Job {
        let job = Job::new(id, Utc::now());
        if self.write().insert(id.to_string(), job.clone()).is_some() {
            log::warn!("Job {} already existed and was replaced", id);
        }
        job
    }

    fn get(&self, id: &str) -> Option<Job> {
        self.read().get(id).cloned()
    }

    fn update(&self, id: &str, update: JobUpdate) -> Option<Job> {
        let mut jobs = self.write();
        let Some(job) = jobs.get_mut(id) else {
            log::warn!("Dropping update for unknown or evicted job {}", id);
            return None;
        };

        if !job.apply(update, Utc::now()) {
            log::debug!(
                "Ignoring update for job {} in terminal state {}",
                id,
                job.status.as_str()
            );
        }

        Some(job.clone())
    }

    fn delete(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        let retention = self.retention;

        jobs.retain(|_, job| match job.completed_at {
            Some(completed_at) => now.signed_duration_since(completed_at) <= retention,
            None => true,
        });

        let evicted = before - jobs.len();
        if evicted > 0 {
            log::info!("Evicted {} expired job(s), {} remaining", evicted, jobs.len());
        }
        evicted
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
