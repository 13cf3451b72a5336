//! Supervised execution of job tasks.
//!
//! Every job runs as a tokio task owned by a [`JoinSet`], so shutdown can
//! wait for in-flight jobs instead of dropping them.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::WorkerError;

type InFlight = Arc<Mutex<HashSet<String>>>;

pub struct JobSupervisor {
    tasks: Mutex<JoinSet<String>>,
    in_flight: InFlight,
    limit: Option<Arc<Semaphore>>,
    shutdown: AtomicBool,
}

/// Removes the job from the in-flight set when its task ends, panics included.
struct InFlightGuard {
    in_flight: InFlight,
    job_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.job_id);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!("Supervisor lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl JobSupervisor {
    /// `max_concurrent` caps how many jobs run at once; excess jobs wait
    /// (still queued) for a free slot. `None` means unbounded.
    pub fn new(max_concurrent: Option<usize>) -> Self {
        if let Some(limit) = max_concurrent {
            info!("Job supervisor limited to {} concurrent jobs", limit);
        }

        Self {
            tasks: Mutex::new(JoinSet::new()),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            limit: max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1)))),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Spawns `job` onto the current runtime under supervision.
    pub fn spawn<F>(&self, job_id: &str, job: F) -> Result<(), WorkerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // The flag is checked under the tasks lock so shutdown cannot take the
        // set between the check and the insert.
        let mut tasks = lock(&self.tasks);
        if self.is_shutdown() {
            return Err(WorkerError::ShuttingDown(job_id.to_string()));
        }

        lock(&self.in_flight).insert(job_id.to_string());
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            job_id: job_id.to_string(),
        };
        let limit = self.limit.clone();
        let id = job_id.to_string();

        reap_finished(&mut tasks);
        tasks.spawn(async move {
            let _guard = guard;
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            job.await;
            id
        });

        debug!("Spawned job {}", job_id);
        Ok(())
    }

    /// Ids of jobs whose tasks have not finished yet.
    pub fn in_flight(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.in_flight).iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Stops accepting jobs and waits up to `timeout` for running ones.
    /// Jobs still running after the timeout are aborted. Returns the number
    /// of jobs that were joined.
    pub async fn shutdown(&self, timeout: Duration) -> usize {
        let mut tasks = {
            let mut guard = lock(&self.tasks);
            self.shutdown.store(true, Ordering::Relaxed);
            std::mem::take(&mut *guard)
        };
        info!("Waiting for {} job task(s) to finish", tasks.len());

        let mut joined = 0;
        let drain = async {
            while let Some(result) = tasks.join_next().await {
                log_join(result);
                joined += 1;
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(
                "Shutdown timed out after {:?}, aborting {} job(s)",
                timeout,
                tasks.len()
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        info!("Job supervisor stopped");
        joined
    }

    /// Waits for every job spawned so far without shutting down.
    pub async fn wait_idle(&self) {
        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }
    }
}

impl Default for JobSupervisor {
    fn default() -> Self {
        Self::new(None)
    }
}

fn reap_finished(tasks: &mut JoinSet<String>) {
    while let Some(result) = tasks.try_join_next() {
        log_join(result);
    }
}

fn log_join(result: Result<String, tokio::task::JoinError>) {
    match result {
        Ok(job_id) => debug!("Job task {} finished", job_id),
        Err(e) if e.is_panic() => error!("Job task panicked: {}", e),
        Err(e) => debug!("Job task cancelled: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_shutdown_joins_in_flight_jobs() {
        let supervisor = JobSupervisor::new(None);
        let done = Arc::new(AtomicUsize::new(0));

        for i in 0..3 {
            let done = Arc::clone(&done);
            supervisor
                .spawn(&format!("job-{}", i), async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(supervisor.in_flight_count(), 3);

        let joined = supervisor.shutdown(Duration::from_secs(5)).await;
        assert_eq!(joined, 3);
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(supervisor.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_rejects_jobs_after_shutdown() {
        let supervisor = JobSupervisor::new(None);
        supervisor.shutdown(Duration::from_millis(10)).await;

        let result = supervisor.spawn("late", async {});
        assert!(matches!(result, Err(WorkerError::ShuttingDown(id)) if id == "late"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jobs_accepted_during_shutdown_are_joined() {
        let supervisor = Arc::new(JobSupervisor::new(None));
        let accepted = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicUsize::new(0));

        let spawners: Vec<_> = (0..4)
            .map(|n| {
                let supervisor = Arc::clone(&supervisor);
                let accepted = Arc::clone(&accepted);
                let done = Arc::clone(&done);
                tokio::spawn(async move {
                    for i in 0.. {
                        let done = Arc::clone(&done);
                        let job = async move {
                            tokio::task::yield_now().await;
                            done.fetch_add(1, Ordering::SeqCst);
                        };
                        if supervisor.spawn(&format!("job-{}-{}", n, i), job).is_err() {
                            break;
                        }
                        accepted.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        supervisor.shutdown(Duration::from_secs(10)).await;
        let done_at_shutdown = done.load(Ordering::SeqCst);

        for spawner in spawners {
            spawner.await.unwrap();
        }
        assert!(accepted.load(Ordering::SeqCst) > 0);
        assert_eq!(done_at_shutdown, accepted.load(Ordering::SeqCst));
        assert_eq!(supervisor.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_after_timeout() {
        let supervisor = JobSupervisor::new(None);
        supervisor
            .spawn("stuck", async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
            .unwrap();

        let joined = supervisor.shutdown(Duration::from_millis(20)).await;
        assert_eq!(joined, 0);
        assert_eq!(supervisor.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrency_limit() {
        let supervisor = JobSupervisor::new(Some(1));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for i in 0..4 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            supervisor
                .spawn(&format!("job-{}", i), async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        supervisor.wait_idle().await;
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_leaves_in_flight_set() {
        let supervisor = JobSupervisor::new(None);
        supervisor
            .spawn("boom", async {
                panic!("job exploded");
            })
            .unwrap();

        supervisor.wait_idle().await;
        assert!(supervisor.in_flight().is_empty());
    }
}
