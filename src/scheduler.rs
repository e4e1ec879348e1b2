//! Per-job timelines that drive the lifecycle over time.
//!
//! Every registered job gets one lightweight task:
//!
//! ```text
//!   sleep(start_delay) ──→ Queued → Running
//!   loop {
//!       sleep(tick_interval)
//!       re-validate under the store lock ──→ gone / not Running: stop
//!       progress += U(0, max_increment), clamped to 100
//!       progress == 100 ──→ generate results ──→ Completed (or Failed): stop
//!   }
//! ```
//!
//! The re-validation is what keeps cancellation safe: a tick that fires
//! after a delete or cancel finds the job missing or terminal and ends the
//! timeline without writing anything. [`LifecycleScheduler::cancel`] also
//! aborts the task so it does not linger until its next wake.
//!
//! The scheduler holds the store weakly and addresses jobs only by id.
//! Nothing here returns an error to a caller; problems are logged and end
//! the affected job's timeline.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::LifecycleConfig;
use crate::error::{JobError, JobResult};
use crate::generator::GeneratorRegistry;
use crate::job::{Job, JobId, JobStatus};
use crate::store::JobStore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Result of one progress tick.
#[derive(Debug, Clone, PartialEq)]
enum TickOutcome {
    Progressed(f64),
    Completed,
    Failed(String),
    /// Job left `Running` before this tick.
    Stopped(JobStatus),
}

struct Shared {
    store: Weak<JobStore>,
    clock: Arc<dyn Clock>,
    generators: Arc<GeneratorRegistry>,
    start_delay: Duration,
    tick_interval: Duration,
    max_increment: f64,
    rng: Mutex<StdRng>,
    timelines: Mutex<FxHashMap<JobId, JoinHandle<()>>>,
}

/// Drives queued jobs to a terminal state.
pub struct LifecycleScheduler {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl LifecycleScheduler {
    /// Create a scheduler that spawns timelines on the current Tokio runtime.
    ///
    /// Fails with [`JobError::Configuration`] if `config` is invalid or if
    /// called outside a runtime.
    pub fn new(
        store: &Arc<JobStore>,
        clock: Arc<dyn Clock>,
        generators: Arc<GeneratorRegistry>,
        config: &LifecycleConfig,
    ) -> JobResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| JobError::Configuration(format!("no Tokio runtime available: {e}")))?;
        let rng = config
            .rng_seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        Ok(Self {
            shared: Arc::new(Shared {
                store: Arc::downgrade(store),
                clock,
                generators,
                start_delay: config.start_delay,
                tick_interval: config.tick_interval,
                max_increment: config.max_progress_increment,
                rng: Mutex::new(rng),
                timelines: Mutex::new(FxHashMap::default()),
            }),
            runtime,
        })
    }

    /// Start the timeline of a freshly queued job.
    pub fn register(&self, id: JobId) {
        // Held across the spawn so the task cannot deregister before it is
        // recorded.
        let mut timelines = lock(&self.shared.timelines);
        let shared = Arc::clone(&self.shared);
        let task_id = id.clone();
        let handle = self.runtime.spawn(async move {
            shared.run_timeline(&task_id).await;
            lock(&shared.timelines).remove(&task_id);
        });
        if let Some(previous) = timelines.insert(id, handle) {
            previous.abort();
        }
    }

    /// Tear down a job's timeline. Returns `false` if none was live.
    pub fn cancel(&self, id: &JobId) -> bool {
        let handle = lock(&self.shared.timelines).remove(id);
        match handle {
            Some(handle) => {
                handle.abort();
                debug!(job_id = %id, "timeline cancelled");
                true
            }
            None => false,
        }
    }

    /// Number of timelines that have not finished yet.
    pub fn active_timelines(&self) -> usize {
        lock(&self.shared.timelines).len()
    }
}

impl Drop for LifecycleScheduler {
    fn drop(&mut self) {
        for (_, handle) in lock(&self.shared.timelines).drain() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for LifecycleScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleScheduler")
            .field("start_delay", &self.shared.start_delay)
            .field("tick_interval", &self.shared.tick_interval)
            .field("active_timelines", &self.active_timelines())
            .finish()
    }
}

impl Shared {
    async fn run_timeline(&self, id: &JobId) {
        self.clock.sleep(self.start_delay).await;
        if !self.start(id) {
            return;
        }

        loop {
            self.clock.sleep(self.tick_interval).await;
            let Some(store) = self.store.upgrade() else {
                debug!(job_id = %id, "store dropped, timeline stopped");
                return;
            };

            let increment = self.next_increment();
            let outcome = store.update(id, |job| self.tick(job, increment));
            drop(store);

            match outcome {
                Some(TickOutcome::Progressed(progress)) => {
                    debug!(job_id = %id, progress, "progress tick");
                }
                Some(TickOutcome::Completed) => {
                    info!(job_id = %id, "job completed");
                    return;
                }
                Some(TickOutcome::Failed(reason)) => {
                    warn!(job_id = %id, %reason, "job failed during execution");
                    return;
                }
                Some(TickOutcome::Stopped(status)) => {
                    debug!(job_id = %id, %status, "job no longer running, timeline stopped");
                    return;
                }
                None => {
                    debug!(job_id = %id, "job removed, timeline stopped");
                    return;
                }
            }
        }
    }

    /// Queued → Running. Returns whether the timeline should continue.
    fn start(&self, id: &JobId) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        let now = self.clock.now();
        match store.update(id, |job| job.start(now).map(|()| job.toolkit.clone())) {
            Some(Ok(toolkit)) => {
                info!(job_id = %id, %toolkit, "job started");
                true
            }
            Some(Err(err)) => {
                warn!(job_id = %id, error = %err, "job could not start, timeline stopped");
                false
            }
            None => {
                debug!(job_id = %id, "job removed before start");
                false
            }
        }
    }

    /// One tick against a job, run under the store lock.
    fn tick(&self, job: &mut Job, increment: f64) -> TickOutcome {
        if job.status != JobStatus::Running {
            return TickOutcome::Stopped(job.status);
        }
        let now = self.clock.now();
        match self.advance(job, increment, now) {
            Ok(outcome) => outcome,
            Err(err) => {
                let reason = err.to_string();
                match job.fail(reason.as_str(), now) {
                    Ok(()) => TickOutcome::Failed(reason),
                    Err(_) => TickOutcome::Stopped(job.status),
                }
            }
        }
    }

    fn advance(
        &self,
        job: &mut Job,
        increment: f64,
        now: DateTime<Utc>,
    ) -> JobResult<TickOutcome> {
        let progress = job.advance(increment)?;
        if !job.is_progress_complete() {
            return Ok(TickOutcome::Progressed(progress));
        }

        let results = {
            let mut rng = lock(&self.rng);
            self.generators.generate(job, &mut *rng)?
        };
        job.complete(results, now)?;
        Ok(TickOutcome::Completed)
    }

    fn next_increment(&self) -> f64 {
        lock(&self.rng).gen_range(0.0..=self.max_increment)
    }
}
