//! The job service: registry, scheduler and clock wired together.
//!
//! [`JobService`] is the entry point for callers. A submission is validated,
//! inserted into the [`JobStore`], and handed to the [`LifecycleScheduler`]
//! before it is returned. Reads (`get`, `list`, `stats`) work on
//! snapshots taken under the store lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::DeleteOutcome;
use crate::clock::{self, Clock, TokioClock};
use crate::config::LifecycleConfig;
use crate::error::{JobError, JobResult};
use crate::generator::GeneratorRegistry;
use crate::job::{Job, JobId, SubmitRequest};
use crate::query::{JobPage, ListQuery};
use crate::scheduler::LifecycleScheduler;
use crate::stats::{FleetStats, HealthReport, StatsReport};
use crate::store::{JobStore, Removal};

/// In-memory job lifecycle service.
pub struct JobService {
    store: Arc<JobStore>,
    scheduler: LifecycleScheduler,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
    started_at: DateTime<Utc>,
}

impl JobService {
    /// Create a service on the Tokio clock with the built-in generators.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: LifecycleConfig) -> JobResult<Self> {
        Self::with_components(
            config,
            Arc::new(TokioClock::new()),
            GeneratorRegistry::with_defaults(),
        )
    }

    /// Create a service with an explicit clock and generator registry.
    pub fn with_components(
        config: LifecycleConfig,
        clock: Arc<dyn Clock>,
        generators: GeneratorRegistry,
    ) -> JobResult<Self> {
        let store = Arc::new(JobStore::new());
        let scheduler = LifecycleScheduler::new(
            &store,
            Arc::clone(&clock),
            Arc::new(generators),
            &config,
        )?;
        let started_at = clock.now();

        Ok(Self {
            store,
            scheduler,
            clock,
            config,
            started_at,
        })
    }

    /// Validate and queue a new job, then start its timeline.
    pub fn submit(&self, request: SubmitRequest) -> JobResult<Job> {
        let submission = request.validate()?;
        let now = self.clock.now();
        let estimated_completion = clock::offset(now, self.config.completion_horizon);

        let job = self.store.insert_queued(|queue_position| {
            Job::new(
                JobId::generate(),
                submission,
                now,
                queue_position,
                estimated_completion,
            )
        })?;
        self.scheduler.register(job.id.clone());

        info!(
            job_id = %job.id,
            toolkit = %job.toolkit,
            queue_position = job.queue_position,
            "job submitted"
        );
        Ok(job)
    }

    /// Snapshot of one job.
    pub fn get(&self, id: &JobId) -> JobResult<Job> {
        self.store.get(id)
    }

    /// Filtered page of jobs in creation order.
    pub fn list(&self, query: &ListQuery) -> JobPage {
        query.apply(self.store.list(), self.config.default_list_limit)
    }

    /// Cancel a running job, or remove any other job.
    pub fn delete(&self, id: &JobId) -> JobResult<DeleteOutcome> {
        let removal = self.store.remove_or_cancel(id, self.clock.now())?;
        self.scheduler.cancel(id);

        Ok(match removal {
            Removal::Cancelled(job) => {
                info!(job_id = %id, progress = job.progress, "job cancelled");
                DeleteOutcome::Cancelled { job }
            }
            Removal::Removed(job) => {
                info!(job_id = %id, status = %job.status, "job deleted");
                DeleteOutcome::Deleted
            }
        })
    }

    /// Fail a running job with `reason` and stop its timeline.
    pub fn mark_failed(&self, id: &JobId, reason: impl Into<String>) -> JobResult<Job> {
        let reason = reason.into();
        let now = self.clock.now();
        let job = self
            .store
            .update(id, |job| job.fail(reason.as_str(), now).map(|()| job.clone()))
            .ok_or_else(|| JobError::NotFound(id.clone()))??;
        self.scheduler.cancel(id);

        info!(job_id = %id, %reason, "job marked failed");
        Ok(job)
    }

    /// Aggregate statistics, stamped with the current time.
    pub fn stats(&self) -> StatsReport {
        let jobs = self.store.list();
        StatsReport {
            stats: FleetStats::compute(&jobs, self.uptime()),
            timestamp: self.clock.now(),
        }
    }

    /// Liveness report.
    pub fn health(&self) -> HealthReport {
        HealthReport::healthy(self.clock.now())
    }

    /// Time since the service was created.
    pub fn uptime(&self) -> Duration {
        (self.clock.now() - self.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// The scheduler driving this service's jobs.
    pub fn scheduler(&self) -> &LifecycleScheduler {
        &self.scheduler
    }

    /// The configuration this service runs with.
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }
}

impl std::fmt::Debug for JobService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobService")
            .field("jobs", &self.store.len())
            .field("scheduler", &self.scheduler)
            .field("config", &self.config)
            .field("started_at", &self.started_at)
            .finish()
    }
}
