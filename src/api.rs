//! The boundary a transport layer codes against.
//!
//! # Method table
//!
//! | Method | Kind | Required | Returns |
//! |--------|------|----------|---------|
//! | `submit()` | async | yes | `JobResult<Job>` |
//! | `get()` | async | yes | `JobResult<Job>` |
//! | `list()` | async | yes | `JobResult<JobPage>` |
//! | `delete()` | async | yes | `JobResult<DeleteOutcome>` |
//! | `stats()` | async | yes | `JobResult<StatsReport>` |
//! | `health()` | async | yes | `JobResult<HealthReport>` |
//! | `mark_failed()` | async | yes | `JobResult<Job>` |
//! | `wait()` | async | provided | `JobResult<Job>` |
//!
//! Every return type serializes to the JSON body a transport sends back.
//! [`JobError::is_client_error`] separates 4xx-style failures from the rest.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobId, SubmitRequest};
use crate::query::{JobPage, ListQuery};
use crate::service::JobService;
use crate::stats::{HealthReport, StatsReport};

/// Async job API.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Queue a new job. The job MUST come back `Queued`.
    async fn submit(&self, request: SubmitRequest) -> JobResult<Job>;

    /// Fetch one job.
    async fn get(&self, id: &JobId) -> JobResult<Job>;

    /// List jobs matching `query`.
    async fn list(&self, query: &ListQuery) -> JobResult<JobPage>;

    /// Cancel a running job, or delete any other job.
    async fn delete(&self, id: &JobId) -> JobResult<DeleteOutcome>;

    /// Fleet statistics.
    async fn stats(&self) -> JobResult<StatsReport>;

    /// Liveness.
    async fn health(&self) -> JobResult<HealthReport>;

    /// Fail a running job with `reason`.
    async fn mark_failed(&self, id: &JobId, reason: &str) -> JobResult<Job>;

    /// Wait for a job to reach a terminal state and return it.
    ///
    /// Default implementation polls every 500ms for up to 5 minutes.
    /// It sleeps on the Tokio timer, not on the service's
    /// [`Clock`](crate::clock::Clock): a custom clock that does not follow
    /// Tokio time will not pace these polls.
    async fn wait(&self, id: &JobId) -> JobResult<Job> {
        let poll_interval = Duration::from_millis(500);
        let max_polls = 600; // 5 minutes max

        for _ in 0..max_polls {
            let job = self.get(id).await?;
            if !job.status.is_pending() {
                return Ok(job);
            }
            tokio::time::sleep(poll_interval).await;
        }

        Err(JobError::Timeout(id.clone()))
    }
}

/// Response to a delete.
///
/// Serializes as `{"message":"cancelled","job":{..}}` or
/// `{"message":"deleted"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "lowercase")]
pub enum DeleteOutcome {
    /// The job was running and is now cancelled.
    Cancelled { job: Job },
    /// The job was removed from the registry.
    Deleted,
}

#[async_trait]
impl JobApi for JobService {
    async fn submit(&self, request: SubmitRequest) -> JobResult<Job> {
        JobService::submit(self, request)
    }

    async fn get(&self, id: &JobId) -> JobResult<Job> {
        JobService::get(self, id)
    }

    async fn list(&self, query: &ListQuery) -> JobResult<JobPage> {
        Ok(JobService::list(self, query))
    }

    async fn delete(&self, id: &JobId) -> JobResult<DeleteOutcome> {
        JobService::delete(self, id)
    }

    async fn stats(&self) -> JobResult<StatsReport> {
        Ok(JobService::stats(self))
    }

    async fn health(&self) -> JobResult<HealthReport> {
        Ok(JobService::health(self))
    }

    async fn mark_failed(&self, id: &JobId, reason: &str) -> JobResult<Job> {
        JobService::mark_failed(self, id, reason)
    }
}
