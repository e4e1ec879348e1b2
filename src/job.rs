//! Job records and the lifecycle state machine.
//!
//! ```text
//!   submit() ──→ Queued ──→ Running ──→ Completed
//!                  │           │
//!                  │           ├──→ Failed(reason)
//!                  │           │
//!               (delete)       └──→ Cancelled
//! ```
//!
//! **Invariants:**
//! - A submitted job starts `Queued` with `progress == 0`.
//! - Transitions are monotonic; a job never moves backward.
//! - Terminal states (`Completed`, `Failed`, `Cancelled`) are permanent.
//! - `results` is present if and only if the status is `Completed`.
//! - `progress` never decreases and never exceeds 100.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, JobResult};

/// Default priority for submissions that don't specify one.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Upper bound of `progress`.
pub const MAX_PROGRESS: f64 = 100.0;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Create a job ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh, process-unique job ID.
    pub fn generate() -> Self {
        Self(format!("job-{}", Uuid::new_v4()))
    }

    /// Borrow the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is waiting for its start delay to elapse.
    Queued,
    /// Job is making progress.
    Running,
    /// Job finished and carries results.
    Completed,
    /// Job failed; the reason is recorded on the job.
    Failed,
    /// Job was cancelled while running.
    Cancelled,
}

impl JobStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ];

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Check if the job is still pending (queued or running).
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }

    /// Check if the job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (
                    JobStatus::Running,
                    JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
                )
        )
    }

    /// Lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| JobError::Validation(format!("unknown status: {s}")))
    }
}

/// A job submission as received from a caller.
///
/// `toolkit` and `config` are optional here so that missing fields surface
/// as a [`JobError::Validation`] naming them, not as a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Toolkit selecting the kind of work.
    #[serde(default)]
    pub toolkit: Option<String>,
    /// Opaque job configuration.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    /// Input file references.
    #[serde(default)]
    pub input_files: Vec<String>,
    /// Priority, defaults to [`DEFAULT_PRIORITY`].
    #[serde(default)]
    pub priority: Option<i32>,
}

impl SubmitRequest {
    /// Create a request with the two required fields.
    pub fn new(toolkit: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            toolkit: Some(toolkit.into()),
            config: Some(config),
            input_files: Vec::new(),
            priority: None,
        }
    }

    /// Set the input files.
    pub fn with_input_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.input_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Check required fields and split the request into a [`Submission`].
    pub fn validate(self) -> JobResult<Submission> {
        let toolkit = self.toolkit.filter(|t| !t.trim().is_empty());

        let mut missing = Vec::new();
        if toolkit.is_none() {
            missing.push("toolkit");
        }
        if self.config.is_none() {
            missing.push("config");
        }

        match (toolkit, self.config) {
            (Some(toolkit), Some(config)) => Ok(Submission {
                toolkit,
                config,
                input_files: self.input_files,
                priority: self.priority.unwrap_or(DEFAULT_PRIORITY),
            }),
            _ => Err(JobError::Validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            ))),
        }
    }
}

/// A validated submission, ready to become a [`Job`].
#[derive(Debug, Clone)]
pub struct Submission {
    pub toolkit: String,
    pub config: serde_json::Value,
    pub input_files: Vec<String>,
    pub priority: i32,
}

/// A tracked compute job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// The job identifier.
    pub id: JobId,
    /// Toolkit the job runs.
    pub toolkit: String,
    /// Opaque configuration, passed through untouched.
    pub config: serde_json::Value,
    /// Input file references.
    pub input_files: Vec<String>,
    /// Submission priority. Stored, not used for ordering.
    pub priority: i32,
    /// Current status.
    pub status: JobStatus,
    /// Progress percentage in `0..=100`.
    pub progress: f64,
    /// Time the job was submitted.
    pub created_at: DateTime<Utc>,
    /// Time the job started running.
    pub started_at: Option<DateTime<Utc>>,
    /// Time the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Queued jobs ahead of this one at submission, plus one.
    pub queue_position: usize,
    /// Completion estimate fixed at submission.
    pub estimated_completion: DateTime<Utc>,
    /// Toolkit results, present only once completed.
    pub results: Option<serde_json::Value>,
    /// Why the job failed, present only once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Job {
    /// Create a queued job from a validated submission.
    pub fn new(
        id: JobId,
        submission: Submission,
        created_at: DateTime<Utc>,
        queue_position: usize,
        estimated_completion: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            toolkit: submission.toolkit,
            config: submission.config,
            input_files: submission.input_files,
            priority: submission.priority,
            status: JobStatus::Queued,
            progress: 0.0,
            created_at,
            started_at: None,
            completed_at: None,
            queue_position,
            estimated_completion,
            results: None,
            failure_reason: None,
        }
    }

    fn transition(&mut self, next: JobStatus) -> JobResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Move a queued job to `Running`.
    pub fn start(&mut self, now: DateTime<Utc>) -> JobResult<()> {
        self.transition(JobStatus::Running)?;
        self.started_at = Some(now);
        Ok(())
    }

    /// Add `increment` to a running job's progress, clamped to 100.
    ///
    /// Negative and non-finite increments are treated as zero.
    pub fn advance(&mut self, increment: f64) -> JobResult<f64> {
        if self.status != JobStatus::Running {
            return Err(JobError::Internal(format!(
                "cannot advance job {} while {}",
                self.id, self.status
            )));
        }
        let increment = if increment.is_finite() { increment.max(0.0) } else { 0.0 };
        self.progress = (self.progress + increment).min(MAX_PROGRESS);
        Ok(self.progress)
    }

    /// Check whether progress has reached 100.
    pub fn is_progress_complete(&self) -> bool {
        self.progress >= MAX_PROGRESS
    }

    /// Complete a running job with its results.
    pub fn complete(&mut self, results: serde_json::Value, now: DateTime<Utc>) -> JobResult<()> {
        self.transition(JobStatus::Completed)?;
        self.progress = MAX_PROGRESS;
        self.results = Some(results);
        self.completed_at = Some(now);
        Ok(())
    }

    /// Fail a running job, recording why.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> JobResult<()> {
        self.transition(JobStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        self.completed_at = Some(now);
        Ok(())
    }

    /// Cancel a running job. Progress is frozen where it stands.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> JobResult<()> {
        self.transition(JobStatus::Cancelled)?;
        self.completed_at = Some(now);
        Ok(())
    }
}
