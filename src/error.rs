//! Job lifecycle error types.
//!
//! Errors are categorized by who can act on them:
//!
//! | Category | Variants | Recovery |
//! |----------|----------|----------|
//! | **Client** | `Validation`, `NotFound`, `InvalidTransition` | Fix the request |
//! | **Transient** | `Timeout` | Poll again later |
//! | **Config** | `Configuration` | Fix configuration |
//! | **Internal** | `Internal` | None; the affected job is marked failed |

use thiserror::Error;

use crate::job::{JobId, JobStatus};

/// Errors that can occur in job lifecycle operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JobError {
    // ── Client errors (fix the request) ──────────────────────────────
    /// Required submission fields are missing or malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No job with this id exists.
    #[error("Job not found: {0}")]
    NotFound(JobId),

    /// The requested transition is not allowed by the state machine.
    #[error("Job {id}: cannot transition from {from} to {to}")]
    InvalidTransition {
        /// Job that rejected the transition.
        id: JobId,
        /// Status the job was in.
        from: JobStatus,
        /// Status that was requested.
        to: JobStatus,
    },

    // ── Transient errors ─────────────────────────────────────────────
    /// Timed out waiting for a job to reach a terminal state.
    #[error("Timeout waiting for job {0}")]
    Timeout(JobId),

    // ── Config errors ────────────────────────────────────────────────
    /// Configuration error (fix configuration).
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Internal errors ──────────────────────────────────────────────
    /// Invariant violation inside the scheduler or a result generator.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Returns `true` if the caller caused this error and can correct it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound(_) | Self::InvalidTransition { .. }
        )
    }

    /// Returns `true` if the operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Result type for job lifecycle operations.
pub type JobResult<T> = Result<T, JobError>;
