//! Job Lifecycle — in-memory manager for simulated compute jobs
//!
//! This crate accepts asynchronous compute job submissions, drives each job
//! through its lifecycle on a timer, and answers per-job and fleet-wide
//! queries. No real computation happens: progress is simulated and results
//! are synthesized per toolkit when a job finishes.
//!
//! # Overview
//!
//! The crate provides:
//! - [`JobService`], the entry point wiring everything together
//! - [`JobApi`], the async boundary a transport layer codes against
//! - [`JobStore`], the mutex-guarded registry that owns every [`Job`]
//! - [`LifecycleScheduler`], one timer task per job over an injectable [`Clock`]
//! - [`ListQuery`] / [`JobPage`] for filtering and pagination
//! - [`FleetStats`] for aggregate counts and success rate
//! - [`ResultGenerator`] / [`GeneratorRegistry`] for per-toolkit results
//! - [`JobError`] with client, transient, config and internal variants
//!
//! # Lifecycle
//!
//! ```text
//!   submit() ──→ Queued ──(start delay)──→ Running ──(ticks)──→ Completed
//!                  │                          │
//!               delete()                      ├──→ Failed(reason)
//!               (removed)                     └──→ Cancelled (delete())
//! ```
//!
//! # Example
//!
//! ```no_run
//! use job_lifecycle::{JobApi, JobService, LifecycleConfig, SubmitRequest};
//! use serde_json::json;
//!
//! # async fn run() -> job_lifecycle::JobResult<()> {
//! let service = JobService::new(LifecycleConfig::default())?;
//! let job = JobApi::submit(&service, SubmitRequest::new("structure_prediction", json!({}))).await?;
//! let done = service.wait(&job.id).await?;
//! assert!(done.results.is_some());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod job;
pub mod query;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod store;

pub use api::{DeleteOutcome, JobApi};
pub use clock::{Clock, TokioClock};
pub use config::LifecycleConfig;
pub use error::{JobError, JobResult};
pub use generator::{GeneratorRegistry, ResultGenerator};
pub use job::{Job, JobId, JobStatus, SubmitRequest};
pub use query::{JobPage, ListQuery};
pub use scheduler::LifecycleScheduler;
pub use service::JobService;
pub use stats::{FleetStats, HealthReport, StatsReport};
pub use store::JobStore;
