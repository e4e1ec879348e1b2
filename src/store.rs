//! The job registry.
//!
//! [`JobStore`] is the only owner of job records. Every access goes through
//! one mutex: structural changes (insert/remove) and per-record
//! read-modify-write both take it, so a reader never sees a half-applied
//! update and a scheduler tick can never interleave with a delete.
//! Callers only ever get clones.
//!
//! The lock is never held across an `.await`.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobId, JobStatus};

/// What [`JobStore::remove_or_cancel`] did.
#[derive(Debug, Clone)]
pub enum Removal {
    /// The job was running; it is now `Cancelled` and still registered.
    Cancelled(Job),
    /// The job was removed. Holds the record as it was at removal.
    Removed(Job),
}

#[derive(Debug, Default)]
struct Registry {
    jobs: FxHashMap<JobId, Job>,
    /// Creation order of the ids still present in `jobs`.
    order: Vec<JobId>,
}

impl Registry {
    fn queued_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|job| job.status == JobStatus::Queued)
            .count()
    }
}

/// In-memory job registry.
#[derive(Debug, Default)]
pub struct JobStore {
    inner: Mutex<Registry>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves records valid, so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a new job built by `build`.
    ///
    /// `build` receives the queue position (queued jobs + 1) and runs under
    /// the registry lock, so the position is consistent with the insert.
    pub fn insert_queued(&self, build: impl FnOnce(usize) -> Job) -> JobResult<Job> {
        let mut registry = self.lock();
        let job = build(registry.queued_count() + 1);
        if registry.jobs.contains_key(&job.id) {
            return Err(JobError::Internal(format!("duplicate job id {}", job.id)));
        }
        registry.order.push(job.id.clone());
        registry.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    /// Snapshot of a single job.
    pub fn get(&self, id: &JobId) -> JobResult<Job> {
        self.lock()
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.clone()))
    }

    /// Apply `f` to a job under the registry lock.
    ///
    /// Returns `None` if the job does not exist.
    pub fn update<T>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> T) -> Option<T> {
        self.lock().jobs.get_mut(id).map(f)
    }

    /// Cancel a running job in place, or remove any other job.
    pub fn remove_or_cancel(&self, id: &JobId, now: DateTime<Utc>) -> JobResult<Removal> {
        let mut registry = self.lock();
        let job = registry
            .jobs
            .get_mut(id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;

        if job.status == JobStatus::Running {
            job.cancel(now)?;
            return Ok(Removal::Cancelled(job.clone()));
        }

        let removed = registry
            .jobs
            .remove(id)
            .ok_or_else(|| JobError::NotFound(id.clone()))?;
        registry.order.retain(|existing| existing != id);
        Ok(Removal::Removed(removed))
    }

    /// All jobs in creation order.
    pub fn list(&self) -> Vec<Job> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|id| registry.jobs.get(id).cloned())
            .collect()
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    /// Check if no jobs are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SubmitRequest;
    use serde_json::json;

    fn insert(store: &JobStore, toolkit: &str) -> Job {
        let now = Utc::now();
        let submission = SubmitRequest::new(toolkit, json!({})).validate().unwrap();
        store
            .insert_queued(|position| Job::new(JobId::generate(), submission, now, position, now))
            .unwrap()
    }

    #[test]
    fn test_queue_position_counts_queued_jobs() {
        let store = JobStore::new();
        let first = insert(&store, "a");
        let second = insert(&store, "b");
        assert_eq!(first.queue_position, 1);
        assert_eq!(second.queue_position, 2);

        store.update(&first.id, |job| job.start(Utc::now())).unwrap().unwrap();
        let third = insert(&store, "c");
        assert_eq!(third.queue_position, 2);

        // Recorded positions are never recomputed.
        assert_eq!(store.get(&second.id).unwrap().queue_position, 2);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let store = JobStore::new();
        let job = insert(&store, "a");
        let dup = store.insert_queued(|_| job.clone());
        assert!(matches!(dup, Err(JobError::Internal(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing() {
        let store = JobStore::new();
        assert!(matches!(
            store.get(&JobId::new("nope")),
            Err(JobError::NotFound(_))
        ));
        assert!(store.update(&JobId::new("nope"), |_| ()).is_none());
    }

    #[test]
    fn test_list_preserves_creation_order() {
        let store = JobStore::new();
        let ids: Vec<_> = (0..5).map(|i| insert(&store, &format!("t{i}")).id).collect();

        store.remove_or_cancel(&ids[2], Utc::now()).unwrap();

        let listed: Vec<_> = store.list().into_iter().map(|job| job.id).collect();
        assert_eq!(listed, vec![ids[0].clone(), ids[1].clone(), ids[3].clone(), ids[4].clone()]);
    }

    #[test]
    fn test_remove_queued_job() {
        let store = JobStore::new();
        let job = insert(&store, "a");

        let removal = store.remove_or_cancel(&job.id, Utc::now()).unwrap();
        assert!(matches!(removal, Removal::Removed(ref j) if j.id == job.id));
        assert!(store.is_empty());
        assert!(matches!(store.get(&job.id), Err(JobError::NotFound(_))));
        assert!(matches!(
            store.remove_or_cancel(&job.id, Utc::now()),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_cancel_running_job_keeps_record() {
        let store = JobStore::new();
        let job = insert(&store, "a");
        store
            .update(&job.id, |job| {
                job.start(Utc::now())?;
                job.advance(30.0)
            })
            .unwrap()
            .unwrap();

        let removal = store.remove_or_cancel(&job.id, Utc::now()).unwrap();
        let Removal::Cancelled(cancelled) = removal else {
            panic!("running job should be cancelled, not removed");
        };
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(cancelled.progress, 30.0);
        assert_eq!(store.get(&job.id).unwrap().status, JobStatus::Cancelled);

        // A second delete removes the cancelled record.
        let removal = store.remove_or_cancel(&job.id, Utc::now()).unwrap();
        assert!(matches!(removal, Removal::Removed(_)));
        assert!(store.is_empty());
    }
}
