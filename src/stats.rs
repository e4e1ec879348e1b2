//! Fleet-wide statistics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::{Job, JobStatus};

/// Aggregate counts over the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub completed: usize,
    pub running: usize,
    pub queued: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Completed jobs as a percentage of all jobs, two decimals.
    /// 100 for an empty registry.
    pub success_rate: f64,
    /// Seconds since the service started.
    pub uptime: f64,
}

impl FleetStats {
    /// Count `jobs` in a single pass.
    #[allow(clippy::cast_precision_loss)]
    pub fn compute<'a>(jobs: impl IntoIterator<Item = &'a Job>, uptime: Duration) -> Self {
        let mut stats = Self {
            uptime: uptime.as_secs_f64(),
            ..Self::default()
        };

        for job in jobs {
            stats.total += 1;
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }

        stats.success_rate = if stats.total == 0 {
            100.0
        } else {
            let rate = stats.completed as f64 / stats.total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };
        stats
    }
}

/// [`FleetStats`] stamped with the time they were taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub stats: FleetStats,
    pub timestamp: DateTime<Utc>,
}

/// Liveness report. Independent of job state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    /// A healthy report for this crate version.
    pub fn healthy(timestamp: DateTime<Utc>) -> Self {
        Self {
            status: "healthy".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobId, SubmitRequest};
    use serde_json::json;

    fn jobs(statuses: &[JobStatus]) -> Vec<Job> {
        statuses
            .iter()
            .map(|&status| {
                let now = Utc::now();
                let submission = SubmitRequest::new("docking", json!({})).validate().unwrap();
                let mut job = Job::new(JobId::generate(), submission, now, 1, now);
                job.status = status;
                job
            })
            .collect()
    }

    #[test]
    fn test_empty_registry() {
        let stats = FleetStats::compute(std::iter::empty(), Duration::from_secs(12));
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 100.0);
        assert_eq!(stats.uptime, 12.0);
    }

    #[test]
    fn test_counts_by_status() {
        let fleet = jobs(&[
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ]);
        let stats = FleetStats::compute(&fleet, Duration::ZERO);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.running, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 1);
    }

    #[test]
    fn test_success_rate_rounds_to_two_decimals() {
        let mixed = jobs(&[JobStatus::Completed, JobStatus::Failed, JobStatus::Queued]);
        let stats = FleetStats::compute(&mixed, Duration::ZERO);
        assert_eq!(stats.success_rate, 33.33);

        let all_done = jobs(&[JobStatus::Completed; 4]);
        assert_eq!(FleetStats::compute(&all_done, Duration::ZERO).success_rate, 100.0);
    }

    #[test]
    fn test_report_flattens_stats() {
        let report = StatsReport {
            stats: FleetStats::compute(std::iter::empty(), Duration::from_secs(1)),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["total"], json!(0));
        assert_eq!(value["success_rate"], json!(100.0));
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_health_report() {
        let health = HealthReport::healthy(Utc::now());
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    }
}
