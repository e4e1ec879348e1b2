//! Filtering and pagination over job snapshots.

use serde::{Deserialize, Serialize};

use crate::error::JobResult;
use crate::job::{Job, JobStatus};

/// A list request: exact-match filters plus an optional page size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Only jobs in this status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    /// Only jobs for this toolkit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolkit: Option<String>,
    /// Maximum number of jobs returned. `None` uses the default limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Match every job, default page size.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build a query from raw transport parameters.
    ///
    /// An unknown status is a validation error. A `limit` is read up to its
    /// first non-digit, so `"2.5"` and `"10abc"` mean 2 and 10; one with no
    /// leading digits is ignored and the default applies.
    pub fn from_params(
        status: Option<&str>,
        toolkit: Option<&str>,
        limit: Option<&str>,
    ) -> JobResult<Self> {
        Ok(Self {
            status: status.map(str::parse::<JobStatus>).transpose()?,
            toolkit: toolkit.map(str::to_string),
            limit: limit.and_then(parse_limit),
        })
    }

    /// Filter by status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by toolkit.
    pub fn with_toolkit(mut self, toolkit: impl Into<String>) -> Self {
        self.toolkit = Some(toolkit.into());
        self
    }

    /// Cap the page size.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `job` passes every filter that is set.
    pub fn matches(&self, job: &Job) -> bool {
        self.status.is_none_or(|status| job.status == status)
            && self
                .toolkit
                .as_deref()
                .is_none_or(|toolkit| job.toolkit == toolkit)
    }

    /// Apply the query to jobs in creation order.
    pub fn apply(&self, jobs: impl IntoIterator<Item = Job>, default_limit: usize) -> JobPage {
        let limit = self.limit.unwrap_or(default_limit);
        let mut total = 0;
        let mut page = Vec::new();
        for job in jobs.into_iter().filter(|job| self.matches(job)) {
            total += 1;
            if page.len() < limit {
                page.push(job);
            }
        }
        JobPage { total, jobs: page }
    }
}

fn parse_limit(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    let digits = raw
        .find(|c: char| !c.is_ascii_digit())
        .map_or(raw, |end| &raw[..end]);
    digits.parse().ok()
}

/// One page of list results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPage {
    /// Matches before truncation.
    pub total: usize,
    /// Matching jobs in creation order, at most `limit` of them.
    pub jobs: Vec<Job>,
}
