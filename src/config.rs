//! Scheduling and query parameters.

use std::time::Duration;

use crate::error::{JobError, JobResult};

/// Configuration for the lifecycle scheduler and query defaults.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Delay between submission and the transition to `Running`.
    pub start_delay: Duration,
    /// Interval between progress ticks while running.
    pub tick_interval: Duration,
    /// Upper bound of the uniform per-tick progress increment.
    pub max_progress_increment: f64,
    /// Offset from submission used for `estimated_completion`.
    pub completion_horizon: Duration,
    /// Page size used when a list query gives no usable limit.
    pub default_list_limit: usize,
    /// Seed for progress increments. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::from_secs(2),
            tick_interval: Duration::from_secs(1),
            max_progress_increment: 20.0,
            completion_horizon: Duration::from_secs(2 * 60 * 60),
            default_list_limit: 50,
            rng_seed: None,
        }
    }
}

impl LifecycleConfig {
    /// Set the start delay.
    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    /// Set the tick interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the maximum progress increment per tick.
    pub fn with_max_progress_increment(mut self, increment: f64) -> Self {
        self.max_progress_increment = increment;
        self
    }

    /// Set the completion horizon.
    pub fn with_completion_horizon(mut self, horizon: Duration) -> Self {
        self.completion_horizon = horizon;
        self
    }

    /// Set the default list limit.
    pub fn with_default_list_limit(mut self, limit: usize) -> Self {
        self.default_list_limit = limit;
        self
    }

    /// Seed the progress RNG for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Reject configurations the scheduler cannot run with.
    pub fn validate(&self) -> JobResult<()> {
        if self.tick_interval.is_zero() {
            return Err(JobError::Configuration(
                "tick_interval must be greater than zero".into(),
            ));
        }
        if !self.max_progress_increment.is_finite() || self.max_progress_increment <= 0.0 {
            return Err(JobError::Configuration(format!(
                "max_progress_increment must be a positive number, got {}",
                self.max_progress_increment
            )));
        }
        if self.default_list_limit == 0 {
            return Err(JobError::Configuration(
                "default_list_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
