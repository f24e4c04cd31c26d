use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-job result counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobTally {
    pub successes: u64,
    pub failures: u64,
}

/// Scheduler operational metrics, logged as the run summary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Completed poll sweeps.
    pub sweeps: u64,
    /// Attempts started, including ones whose launch errored.
    pub launches: u64,
    pub launch_failures: u64,
    pub query_errors: u64,
    pub successes: u64,
    pub failures: u64,
    /// Jobs that succeeded at their final iteration.
    pub jobs_completed: u64,
    /// Jobs removed for exceeding a budget without completing.
    pub jobs_dropped: u64,
    pub per_job: HashMap<String, JobTally>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Record one terminal attempt.
    pub fn record_result(&mut self, job_name: &str, successful: bool) {
        let tally = self.per_job.entry(job_name.to_string()).or_default();
        if successful {
            self.successes += 1;
            tally.successes += 1;
        } else {
            self.failures += 1;
            tally.failures += 1;
        }
    }

    /// Total terminal attempts seen.
    pub fn results(&self) -> u64 {
        self.successes + self.failures
    }
}
