use chrono::Utc;
use rand::Rng;
use tracing::info;

use crate::attempt::{AttemptStatus, JobLauncher};
use crate::event::SchedulerEvent;
use crate::metrics::SchedulerMetrics;
use crate::record::RecordId;
use crate::sink::ResultSink;
use crate::ticker::Ticker;

use super::Scheduler;

impl<L: JobLauncher, S: ResultSink, R: Rng> Scheduler<L, S, R> {
    /// Poll every record that had an attempt in flight when the sweep began.
    ///
    /// Terminal statuses go through the completion rule; a status query that
    /// errors counts as a failed attempt. Records launched during the sweep
    /// are first polled on the next one.
    pub fn sweep(&mut self) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        self.metrics.sweeps += 1;

        let snapshot: Vec<RecordId> = self.running().map(|r| r.id).collect();
        for id in snapshot {
            let Some(idx) = self.position(id) else {
                continue;
            };
            let record = &mut self.records[idx];
            let Some(attempt) = record.attempt.as_mut() else {
                continue;
            };

            let succeeded = match attempt.status() {
                Ok(AttemptStatus::Succeeded) => true,
                Ok(AttemptStatus::Failed) => false,
                Ok(status) => {
                    let event = SchedulerEvent::Progress {
                        job: record.name.clone(),
                        class: record.class,
                        iteration: record.iteration,
                        status,
                    };
                    Self::emit(&mut events, event);
                    continue;
                }
                Err(e) => {
                    let event = SchedulerEvent::QueryFailed {
                        job: record.name.clone(),
                        class: record.class,
                        iteration: record.iteration,
                        error: e.to_string(),
                    };
                    self.metrics.query_errors += 1;
                    Self::emit(&mut events, event);
                    false
                }
            };
            self.complete(id, succeeded, &mut events);
        }

        events
    }

    /// Sweep once per tick until every record has been removed.
    ///
    /// Returns the final metrics. Does nothing useful unless [`start`](Self::start)
    /// was called first.
    pub async fn run<T: Ticker>(&mut self, ticker: &mut T) -> SchedulerMetrics {
        info!(
            jobs = self.records.len(),
            running = self.running().count(),
            "scheduler loop starting"
        );

        while !self.is_drained() {
            ticker.tick().await;
            self.sweep();
        }

        self.metrics.finished_at = Some(Utc::now());
        info!(
            sweeps = self.metrics.sweeps,
            successes = self.metrics.successes,
            failures = self.metrics.failures,
            completed = self.metrics.jobs_completed,
            dropped = self.metrics.jobs_dropped,
            "all jobs finished"
        );
        self.metrics.clone()
    }
}
