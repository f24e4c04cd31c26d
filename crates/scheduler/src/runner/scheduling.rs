use chrono::Utc;
use playloop_core::{JobClass, JobSet};
use rand::Rng;
use tracing::{debug, warn};

use crate::attempt::{Attempt, AttemptSpec, JobLauncher};
use crate::event::SchedulerEvent;
use crate::policy::{self, Verdict};
use crate::record::{JobRecord, RecordId};
use crate::sink::ResultSink;

use super::Scheduler;

impl<L: JobLauncher, S: ResultSink, R: Rng> Scheduler<L, S, R> {
    /// Create records for the initial job set and launch the first wave.
    ///
    /// Every functional job starts immediately. All HA jobs get a parked
    /// record and one of them, chosen at random, starts. Calling this a
    /// second time is a no-op.
    pub fn start(&mut self, jobs: &JobSet) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        if self.started {
            warn!("scheduler already started, ignoring job set");
            return events;
        }
        self.started = true;
        self.metrics.started_at = Some(Utc::now());

        for name in &jobs.functional {
            let id = self.allocate_id();
            self.records.push(JobRecord::new(id, name.clone(), JobClass::Functional));
            self.launch(id, &mut events);
        }

        for name in &jobs.ha {
            let id = self.allocate_id();
            self.records.push(JobRecord::new(id, name.clone(), JobClass::Ha));
        }
        self.launch_next_ha(&mut events);

        events
    }

    /// Apply the completion rule to a record whose attempt just finished.
    pub(super) fn complete(&mut self, id: RecordId, succeeded: bool, events: &mut Vec<SchedulerEvent>) {
        let Some(idx) = self.position(id) else {
            return;
        };

        let name = self.records[idx].name.clone();
        self.sink.record_result(&name, succeeded);
        self.metrics.record_result(&name, succeeded);

        let limits = self.limits;
        let record = &mut self.records[idx];
        record.attempt = None;
        let verdict = policy::settle(record, succeeded, &limits);
        let (class, iteration, failures) = (record.class, record.iteration, record.failures);

        let outcome = if succeeded {
            SchedulerEvent::Succeeded { job: name.clone(), class, iteration }
        } else {
            SchedulerEvent::Failed { job: name.clone(), class, iteration, failures }
        };
        Self::emit(events, outcome);

        let removal = match verdict {
            Verdict::Relaunch => None,
            Verdict::Completed => {
                self.metrics.jobs_completed += 1;
                Some(SchedulerEvent::Completed { job: name, class, iteration })
            }
            Verdict::FailureBudgetExceeded => {
                self.metrics.jobs_dropped += 1;
                Some(SchedulerEvent::FailureBudgetExceeded { job: name, class, iteration, failures })
            }
            Verdict::IterationBudgetExhausted => {
                self.metrics.jobs_dropped += 1;
                Some(SchedulerEvent::IterationBudgetExhausted { job: name, class, iteration, failures })
            }
        };
        if let Some(event) = removal {
            self.records.remove(idx);
            Self::emit(events, event);
        }

        match class {
            JobClass::Functional if !verdict.is_terminal() => self.launch(id, events),
            JobClass::Functional => {}
            // The HA slot is free whether or not this record survived.
            JobClass::Ha => self.launch_next_ha(events),
        }
    }

    /// Fill the single HA slot with a random surviving HA record.
    pub(super) fn launch_next_ha(&mut self, events: &mut Vec<SchedulerEvent>) {
        debug_assert!(
            !self.records.iter().any(|r| r.is_ha() && r.is_running()),
            "HA slot must be free before selecting the next HA job"
        );
        let candidates: Vec<RecordId> = self
            .records
            .iter()
            .filter(|r| r.is_ha())
            .map(|r| r.id)
            .collect();
        match policy::pick(&candidates, &mut self.rng) {
            Some(&id) => self.launch(id, events),
            None => debug!("no HA jobs left to schedule"),
        }
    }

    /// Advance a record to its next iteration and start an attempt for it.
    pub(super) fn launch(&mut self, id: RecordId, events: &mut Vec<SchedulerEvent>) {
        let Some(idx) = self.position(id) else {
            return;
        };
        let record = &mut self.records[idx];
        record.iteration += 1;
        let spec = AttemptSpec {
            job_name: record.name.clone(),
            class: record.class,
            iteration: record.iteration,
            failures: record.failures,
        };

        self.metrics.launches += 1;
        let attempt = match self.launcher.launch(&spec) {
            Ok(handle) => {
                Self::emit(
                    events,
                    SchedulerEvent::Launched {
                        job: spec.job_name,
                        class: spec.class,
                        iteration: spec.iteration,
                        failures: spec.failures,
                    },
                );
                Attempt::Live(handle)
            }
            Err(e) => {
                self.metrics.launch_failures += 1;
                let reason = e.to_string();
                Self::emit(
                    events,
                    SchedulerEvent::LaunchFailed {
                        job: spec.job_name,
                        class: spec.class,
                        iteration: spec.iteration,
                        error: reason.clone(),
                    },
                );
                Attempt::LaunchFailed(reason)
            }
        };
        self.records[idx].attempt = Some(attempt);
    }
}
