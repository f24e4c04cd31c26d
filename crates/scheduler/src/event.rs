use playloop_core::JobClass;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::attempt::AttemptStatus;

/// Structured record of something the scheduler did or observed.
///
/// Every event is logged when emitted and also returned from the sweep that
/// produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Launched {
        job: String,
        class: JobClass,
        iteration: u32,
        failures: u32,
    },
    LaunchFailed {
        job: String,
        class: JobClass,
        iteration: u32,
        error: String,
    },
    /// Attempt still in progress at sweep time.
    Progress {
        job: String,
        class: JobClass,
        iteration: u32,
        status: AttemptStatus,
    },
    QueryFailed {
        job: String,
        class: JobClass,
        iteration: u32,
        error: String,
    },
    Succeeded {
        job: String,
        class: JobClass,
        iteration: u32,
    },
    Failed {
        job: String,
        class: JobClass,
        iteration: u32,
        failures: u32,
    },
    Completed {
        job: String,
        class: JobClass,
        iteration: u32,
    },
    FailureBudgetExceeded {
        job: String,
        class: JobClass,
        iteration: u32,
        failures: u32,
    },
    IterationBudgetExhausted {
        job: String,
        class: JobClass,
        iteration: u32,
        failures: u32,
    },
}

impl SchedulerEvent {
    pub fn job(&self) -> &str {
        match self {
            SchedulerEvent::Launched { job, .. }
            | SchedulerEvent::LaunchFailed { job, .. }
            | SchedulerEvent::Progress { job, .. }
            | SchedulerEvent::QueryFailed { job, .. }
            | SchedulerEvent::Succeeded { job, .. }
            | SchedulerEvent::Failed { job, .. }
            | SchedulerEvent::Completed { job, .. }
            | SchedulerEvent::FailureBudgetExceeded { job, .. }
            | SchedulerEvent::IterationBudgetExhausted { job, .. } => job,
        }
    }

    /// Whether the event removes the job from tracking.
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            SchedulerEvent::Completed { .. }
                | SchedulerEvent::FailureBudgetExceeded { .. }
                | SchedulerEvent::IterationBudgetExhausted { .. }
        )
    }

    pub(crate) fn log(&self) {
        match self {
            SchedulerEvent::Launched { job, class, iteration, failures } => {
                info!(job = %job, class = %class, iteration, failures, "launching");
            }
            SchedulerEvent::LaunchFailed { job, class, iteration, error } => {
                warn!(job = %job, class = %class, iteration, error = %error, "launch failed");
            }
            SchedulerEvent::Progress { job, class, iteration, status } => {
                debug!(job = %job, class = %class, iteration, status = %status, "running");
            }
            SchedulerEvent::QueryFailed { job, class, iteration, error } => {
                warn!(
                    job = %job, class = %class, iteration, error = %error,
                    "status query failed, counting attempt as failed"
                );
            }
            SchedulerEvent::Succeeded { job, class, iteration } => {
                info!(job = %job, class = %class, iteration, "attempt succeeded");
            }
            SchedulerEvent::Failed { job, class, iteration, failures } => {
                warn!(job = %job, class = %class, iteration, failures, "attempt failed");
            }
            SchedulerEvent::Completed { job, class, iteration } => {
                info!(job = %job, class = %class, iteration, "complete");
            }
            SchedulerEvent::FailureBudgetExceeded { job, class, iteration, failures } => {
                error!(
                    job = %job, class = %class, iteration, failures,
                    "max failures exceeded, removing job"
                );
            }
            SchedulerEvent::IterationBudgetExhausted { job, class, iteration, failures } => {
                warn!(
                    job = %job, class = %class, iteration, failures,
                    "final iteration failed, removing job"
                );
            }
        }
    }
}
