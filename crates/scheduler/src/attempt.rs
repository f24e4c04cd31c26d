use std::fmt;

use playloop_core::JobClass;
use serde::{Deserialize, Serialize};

/// Error returned when a launcher cannot start an attempt.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("playbook not found: {0}")]
    PlaybookNotFound(String),
    #[error("failed to spawn attempt: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Error returned when an attempt's status cannot be read.
///
/// The scheduler treats this as a failed outcome for the attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptQueryError {
    #[error("status source unreachable: {0}")]
    Unreachable(String),
    #[error("attempt was never started: {0}")]
    NeverStarted(String),
}

/// Normalized status of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Starting,
    Running,
    Succeeded,
    Failed,
}

impl AttemptStatus {
    /// Map a runner's status vocabulary onto the closed set.
    ///
    /// Anything not recognised as in-progress or successful is a failure.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "starting" | "pending" => AttemptStatus::Starting,
            "running" => AttemptStatus::Running,
            "successful" | "succeeded" | "success" => AttemptStatus::Succeeded,
            _ => AttemptStatus::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Succeeded | AttemptStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Starting => "starting",
            AttemptStatus::Running => "running",
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptSpec {
    pub job_name: String,
    pub class: JobClass,
    /// 1-based attempt number for this job.
    pub iteration: u32,
    /// Failures the job had accumulated before this attempt.
    pub failures: u32,
}

impl AttemptSpec {
    /// Identity of the attempt within its job, e.g. `ha_3_1`.
    ///
    /// Iteration and failure counts only grow, so no two attempts of the
    /// same job share an ident.
    pub fn ident(&self) -> String {
        format!("{}_{}_{}", self.class, self.iteration, self.failures)
    }
}

/// A pollable handle to an in-flight attempt.
pub trait AttemptHandle {
    /// Non-blocking status query.
    fn status(&mut self) -> Result<AttemptStatus, AttemptQueryError>;
}

/// Starts attempts. The scheduler calls this once per (re)launch.
pub trait JobLauncher {
    type Handle: AttemptHandle;

    fn launch(&mut self, spec: &AttemptSpec) -> Result<Self::Handle, LaunchError>;
}

/// An attempt slot on a job record.
///
/// A launch that errored still occupies the slot so the failure is counted
/// on the next sweep like any other failed attempt.
#[derive(Debug)]
pub enum Attempt<H> {
    Live(H),
    LaunchFailed(String),
}

impl<H: AttemptHandle> Attempt<H> {
    pub fn status(&mut self) -> Result<AttemptStatus, AttemptQueryError> {
        match self {
            Attempt::Live(handle) => handle.status(),
            Attempt::LaunchFailed(reason) => Err(AttemptQueryError::NeverStarted(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_statuses() {
        assert_eq!(AttemptStatus::parse("starting"), AttemptStatus::Starting);
        assert_eq!(AttemptStatus::parse("running"), AttemptStatus::Running);
        assert_eq!(AttemptStatus::parse("successful"), AttemptStatus::Succeeded);
        assert_eq!(AttemptStatus::parse(" Succeeded "), AttemptStatus::Succeeded);
    }

    #[test]
    fn unknown_status_is_failure() {
        assert_eq!(AttemptStatus::parse("failed"), AttemptStatus::Failed);
        assert_eq!(AttemptStatus::parse("timeout"), AttemptStatus::Failed);
        assert_eq!(AttemptStatus::parse("canceled"), AttemptStatus::Failed);
        assert_eq!(AttemptStatus::parse(""), AttemptStatus::Failed);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AttemptStatus::Starting.is_terminal());
        assert!(!AttemptStatus::Running.is_terminal());
        assert!(AttemptStatus::Succeeded.is_terminal());
        assert!(AttemptStatus::Failed.is_terminal());
    }

    #[test]
    fn ident_format() {
        let spec = AttemptSpec {
            job_name: "kill-db".into(),
            class: JobClass::Ha,
            iteration: 3,
            failures: 1,
        };
        assert_eq!(spec.ident(), "ha_3_1");
    }

    #[test]
    fn failed_launch_reports_query_error() {
        struct Never;
        impl AttemptHandle for Never {
            fn status(&mut self) -> Result<AttemptStatus, AttemptQueryError> {
                Ok(AttemptStatus::Running)
            }
        }
        let mut attempt: Attempt<Never> = Attempt::LaunchFailed("no playbook".into());
        assert_eq!(
            attempt.status(),
            Err(AttemptQueryError::NeverStarted("no playbook".into()))
        );
    }
}
