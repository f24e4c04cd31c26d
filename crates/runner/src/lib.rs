//! Concrete collaborators for the playloop scheduler: a launcher that runs
//! each attempt as an `ansible-playbook` child process, artifact rotation for
//! attempt logs, and the CSV result report.

pub mod artifacts;
pub mod launcher;
pub mod report;

pub use launcher::{AnsibleLauncher, LaunchSettings, PlaybookAttempt};
pub use report::{CsvReport, ReportError};
