//! CSV result report.
//!
//! One row per job. The file is rewritten after every result so an
//! interrupted run still leaves an up-to-date report behind.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use playloop_core::JobSet;
use playloop_scheduler::ResultSink;
use thiserror::Error;
use tracing::warn;

const HEADER: &str = "test,type,attempts,successes,failures,last_result";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Row {
    class: String,
    successes: u64,
    failures: u64,
    last_result: Option<bool>,
}

impl Row {
    fn attempts(&self) -> u64 {
        self.successes + self.failures
    }
}

/// [`ResultSink`] that tallies results per job and mirrors them to a CSV file.
#[derive(Debug)]
pub struct CsvReport {
    path: PathBuf,
    rows: IndexMap<String, Row>,
}

impl CsvReport {
    /// Seed a row for every job so never-finished jobs still appear.
    pub fn new(path: impl Into<PathBuf>, jobs: &JobSet) -> Self {
        let mut rows: IndexMap<String, Row> = IndexMap::new();
        for def in jobs.definitions() {
            let row = rows.entry(def.name).or_default();
            // A name may exist in both classes; results are keyed by name only.
            if row.class.is_empty() {
                row.class = def.class.to_string();
            } else {
                row.class = format!("{}+{}", row.class, def.class);
            }
        }
        Self {
            path: path.into(),
            rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// (successes, failures) recorded for a job.
    pub fn tally(&self, job_name: &str) -> Option<(u64, u64)> {
        self.rows.get(job_name).map(|r| (r.successes, r.failures))
    }

    /// Render the full report.
    pub fn to_csv(&self) -> String {
        let mut out = String::with_capacity(64 * (self.rows.len() + 1));
        out.push_str(HEADER);
        out.push('\n');
        for (name, row) in &self.rows {
            let last = match row.last_result {
                Some(true) => "success",
                Some(false) => "failure",
                None => "",
            };
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                escape(name),
                row.class,
                row.attempts(),
                row.successes,
                row.failures,
                last
            ));
        }
        out
    }

    /// Write the report to disk, replacing any previous content.
    pub fn flush(&self) -> Result<(), ReportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, self.to_csv()).map_err(|source| ReportError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ResultSink for CsvReport {
    fn record_result(&mut self, job_name: &str, successful: bool) {
        let row = self.rows.entry(job_name.to_string()).or_default();
        if successful {
            row.successes += 1;
        } else {
            row.failures += 1;
        }
        row.last_result = Some(successful);

        if let Err(e) = self.flush() {
            warn!(error = %e, "report not updated");
        }
    }
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> JobSet {
        JobSet::new(vec!["boot".into(), "ping".into()], vec!["kill-db".into()])
    }

    #[test]
    fn seeded_rows_in_job_order() {
        let report = CsvReport::new("unused.csv", &jobs());
        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], HEADER);
        assert_eq!(lines[1], "boot,functional,0,0,0,");
        assert_eq!(lines[2], "ping,functional,0,0,0,");
        assert_eq!(lines[3], "kill-db,ha,0,0,0,");
    }

    #[test]
    fn results_are_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.csv");
        let mut report = CsvReport::new(&path, &jobs());

        report.record_result("boot", true);
        report.record_result("boot", false);
        report.record_result("kill-db", true);

        assert_eq!(report.tally("boot"), Some((1, 1)));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("boot,functional,2,1,1,failure"));
        assert!(written.contains("kill-db,ha,1,1,0,success"));
        assert!(written.contains("ping,functional,0,0,0,"));
    }

    #[test]
    fn unknown_job_gets_a_row() {
        let mut report = CsvReport::new("unused.csv", &JobSet::default());
        // Write failure is only logged.
        report.path = PathBuf::from("/proc/definitely/not/writable.csv");
        report.record_result("stray", false);
        assert_eq!(report.tally("stray"), Some((0, 1)));
    }

    #[test]
    fn name_in_both_classes_shares_a_row() {
        let set = JobSet::new(vec!["net".into()], vec!["net".into()]);
        let report = CsvReport::new("unused.csv", &set);
        assert!(report.to_csv().contains("net,functional+ha,0,0,0,"));
    }

    #[test]
    fn escape_quotes_special_fields() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn flush_to_unwritable_path_errors() {
        let report = CsvReport::new("/proc/definitely/not/writable.csv", &jobs());
        assert!(matches!(report.flush(), Err(ReportError::Write { .. })));
    }
}
