//! Job-set resolution.
//!
//! A run draws its jobs from exactly one place: named plan files, the
//! `[enabled_tests]` config section, or a scan of the test directory.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::PlayloopConfig;
use crate::error::ConfigError;
use crate::job::{JobClass, JobSet};

/// Where the job set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// One or more plan files, in the order requested.
    Plans(Vec<String>),
    /// The `[enabled_tests]` section of the config.
    EnabledTests,
    /// Everything under `functional_tests/` and `ha_tests/`.
    DirectoryScan,
}

impl JobSource {
    /// Pick the source: an explicit plan wins, then enabled tests, then a scan.
    pub fn select(plan_arg: Option<&str>, config: &PlayloopConfig) -> Self {
        let plans: Vec<String> = plan_arg
            .map(|p| {
                p.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        if !plans.is_empty() {
            JobSource::Plans(plans)
        } else if !config.enabled_tests.is_empty() {
            JobSource::EnabledTests
        } else {
            JobSource::DirectoryScan
        }
    }
}

impl fmt::Display for JobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobSource::Plans(plans) => write!(f, "plan {}", plans.join(",")),
            JobSource::EnabledTests => f.write_str("enabled tests"),
            JobSource::DirectoryScan => f.write_str("directory scan"),
        }
    }
}

/// Resolve the job set from the selected source and validate it.
pub fn resolve_job_set(source: &JobSource, config: &PlayloopConfig) -> Result<JobSet, ConfigError> {
    let set = match source {
        JobSource::Plans(plans) => load_plans(&config.general.plans_dir(), plans)?,
        JobSource::EnabledTests => config.enabled_tests.to_job_set(),
        JobSource::DirectoryScan => scan_test_directory(&config.general.test_directory)?,
    };
    set.validate()?;
    info!(
        source = %source,
        functional = set.functional.len(),
        ha = set.ha.len(),
        "resolved job set"
    );
    Ok(set)
}

// ── Plans ───────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct PlanFile {
    #[serde(default)]
    functional_tests: Vec<String>,
    #[serde(default)]
    ha_tests: Vec<String>,
}

/// Load and concatenate the named plans from `plans_dir`.
pub fn load_plans(plans_dir: &Path, plans: &[String]) -> Result<JobSet, ConfigError> {
    let mut set = JobSet::default();
    for plan in plans {
        let path = find_yaml(plans_dir, plan)?;
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
        let parsed: PlanFile = if content.trim().is_empty() {
            PlanFile::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|source| ConfigError::PlanParse { path: path.clone(), source })?
        };
        debug!(plan = %plan, path = %path.display(), "loaded plan");
        set.extend(JobSet::new(parsed.functional_tests, parsed.ha_tests));
    }
    Ok(set)
}

/// Find `<base>.yaml` or `<base>.yml` in `dir`, preferring `.yaml`.
pub fn find_yaml(dir: &Path, base: &str) -> Result<PathBuf, ConfigError> {
    ["yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{base}.{ext}")))
        .find(|p| p.exists())
        .ok_or_else(|| ConfigError::PlanNotFound {
            base: base.to_string(),
            dir: dir.to_path_buf(),
        })
}

// ── Directory scan ──────────────────────────────────────────────────

/// List every job directory under `<test_directory>/<class>_tests`.
pub fn scan_test_directory(test_directory: &Path) -> Result<JobSet, ConfigError> {
    Ok(JobSet::new(
        scan_class(test_directory, JobClass::Functional)?,
        scan_class(test_directory, JobClass::Ha)?,
    ))
}

fn scan_class(test_directory: &Path, class: JobClass) -> Result<Vec<String>, ConfigError> {
    let dir = test_directory.join(class.tests_dir());
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.clone());
            ConfigError::io(path, e.into())
        })?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
