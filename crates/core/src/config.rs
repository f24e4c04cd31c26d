use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::job::JobSet;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Top-level config ──────────────────────────────────────────

/// Full configuration for a playloop run.
///
/// Parsed from TOML with support for `PLAYLOOP_*` environment variable
/// overrides, then validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayloopConfig {
    pub general: GeneralConfig,

    /// Explicitly enabled jobs. Used as the job source when non-empty and no
    /// plan was requested.
    #[serde(default)]
    pub enabled_tests: EnabledTests,

    /// Extra environment exported to every attempt process.
    #[serde(default)]
    pub runner_settings: BTreeMap<String, String>,
}

// ── Section configs ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Root directory holding `functional_tests/`, `ha_tests/`, `plans/`
    /// and the default inventory.
    pub test_directory: PathBuf,

    /// Where plan files live. Defaults to `<test_directory>/plans`.
    pub plans_directory: Option<PathBuf>,

    /// Inventory paths. Defaults to `<test_directory>/inventory/hosts` when present.
    #[serde(default)]
    pub inventory: Vec<PathBuf>,

    /// Extra-vars file, passed along only if it exists.
    #[serde(default = "default_extra_vars")]
    pub extra_vars: PathBuf,

    /// Per-job private data dirs go here instead of under `test_directory`.
    pub output_directory: Option<PathBuf>,

    /// Fact cache plugin name.
    pub fact_caching: Option<String>,

    /// Maximum iterations per job.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Failed attempts a job may accumulate before it is dropped.
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Delay between poll sweeps in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// CSV report path.
    #[serde(default = "default_report")]
    pub report: PathBuf,

    /// Executable used to run a playbook.
    #[serde(default = "default_playbook_command")]
    pub playbook_command: String,
}

fn default_extra_vars() -> PathBuf {
    "extra_vars.yaml".into()
}

fn default_iterations() -> u32 {
    20
}

fn default_max_failures() -> u32 {
    3
}

fn default_sweep_interval() -> u64 {
    2
}

fn default_report() -> PathBuf {
    "report.csv".into()
}

fn default_playbook_command() -> String {
    "ansible-playbook".into()
}

impl GeneralConfig {
    /// Defaults for everything except the test directory.
    pub fn new(test_directory: impl Into<PathBuf>) -> Self {
        Self {
            test_directory: test_directory.into(),
            plans_directory: None,
            inventory: Vec::new(),
            extra_vars: default_extra_vars(),
            output_directory: None,
            fact_caching: None,
            iterations: default_iterations(),
            max_failures: default_max_failures(),
            sweep_interval_secs: default_sweep_interval(),
            report: default_report(),
            playbook_command: default_playbook_command(),
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.plans_directory
            .clone()
            .unwrap_or_else(|| self.test_directory.join("plans"))
    }

    /// Inventory to hand to the playbook runner.
    ///
    /// An explicit list is used as-is. Otherwise the conventional
    /// `inventory/hosts` file is used if it exists, else no inventory at all.
    pub fn resolved_inventory(&self) -> Vec<PathBuf> {
        if !self.inventory.is_empty() {
            return self.inventory.clone();
        }
        let fallback = self.test_directory.join("inventory").join("hosts");
        if fallback.exists() {
            vec![fallback]
        } else {
            Vec::new()
        }
    }

    fn output_root(&self) -> &Path {
        self.output_directory
            .as_deref()
            .unwrap_or(&self.test_directory)
    }

    /// Base directory for a job's private data (artifacts, logs).
    pub fn private_data_dir(&self, job_name: &str) -> PathBuf {
        self.output_root().join(job_name)
    }

    /// Where the CSV report is written. Relative paths resolve against the
    /// output directory, or the test directory when none is set.
    pub fn report_path(&self) -> PathBuf {
        self.output_root().join(&self.report)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnabledTests {
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub ha: Vec<String>,
}

impl EnabledTests {
    pub fn is_empty(&self) -> bool {
        self.functional.is_empty() && self.ha.is_empty()
    }

    pub fn to_job_set(&self) -> JobSet {
        JobSet::new(self.functional.clone(), self.ha.clone())
    }
}

// ── Loading & Validation ────────────────────────────────────────

impl PlayloopConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Config rooted at `test_directory` with every default applied.
    pub fn with_test_directory(test_directory: impl Into<PathBuf>) -> Self {
        Self {
            general: GeneralConfig::new(test_directory),
            enabled_tests: EnabledTests::default(),
            runner_settings: BTreeMap::new(),
        }
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `PLAYLOOP_SECTION_KEY` overrides `section.key`.
    /// - `PLAYLOOP_GENERAL_TEST_DIRECTORY` → `general.test_directory`
    /// - `PLAYLOOP_GENERAL_OUTPUT_DIRECTORY` → `general.output_directory`
    /// - `PLAYLOOP_GENERAL_REPORT` → `general.report`
    /// - `PLAYLOOP_GENERAL_ITERATIONS` → `general.iterations`
    /// - `PLAYLOOP_GENERAL_MAX_FAILURES` → `general.max_failures`
    /// - `PLAYLOOP_GENERAL_SWEEP_INTERVAL_SECS` → `general.sweep_interval_secs`
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PLAYLOOP_GENERAL_TEST_DIRECTORY") {
            self.general.test_directory = v.into();
        }
        if let Some(v) = lookup("PLAYLOOP_GENERAL_OUTPUT_DIRECTORY") {
            self.general.output_directory = Some(v.into());
        }
        if let Some(v) = lookup("PLAYLOOP_GENERAL_REPORT") {
            self.general.report = v.into();
        }
        if let Some(n) = lookup("PLAYLOOP_GENERAL_ITERATIONS").and_then(|v| v.parse().ok()) {
            self.general.iterations = n;
        }
        if let Some(n) = lookup("PLAYLOOP_GENERAL_MAX_FAILURES").and_then(|v| v.parse().ok()) {
            self.general.max_failures = n;
        }
        if let Some(n) =
            lookup("PLAYLOOP_GENERAL_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok())
        {
            self.general.sweep_interval_secs = n;
        }
    }

    /// Validate limits and required paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.test_directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "general.test_directory must not be empty".into(),
            ));
        }
        if self.general.iterations == 0 {
            return Err(ConfigError::Invalid(
                "general.iterations must be at least 1".into(),
            ));
        }
        if self.general.max_failures == 0 {
            return Err(ConfigError::Invalid(
                "general.max_failures must be at least 1".into(),
            ));
        }
        if self.general.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "general.sweep_interval_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[general]
test_directory = "/srv/infra-tests"
"#;
        let cfg = PlayloopConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.general.test_directory, PathBuf::from("/srv/infra-tests"));
        assert_eq!(cfg.general.iterations, 20);
        assert_eq!(cfg.general.max_failures, 3);
        assert_eq!(cfg.general.sweep_interval(), Duration::from_secs(2));
        assert_eq!(cfg.general.report, PathBuf::from("report.csv"));
        assert_eq!(cfg.general.playbook_command, "ansible-playbook");
        assert!(cfg.enabled_tests.is_empty());
        assert!(cfg.runner_settings.is_empty());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[general]
test_directory = "/srv/infra-tests"
plans_directory = "/srv/plans"
inventory = ["/etc/ansible/hosts", "/etc/ansible/extra"]
output_directory = "/var/lib/playloop"
fact_caching = "jsonfile"
iterations = 5
max_failures = 1
report = "out.csv"

[enabled_tests]
functional = ["create-volume", "attach-volume"]
ha = ["kill-controller"]

[runner_settings]
ANSIBLE_TIMEOUT = "60"
"#;
        let cfg = PlayloopConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.general.iterations, 5);
        assert_eq!(cfg.general.max_failures, 1);
        assert_eq!(cfg.general.plans_dir(), PathBuf::from("/srv/plans"));
        assert_eq!(cfg.general.resolved_inventory().len(), 2);
        assert_eq!(
            cfg.general.private_data_dir("create-volume"),
            PathBuf::from("/var/lib/playloop/create-volume")
        );
        assert_eq!(
            cfg.general.report_path(),
            PathBuf::from("/var/lib/playloop/out.csv")
        );
        assert_eq!(cfg.enabled_tests.functional.len(), 2);
        assert_eq!(cfg.enabled_tests.to_job_set().ha, vec!["kill-controller"]);
        assert_eq!(cfg.runner_settings["ANSIBLE_TIMEOUT"], "60");
    }

    #[test]
    fn missing_general_section_fails() {
        let err = PlayloopConfig::from_toml("[enabled_tests]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_iterations_rejected() {
        let toml = r#"
[general]
test_directory = "/srv/t"
iterations = 0
"#;
        let err = PlayloopConfig::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains("iterations"));
    }

    #[test]
    fn zero_max_failures_rejected() {
        let mut cfg = PlayloopConfig::with_test_directory("/srv/t");
        cfg.general.max_failures = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_failures"));
    }

    #[test]
    fn empty_test_directory_rejected() {
        let cfg = PlayloopConfig::with_test_directory("");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn defaults_derive_from_test_directory() {
        let cfg = PlayloopConfig::with_test_directory("/srv/t");
        assert_eq!(cfg.general.plans_dir(), PathBuf::from("/srv/t/plans"));
        assert_eq!(
            cfg.general.private_data_dir("job1"),
            PathBuf::from("/srv/t/job1")
        );
        assert_eq!(cfg.general.report_path(), PathBuf::from("/srv/t/report.csv"));
    }

    #[test]
    fn inventory_fallback_only_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PlayloopConfig::with_test_directory(dir.path());
        assert!(cfg.general.resolved_inventory().is_empty());

        std::fs::create_dir_all(dir.path().join("inventory")).unwrap();
        std::fs::write(dir.path().join("inventory/hosts"), "localhost\n").unwrap();
        assert_eq!(
            cfg.general.resolved_inventory(),
            vec![dir.path().join("inventory/hosts")]
        );
    }

    #[test]
    fn overrides_replace_file_values() {
        let vars: BTreeMap<&str, &str> = [
            ("PLAYLOOP_GENERAL_MAX_FAILURES", "7"),
            ("PLAYLOOP_GENERAL_REPORT", "/tmp/r.csv"),
        ]
        .into_iter()
        .collect();
        let mut cfg = PlayloopConfig::with_test_directory("/srv/t");
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.general.max_failures, 7);
        assert_eq!(cfg.general.report, PathBuf::from("/tmp/r.csv"));
        assert_eq!(cfg.general.iterations, 20);
    }

    #[test]
    fn unparsable_numeric_override_ignored() {
        let mut cfg = PlayloopConfig::with_test_directory("/srv/t");
        cfg.apply_overrides(|k| (k == "PLAYLOOP_GENERAL_ITERATIONS").then(|| "many".to_string()));
        assert_eq!(cfg.general.iterations, 20);
    }

    #[test]
    fn from_file_reports_path_on_missing_file() {
        let err = PlayloopConfig::from_file("/nonexistent/playloop.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/playloop.toml"));
    }
}
