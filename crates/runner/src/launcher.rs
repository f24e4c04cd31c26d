//! Runs each attempt as a playbook child process.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use playloop_core::{JobClass, PlayloopConfig};
use playloop_scheduler::{
    AttemptHandle, AttemptQueryError, AttemptSpec, AttemptStatus, JobLauncher, LaunchError,
};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::artifacts;

/// Everything needed to build a playbook command line.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Executable, normally `ansible-playbook`.
    pub program: String,
    pub test_directory: PathBuf,
    pub output_directory: Option<PathBuf>,
    pub inventory: Vec<PathBuf>,
    /// Extra-vars file, already checked for existence.
    pub extra_vars: Option<PathBuf>,
    pub fact_caching: Option<String>,
    pub env: BTreeMap<String, String>,
    /// Attempt artifact directories retained per job.
    pub keep_artifacts: usize,
}

impl LaunchSettings {
    pub fn from_config(config: &PlayloopConfig) -> Self {
        let general = &config.general;
        let extra_vars = Some(general.extra_vars.clone()).filter(|p| p.exists());
        Self {
            program: general.playbook_command.clone(),
            test_directory: general.test_directory.clone(),
            output_directory: general.output_directory.clone(),
            inventory: general.resolved_inventory(),
            extra_vars,
            fact_caching: general.fact_caching.clone(),
            env: config.runner_settings.clone(),
            keep_artifacts: general.iterations as usize,
        }
    }

    /// Bare settings for running `program` against `test_directory`.
    pub fn new(program: impl Into<String>, test_directory: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            test_directory: test_directory.into(),
            output_directory: None,
            inventory: Vec::new(),
            extra_vars: None,
            fact_caching: None,
            env: BTreeMap::new(),
            keep_artifacts: 20,
        }
    }

    pub fn private_data_dir(&self, job_name: &str) -> PathBuf {
        self.output_directory
            .as_deref()
            .unwrap_or(&self.test_directory)
            .join(job_name)
    }

    /// `<test_directory>/<class>_tests/<job>/test.yaml` (or `.yml`).
    pub fn playbook_path(&self, job_name: &str, class: JobClass) -> Result<PathBuf, LaunchError> {
        let dir = self.test_directory.join(class.tests_dir()).join(job_name);
        ["test.yaml", "test.yml"]
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.exists())
            .ok_or_else(|| {
                LaunchError::PlaybookNotFound(format!(
                    "neither test.yaml nor test.yml in {}",
                    dir.display()
                ))
            })
    }

    fn args(&self, playbook: &Path) -> Vec<String> {
        let mut args = Vec::new();
        for inv in &self.inventory {
            args.push("-i".to_string());
            args.push(inv.display().to_string());
        }
        if let Some(vars) = &self.extra_vars {
            args.push("-e".to_string());
            args.push(format!("@{}", vars.display()));
        }
        args.push(playbook.display().to_string());
        args
    }
}

/// [`JobLauncher`] that spawns one playbook process per attempt.
pub struct AnsibleLauncher {
    settings: LaunchSettings,
}

impl AnsibleLauncher {
    pub fn new(settings: LaunchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LaunchSettings {
        &self.settings
    }

    fn prepare_artifacts(&self, spec: &AttemptSpec) -> Result<PathBuf, LaunchError> {
        let private_dir = self.settings.private_data_dir(&spec.job_name);
        if self.settings.output_directory.is_some() {
            artifacts::create_private_dir(&private_dir)?;
        }
        let artifacts_dir = private_dir.join("artifacts");
        if let Err(e) = artifacts::rotate(&artifacts_dir, self.settings.keep_artifacts) {
            warn!(job = %spec.job_name, error = %e, "artifact rotation failed");
        }
        let attempt_dir = artifacts_dir.join(spec.ident());
        fs::create_dir_all(&attempt_dir)?;
        Ok(attempt_dir)
    }
}

impl JobLauncher for AnsibleLauncher {
    type Handle = PlaybookAttempt;

    fn launch(&mut self, spec: &AttemptSpec) -> Result<PlaybookAttempt, LaunchError> {
        let playbook = self.settings.playbook_path(&spec.job_name, spec.class)?;
        let attempt_dir = self.prepare_artifacts(spec)?;
        let args = self.settings.args(&playbook);

        fs::write(
            attempt_dir.join("command"),
            format!("{} {}\n", self.settings.program, args.join(" ")),
        )?;
        let stdout = File::create(attempt_dir.join("stdout"))?;
        let stderr = stdout.try_clone()?;

        let mut cmd = Command::new(&self.settings.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .env("PLAYLOOP_JOB", &spec.job_name)
            .env("PLAYLOOP_CLASS", spec.class.as_str())
            .env("PLAYLOOP_ITERATION", spec.iteration.to_string())
            .env("PLAYLOOP_FAILURES", spec.failures.to_string())
            .kill_on_drop(true);
        if let Some(cache) = &self.settings.fact_caching {
            cmd.env("ANSIBLE_CACHE_PLUGIN", cache);
        }
        for (k, v) in &self.settings.env {
            cmd.env(k, v);
        }

        let child = cmd.spawn()?;
        debug!(
            job = %spec.job_name,
            ident = %spec.ident(),
            pid = ?child.id(),
            "spawned playbook"
        );
        Ok(PlaybookAttempt {
            child,
            ident: spec.ident(),
            artifacts: attempt_dir,
        })
    }
}

/// A running playbook process.
#[derive(Debug)]
pub struct PlaybookAttempt {
    child: Child,
    ident: String,
    artifacts: PathBuf,
}

impl PlaybookAttempt {
    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// Directory holding this attempt's `stdout` and `command` files.
    pub fn artifacts(&self) -> &Path {
        &self.artifacts
    }
}

impl AttemptHandle for PlaybookAttempt {
    fn status(&mut self) -> Result<AttemptStatus, AttemptQueryError> {
        match self.child.try_wait() {
            Ok(None) => Ok(AttemptStatus::Running),
            Ok(Some(exit)) if exit.success() => Ok(AttemptStatus::Succeeded),
            Ok(Some(exit)) => {
                debug!(ident = %self.ident, code = ?exit.code(), "playbook exited with failure");
                Ok(AttemptStatus::Failed)
            }
            Err(e) => Err(AttemptQueryError::Unreachable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playbook_prefers_yaml_then_yml() {
        let dir = tempfile::tempdir().unwrap();
        let job_dir = dir.path().join("ha_tests/reboot");
        fs::create_dir_all(&job_dir).unwrap();
        fs::write(job_dir.join("test.yml"), "").unwrap();

        let settings = LaunchSettings::new("ansible-playbook", dir.path());
        assert_eq!(
            settings.playbook_path("reboot", JobClass::Ha).unwrap(),
            job_dir.join("test.yml")
        );

        fs::write(job_dir.join("test.yaml"), "").unwrap();
        assert_eq!(
            settings.playbook_path("reboot", JobClass::Ha).unwrap(),
            job_dir.join("test.yaml")
        );
    }

    #[test]
    fn missing_playbook_is_launch_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LaunchSettings::new("ansible-playbook", dir.path());
        let err = settings.playbook_path("ghost", JobClass::Functional).unwrap_err();
        assert!(matches!(err, LaunchError::PlaybookNotFound(_)));
        assert!(err.to_string().contains("functional_tests"));
    }

    #[test]
    fn args_include_inventory_and_extra_vars() {
        let mut settings = LaunchSettings::new("ansible-playbook", "/srv/t");
        settings.inventory = vec!["/etc/hosts-a".into(), "/etc/hosts-b".into()];
        settings.extra_vars = Some("/srv/vars.yaml".into());
        let args = settings.args(Path::new("/srv/t/functional_tests/x/test.yaml"));
        assert_eq!(
            args,
            vec![
                "-i",
                "/etc/hosts-a",
                "-i",
                "/etc/hosts-b",
                "-e",
                "@/srv/vars.yaml",
                "/srv/t/functional_tests/x/test.yaml",
            ]
        );
    }

    #[test]
    fn private_data_dir_follows_output_directory() {
        let mut settings = LaunchSettings::new("ansible-playbook", "/srv/t");
        assert_eq!(settings.private_data_dir("x"), PathBuf::from("/srv/t/x"));
        settings.output_directory = Some("/var/out".into());
        assert_eq!(settings.private_data_dir("x"), PathBuf::from("/var/out/x"));
    }

    #[test]
    fn settings_from_config_skip_missing_extra_vars() {
        let mut config = PlayloopConfig::with_test_directory("/srv/t");
        config.general.extra_vars = "/definitely/not/here.yaml".into();
        config.general.iterations = 7;
        config.runner_settings.insert("ANSIBLE_FORKS".into(), "10".into());

        let settings = LaunchSettings::from_config(&config);
        assert!(settings.extra_vars.is_none());
        assert_eq!(settings.keep_artifacts, 7);
        assert_eq!(settings.env["ANSIBLE_FORKS"], "10");
    }
}
