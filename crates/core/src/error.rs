use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or resolving the job set.
///
/// All of these are fatal: they are surfaced before the first attempt is
/// launched, so a run never starts with a partially valid setup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("plan parse error in {path}: {source}")]
    PlanParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not find {base}.yaml nor {base}.yml in {dir}")]
    PlanNotFound { base: String, dir: PathBuf },

    #[error("duplicate {class} job '{name}'")]
    DuplicateJob { class: String, name: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
