pub mod config;
pub mod error;
pub mod job;
pub mod source;

pub use config::{load_dotenv, GeneralConfig, EnabledTests, PlayloopConfig};
pub use error::ConfigError;
pub use job::{JobClass, JobDefinition, JobSet};
pub use source::{resolve_job_set, JobSource};
