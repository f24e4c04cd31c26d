use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Scheduling class of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobClass {
    /// Every job runs concurrently, each up to its own iteration budget.
    Functional,
    /// High-availability / chaos jobs. Only one runs at a time across the class.
    Ha,
}

impl JobClass {
    /// Lowercase label used in directory names and attempt identities.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobClass::Functional => "functional",
            JobClass::Ha => "ha",
        }
    }

    /// Name of the directory holding this class's job definitions.
    pub fn tests_dir(&self) -> String {
        format!("{}_tests", self.as_str())
    }
}

impl fmt::Display for JobClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable job definition: a name unique within its class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub class: JobClass,
}

impl JobDefinition {
    pub fn new(name: impl Into<String>, class: JobClass) -> Self {
        Self {
            name: name.into(),
            class,
        }
    }
}

/// The two ordered job lists handed to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSet {
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub ha: Vec<String>,
}

impl JobSet {
    pub fn new(functional: Vec<String>, ha: Vec<String>) -> Self {
        Self { functional, ha }
    }

    pub fn is_empty(&self) -> bool {
        self.functional.is_empty() && self.ha.is_empty()
    }

    pub fn len(&self) -> usize {
        self.functional.len() + self.ha.len()
    }

    /// Append another set's lists, preserving order.
    pub fn extend(&mut self, other: JobSet) {
        self.functional.extend(other.functional);
        self.ha.extend(other.ha);
    }

    /// All definitions, functional first.
    pub fn definitions(&self) -> Vec<JobDefinition> {
        self.functional
            .iter()
            .map(|n| JobDefinition::new(n.clone(), JobClass::Functional))
            .chain(
                self.ha
                    .iter()
                    .map(|n| JobDefinition::new(n.clone(), JobClass::Ha)),
            )
            .collect()
    }

    /// Reject duplicate names within a class.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (class, names) in [(JobClass::Functional, &self.functional), (JobClass::Ha, &self.ha)] {
            let mut seen = HashSet::new();
            for name in names {
                if !seen.insert(name.as_str()) {
                    return Err(ConfigError::DuplicateJob {
                        class: class.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
