use std::fmt;

use playloop_core::JobClass;

use crate::attempt::Attempt;

/// Stable identity of a record for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub(crate) u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutable tracking state for one job.
///
/// `iteration` is the attempt currently running (or last run); a parked HA
/// job that has never been launched sits at 0. `failures` accumulates over
/// the job's whole lifetime.
#[derive(Debug)]
pub struct JobRecord<H> {
    pub(crate) id: RecordId,
    pub(crate) name: String,
    pub(crate) class: JobClass,
    pub(crate) iteration: u32,
    pub(crate) failures: u32,
    pub(crate) attempt: Option<Attempt<H>>,
}

impl<H> JobRecord<H> {
    pub(crate) fn new(id: RecordId, name: impl Into<String>, class: JobClass) -> Self {
        Self {
            id,
            name: name.into(),
            class,
            iteration: 0,
            failures: 0,
            attempt: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> JobClass {
        self.class
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Whether an attempt is in flight.
    pub fn is_running(&self) -> bool {
        self.attempt.is_some()
    }

    pub fn is_ha(&self) -> bool {
        self.class == JobClass::Ha
    }
}
