//! Pure scheduling decisions: budget accounting and random selection.
//!
//! Nothing here performs I/O. The runner applies these decisions to its
//! record collection and talks to the launcher and result sink.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::record::JobRecord;

/// Per-job iteration and failure budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_iterations: u32,
    pub max_failures: u32,
}

impl Limits {
    /// Both budgets are clamped to at least 1 so every job can run once.
    pub fn new(max_iterations: u32, max_failures: u32) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            max_failures: max_failures.max(1),
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(20, 3)
    }
}

/// What happens to a record after one of its attempts finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// Still within both budgets; eligible to run again.
    Relaunch,
    /// Succeeded at its final iteration.
    Completed,
    /// Failure count reached `max_failures`.
    FailureBudgetExceeded,
    /// Failed at its final iteration with failure budget to spare.
    IterationBudgetExhausted,
}

impl Verdict {
    /// Whether the record leaves tracking.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Verdict::Relaunch)
    }
}

/// Account for a finished attempt and decide the record's fate.
///
/// A failure is counted here, so the record's `failures` is up to date when
/// this returns.
pub fn settle<H>(record: &mut JobRecord<H>, succeeded: bool, limits: &Limits) -> Verdict {
    if !succeeded {
        record.failures += 1;
        if record.failures >= limits.max_failures {
            return Verdict::FailureBudgetExceeded;
        }
    }
    if record.iteration >= limits.max_iterations {
        return if succeeded {
            Verdict::Completed
        } else {
            Verdict::IterationBudgetExhausted
        };
    }
    Verdict::Relaunch
}

/// Pick one candidate uniformly at random.
pub fn pick<'a, T, R: Rng + ?Sized>(candidates: &'a [T], rng: &mut R) -> Option<&'a T> {
    candidates.choose(rng)
}
