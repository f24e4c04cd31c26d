//! Bounded-iteration, bounded-failure job scheduler.
//!
//! Functional jobs all start at once and each loops up to its own iteration
//! budget. HA jobs share a single slot: after every HA completion the next
//! one to run is drawn at random from the surviving HA jobs. A job leaves
//! tracking when it succeeds at its last iteration or exhausts its failure
//! budget; the scheduler finishes once nothing is left.

pub mod attempt;
pub mod event;
pub mod metrics;
pub mod policy;
pub mod record;
pub mod runner;
pub mod sink;
pub mod ticker;

pub use attempt::{
    Attempt, AttemptHandle, AttemptQueryError, AttemptSpec, AttemptStatus, JobLauncher,
    LaunchError,
};
pub use event::SchedulerEvent;
pub use metrics::SchedulerMetrics;
pub use policy::{pick, Limits, Verdict};
pub use record::{JobRecord, RecordId};
pub use runner::Scheduler;
pub use sink::ResultSink;
pub use ticker::{IntervalTicker, Ticker};
