use playloop_core::JobClass;
use rand::Rng;
use tracing::info;

use crate::attempt::JobLauncher;
use crate::event::SchedulerEvent;
use crate::metrics::SchedulerMetrics;
use crate::policy::Limits;
use crate::record::{JobRecord, RecordId};
use crate::sink::ResultSink;

/// The job scheduler. Owns every [`JobRecord`] and is the only writer to them.
///
/// Generic over the launcher that starts attempts, the sink that receives
/// results, and the random source used for HA selection (seed it for
/// reproducible runs).
pub struct Scheduler<L: JobLauncher, S: ResultSink, R: Rng> {
    pub(super) limits: Limits,
    pub(super) launcher: L,
    pub(super) sink: S,
    pub(super) rng: R,
    /// Live records in creation order.
    pub(super) records: Vec<JobRecord<L::Handle>>,
    pub(super) next_id: u64,
    pub(super) started: bool,
    pub(super) metrics: SchedulerMetrics,
}

impl<L: JobLauncher, S: ResultSink, R: Rng> Scheduler<L, S, R> {
    pub fn new(limits: Limits, launcher: L, sink: S, rng: R) -> Self {
        info!(
            max_iterations = limits.max_iterations,
            max_failures = limits.max_failures,
            "scheduler created"
        );
        Self {
            limits,
            launcher,
            sink,
            rng,
            records: Vec::new(),
            next_id: 0,
            started: false,
            metrics: SchedulerMetrics::default(),
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn records(&self) -> &[JobRecord<L::Handle>] {
        &self.records
    }

    pub fn record(&self, name: &str, class: JobClass) -> Option<&JobRecord<L::Handle>> {
        self.records
            .iter()
            .find(|r| r.name == name && r.class == class)
    }

    /// True once every record has been removed.
    pub fn is_drained(&self) -> bool {
        self.records.is_empty()
    }

    /// Records with an attempt in flight.
    pub fn running(&self) -> impl Iterator<Item = &JobRecord<L::Handle>> {
        self.records.iter().filter(|r| r.is_running())
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.metrics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub(super) fn allocate_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(super) fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub(super) fn emit(events: &mut Vec<SchedulerEvent>, event: SchedulerEvent) {
        event.log();
        events.push(event);
    }
}
