use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};

/// Paces poll sweeps.
///
/// The run loop awaits one tick before every sweep. Tests substitute a
/// ticker that returns immediately.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Wall-clock ticker backed by [`tokio::time::interval`].
///
/// The first tick completes immediately. Must be created inside a Tokio runtime.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}
