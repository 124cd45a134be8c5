use crate::runtime::engine::Engine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Periodic eviction of stalled flow instances.
///
/// Runs on its own timer and takes the same per-instance locks as the
/// engine, so a late-arriving record call and an eviction never race.
pub struct Reaper {
    engine: Arc<Engine>,
    interval: Duration,
}

impl Reaper {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        debug!(interval_ms = self.interval.as_millis() as u64, "reaper started");
        loop {
            ticker.tick().await;
            self.engine.reap(Instant::now());
        }
    }
}
