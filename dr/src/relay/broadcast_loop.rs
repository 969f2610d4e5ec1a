//! BroadcastLoop - periodic distance broadcasts
//!
//! Wakes every tick and emits only once the update interval has passed since the last
//! successful emission, so the real cadence is the update interval rounded up to a whole
//! number of ticks and never faster.

use std::time::Duration;

use eyre::Result;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info};

use super::{ERROR_BACKOFF, STATUS_EVERY_TICKS, STATUS_SECONDS_PER_TICK, UpdateEmitter};
use crate::config::RelayConfig;
use crate::update::DistanceUpdate;

/// The rate-limited poll loop
pub struct BroadcastLoop {
    emitter: UpdateEmitter,
    update_interval: Duration,
    tick_interval: Duration,
    /// Instant of the tick that last emitted successfully
    last_update: Option<Instant>,
    ticks: u64,
}

impl BroadcastLoop {
    pub fn new(emitter: UpdateEmitter, config: &RelayConfig) -> Self {
        debug!(?config, "BroadcastLoop::new: called");
        Self {
            emitter,
            update_interval: config.update_interval(),
            tick_interval: config.tick_interval(),
            last_update: None,
            ticks: 0,
        }
    }

    /// Whether an emission is due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_update {
            Some(last) => now.saturating_duration_since(last) >= self.update_interval,
            None => true,
        }
    }

    /// Instant of the last successful emission
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Handle one tick
    ///
    /// Returns the update when one was emitted. `last_update` moves to `now` only after
    /// a successful emission.
    pub async fn tick(&mut self, now: Instant) -> Result<Option<DistanceUpdate>> {
        if !self.is_due(now) {
            return Ok(None);
        }

        debug!("BroadcastLoop::tick: emitting");
        let emission = self.emitter.emit().await?;
        self.last_update = Some(now);
        Ok(Some(emission.update))
    }

    /// Run until the task is dropped
    pub async fn run(&mut self) {
        info!(
            "Broadcast loop started (update every {:?}, tick every {:?})",
            self.update_interval, self.tick_interval
        );

        loop {
            match self.tick(Instant::now()).await {
                Ok(_) => {
                    self.ticks += 1;
                    if self.ticks % STATUS_EVERY_TICKS == 0 {
                        info!(
                            "Broadcast loop running (loop {}, {:.1}s elapsed)",
                            self.ticks,
                            self.ticks as f64 * STATUS_SECONDS_PER_TICK
                        );
                    }
                    sleep(self.tick_interval).await;
                }
                Err(e) => {
                    error!("Error in broadcast loop: {:?}", e);
                    sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }
}
