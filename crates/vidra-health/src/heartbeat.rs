// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic health checkups.
//!
//! The [`HeartbeatRunner`] calls [`HealthMonitor::perform_checkup`] on a fixed
//! interval until its cancellation token fires. The first checkup happens one
//! full interval after start.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vidra_config::model::HealthConfig;

use crate::monitor::HealthMonitor;

/// Drives heartbeat decay for one monitor.
#[derive(Debug, Clone)]
pub struct HeartbeatRunner {
    monitor: HealthMonitor,
    interval: Duration,
}

impl HeartbeatRunner {
    pub fn new(monitor: HealthMonitor, config: &HealthConfig) -> Self {
        Self::with_interval(
            monitor,
            Duration::from_secs(config.heartbeat_interval_secs),
        )
    }

    /// Zero intervals are clamped to one millisecond.
    pub fn with_interval(monitor: HealthMonitor, interval: Duration) -> Self {
        Self {
            monitor,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs checkups until `cancel` is triggered.
    pub async fn run(self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs(), "heartbeat started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("heartbeat tick");
                    self.monitor.perform_checkup();
                }
                _ = cancel.cancelled() => {
                    info!("heartbeat task shutting down");
                    break;
                }
            }
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
