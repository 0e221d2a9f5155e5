// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the health monitor, heal protocol, and heartbeat.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vidra_config::model::HealthConfig;
use vidra_core::{HealthStatus, LogLevel};
use vidra_health::{HealthMonitor, HealthSnapshot, HeartbeatRunner};
use vidra_test_utils::CountingPurger;

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Error pressure past the threshold purges the cache and resets to Healthy.
#[tokio::test]
async fn three_errors_trigger_purge_and_reset() {
    let purger = Arc::new(CountingPurger::new());
    let monitor = HealthMonitor::with_cache_purger(&HealthConfig::default(), purger.clone());

    monitor.report_error("e1");
    monitor.report_error("e2");
    assert_eq!(purger.count(), 0);

    monitor.report_error("e3");
    settle().await;

    assert_eq!(purger.count(), 1);
    assert_eq!(monitor.active_error_count(), 0);
    assert_eq!(monitor.status(), HealthStatus::Healthy);
    assert_eq!(monitor.heal_attempts(), 1);
}

/// A failed purge is logged but the reset still happens.
#[tokio::test]
async fn failed_purge_still_stabilizes() {
    let purger = Arc::new(CountingPurger::failing());
    let monitor = HealthMonitor::with_cache_purger(&HealthConfig::default(), purger.clone());

    for _ in 0..3 {
        monitor.report_error("boom");
    }
    settle().await;

    assert_eq!(purger.count(), 1);
    assert_eq!(monitor.active_error_count(), 0);
    let logs = monitor.logs();
    let last = logs.last().unwrap();
    assert_eq!(last.level, LogLevel::Info);
    assert_eq!(last.message, "system stabilized");
}

/// Status always matches the count reported alongside it.
#[tokio::test]
async fn observed_status_matches_count() {
    let monitor = HealthMonitor::new(&HealthConfig {
        heal_threshold: 10,
        ..HealthConfig::default()
    });
    let seen: Arc<Mutex<Vec<HealthSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = monitor.subscribe(move |s| sink.lock().unwrap().push(s.clone()));

    for _ in 0..8 {
        monitor.report_error("x");
    }
    for _ in 0..3 {
        monitor.perform_checkup();
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 12);
    for snapshot in seen.iter() {
        assert_eq!(
            snapshot.status,
            HealthStatus::from_error_count(snapshot.active_error_count)
        );
    }
    assert_eq!(seen.last().unwrap().active_error_count, 5);
    assert_eq!(seen.last().unwrap().status, HealthStatus::Degraded);
}

/// The heartbeat drains error pressure one tick at a time.
#[tokio::test(start_paused = true)]
async fn heartbeat_decays_to_healthy() {
    let config = HealthConfig {
        heartbeat_interval_secs: 30,
        heal_threshold: 100,
        ..HealthConfig::default()
    };
    let monitor = HealthMonitor::new(&config);
    monitor.report_error("a");
    monitor.report_error("b");
    assert_eq!(monitor.status(), HealthStatus::Degraded);

    let cancel = CancellationToken::new();
    let handle = HeartbeatRunner::new(monitor.clone(), &config).spawn(cancel.clone());

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(monitor.active_error_count(), 0);
    assert_eq!(monitor.status(), HealthStatus::Healthy);

    cancel.cancel();
    handle.await.unwrap();
}

/// Clones of the monitor observe the same state.
#[test]
fn clones_share_state() {
    let monitor = HealthMonitor::new(&HealthConfig::default());
    let other = monitor.clone();
    other.report_error("shared");
    assert_eq!(monitor.active_error_count(), 1);
    assert_eq!(monitor.logs().len(), 1);
}
