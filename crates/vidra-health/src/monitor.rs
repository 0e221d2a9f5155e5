// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The health monitor service.
//!
//! State changes fan out synchronously to subscribers. Every change is queued
//! under the state lock and the queue is drained by one thread at a time, so
//! observers see snapshots in the order the changes happened. Callbacks run
//! unlocked and may call back into the monitor; a change made from inside a
//! callback is delivered after the callback returns.

use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use vidra_config::model::HealthConfig;
use vidra_core::{CachePurger, HealthStatus, LogLevel};

use crate::log::{HealthLog, HealthLogEntry};
use crate::memory;

/// Observer invoked with the state after every change.
pub type HealthCallback = Arc<dyn Fn(&HealthSnapshot) + Send + Sync>;

/// A point-in-time copy of the monitor's state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub active_error_count: u32,
    pub last_check: DateTime<Utc>,
    pub memory_usage_bytes: Option<u64>,
}

impl HealthSnapshot {
    fn initial() -> Self {
        Self {
            status: HealthStatus::Healthy,
            active_error_count: 0,
            last_check: Utc::now(),
            memory_usage_bytes: None,
        }
    }

    fn set_error_count(&mut self, count: u32) {
        self.active_error_count = count;
        self.status = HealthStatus::from_error_count(count);
    }
}

/// Snapshots waiting to be delivered, oldest first.
#[derive(Default)]
struct Fanout {
    pending: VecDeque<HealthSnapshot>,
    draining: bool,
}

struct Shared {
    state: Mutex<HealthSnapshot>,
    fanout: Mutex<Fanout>,
    subscribers: Mutex<HashMap<u64, HealthCallback>>,
    next_subscriber: AtomicU64,
    log: Mutex<HealthLog>,
    purger: Option<Arc<dyn CachePurger>>,
    heal_threshold: u32,
    healing: AtomicBool,
    heal_attempts: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-scoped health service. Clones share the same state.
#[derive(Clone)]
pub struct HealthMonitor {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("state", &self.snapshot())
            .field("heal_threshold", &self.shared.heal_threshold)
            .finish()
    }
}

impl HealthMonitor {
    /// Creates a monitor with no cache purge channel.
    pub fn new(config: &HealthConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a monitor whose heal protocol signals `purger`.
    pub fn with_cache_purger(config: &HealthConfig, purger: Arc<dyn CachePurger>) -> Self {
        Self::build(config, Some(purger))
    }

    fn build(config: &HealthConfig, purger: Option<Arc<dyn CachePurger>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(HealthSnapshot::initial()),
                fanout: Mutex::new(Fanout::default()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(0),
                log: Mutex::new(HealthLog::new(config.log_capacity)),
                purger,
                heal_threshold: config.heal_threshold,
                healing: AtomicBool::new(false),
                heal_attempts: AtomicU64::new(0),
            }),
        }
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        lock(&self.shared.state).clone()
    }

    pub fn status(&self) -> HealthStatus {
        lock(&self.shared.state).status
    }

    pub fn active_error_count(&self) -> u32 {
        lock(&self.shared.state).active_error_count
    }

    /// Number of heal protocols started since construction.
    pub fn heal_attempts(&self) -> u64 {
        self.shared.heal_attempts.load(Ordering::SeqCst)
    }

    /// Records one error and notifies subscribers.
    ///
    /// Past the heal threshold a heal is spawned on the current tokio
    /// runtime; the caller never waits for it.
    pub fn report_error(&self, error: impl Display) {
        let snapshot = self.commit(|state| {
            let count = state.active_error_count.saturating_add(1);
            state.set_error_count(count);
        });

        self.add_log(LogLevel::Error, error.to_string());
        self.flush();

        if snapshot.active_error_count > self.shared.heal_threshold {
            self.spawn_auto_heal();
        }
    }

    fn spawn_auto_heal(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let monitor = self.clone();
                handle.spawn(async move {
                    monitor.attempt_auto_heal().await;
                });
            }
            Err(_) => {
                warn!("no tokio runtime, auto-heal skipped");
            }
        }
    }

    /// Runs the heal protocol: purge cached media, then soft-reset the error count.
    ///
    /// The reset is optimistic and does not check that the underlying fault
    /// cleared. Returns `false` if another heal was already running.
    pub async fn attempt_auto_heal(&self) -> bool {
        if self.shared.healing.swap(true, Ordering::SeqCst) {
            debug!("auto-heal already in progress");
            return false;
        }
        let _guard = HealingGuard(&self.shared.healing);
        self.shared.heal_attempts.fetch_add(1, Ordering::SeqCst);

        self.add_log(LogLevel::Warn, "error pressure high, attempting auto-heal");

        if let Some(purger) = &self.shared.purger
            && let Err(e) = purger.purge()
        {
            self.add_log(LogLevel::Error, format!("media cache purge failed: {e}"));
        }

        self.commit(|state| state.set_error_count(0));
        self.flush();

        self.add_log(LogLevel::Info, "system stabilized");
        true
    }

    /// Heartbeat checkup: decays the error count by one and samples memory.
    pub fn perform_checkup(&self) {
        let memory = memory::sample_memory_usage();
        let snapshot = self.commit(|state| {
            let count = state.active_error_count.saturating_sub(1);
            state.set_error_count(count);
            state.last_check = Utc::now();
            if memory.is_some() {
                state.memory_usage_bytes = memory;
            }
        });

        debug!(
            status = %snapshot.status,
            count = snapshot.active_error_count,
            memory_bytes = ?snapshot.memory_usage_bytes,
            "health checkup"
        );
        self.flush();
    }

    /// Registers an observer and calls it immediately with the current state.
    ///
    /// The observer stays registered until the returned handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&HealthSnapshot) + Send + Sync + 'static,
    {
        let id = self.shared.next_subscriber.fetch_add(1, Ordering::SeqCst);
        let callback: HealthCallback = Arc::new(callback);
        lock(&self.shared.subscribers).insert(id, Arc::clone(&callback));

        callback(&self.snapshot());

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.subscribers).len()
    }

    /// Appends to the ring buffer and mirrors the entry to `tracing`.
    pub fn add_log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
        lock(&self.shared.log).push(level, message);
    }

    /// Log entries, oldest first.
    pub fn logs(&self) -> Vec<HealthLogEntry> {
        lock(&self.shared.log).entries().cloned().collect()
    }

    /// Applies `change` and queues the resulting snapshot for delivery.
    fn commit(&self, change: impl FnOnce(&mut HealthSnapshot)) -> HealthSnapshot {
        let mut state = lock(&self.shared.state);
        change(&mut state);
        let snapshot = state.clone();
        lock(&self.shared.fanout)
            .pending
            .push_back(snapshot.clone());
        snapshot
    }

    /// Delivers queued snapshots unless another caller is already doing so.
    fn flush(&self) {
        {
            let mut fanout = lock(&self.shared.fanout);
            if fanout.draining {
                return;
            }
            fanout.draining = true;
        }
        let mut guard = DrainGuard {
            fanout: &self.shared.fanout,
            done: false,
        };

        loop {
            let next = {
                let mut fanout = lock(&self.shared.fanout);
                match fanout.pending.pop_front() {
                    Some(snapshot) => snapshot,
                    None => {
                        fanout.draining = false;
                        guard.done = true;
                        return;
                    }
                }
            };
            let callbacks: Vec<HealthCallback> =
                lock(&self.shared.subscribers).values().cloned().collect();
            for callback in callbacks {
                callback(&next);
            }
        }
    }
}

/// Releases the drain role if a callback unwinds.
struct DrainGuard<'a> {
    fanout: &'a Mutex<Fanout>,
    done: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            lock(self.fanout).draining = false;
        }
    }
}

/// Clears the in-progress flag even if the heal unwinds.
struct HealingGuard<'a>(&'a AtomicBool);

impl Drop for HealingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle for a registered observer; dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Removes the observer now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.subscribers).remove(&self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;
    use vidra_core::VidraError;

    fn config() -> HealthConfig {
        HealthConfig::default()
    }

    /// Records every snapshot an observer receives.
    fn recorder() -> (
        Arc<Mutex<Vec<HealthSnapshot>>>,
        impl Fn(&HealthSnapshot) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |s: &HealthSnapshot| {
            sink.lock().unwrap().push(s.clone())
        })
    }

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    struct FailingPurger;

    impl CachePurger for FailingPurger {
        fn purge(&self) -> Result<(), VidraError> {
            Err(VidraError::Cache("worker gone".into()))
        }
    }

    #[test]
    fn starts_healthy() {
        let monitor = HealthMonitor::new(&config());
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.status, HealthStatus::Healthy);
        assert_eq!(snapshot.active_error_count, 0);
        assert!(monitor.logs().is_empty());
    }

    #[test]
    fn errors_below_threshold_accumulate() {
        let monitor = HealthMonitor::new(&config());
        monitor.report_error("first");
        assert_eq!(monitor.active_error_count(), 1);
        assert_eq!(monitor.status(), HealthStatus::Degraded);
        monitor.report_error("second");
        assert_eq!(monitor.active_error_count(), 2);
        assert_eq!(monitor.heal_attempts(), 0);
    }

    #[test]
    fn report_error_logs_message_at_error_level() {
        let monitor = HealthMonitor::new(&config());
        monitor.report_error("QuotaExceeded: slow down");
        let logs = monitor.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, LogLevel::Error);
        assert_eq!(logs[0].message, "QuotaExceeded: slow down");
    }

    #[test]
    fn status_reaches_critical_without_runtime() {
        // Outside a runtime the heal cannot be spawned, so the count keeps rising.
        let monitor = HealthMonitor::new(&config());
        for n in 1..=7u32 {
            monitor.report_error("boom");
            let snapshot = monitor.snapshot();
            assert_eq!(snapshot.active_error_count, n);
            assert_eq!(snapshot.status, HealthStatus::from_error_count(n));
        }
        assert_eq!(monitor.status(), HealthStatus::Critical);
    }

    #[tokio::test]
    async fn third_error_triggers_heal_and_reset() {
        let monitor = HealthMonitor::new(&config());
        monitor.report_error("a");
        monitor.report_error("b");
        monitor.report_error("c");
        settle().await;

        assert!(monitor.heal_attempts() >= 1);
        assert_eq!(monitor.active_error_count(), 0);
        assert_eq!(monitor.status(), HealthStatus::Healthy);

        let logs = monitor.logs();
        assert!(logs.iter().any(|e| e.level == LogLevel::Warn));
        assert_eq!(logs.last().unwrap().message, "system stabilized");
        assert_eq!(logs.last().unwrap().level, LogLevel::Info);
    }

    #[tokio::test]
    async fn heal_resets_even_when_purge_fails() {
        let monitor = HealthMonitor::with_cache_purger(&config(), Arc::new(FailingPurger));
        monitor.report_error("x");
        assert!(monitor.attempt_auto_heal().await);

        assert_eq!(monitor.active_error_count(), 0);
        let logs = monitor.logs();
        assert!(
            logs.iter()
                .any(|e| e.level == LogLevel::Error && e.message.contains("purge failed"))
        );
        assert_eq!(logs.last().unwrap().message, "system stabilized");
    }

    #[tokio::test]
    async fn heal_notifies_subscribers_with_reset_state() {
        let monitor = HealthMonitor::new(&config());
        let (seen, callback) = recorder();
        let _sub = monitor.subscribe(callback);

        for _ in 0..3 {
            monitor.report_error("err");
        }
        settle().await;

        let counts: Vec<u32> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.active_error_count)
            .collect();
        assert_eq!(counts, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn subscribe_invokes_immediately() {
        let monitor = HealthMonitor::new(&config());
        let (seen, callback) = recorder();
        let _sub = monitor.subscribe(callback);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].status, HealthStatus::Healthy);
    }

    #[test]
    fn two_observers_each_see_one_error_notification() {
        let monitor = HealthMonitor::new(&config());
        let (first, cb1) = recorder();
        let (second, cb2) = recorder();
        let _a = monitor.subscribe(cb1);
        let _b = monitor.subscribe(cb2);

        monitor.report_error("one");

        for seen in [&first, &second] {
            let seen = seen.lock().unwrap();
            // Initial call plus exactly one change notification.
            assert_eq!(seen.len(), 2);
            assert_eq!(seen[1].active_error_count, 1);
            assert_eq!(seen[1].status, HealthStatus::Degraded);
        }
    }

    #[test]
    fn dropping_subscription_stops_notifications() {
        let monitor = HealthMonitor::new(&config());
        let (seen, callback) = recorder();
        let sub = monitor.subscribe(callback);
        assert_eq!(monitor.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(monitor.subscriber_count(), 0);

        monitor.report_error("ignored");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscriber_may_read_monitor_from_callback() {
        let monitor = HealthMonitor::new(&config());
        let inner = monitor.clone();
        let reads = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&reads);
        let _sub = monitor.subscribe(move |_| {
            let _ = inner.snapshot();
            counter.fetch_add(1, Ordering::SeqCst);
        });
        monitor.report_error("reentrant");
        assert_eq!(reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn checkup_decays_by_one_with_floor() {
        let monitor = HealthMonitor::new(&config());
        monitor.report_error("a");
        monitor.report_error("b");
        let before = monitor.snapshot().last_check;

        monitor.perform_checkup();
        assert_eq!(monitor.active_error_count(), 1);
        assert_eq!(monitor.status(), HealthStatus::Degraded);
        assert!(monitor.snapshot().last_check >= before);

        monitor.perform_checkup();
        monitor.perform_checkup();
        assert_eq!(monitor.active_error_count(), 0);
        assert_eq!(monitor.status(), HealthStatus::Healthy);
    }

    #[test]
    fn checkup_notifies_subscribers() {
        let monitor = HealthMonitor::new(&config());
        let (seen, callback) = recorder();
        let _sub = monitor.subscribe(callback);
        monitor.perform_checkup();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn log_buffer_is_bounded() {
        let monitor = HealthMonitor::new(&HealthConfig {
            log_capacity: 100,
            heal_threshold: u32::MAX,
            ..HealthConfig::default()
        });
        for i in 0..150 {
            monitor.add_log(LogLevel::Info, format!("line {i}"));
        }
        let logs = monitor.logs();
        assert_eq!(logs.len(), 100);
        assert_eq!(logs[0].message, "line 50");
        assert_eq!(logs[99].message, "line 149");
    }

    #[tokio::test]
    #[traced_test]
    async fn heal_protocol_is_mirrored_to_tracing() {
        let monitor = HealthMonitor::new(&config());
        monitor.report_error("upstream exploded");
        monitor.attempt_auto_heal().await;
        assert!(logs_contain("upstream exploded"));
        assert!(logs_contain("attempting auto-heal"));
        assert!(logs_contain("system stabilized"));
    }

    #[test]
    fn change_made_inside_callback_is_delivered_after_it() {
        let monitor = HealthMonitor::new(&HealthConfig {
            heal_threshold: u32::MAX,
            ..config()
        });
        let (seen, record) = recorder();
        let inner = monitor.clone();
        let _sub = monitor.subscribe(move |s: &HealthSnapshot| {
            record(s);
            if s.active_error_count == 1 {
                inner.report_error("nested");
            }
        });

        monitor.report_error("outer");

        let counts: Vec<u32> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.active_error_count)
            .collect();
        assert_eq!(counts, vec![0, 1, 2]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn observers_see_changes_in_order_across_threads() {
        let monitor = HealthMonitor::new(&HealthConfig {
            heal_threshold: u32::MAX,
            ..config()
        });
        let (seen, callback) = recorder();
        let _sub = monitor.subscribe(callback);

        let mut tasks = Vec::new();
        for t in 0..4 {
            let monitor = monitor.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    monitor.report_error(format!("task {t} error {i}"));
                    if i % 10 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let counts: Vec<u32> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.active_error_count)
            .collect();
        assert_eq!(counts.len(), 201);
        assert!(counts.windows(2).all(|w| w[0] < w[1]), "out of order: {counts:?}");
        assert_eq!(counts.last().copied(), Some(monitor.active_error_count()));
        assert_eq!(monitor.active_error_count(), 200);
    }

    #[tokio::test]
    async fn concurrent_heal_is_skipped() {
        let monitor = HealthMonitor::new(&config());
        monitor.shared.healing.store(true, Ordering::SeqCst);
        assert!(!monitor.attempt_auto_heal().await);
        assert_eq!(monitor.heal_attempts(), 0);

        monitor.shared.healing.store(false, Ordering::SeqCst);
        assert!(monitor.attempt_auto_heal().await);
        assert!(!monitor.shared.healing.load(Ordering::SeqCst));
    }
}
