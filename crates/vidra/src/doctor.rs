// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vidra doctor` command implementation.
//!
//! Runs diagnostic checks against the adapters, the media cache and the
//! studio health monitor, then prints one line per check.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use vidra_core::{AdapterHealth, HealthStatus, LogLevel, PluginAdapter, VidraError};
use vidra_health::HealthSnapshot;
use vidra_storage::EventRecord;

use crate::app::App;
use crate::output::truncate;

/// Events inspected by the recent-errors check.
const RECENT_EVENT_WINDOW: usize = 50;

/// Status of a diagnostic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `vidra doctor` command.
///
/// With `plain`, or when stdout is not a terminal, colors are disabled.
pub async fn run_doctor(app: &App, plain: bool) -> Result<(), VidraError> {
    let use_color = !plain && std::io::stdout().is_terminal();

    let mut results = vec![
        check_adapter("Database", app.store.as_ref()).await,
        check_adapter("Generator", app.generator.as_ref()).await,
        check_media_cache(app.cache.dir()).await,
    ];

    results.push(check_health(&app.controller.health().snapshot()));

    let events = app.store.recent_events(RECENT_EVENT_WINDOW).await?;
    results.push(check_recent_errors(&events));
    results.push(check_memory());

    print_results(&results, use_color);
    Ok(())
}

fn print_results(results: &[CheckResult], use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  vidra doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in results {
        let duration_ms = result.duration.as_millis();
        let (symbol, message) = match (result.status, use_color) {
            (CheckStatus::Pass, true) => ("✓".green().to_string(), result.message.normal().to_string()),
            (CheckStatus::Warn, true) => ("!".yellow().to_string(), result.message.yellow().to_string()),
            (CheckStatus::Fail, true) => ("✗".red().to_string(), result.message.red().to_string()),
            (CheckStatus::Pass, false) => ("[OK]  ".to_string(), result.message.clone()),
            (CheckStatus::Warn, false) => ("[WARN]".to_string(), result.message.clone()),
            (CheckStatus::Fail, false) => ("[FAIL]".to_string(), result.message.clone()),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("    {symbol} {:<16} {message} ({duration_ms}ms)", result.name);
    }

    println!();
    match issues {
        0 => println!("  All checks passed."),
        1 => println!("  1 issue found."),
        n => println!("  {n} issues found."),
    }
    println!();
}

/// Runs an adapter's own health check.
pub async fn check_adapter(name: &str, adapter: &dyn PluginAdapter) -> CheckResult {
    let start = Instant::now();
    match adapter.health_check().await {
        Ok(AdapterHealth::Healthy) => {
            CheckResult::new(name, CheckStatus::Pass, format!("{} ok", adapter.name()), start)
        }
        Ok(AdapterHealth::Degraded(reason)) => {
            CheckResult::new(name, CheckStatus::Warn, reason, start)
        }
        Ok(AdapterHealth::Unhealthy(reason)) => {
            CheckResult::new(name, CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new(name, CheckStatus::Fail, e.to_string(), start),
    }
}

/// Confirms the cache directory exists and is writable.
pub async fn check_media_cache(dir: &Path) -> CheckResult {
    let start = Instant::now();
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        return CheckResult::new(
            "Media cache",
            CheckStatus::Fail,
            format!("cannot create {}: {e}", dir.display()),
            start,
        );
    }

    let probe = dir.join(".doctor-probe");
    match tokio::fs::write(&probe, b"ok").await {
        Ok(()) => {
            let _ = tokio::fs::remove_file(&probe).await;
            CheckResult::new(
                "Media cache",
                CheckStatus::Pass,
                format!("writable: {}", dir.display()),
                start,
            )
        }
        Err(e) => CheckResult::new(
            "Media cache",
            CheckStatus::Fail,
            format!("not writable: {e}"),
            start,
        ),
    }
}

pub fn check_health(snapshot: &HealthSnapshot) -> CheckResult {
    let start = Instant::now();
    let status = match snapshot.status {
        HealthStatus::Healthy => CheckStatus::Pass,
        HealthStatus::Degraded => CheckStatus::Warn,
        HealthStatus::Critical => CheckStatus::Fail,
    };
    CheckResult::new(
        "Studio health",
        status,
        format!(
            "{}, {} active error(s)",
            snapshot.status, snapshot.active_error_count
        ),
        start,
    )
}

/// Summarises error-level entries among the persisted events.
pub fn check_recent_errors(events: &[EventRecord]) -> CheckResult {
    let start = Instant::now();
    let errors: Vec<&EventRecord> = events
        .iter()
        .filter(|e| e.level == LogLevel::Error)
        .collect();

    match errors.first() {
        None => CheckResult::new("Recent errors", CheckStatus::Pass, "none", start),
        Some(latest) => CheckResult::new(
            "Recent errors",
            CheckStatus::Warn,
            format!(
                "{} of last {}; latest: {}",
                errors.len(),
                events.len(),
                truncate(&latest.message, 60)
            ),
            start,
        ),
    }
}

pub fn check_memory() -> CheckResult {
    let start = Instant::now();

    #[cfg(not(target_env = "msvc"))]
    {
        let _ = tikv_jemalloc_ctl::epoch::advance();
        let allocated = tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0);
        let resident = tikv_jemalloc_ctl::stats::resident::read().unwrap_or(0);
        let allocated_mb = allocated as f64 / (1024.0 * 1024.0);
        let resident_mb = resident as f64 / (1024.0 * 1024.0);
        CheckResult::new(
            "Memory",
            CheckStatus::Pass,
            format!("heap: {allocated_mb:.1} MB, resident: {resident_mb:.1} MB"),
            start,
        )
    }

    #[cfg(target_env = "msvc")]
    {
        CheckResult::new(
            "Memory",
            CheckStatus::Warn,
            "jemalloc not available on MSVC",
            start,
        )
    }
}
