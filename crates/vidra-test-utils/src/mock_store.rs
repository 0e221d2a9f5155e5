// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory persistence adapter with injectable failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vidra_core::traits::adapter::PluginAdapter;
use vidra_core::traits::persistence::PersistenceAdapter;
use vidra_core::types::{AdapterHealth, AdapterType, GenerationJob, JobId, LogLevel};
use vidra_core::VidraError;

/// One event passed to `log_event`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    pub level: LogLevel,
    pub message: String,
    pub metadata: serde_json::Value,
}

/// Persistence backed by a `HashMap`.
#[derive(Default)]
pub struct MockStore {
    jobs: Arc<Mutex<HashMap<JobId, GenerationJob>>>,
    blobs: Arc<Mutex<HashMap<JobId, Vec<u8>>>>,
    events: Arc<Mutex<Vec<LoggedEvent>>>,
    fail_deletes: AtomicBool,
    fail_saves: AtomicBool,
    delete_delay_ms: AtomicU64,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads jobs as if written by an earlier session.
    pub async fn with_jobs(jobs: Vec<GenerationJob>) -> Self {
        let store = Self::new();
        {
            let mut map = store.jobs.lock().await;
            for job in jobs {
                map.insert(job.id.clone(), job);
            }
        }
        store
    }

    /// Makes every subsequent `delete_job` fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Makes `delete_job` return only after `delay`, with the row already gone.
    pub fn delay_deletes(&self, delay: Duration) {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.delete_delay_ms.store(ms, Ordering::SeqCst);
    }

    /// Makes every subsequent `save_job` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub async fn job(&self, id: &JobId) -> Option<GenerationJob> {
        self.jobs.lock().await.get(id).cloned()
    }

    pub async fn blob(&self, id: &JobId) -> Option<Vec<u8>> {
        self.blobs.lock().await.get(id).cloned()
    }

    pub async fn job_count(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn events(&self) -> Vec<LoggedEvent> {
        self.events.lock().await.clone()
    }
}

fn injected(what: &str) -> VidraError {
    VidraError::Storage {
        source: Box::new(std::io::Error::other(format!("injected {what} failure"))),
    }
}

#[async_trait]
impl PluginAdapter for MockStore {
    fn name(&self) -> &str {
        "mock-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Persistence
    }

    async fn health_check(&self) -> Result<AdapterHealth, VidraError> {
        Ok(AdapterHealth::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VidraError> {
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdapter for MockStore {
    async fn save_job(&self, job: &GenerationJob, blob: Option<&[u8]>) -> Result<(), VidraError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(injected("save"));
        }
        self.jobs.lock().await.insert(job.id.clone(), job.clone());
        if let Some(blob) = blob {
            self.blobs.lock().await.insert(job.id.clone(), blob.to_vec());
        }
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), VidraError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(injected("delete"));
        }
        self.jobs.lock().await.remove(id);
        self.blobs.lock().await.remove(id);
        let delay = self.delete_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<GenerationJob>, VidraError> {
        let mut jobs: Vec<GenerationJob> = self.jobs.lock().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn log_event(
        &self,
        level: LogLevel,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), VidraError> {
        self.events.lock().await.push(LoggedEvent {
            level,
            message: message.to_string(),
            metadata,
        });
        Ok(())
    }
}
