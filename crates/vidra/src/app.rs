// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime wiring shared by every command.
//!
//! Opens storage, starts the media cache purge worker and the heartbeat,
//! builds the Gemini generator and the studio controller, and restores the
//! feed. [`App::shutdown`] stops the background tasks in reverse order.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vidra_config::VidraConfig;
use vidra_core::{GenerationJob, JobStatus, PluginAdapter, VidraError};
use vidra_gemini::GeminiGenerator;
use vidra_health::{HealthMonitor, HeartbeatRunner};
use vidra_storage::{MediaCache, SqliteStore};
use vidra_studio::{StudioController, StudioOptions};

use crate::prompt::TerminalKeyPrompt;

/// Fully wired studio plus its background tasks.
pub struct App {
    pub config: VidraConfig,
    pub controller: StudioController,
    pub store: Arc<SqliteStore>,
    pub generator: Arc<GeminiGenerator>,
    pub cache: Arc<MediaCache>,
    pub prompt: Arc<TerminalKeyPrompt>,
    cancel: CancellationToken,
    heartbeat: JoinHandle<()>,
    purge_worker: JoinHandle<()>,
    notice_printer: JoinHandle<()>,
}

impl App {
    /// Builds every component and restores the persisted feed.
    pub async fn start(config: VidraConfig) -> Result<Self, VidraError> {
        let store = Arc::new(SqliteStore::open(&config.storage).await?);

        let cache = Arc::new(MediaCache::new(&config.storage.media_cache_dir));
        let (purger, purge_worker) = Arc::clone(&cache).spawn_purge_worker();

        let health = HealthMonitor::with_cache_purger(&config.health, Arc::new(purger));
        let cancel = CancellationToken::new();
        let heartbeat = HeartbeatRunner::new(health.clone(), &config.health).spawn(cancel.clone());

        let generator = Arc::new(GeminiGenerator::new(&config.gemini)?);
        let prompt = Arc::new(TerminalKeyPrompt::new(generator.client().clone()));

        let controller = StudioController::new(
            generator.clone(),
            store.clone(),
            prompt.clone(),
            health,
            StudioOptions::from_config(&config.studio),
        );
        controller.load_feed().await?;

        let notice_printer = spawn_notice_printer(&controller, cancel.clone());

        info!(
            database = config.storage.database_path,
            jobs = controller.jobs().len(),
            "vidra started"
        );

        Ok(Self {
            config,
            controller,
            store,
            generator,
            cache,
            prompt,
            cancel,
            heartbeat,
            purge_worker,
            notice_printer,
        })
    }

    /// Writes a successful job's video into the media cache.
    ///
    /// Returns `None` when the job has no stored media.
    pub async fn materialize(&self, job: &GenerationJob) -> Result<Option<PathBuf>, VidraError> {
        if job.status != JobStatus::Success {
            return Ok(None);
        }
        let Some(blob) = self.store.media(&job.id).await? else {
            return Ok(None);
        };
        let path = self.cache.materialize(&job.id, &blob, "video/mp4").await?;
        Ok(Some(path))
    }

    /// Stops background tasks and flushes storage.
    pub async fn shutdown(self) -> Result<(), VidraError> {
        self.cancel.cancel();
        if let Err(e) = self.heartbeat.await {
            warn!(error = %e, "heartbeat task ended abnormally");
        }
        if let Err(e) = self.notice_printer.await {
            warn!(error = %e, "notice printer ended abnormally");
        }

        // The purge worker exits once the monitor's handle is gone.
        drop(self.controller);
        self.purge_worker.abort();

        self.generator.shutdown().await?;
        self.store.shutdown().await?;
        debug!("vidra shut down");
        Ok(())
    }
}

/// Echoes studio notices to stderr until cancelled.
fn spawn_notice_printer(controller: &StudioController, cancel: CancellationToken) -> JoinHandle<()> {
    let mut notices = controller.notices();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = notices.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let notice = notices.borrow_and_update().clone();
                    if let Some(notice) = notice {
                        eprintln!("{}", crate::output::format_notice(&notice));
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}
