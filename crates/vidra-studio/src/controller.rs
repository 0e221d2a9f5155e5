// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The generation lifecycle controller.
//!
//! Job state is only mutated through the [`JobRegistry`] lock, which is never
//! held across an await. Each dispatch task touches only its own job id, and
//! a job deleted while its request is in flight silently drops the result.
//! A completion that lands while the job's storage delete is in flight waits
//! for the delete to settle first.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use vidra_config::model::StudioConfig;
use vidra_core::classify::{ClassifiedError, classify};
use vidra_core::{
    CredentialPrompt, GeneratedMedia, GenerationJob, GenerationMode, GenerationParams,
    GeneratorAdapter, ImageInput, JobId, JobStatus, LogLevel, PersistenceAdapter, ProgressFn,
    Resolution, ResultMedia, VidraError,
};
use vidra_health::HealthMonitor;

use crate::debounce::Debouncer;
use crate::notice::{Notice, Toaster};
use crate::registry::JobRegistry;

/// Buffered job updates per subscriber before it starts lagging.
const UPDATE_CHANNEL_CAPACITY: usize = 256;

const DELETE_FAILED_MESSAGE: &str = "Could not delete the video. Please try again.";

/// Timer settings for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudioOptions {
    /// Delay between an auth-class failure and the credential prompt.
    pub auth_reprompt_delay: Duration,
    /// Quiet period before a live preview is requested.
    pub preview_debounce: Duration,
    /// How long a notice stays up.
    pub notice_dismiss: Duration,
}

impl StudioOptions {
    pub fn from_config(config: &StudioConfig) -> Self {
        Self {
            auth_reprompt_delay: Duration::from_millis(config.auth_reprompt_delay_ms),
            preview_debounce: Duration::from_millis(config.preview_debounce_ms),
            notice_dismiss: Duration::from_millis(config.notice_dismiss_ms),
        }
    }
}

impl Default for StudioOptions {
    fn default() -> Self {
        Self::from_config(&StudioConfig::default())
    }
}

/// A change to the job feed.
#[derive(Debug, Clone, PartialEq)]
pub enum JobUpdate {
    Added(GenerationJob),
    Changed(GenerationJob),
    Removed(JobId),
}

impl JobUpdate {
    pub fn job_id(&self) -> &JobId {
        match self {
            JobUpdate::Added(job) | JobUpdate::Changed(job) => &job.id,
            JobUpdate::Removed(id) => id,
        }
    }
}

struct Inner {
    jobs: Mutex<JobRegistry>,
    generator: Arc<dyn GeneratorAdapter>,
    store: Arc<dyn PersistenceAdapter>,
    credentials: Arc<dyn CredentialPrompt>,
    health: HealthMonitor,
    toaster: Arc<Toaster>,
    updates: broadcast::Sender<JobUpdate>,
    preview: watch::Sender<Option<ImageInput>>,
    /// Sequence number of the most recent preview request.
    preview_seq: AtomicU64,
    preview_debouncer: Debouncer,
    options: StudioOptions,
}

/// Owns the job feed and drives every job through its lifecycle.
///
/// Cheap to clone; clones share the same feed.
#[derive(Clone)]
pub struct StudioController {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for StudioController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioController")
            .field("jobs", &self.inner.registry().len())
            .field("generator", &self.inner.generator.name())
            .field("store", &self.inner.store.name())
            .field("options", &self.inner.options)
            .finish()
    }
}

impl StudioController {
    pub fn new(
        generator: Arc<dyn GeneratorAdapter>,
        store: Arc<dyn PersistenceAdapter>,
        credentials: Arc<dyn CredentialPrompt>,
        health: HealthMonitor,
        options: StudioOptions,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (preview, _) = watch::channel(None);

        info!(
            generator = generator.name(),
            store = store.name(),
            "studio controller initialized"
        );

        Self {
            inner: Arc::new(Inner {
                jobs: Mutex::new(JobRegistry::new()),
                generator,
                store,
                credentials,
                health,
                toaster: Arc::new(Toaster::new(options.notice_dismiss)),
                updates,
                preview,
                preview_seq: AtomicU64::new(0),
                preview_debouncer: Debouncer::new(options.preview_debounce),
                options,
            }),
        }
    }

    /// Restores persisted jobs behind any jobs already in the feed.
    ///
    /// Returns how many jobs were added.
    pub async fn load_feed(&self) -> Result<usize, VidraError> {
        let stored = self.inner.store.list_jobs().await?;
        let added = self.inner.registry().extend_back(stored);
        info!(count = added, "feed restored from storage");
        Ok(added)
    }

    /// Creates a `Generating` job at the head of the feed and dispatches it.
    ///
    /// Returns without waiting for the generator. Callers are expected to
    /// check [`GenerationParams::is_submittable`] first. Must be called
    /// inside a tokio runtime.
    pub fn submit(&self, params: GenerationParams) -> JobId {
        let job = GenerationJob::pending(params.clone());
        let id = job.id.clone();

        self.inner.registry().insert_front(job.clone());
        info!(job_id = %id, mode = %params.mode, resolution = %params.resolution, "job submitted");
        self.inner.publish(JobUpdate::Added(job));

        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();
        tokio::spawn(async move {
            inner.dispatch(job_id, params).await;
        });

        id
    }

    /// Re-runs a successful job at the highest resolution.
    ///
    /// Returns `false` without changing anything unless the job exists, is in
    /// `Success` and still carries its original parameters.
    pub fn upgrade(&self, id: &JobId) -> bool {
        let mut params = None;
        let job = self.inner.registry().update(id, |job| {
            if job.begin_upgrade() {
                params = job.params.clone();
            }
        });
        let (Some(job), Some(params)) = (job, params) else {
            debug!(job_id = %id, "upgrade ignored");
            return false;
        };

        info!(job_id = %id, "upgrade started");
        self.inner.publish(JobUpdate::Changed(job));

        let inner = Arc::clone(&self.inner);
        let job_id = id.clone();
        tokio::spawn(async move {
            inner
                .run_upgrade(job_id, params.with_resolution(Resolution::highest()))
                .await;
        });
        true
    }

    /// Submits a fresh job from the parameters of an existing one.
    pub fn regenerate(&self, id: &JobId) -> Option<JobId> {
        let params = self.inner.registry().get(id)?.params.clone()?;
        Some(self.submit(params))
    }

    /// Deletes a job from storage and then from the feed.
    ///
    /// If storage refuses, the feed is left exactly as it was and an error
    /// notice is shown. A second delete of the same job waits for the first.
    pub async fn delete(&self, id: &JobId) -> Result<(), VidraError> {
        loop {
            let pending = {
                let mut registry = self.inner.registry();
                if !registry.contains(id) {
                    return Err(VidraError::JobNotFound(id.clone()));
                }
                if registry.begin_delete(id) {
                    None
                } else {
                    registry.pending_delete(id)
                }
            };
            match pending {
                None => break,
                Some(mut done) => {
                    let _ = done.changed().await;
                }
            }
        }

        let pending = PendingDelete {
            inner: &*self.inner,
            id,
            settled: false,
        };
        let result = self.inner.store.delete_job(id).await;
        let removed = pending.settle(result.is_ok());

        if let Err(e) = result {
            error!(job_id = %id, error = %e, "failed to delete job");
            self.inner.toaster.error(DELETE_FAILED_MESSAGE);
            return Err(e);
        }

        if removed.is_some() {
            info!(job_id = %id, "job deleted");
            self.inner.publish(JobUpdate::Removed(id.clone()));
        }
        Ok(())
    }

    /// Feed snapshot, most recent first.
    pub fn jobs(&self) -> Vec<GenerationJob> {
        self.inner.registry().snapshot()
    }

    pub fn job(&self, id: &JobId) -> Option<GenerationJob> {
        self.inner.registry().get(id).cloned()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<JobUpdate> {
        self.inner.updates.subscribe()
    }

    /// Waits until the job is `Success` or `Error`.
    ///
    /// An upgrading job is not terminal; this resolves once the upgrade
    /// settles. Fails with `JobNotFound` if the job is (or becomes) absent.
    pub async fn wait_for_terminal(&self, id: &JobId) -> Result<GenerationJob, VidraError> {
        let mut updates = self.subscribe_updates();
        loop {
            match self.job(id) {
                None => return Err(VidraError::JobNotFound(id.clone())),
                Some(job) if job.status.is_terminal() => return Ok(job),
                Some(_) => {}
            }

            match updates.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(VidraError::Internal("job update channel closed".into()));
                }
            }
        }
    }

    /// Debounces a live preview request; only the last call within the
    /// quiet period reaches the generator.
    ///
    /// A preview request that finishes after a newer one was scheduled is
    /// discarded.
    pub fn schedule_preview(&self, params: GenerationParams) {
        let seq = self.inner.preview_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        self.inner.preview_debouncer.schedule(async move {
            inner.refresh_preview(seq, params).await;
        });
    }

    pub fn preview(&self) -> watch::Receiver<Option<ImageInput>> {
        self.inner.preview.subscribe()
    }

    pub fn current_preview(&self) -> Option<ImageInput> {
        self.inner.preview.borrow().clone()
    }

    pub fn notices(&self) -> watch::Receiver<Option<Notice>> {
        self.inner.toaster.subscribe()
    }

    pub fn current_notice(&self) -> Option<Notice> {
        self.inner.toaster.current()
    }

    pub fn health(&self) -> &HealthMonitor {
        &self.inner.health
    }

    pub fn options(&self) -> StudioOptions {
        self.inner.options
    }
}

/// Clears a job's delete mark even if the delete future is dropped.
struct PendingDelete<'a> {
    inner: &'a Inner,
    id: &'a JobId,
    settled: bool,
}

impl PendingDelete<'_> {
    fn settle(mut self, removed: bool) -> Option<GenerationJob> {
        self.settled = true;
        self.inner.registry().finish_delete(self.id, removed)
    }
}

impl Drop for PendingDelete<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.registry().finish_delete(self.id, false);
        }
    }
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, JobRegistry> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Waits for an in-flight storage delete of `id`, if any, to settle.
    async fn await_pending_delete(&self, id: &JobId) {
        let pending = self.registry().pending_delete(id);
        if let Some(mut done) = pending {
            debug!(job_id = %id, "result waiting on pending delete");
            let _ = done.changed().await;
        }
    }

    /// Saves `job`, then undoes the save if the job was deleted meanwhile.
    ///
    /// Returns `false` when the job is no longer in the feed.
    async fn persist(&self, job: &GenerationJob, blob: Option<&[u8]>) -> bool {
        if let Err(e) = self.store.save_job(job, blob).await {
            error!(job_id = %job.id, error = %e, "failed to persist job");
        }

        self.await_pending_delete(&job.id).await;
        if self.registry().contains(&job.id) {
            return true;
        }

        debug!(job_id = %job.id, "job deleted while saving, removing stored copy");
        if let Err(e) = self.store.delete_job(&job.id).await {
            error!(job_id = %job.id, error = %e, "failed to remove stored copy of deleted job");
        }
        false
    }

    fn publish(&self, update: JobUpdate) {
        // No receivers is fine.
        let _ = self.updates.send(update);
    }

    /// Routes a request to the generator operation for its mode.
    async fn generate(&self, params: &GenerationParams) -> Result<GeneratedMedia, VidraError> {
        match params.mode {
            GenerationMode::ImageEditToVideo => {
                let Some(still) = params.start_frame.as_ref() else {
                    return Err(VidraError::generation(
                        "400 INVALID_ARGUMENT: image edit requires a start frame",
                    ));
                };
                let edited = self.generator.edit_image(still, &params.prompt).await?;
                let mut animate = params.clone();
                animate.start_frame = Some(edited);
                self.generator.generate_video(&animate).await
            }
            GenerationMode::CharacterReplacement => {
                let toaster = Arc::clone(&self.toaster);
                let on_progress: ProgressFn = Arc::new(move |stage: &str| toaster.info(stage));
                self.generator
                    .generate_character_replacement(params, on_progress)
                    .await
            }
            GenerationMode::TextToVideo
            | GenerationMode::FramesToVideo
            | GenerationMode::ReferencesToVideo => self.generator.generate_video(params).await,
        }
    }

    async fn dispatch(&self, id: JobId, params: GenerationParams) {
        match self.generate(&params).await {
            Ok(media) => self.complete(&id, media, params.resolution).await,
            Err(e) => self.fail(&id, &e).await,
        }
    }

    async fn complete(&self, id: &JobId, media: GeneratedMedia, resolution: Resolution) {
        let result = ResultMedia {
            url: media.url.clone(),
            resolution,
        };
        self.await_pending_delete(id).await;
        let Some(job) = self.registry().update(id, |job| job.succeed(result)) else {
            debug!(job_id = %id, "job deleted before completion, result dropped");
            return;
        };

        info!(job_id = %id, %resolution, "generation succeeded");
        if !self.persist(&job, Some(&media.blob)).await {
            return;
        }
        self.toaster.success("Video generated");
        self.publish(JobUpdate::Changed(job));
    }

    async fn fail(&self, id: &JobId, error: &VidraError) {
        let raw = error.to_string();
        let classified = classify(&raw);
        self.await_pending_delete(id).await;
        let Some(job) = self
            .registry()
            .update(id, |job| job.fail(classified.message.clone()))
        else {
            debug!(job_id = %id, "job deleted before failure, result dropped");
            return;
        };

        warn!(job_id = %id, kind = %classified.kind, raw = %raw, "generation failed");
        if !self.persist(&job, None).await {
            return;
        }
        self.toaster.error(classified.message.clone());
        self.health.report_error(&classified);
        self.record_failure(id, &classified).await;
        if classified.is_auth_class() {
            self.schedule_reprompt();
        }
        self.publish(JobUpdate::Changed(job));
    }

    async fn record_failure(&self, id: &JobId, classified: &ClassifiedError) {
        let metadata = json!({
            "job_id": id.as_str(),
            "kind": classified.kind.to_string(),
        });
        if let Err(e) = self
            .store
            .log_event(LogLevel::Error, &classified.raw, metadata)
            .await
        {
            warn!(job_id = %id, error = %e, "failed to write event log");
        }
    }

    fn schedule_reprompt(&self) {
        let credentials = Arc::clone(&self.credentials);
        let delay = self.options.auth_reprompt_delay;
        info!(?delay, "credential prompt scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            credentials.show_key_dialog().await;
        });
    }

    async fn run_upgrade(&self, id: JobId, params: GenerationParams) {
        let outcome = self.generate(&params).await;
        self.await_pending_delete(&id).await;
        match outcome {
            Ok(media) => {
                let result = ResultMedia {
                    url: media.url.clone(),
                    resolution: params.resolution,
                };
                let job = self.registry().update(&id, |job| {
                    if job.status == JobStatus::Upgrading {
                        job.succeed(result);
                    }
                });
                let Some(job) = job else {
                    debug!(job_id = %id, "job deleted during upgrade, result dropped");
                    return;
                };

                info!(job_id = %id, resolution = %params.resolution, "upgrade succeeded");
                if !self.persist(&job, Some(&media.blob)).await {
                    return;
                }
                self.toaster
                    .success(format!("Upgraded to {}", params.resolution));
                self.publish(JobUpdate::Changed(job));
            }
            Err(e) => {
                let classified = classify(&e.to_string());
                let Some(job) = self.registry().update(&id, |job| job.revert_upgrade()) else {
                    debug!(job_id = %id, "job deleted during upgrade");
                    return;
                };

                warn!(job_id = %id, kind = %classified.kind, "upgrade failed, original kept");
                self.toaster.error(classified.message.clone());
                self.health.report_error(&classified);
                self.publish(JobUpdate::Changed(job));
            }
        }
    }

    fn is_latest_preview(&self, seq: u64) -> bool {
        self.preview_seq.load(Ordering::SeqCst) == seq
    }

    async fn refresh_preview(&self, seq: u64, params: GenerationParams) {
        if !params.is_submittable() {
            if self.is_latest_preview(seq) {
                self.preview.send_replace(None);
            }
            return;
        }

        match self.generator.generate_preview(&params).await {
            Ok(still) => {
                let published = self.preview.send_if_modified(|current| {
                    if !self.is_latest_preview(seq) {
                        return false;
                    }
                    *current = Some(still);
                    true
                });
                if published {
                    debug!(seq, "preview refreshed");
                } else {
                    debug!(seq, "stale preview discarded");
                }
            }
            Err(e) => {
                let classified = classify(&e.to_string());
                warn!(kind = %classified.kind, error = %e, "preview failed");
                self.health.report_error(&classified);
            }
        }
    }
}
