// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk media cache with a background purge worker.
//!
//! Generated videos are materialised as `<job id>.<ext>` under the cache
//! directory so external players can open them. The health monitor's heal
//! protocol clears the directory through a [`PurgeHandle`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vidra_core::{CachePurger, JobId, VidraError};

/// Pending purge requests beyond this are coalesced.
const PURGE_QUEUE_DEPTH: usize = 4;

fn io_err(e: std::io::Error) -> VidraError {
    VidraError::Cache(e.to_string())
}

/// Directory of materialised media files.
#[derive(Debug, Clone)]
pub struct MediaCache {
    dir: PathBuf,
}

impl MediaCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the media for `id` is (or would be) materialised.
    pub fn path_for(&self, id: &JobId, mime_type: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", id.as_str(), extension_for(mime_type)))
    }

    /// Writes `blob` to the cache and returns its path.
    pub async fn materialize(
        &self,
        id: &JobId,
        blob: &[u8],
        mime_type: &str,
    ) -> Result<PathBuf, VidraError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_err)?;
        let path = self.path_for(id, mime_type);
        tokio::fs::write(&path, blob).await.map_err(io_err)?;
        debug!(job_id = %id, path = %path.display(), bytes = blob.len(), "media materialised");
        Ok(path)
    }

    /// Removes every file in the cache directory. Returns how many were removed.
    ///
    /// A missing directory counts as empty.
    pub async fn purge(&self) -> Result<usize, VidraError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err(e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let file_type = entry.file_type().await.map_err(io_err)?;
            if !file_type.is_file() {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "failed to remove cached media"),
            }
        }
        Ok(removed)
    }

    /// Starts the purge worker. The worker exits once every handle is dropped.
    pub fn spawn_purge_worker(self: Arc<Self>) -> (PurgeHandle, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<()>(PURGE_QUEUE_DEPTH);
        let worker = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                match self.purge().await {
                    Ok(removed) => info!(removed, dir = %self.dir.display(), "media cache purged"),
                    Err(e) => warn!(error = %e, "media cache purge failed"),
                }
            }
            debug!("media cache purge worker stopped");
        });
        (PurgeHandle { tx }, worker)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "mp4",
    }
}

/// Sends purge signals to the worker started by
/// [`MediaCache::spawn_purge_worker`].
#[derive(Debug, Clone)]
pub struct PurgeHandle {
    tx: mpsc::Sender<()>,
}

impl CachePurger for PurgeHandle {
    fn purge(&self) -> Result<(), VidraError> {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(())) => {
                Err(VidraError::Cache("purge worker is not running".into()))
            }
        }
    }
}
