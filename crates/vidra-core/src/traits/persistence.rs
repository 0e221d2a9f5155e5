// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence adapter trait for the job feed.

use async_trait::async_trait;

use crate::error::VidraError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationJob, JobId, LogLevel};

/// Adapter for storing jobs, their media, and an event log.
#[async_trait]
pub trait PersistenceAdapter: PluginAdapter {
    /// Inserts or replaces a job, storing `blob` as its media when given.
    async fn save_job(&self, job: &GenerationJob, blob: Option<&[u8]>)
    -> Result<(), VidraError>;

    /// Removes a job and its media. Deleting an unknown id is not an error.
    async fn delete_job(&self, id: &JobId) -> Result<(), VidraError>;

    /// Returns all stored jobs, most recent first.
    async fn list_jobs(&self) -> Result<Vec<GenerationJob>, VidraError>;

    /// Appends an observability event.
    async fn log_event(
        &self,
        level: LogLevel,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), VidraError>;
}
