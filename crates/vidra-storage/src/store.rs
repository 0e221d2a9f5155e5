// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the PersistenceAdapter trait.

use async_trait::async_trait;
use tracing::debug;

use vidra_config::model::StorageConfig;
use vidra_core::{
    AdapterHealth, AdapterType, GenerationJob, JobId, LogLevel, PersistenceAdapter, PluginAdapter,
    VidraError,
};

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::queries::events::EventRecord;

/// SQLite-backed job store.
///
/// Delegates to the typed query modules over one [`Database`] handle.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Opens the database named by `config`, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, VidraError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store initialized");
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Option<GenerationJob>, VidraError> {
        queries::jobs::get_job(&self.db, id).await
    }

    /// Stored video bytes for a job.
    pub async fn media(&self, id: &JobId) -> Result<Option<Vec<u8>>, VidraError> {
        queries::jobs::get_media(&self.db, id).await
    }

    pub async fn recent_events(&self, limit: usize) -> Result<Vec<EventRecord>, VidraError> {
        queries::events::recent_events(&self.db, limit).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Persistence
    }

    async fn health_check(&self) -> Result<AdapterHealth, VidraError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(AdapterHealth::Healthy)
    }

    async fn shutdown(&self) -> Result<(), VidraError> {
        self.db.checkpoint().await
    }
}

#[async_trait]
impl PersistenceAdapter for SqliteStore {
    async fn save_job(&self, job: &GenerationJob, blob: Option<&[u8]>) -> Result<(), VidraError> {
        queries::jobs::upsert_job(&self.db, job, blob).await?;
        debug!(job_id = %job.id, status = %job.status, has_media = blob.is_some(), "job saved");
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), VidraError> {
        let removed = queries::jobs::delete_job(&self.db, id).await?;
        debug!(job_id = %id, removed, "job deleted");
        Ok(())
    }

    async fn list_jobs(&self) -> Result<Vec<GenerationJob>, VidraError> {
        queries::jobs::list_jobs(&self.db).await
    }

    async fn log_event(
        &self,
        level: LogLevel,
        message: &str,
        metadata: serde_json::Value,
    ) -> Result<(), VidraError> {
        queries::events::append_event(&self.db, level, message, &metadata).await
    }
}
