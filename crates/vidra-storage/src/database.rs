// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do not open additional connections for writes.

use std::path::Path;

use tracing::{debug, info};
use vidra_core::VidraError;

use crate::migrations;

/// Handle to the studio database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Opens (creating if needed) the database file and applies migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, VidraError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| VidraError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| VidraError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        info!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Opens a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, VidraError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| VidraError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), VidraError> {
        self.conn
            .call(move |conn| -> Result<(), VidraError> {
                let pragmas = if wal_mode {
                    "PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;"
                } else {
                    "PRAGMA synchronous = FULL;"
                };
                conn.execute_batch(pragmas).map_err(storage_err)?;
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )
                .map_err(storage_err)?;
                migrations::run_migrations(conn)
            })
            .await
            .map_err(flatten_err)?;
        debug!("database pragmas applied and migrations run");
        Ok(())
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoints the WAL so the main file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), VidraError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

fn storage_err(e: rusqlite::Error) -> VidraError {
    VidraError::Storage {
        source: Box::new(e),
    }
}

/// Convert a tokio-rusqlite error into a `VidraError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> VidraError {
    VidraError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a closure error that is already a `VidraError`.
fn flatten_err(e: tokio_rusqlite::Error<VidraError>) -> VidraError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => VidraError::Storage {
            source: other.to_string().into(),
        },
    }
}
