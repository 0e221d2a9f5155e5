// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event log operations.

use std::str::FromStr;

use rusqlite::params;
use rusqlite::types::Type;
use vidra_core::{LogLevel, VidraError};

use crate::database::{Database, map_tr_err};

/// One stored event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: i64,
    pub level: LogLevel,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

/// Append an event.
pub async fn append_event(
    db: &Database,
    level: LogLevel,
    message: &str,
    metadata: &serde_json::Value,
) -> Result<(), VidraError> {
    let level = level.to_string();
    let message = message.to_string();
    let metadata = metadata.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO event_log (level, message, metadata) VALUES (?1, ?2, ?3)",
                params![level, message, metadata],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The newest `limit` events, newest first.
pub async fn recent_events(db: &Database, limit: usize) -> Result<Vec<EventRecord>, VidraError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, level, message, metadata, created_at FROM event_log
                 ORDER BY id DESC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let level: String = row.get(1)?;
                let metadata: String = row.get(3)?;
                Ok(EventRecord {
                    id: row.get(0)?,
                    level: LogLevel::from_str(&level).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?,
                    message: row.get(2)?,
                    metadata: serde_json::from_str(&metadata).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
                    })?,
                    created_at: row.get(4)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}
