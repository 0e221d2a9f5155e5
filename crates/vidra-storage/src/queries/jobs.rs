// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job and job media operations.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row, params};
use vidra_core::{GenerationJob, JobId, JobStatus, Resolution, ResultMedia, VidraError};

use crate::database::{Database, map_tr_err};

const JOB_COLUMNS: &str =
    "id, status, params, media_url, media_resolution, error_message, created_at";

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<GenerationJob> {
    let id: String = row.get(0)?;
    let status: String = row.get(1)?;
    let params: Option<String> = row.get(2)?;
    let media_url: Option<String> = row.get(3)?;
    let media_resolution: Option<String> = row.get(4)?;
    let error_message: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;

    let status = JobStatus::from_str(&status).map_err(|e| conversion_err(1, e))?;
    let params = params
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(|e| conversion_err(2, e))?;
    let media = match (media_url, media_resolution) {
        (Some(url), Some(resolution)) => Some(ResultMedia {
            url,
            resolution: Resolution::from_str(&resolution).map_err(|e| conversion_err(4, e))?,
        }),
        _ => None,
    };
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_err(6, e))?
        .with_timezone(&Utc);

    Ok(GenerationJob {
        id: JobId(id),
        status,
        params,
        media,
        error_message,
        created_at,
    })
}

/// Insert or update a job row, replacing its media when `blob` is given.
pub async fn upsert_job(
    db: &Database,
    job: &GenerationJob,
    blob: Option<&[u8]>,
) -> Result<(), VidraError> {
    let params = job
        .params
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| VidraError::Storage {
            source: Box::new(e),
        })?;
    let id = job.id.as_str().to_string();
    let status = job.status.to_string();
    let media_url = job.media.as_ref().map(|m| m.url.clone());
    let media_resolution = job.media.as_ref().map(|m| m.resolution.to_string());
    let error_message = job.error_message.clone();
    let created_at = format_timestamp(&job.created_at);
    let blob = blob.map(<[u8]>::to_vec);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO jobs (id, status, params, media_url, media_resolution, error_message, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    params = excluded.params,
                    media_url = excluded.media_url,
                    media_resolution = excluded.media_resolution,
                    error_message = excluded.error_message",
                params![
                    id,
                    status,
                    params,
                    media_url,
                    media_resolution,
                    error_message,
                    created_at,
                ],
            )?;
            if let Some(data) = blob {
                tx.execute(
                    "INSERT INTO job_media (job_id, data) VALUES (?1, ?2)
                     ON CONFLICT(job_id) DO UPDATE SET
                        data = excluded.data,
                        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![id, data],
                )?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Get a job by id.
pub async fn get_job(db: &Database, id: &JobId) -> Result<Option<GenerationJob>, VidraError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                row_to_job,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All jobs, most recent first.
pub async fn list_jobs(db: &Database) -> Result<Vec<GenerationJob>, VidraError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC, rowid DESC"
            ))?;
            let jobs = stmt
                .query_map([], row_to_job)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(jobs)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a job; its media row goes with it.
///
/// Returns whether a row was removed.
pub async fn delete_job(db: &Database, id: &JobId) -> Result<bool, VidraError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM job_media WHERE job_id = ?1", params![id])?;
            let removed = tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// The stored media bytes for a job, if any.
pub async fn get_media(db: &Database, id: &JobId) -> Result<Option<Vec<u8>>, VidraError> {
    let id = id.as_str().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT data FROM job_media WHERE job_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
