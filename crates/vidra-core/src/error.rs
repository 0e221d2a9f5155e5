// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Vidra generation studio.

use thiserror::Error;

use crate::types::JobId;

/// The primary error type used across all Vidra adapter traits and core operations.
#[derive(Debug, Error)]
pub enum VidraError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Persistence backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generation API errors. The message is the raw upstream text and is
    /// what the classifier matches against.
    #[error("{message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested adapter was not found or not configured.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// No job with this id exists in the feed.
    #[error("job not found: {0}")]
    JobNotFound(JobId),

    /// Media cache errors (purge channel closed, filesystem failure).
    #[error("media cache error: {0}")]
    Cache(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl VidraError {
    /// Shorthand for a generation failure without an underlying source.
    pub fn generation(message: impl Into<String>) -> Self {
        VidraError::Generation {
            message: message.into(),
            source: None,
        }
    }
}
