// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence and on-disk media cache for the Vidra studio.
//!
//! Provides:
//! - [`Database`]: the single `tokio-rusqlite` writer with PRAGMA setup and
//!   embedded `refinery` migrations
//! - [`SqliteStore`]: the `PersistenceAdapter` over jobs, media and events
//! - [`MediaCache`]: materialised media files plus a background purge worker

pub mod cache;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod store;

pub use cache::{MediaCache, PurgeHandle};
pub use database::Database;
pub use queries::events::EventRecord;
pub use store::SqliteStore;
