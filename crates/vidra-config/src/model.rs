// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Vidra generation studio.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};
use vidra_core::{AspectRatio, Resolution};

/// Top-level Vidra configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VidraConfig {
    /// Generation lifecycle and UI timing settings.
    #[serde(default)]
    pub studio: StudioConfig,

    /// Health monitor settings.
    #[serde(default)]
    pub health: HealthConfig,

    /// Gemini API settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Generation lifecycle and timer configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StudioConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Video model used when a request does not name one.
    #[serde(default = "default_video_model")]
    pub default_model: String,

    #[serde(default = "default_resolution")]
    pub default_resolution: Resolution,

    #[serde(default = "default_aspect_ratio")]
    pub default_aspect_ratio: AspectRatio,

    /// Delay between an auth-class failure and the credential prompt.
    #[serde(default = "default_auth_reprompt_delay_ms")]
    pub auth_reprompt_delay_ms: u64,

    /// Quiet period before a live preview is requested.
    #[serde(default = "default_preview_debounce_ms")]
    pub preview_debounce_ms: u64,

    /// How long a notice stays visible.
    #[serde(default = "default_notice_dismiss_ms")]
    pub notice_dismiss_ms: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_model: default_video_model(),
            default_resolution: default_resolution(),
            default_aspect_ratio: default_aspect_ratio(),
            auth_reprompt_delay_ms: default_auth_reprompt_delay_ms(),
            preview_debounce_ms: default_preview_debounce_ms(),
            notice_dismiss_ms: default_notice_dismiss_ms(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_video_model() -> String {
    "veo-3.1-fast-generate-preview".to_string()
}

fn default_resolution() -> Resolution {
    Resolution::P720
}

fn default_aspect_ratio() -> AspectRatio {
    AspectRatio::Landscape
}

fn default_auth_reprompt_delay_ms() -> u64 {
    2500
}

fn default_preview_debounce_ms() -> u64 {
    1200
}

fn default_notice_dismiss_ms() -> u64 {
    4000
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Seconds between heartbeat checkups.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Active error count above which the heal protocol runs.
    #[serde(default = "default_heal_threshold")]
    pub heal_threshold: u32,

    /// Capacity of the health log ring buffer.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            heal_threshold: default_heal_threshold(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_heal_threshold() -> u32 {
    2
}

fn default_log_capacity() -> usize {
    100
}

/// Gemini API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeminiConfig {
    /// API key. `None` means the credential prompt runs on first auth failure.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_video_model")]
    pub video_model: String,

    /// Model used for still edits and previews.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Seconds between long-running operation polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            video_model: default_video_model(),
            image_model: default_image_model(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_max_poll_attempts() -> u32 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for materialised media files.
    #[serde(default = "default_media_cache_dir")]
    pub media_cache_dir: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            media_cache_dir: default_media_cache_dir(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("vidra").join("vidra.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("vidra.db"))
        .display()
        .to_string()
}

fn default_media_cache_dir() -> String {
    dirs::cache_dir()
        .map(|p| p.join("vidra").join("media"))
        .unwrap_or_else(|| std::path::PathBuf::from("vidra-media"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}
