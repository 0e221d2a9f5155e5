// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::VidraConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &VidraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    let level = config.studio.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        invalid(format!(
            "studio.log_level `{}` must be one of: {}",
            config.studio.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.studio.default_model.trim().is_empty() {
        invalid("studio.default_model must not be empty".to_string());
    }

    if config.health.heartbeat_interval_secs == 0 {
        invalid("health.heartbeat_interval_secs must be at least 1".to_string());
    }

    if config.health.heal_threshold == 0 {
        invalid("health.heal_threshold must be at least 1".to_string());
    }

    if config.health.log_capacity == 0 {
        invalid("health.log_capacity must be at least 1".to_string());
    }

    let base_url = config.gemini.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        invalid(format!(
            "gemini.base_url `{base_url}` must be an http(s) URL"
        ));
    }

    if config.gemini.poll_interval_secs == 0 {
        invalid("gemini.poll_interval_secs must be at least 1".to_string());
    }

    if config.gemini.max_poll_attempts == 0 {
        invalid("gemini.max_poll_attempts must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if config.storage.media_cache_dir.trim().is_empty() {
        invalid("storage.media_cache_dir must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
