// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Vidra configuration system.

use vidra_config::diagnostic::ConfigError;
use vidra_config::{load_and_validate_str, load_config_from_str};
use vidra_core::{AspectRatio, Resolution};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_vidra_config() {
    let toml = r#"
[studio]
log_level = "debug"
default_model = "veo-3.1-generate-preview"
default_resolution = "1080p"
default_aspect_ratio = "9:16"
auth_reprompt_delay_ms = 1000
preview_debounce_ms = 800
notice_dismiss_ms = 3000

[health]
heartbeat_interval_secs = 10
heal_threshold = 4
log_capacity = 50

[gemini]
api_key = "test-key"
base_url = "http://localhost:9999/v1beta"
video_model = "veo-test"
image_model = "image-test"
poll_interval_secs = 2
max_poll_attempts = 5

[storage]
database_path = "/tmp/vidra.db"
media_cache_dir = "/tmp/vidra-media"
wal_mode = false
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.studio.log_level, "debug");
    assert_eq!(config.studio.default_resolution, Resolution::P1080);
    assert_eq!(config.studio.default_aspect_ratio, AspectRatio::Portrait);
    assert_eq!(config.studio.auth_reprompt_delay_ms, 1000);
    assert_eq!(config.health.heartbeat_interval_secs, 10);
    assert_eq!(config.health.heal_threshold, 4);
    assert_eq!(config.health.log_capacity, 50);
    assert_eq!(config.gemini.api_key.as_deref(), Some("test-key"));
    assert_eq!(config.gemini.max_poll_attempts, 5);
    assert_eq!(config.storage.database_path, "/tmp/vidra.db");
    assert!(!config.storage.wal_mode);
}

/// Omitted sections fall back to defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.studio.auth_reprompt_delay_ms, 2500);
    assert_eq!(config.health.heartbeat_interval_secs, 30);
    assert_eq!(config.health.heal_threshold, 2);
    assert_eq!(config.health.log_capacity, 100);
    assert!(config.gemini.api_key.is_none());
    assert!(config.storage.wal_mode);
}

/// Unknown keys are reported with a suggestion.
#[test]
fn unknown_key_reports_suggestion() {
    let toml = r#"
[health]
heal_treshold = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("typo should be rejected");
    let found = errors.iter().any(|e| {
        matches!(
            e,
            ConfigError::UnknownKey { key, suggestion: Some(s), .. }
                if key == "heal_treshold" && s == "heal_threshold"
        )
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

/// Unknown sections are rejected at the top level.
#[test]
fn unknown_section_is_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// A wrong value type yields an InvalidType diagnostic.
#[test]
fn wrong_type_reports_invalid_type() {
    let toml = r#"
[health]
heartbeat_interval_secs = "thirty"
"#;

    let errors = load_and_validate_str(toml).expect_err("string for integer should fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got: {errors:?}"
    );
}

/// An unsupported resolution label is rejected.
#[test]
fn unknown_resolution_is_rejected() {
    let toml = r#"
[studio]
default_resolution = "4k"
"#;
    assert!(load_and_validate_str(toml).is_err());
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[health]
heartbeat_interval_secs = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero interval is invalid");
    assert!(errors.iter().any(|e| matches!(
        e,
        ConfigError::Validation { message } if message.contains("heartbeat_interval_secs")
    )));
}
