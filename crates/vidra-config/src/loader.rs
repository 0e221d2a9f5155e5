// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! `./vidra.toml` > `~/.config/vidra/vidra.toml` > `/etc/vidra/vidra.toml`,
//! then `GEMINI_API_KEY`, then `VIDRA_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::VidraConfig;

pub(crate) const LOCAL_CONFIG: &str = "vidra.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/vidra/vidra.toml";

/// Section names recognised in `VIDRA_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["studio", "health", "gemini", "storage"];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("vidra").join(LOCAL_CONFIG))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/vidra/vidra.toml`
/// 3. `~/.config/vidra/vidra.toml`
/// 4. `./vidra.toml`
/// 5. `GEMINI_API_KEY`
/// 6. `VIDRA_*` environment variables
pub fn load_config() -> Result<VidraConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<VidraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VidraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<VidraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(VidraConfig::default()))
        .merge(Toml::file(path))
        .merge(api_key_provider())
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for the standard hierarchy.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(VidraConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(api_key_provider())
        .merge(env_provider())
}

/// The conventional `GEMINI_API_KEY` variable, mapped to `gemini.api_key`.
fn api_key_provider() -> Env {
    Env::raw()
        .only(&["GEMINI_API_KEY"])
        .map(|_| "gemini.api_key".into())
}

/// `VIDRA_*` variables mapped to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `VIDRA_STUDIO_AUTH_REPROMPT_DELAY_MS` maps to
/// `studio.auth_reprompt_delay_ms`.
fn env_provider() -> Env {
    Env::prefixed("VIDRA_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
