// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wxbridge.toml` > `~/.config/wxbridge/wxbridge.toml` > `/etc/wxbridge/wxbridge.toml`
//! with environment variable overrides via `WXBRIDGE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BridgeConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/wxbridge/wxbridge.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "wxbridge.toml";

/// The per-user config file under the XDG config dir, if one can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wxbridge").join("wxbridge.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wxbridge/wxbridge.toml` (system-wide)
/// 3. `~/.config/wxbridge/wxbridge.toml` (user XDG config)
/// 4. `./wxbridge.toml` (local directory)
/// 5. `WXBRIDGE_*` environment variables
pub fn load_config() -> Result<BridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<BridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BridgeConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment variable provider with explicit section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `WXBRIDGE_WECHAT_DATA_DIR` must map to `wechat.data_dir`,
/// not `wechat.data.dir`.
fn env_provider() -> Env {
    Env::prefixed("WXBRIDGE_").map(|key| env_key_to_path(key.as_str()).into())
}

/// Maps a lowercased, prefix-stripped env var name to a config key path.
pub fn env_key_to_path(key: &str) -> String {
    key.replacen("wechat_", "wechat.", 1)
        .replacen("logging_", "logging.", 1)
}
