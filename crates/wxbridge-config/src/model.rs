// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the wxbridge gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level wxbridge configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// WeChat session and account settings.
    #[serde(default)]
    pub wechat: WeChatConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WeChat session and account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WeChatConfig {
    /// Directory holding one `<account id>.json` credential blob per account.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Path of the persisted account store (permission, expiry, id list).
    #[serde(default = "default_account_store")]
    pub account_store: String,

    /// Window in which a repeated session error is logged only once.
    #[serde(default = "default_error_suppression_secs")]
    pub error_suppression_secs: u64,

    /// Delay between login and attaching the inbound message handler.
    ///
    /// Lets the initial contact sync settle so the backlog the provider
    /// replays on login is not normalized against an empty contact table.
    #[serde(default = "default_message_grace_ms")]
    pub message_grace_ms: u64,
}

impl Default for WeChatConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            account_store: default_account_store(),
            error_suppression_secs: default_error_suppression_secs(),
            message_grace_ms: default_message_grace_ms(),
        }
    }
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("wxbridge").join("WeChat"))
        .unwrap_or_else(|| std::path::PathBuf::from("data/WeChat"))
        .to_string_lossy()
        .into_owned()
}

fn default_account_store() -> String {
    dirs::config_dir()
        .map(|p| p.join("wxbridge").join("accounts.toml"))
        .unwrap_or_else(|| std::path::PathBuf::from("config/WeChat.toml"))
        .to_string_lossy()
        .into_owned()
}

fn default_error_suppression_secs() -> u64 {
    15
}

fn default_message_grace_ms() -> u64 {
    5000
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
