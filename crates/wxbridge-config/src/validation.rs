// SPDX-FileCopyrightText: 2026 Wxbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::BridgeConfig;

/// Accepted range for the error suppression window, in seconds.
pub const SUPPRESSION_WINDOW_SECS: std::ops::RangeInclusive<u64> = 5..=15;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validates semantic constraints, collecting every failure rather than
/// stopping at the first.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.wechat.data_dir.trim().is_empty() {
        errors.push(ConfigError::validation("wechat.data_dir must not be empty"));
    }

    if config.wechat.account_store.trim().is_empty() {
        errors.push(ConfigError::validation(
            "wechat.account_store must not be empty",
        ));
    }

    if !SUPPRESSION_WINDOW_SECS.contains(&config.wechat.error_suppression_secs) {
        errors.push(ConfigError::validation(format!(
            "wechat.error_suppression_secs must be between {} and {}, got {}",
            SUPPRESSION_WINDOW_SECS.start(),
            SUPPRESSION_WINDOW_SECS.end(),
            config.wechat.error_suppression_secs
        )));
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&BridgeConfig::default()).is_ok());
    }

    #[test]
    fn suppression_window_bounds() {
        let mut config = BridgeConfig::default();
        config.wechat.error_suppression_secs = 5;
        assert!(validate_config(&config).is_ok());
        config.wechat.error_suppression_secs = 4;
        assert!(validate_config(&config).is_err());
        config.wechat.error_suppression_secs = 16;
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)[0].contains("error_suppression_secs"));
    }

    #[test]
    fn collects_all_failures() {
        let mut config = BridgeConfig::default();
        config.wechat.data_dir = " ".into();
        config.wechat.account_store = String::new();
        config.logging.level = "loud".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
