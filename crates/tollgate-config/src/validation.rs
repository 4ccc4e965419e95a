// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as percentage ranges, non-empty paths, and non-zero timeouts.

use crate::diagnostic::ConfigError;
use crate::model::TollgateConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TollgateConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.ledger.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "ledger.log_level `{}` must be one of {}",
                config.ledger.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if i64::try_from(config.ledger.initial_admin_tokens).is_err() {
        errors.push(ConfigError::Validation {
            message: format!(
                "ledger.initial_admin_tokens must not exceed {}, got {}",
                i64::MAX,
                config.ledger.initial_admin_tokens
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.storage.transaction_timeout_ms == 0 {
        errors.push(ConfigError::Validation {
            message: "storage.transaction_timeout_ms must be greater than 0".to_string(),
        });
    }

    for (key, value) in [
        ("guard.cost_ceiling_percent", config.guard.cost_ceiling_percent),
        ("guard.warning_percent", config.guard.warning_percent),
    ] {
        if !(1..=100).contains(&value) {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be between 1 and 100, got {value}"),
            });
        }
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

    #[test]
    fn default_config_validates() {
        let config = TollgateConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TollgateConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("database_path"));
    }

    #[test]
    fn out_of_range_percentages_fail_validation() {
        let mut config = TollgateConfig::default();
        config.guard.cost_ceiling_percent = 0;
        config.guard.warning_percent = 101;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("guard.cost_ceiling_percent"));
        assert!(errors[1].to_string().contains("guard.warning_percent"));
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = TollgateConfig::default();
        config.ledger.log_level = "loud".to_string();
        config.storage.transaction_timeout_ms = 0;
        config.ledger.initial_admin_tokens = u64::MAX;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
