// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tollgate.toml` > `~/.config/tollgate/tollgate.toml` > `/etc/tollgate/tollgate.toml`
//! with environment variable overrides via `TOLLGATE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TollgateConfig;

/// Config sections addressable through `TOLLGATE_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &["ledger", "storage", "guard"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tollgate/tollgate.toml` (system-wide)
/// 3. `~/.config/tollgate/tollgate.toml` (user XDG config)
/// 4. `./tollgate.toml` (local directory)
/// 5. `TOLLGATE_*` environment variables
pub fn load_config() -> Result<TollgateConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TollgateConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TollgateConfig::default()))
        .merge(Toml::file("/etc/tollgate/tollgate.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tollgate/tollgate.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tollgate.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `TOLLGATE_STORAGE_BUSY_TIMEOUT_MS` to
/// `storage.busy_timeout_ms`.
///
/// Only the section prefix becomes a dot, so underscores inside key names
/// survive.
pub fn env_provider() -> Env {
    Env::prefixed("TOLLGATE_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    ENV_SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|rest| format!("{section}.{rest}"))
        })
        .unwrap_or_else(|| key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_keep_inner_underscores() {
        assert_eq!(
            map_env_key("storage_busy_timeout_ms"),
            "storage.busy_timeout_ms"
        );
        assert_eq!(
            map_env_key("guard_cost_ceiling_percent"),
            "guard.cost_ceiling_percent"
        );
        assert_eq!(map_env_key("ledger_log_level"), "ledger.log_level");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("bogus_key"), "bogus_key");
    }
}
