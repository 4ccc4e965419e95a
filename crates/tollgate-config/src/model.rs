// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tollgate ledger.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tollgate configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TollgateConfig {
    /// Ledger behavior: retries, logging, admin grants.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Profit-protection thresholds.
    #[serde(default)]
    pub guard: GuardConfig,
}

/// Ledger behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How many times a charge or purchase is re-run after a transaction conflict.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Base backoff between conflict retries; attempt `n` waits `n * retry_backoff_ms`.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Wallet tokens granted to newly opened admin accounts.
    #[serde(default = "default_initial_admin_tokens")]
    pub initial_admin_tokens: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_conflict_retries: default_max_conflict_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            initial_admin_tokens: default_initial_admin_tokens(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    10
}

fn default_initial_admin_tokens() -> u64 {
    1_000_000
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database before reporting busy.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Deadline for a whole ledger transaction, begin to commit.
    #[serde(default = "default_transaction_timeout_ms")]
    pub transaction_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
            transaction_timeout_ms: default_transaction_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tollgate").join("tollgate.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tollgate.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_transaction_timeout_ms() -> u64 {
    10_000
}

/// Profit-protection thresholds, as whole percentages.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Accumulated owner cost may not exceed this share of lifetime spend.
    #[serde(default = "default_cost_ceiling_percent")]
    pub cost_ceiling_percent: u32,

    /// Share of the ceiling at which charges carry a warning.
    #[serde(default = "default_warning_percent")]
    pub warning_percent: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cost_ceiling_percent: default_cost_ceiling_percent(),
            warning_percent: default_warning_percent(),
        }
    }
}

fn default_cost_ceiling_percent() -> u32 {
    50
}

fn default_warning_percent() -> u32 {
    80
}
