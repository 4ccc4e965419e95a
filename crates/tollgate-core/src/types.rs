// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain records shared by the store contract and the ledger.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::token_string;

/// Opaque account identifier (UUID v4 for accounts opened by the ledger).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AccountId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A verified caller, as supplied by the external auth collaborator.
///
/// The ledger trusts this value and performs no authentication of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub is_admin: bool,
}

impl Identity {
    pub fn user(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            is_admin: false,
        }
    }

    pub fn admin(account_id: impl Into<AccountId>) -> Self {
        Self {
            account_id: account_id.into(),
            is_admin: true,
        }
    }
}

/// Health status reported by store health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is fully operational.
    Healthy,
    /// Store is not operational.
    Unhealthy(String),
}

/// A prepaid account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: Option<String>,
    pub is_admin: bool,
    /// Prepaid usage credits. Never negative.
    #[serde(with = "token_string")]
    pub wallet_tokens: u64,
    /// Lifetime spend in monetary units.
    pub total_spent: Decimal,
    pub created_at: String,
}

/// Accumulated operator cost for one account. Absent until the first charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTracking {
    pub account_id: AccountId,
    #[serde(with = "token_string")]
    pub total_tokens_used: u64,
    pub total_cost_to_owner: Decimal,
    pub updated_at: String,
}

/// A catalog entry describing what one use of a model costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    pub name: String,
    /// Tokens debited from the wallet per use.
    #[serde(with = "token_string")]
    pub token_cost: u64,
    /// Operator's real cost per use.
    pub cost_per_use: Decimal,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>, token_cost: u64, cost_per_use: Decimal) -> Self {
        Self {
            name: name.into(),
            token_cost,
            cost_per_use,
        }
    }
}

/// Append-only record of one successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogEntry {
    pub id: String,
    pub account_id: AccountId,
    pub model_name: String,
    #[serde(with = "token_string")]
    pub tokens_used: u64,
    pub created_at: String,
}

impl UsageLogEntry {
    pub fn new(account_id: AccountId, model_name: String, tokens_used: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id,
            model_name,
            tokens_used,
            created_at: now_timestamp(),
        }
    }
}

/// Append-only record of one token purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseEntry {
    pub id: String,
    pub account_id: AccountId,
    #[serde(with = "token_string")]
    pub token_amount: u64,
    pub price_paid: Decimal,
    pub created_at: String,
}

impl PurchaseEntry {
    pub fn new(account_id: AccountId, token_amount: u64, price_paid: Decimal) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id,
            token_amount,
            price_paid,
            created_at: now_timestamp(),
        }
    }
}

/// Direction and size of a wallet change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenChange {
    Credit(u64),
    /// Applied only if the wallet holds at least this many tokens.
    Debit(u64),
}

/// A change applied to an account row inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDelta {
    pub tokens: TokenChange,
    pub spent_increase: Decimal,
}

impl AccountDelta {
    /// Conditional debit for a charge.
    pub fn debit(tokens: u64) -> Self {
        Self {
            tokens: TokenChange::Debit(tokens),
            spent_increase: Decimal::ZERO,
        }
    }

    /// Credit tokens and record the price paid.
    pub fn purchase(tokens: u64, price_paid: Decimal) -> Self {
        Self {
            tokens: TokenChange::Credit(tokens),
            spent_increase: price_paid,
        }
    }
}

/// Increment applied to an account's cost tracking (or its initial value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostDelta {
    pub tokens_used: u64,
    pub cost_to_owner: Decimal,
}

/// An account together with its cost tracking, as read for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub account: Account,
    pub cost_tracking: Option<CostTracking>,
}

/// Input for registering a new account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDraft {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// Current UTC time in the ledger's timestamp format (RFC 3339, millisecond precision).
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
