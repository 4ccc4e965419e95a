// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw rows as stored in SQLite, and their conversion to domain records.
//!
//! Rows carry integer micro-units and signed token counts; conversion checks
//! that stored values are representable before handing out domain types.

use rusqlite::Row;
use tollgate_core::money::{from_micros, tokens_from_store};
use tollgate_core::{Account, AccountId, CostTracking, ModelEntry, PurchaseEntry, TollgateError, UsageLogEntry};

pub(crate) struct AccountRow {
    id: String,
    email: String,
    name: Option<String>,
    is_admin: bool,
    wallet_tokens: i64,
    total_spent_micros: i64,
    created_at: String,
}

impl AccountRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            name: row.get("name")?,
            is_admin: row.get("is_admin")?,
            wallet_tokens: row.get("wallet_tokens")?,
            total_spent_micros: row.get("total_spent_micros")?,
            created_at: row.get("created_at")?,
        })
    }

    pub(crate) fn into_account(self) -> Result<Account, TollgateError> {
        Ok(Account {
            id: AccountId(self.id),
            email: self.email,
            name: self.name,
            is_admin: self.is_admin,
            wallet_tokens: tokens_from_store(self.wallet_tokens, "wallet_tokens")?,
            total_spent: from_micros(self.total_spent_micros),
            created_at: self.created_at,
        })
    }
}

pub(crate) struct CostTrackingRow {
    account_id: String,
    total_tokens_used: i64,
    total_cost_micros: i64,
    updated_at: String,
}

impl CostTrackingRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            account_id: row.get("account_id")?,
            total_tokens_used: row.get("total_tokens_used")?,
            total_cost_micros: row.get("total_cost_micros")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Read the tracking columns of an `accounts LEFT JOIN cost_tracking` row.
    pub(crate) fn from_joined_row(row: &Row<'_>) -> rusqlite::Result<Option<Self>> {
        let Some(account_id) = row.get::<_, Option<String>>("tracking_account_id")? else {
            return Ok(None);
        };
        Ok(Some(Self {
            account_id,
            total_tokens_used: row.get("total_tokens_used")?,
            total_cost_micros: row.get("total_cost_micros")?,
            updated_at: row.get("updated_at")?,
        }))
    }

    pub(crate) fn into_cost_tracking(self) -> Result<CostTracking, TollgateError> {
        Ok(CostTracking {
            account_id: AccountId(self.account_id),
            total_tokens_used: tokens_from_store(self.total_tokens_used, "total_tokens_used")?,
            total_cost_to_owner: from_micros(self.total_cost_micros),
            updated_at: self.updated_at,
        })
    }
}

pub(crate) struct ModelRow {
    name: String,
    token_cost: i64,
    cost_per_use_micros: i64,
}

impl ModelRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get("name")?,
            token_cost: row.get("token_cost")?,
            cost_per_use_micros: row.get("cost_per_use_micros")?,
        })
    }

    pub(crate) fn into_model(self) -> Result<ModelEntry, TollgateError> {
        Ok(ModelEntry {
            name: self.name,
            token_cost: tokens_from_store(self.token_cost, "token_cost")?,
            cost_per_use: from_micros(self.cost_per_use_micros),
        })
    }
}

pub(crate) struct UsageRow {
    id: String,
    account_id: String,
    model_name: String,
    tokens_used: i64,
    created_at: String,
}

impl UsageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            model_name: row.get("model_name")?,
            tokens_used: row.get("tokens_used")?,
            created_at: row.get("created_at")?,
        })
    }

    pub(crate) fn into_entry(self) -> Result<UsageLogEntry, TollgateError> {
        Ok(UsageLogEntry {
            id: self.id,
            account_id: AccountId(self.account_id),
            model_name: self.model_name,
            tokens_used: tokens_from_store(self.tokens_used, "tokens_used")?,
            created_at: self.created_at,
        })
    }
}

pub(crate) struct PurchaseRow {
    id: String,
    account_id: String,
    token_amount: i64,
    price_paid_micros: i64,
    created_at: String,
}

impl PurchaseRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            account_id: row.get("account_id")?,
            token_amount: row.get("token_amount")?,
            price_paid_micros: row.get("price_paid_micros")?,
            created_at: row.get("created_at")?,
        })
    }

    pub(crate) fn into_entry(self) -> Result<PurchaseEntry, TollgateError> {
        Ok(PurchaseEntry {
            id: self.id,
            account_id: AccountId(self.account_id),
            token_amount: tokens_from_store(self.token_amount, "token_amount")?,
            price_paid: from_micros(self.price_paid_micros),
            created_at: self.created_at,
        })
    }
}
