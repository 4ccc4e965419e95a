// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tollgate token ledger.
//!
//! This crate provides the transactional store contract, the error type,
//! fixed-point money helpers, and the domain records shared by every store
//! backend and by the ledger itself. It also ships [`MemoryLedgerStore`], a
//! volatile backend used by tests and embedders.

pub mod error;
pub mod memory;
pub mod money;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TollgateError;
pub use memory::MemoryLedgerStore;
pub use traits::{LedgerStore, LedgerTxn, StorageAdapter};
pub use types::{
    Account, AccountDelta, AccountDraft, AccountId, AccountSnapshot, CostDelta, CostTracking,
    HealthStatus, Identity, ModelEntry, PurchaseEntry, TokenChange, UsageLogEntry,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_ids_are_unique_uuids() {
        let a = AccountId::generate();
        let b = AccountId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn account_serializes_camel_case_with_string_tokens() {
        let account = Account {
            id: AccountId::from("acc-1"),
            email: "a@example.com".into(),
            name: Some("Ada".into()),
            is_admin: false,
            wallet_tokens: 150_000,
            total_spent: rust_decimal::Decimal::new(4999, 2),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["walletTokens"], "150000");
        assert_eq!(json["isAdmin"], false);
        assert_eq!(json["totalSpent"], "49.99");
    }

    #[test]
    fn memory_store_is_a_ledger_store() {
        fn assert_store<S: LedgerStore>() {}
        assert_store::<MemoryLedgerStore>();
    }
}
