// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional store contract used by the ledger.
//!
//! A transaction is expressed as a closure: [`LedgerStore::transact`] opens a
//! transaction scoped to one account, hands the closure a [`LedgerTxn`], and
//! commits if the closure returns `Ok` or rolls back if it returns `Err`.
//! Callers therefore never observe a half-applied transaction, and there is
//! no commit or abort handle to forget.

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::traits::storage::StorageAdapter;
use crate::types::{
    Account, AccountDelta, AccountId, AccountSnapshot, CostDelta, CostTracking, ModelEntry,
    PurchaseEntry, UsageLogEntry,
};

/// Reads and writes available inside one store transaction.
///
/// Reads observe the transaction's own earlier writes. Implementations must
/// make [`update_account`](Self::update_account) and
/// [`upsert_cost_tracking`](Self::upsert_cost_tracking) single atomic writes
/// rather than read-then-write sequences.
pub trait LedgerTxn {
    fn get_account(&mut self, id: &AccountId) -> Result<Option<Account>, TollgateError>;

    fn get_cost_tracking(&mut self, id: &AccountId) -> Result<Option<CostTracking>, TollgateError>;

    fn get_model(&mut self, name: &str) -> Result<Option<ModelEntry>, TollgateError>;

    /// Insert a new account. Fails with `Validation` if the email is taken.
    fn insert_account(&mut self, account: &Account) -> Result<(), TollgateError>;

    /// Apply `delta` to the account and return the updated row.
    ///
    /// Returns `None` when no row changed: the account does not exist, or a
    /// [`TokenChange::Debit`](crate::types::TokenChange::Debit) exceeds the wallet.
    fn update_account(
        &mut self,
        id: &AccountId,
        delta: &AccountDelta,
    ) -> Result<Option<Account>, TollgateError>;

    /// Create the cost tracking row with `delta` as its initial totals, or
    /// increment the existing totals by `delta`.
    fn upsert_cost_tracking(
        &mut self,
        id: &AccountId,
        delta: &CostDelta,
    ) -> Result<CostTracking, TollgateError>;

    fn append_usage_log(&mut self, entry: &UsageLogEntry) -> Result<(), TollgateError>;

    fn append_purchase(&mut self, entry: &PurchaseEntry) -> Result<(), TollgateError>;
}

/// Durable, transactional record store backing the ledger.
#[async_trait]
pub trait LedgerStore: StorageAdapter {
    /// Run `work` inside a transaction scoped to the records of `scope`.
    ///
    /// Concurrent transactions on the same account are serialized; a
    /// transaction that cannot commit within the backend's deadline fails
    /// with [`TollgateError::Timeout`] and leaves nothing behind.
    async fn transact<T, W>(&self, scope: &AccountId, work: W) -> Result<T, TollgateError>
    where
        T: Send + 'static,
        W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError> + Send + 'static;

    /// Insert or replace a catalog entry.
    async fn put_model(&self, model: &ModelEntry) -> Result<(), TollgateError>;

    /// All catalog entries, ordered by name.
    async fn list_models(&self) -> Result<Vec<ModelEntry>, TollgateError>;

    /// Committed state of one account and its cost tracking, read without
    /// opening a write transaction. `None` if the account does not exist.
    async fn account_snapshot(
        &self,
        id: &AccountId,
    ) -> Result<Option<AccountSnapshot>, TollgateError>;

    /// Every account with its cost tracking, ordered by creation.
    async fn list_accounts(&self) -> Result<Vec<AccountSnapshot>, TollgateError>;

    /// Most recent purchases for an account, newest first.
    async fn recent_purchases(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<PurchaseEntry>, TollgateError>;

    /// Most recent usage entries for an account, newest first.
    async fn recent_usage(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<UsageLogEntry>, TollgateError>;
}
