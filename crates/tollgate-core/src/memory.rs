// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Volatile [`LedgerStore`] for tests and embedding.
//!
//! Each account's records live behind their own async mutex, so
//! transactions on different accounts never wait on each other. A
//! transaction works on a staged copy of the account's records and its
//! pending log appends; the copy is published only when the closure
//! succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use crate::error::TollgateError;
use crate::money::{self, MAX_TOKENS};
use crate::traits::{LedgerStore, LedgerTxn, StorageAdapter};
use crate::types::{
    Account, AccountDelta, AccountId, AccountSnapshot, CostDelta, CostTracking, HealthStatus,
    ModelEntry, PurchaseEntry, TokenChange, UsageLogEntry, now_timestamp,
};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
struct AccountSlot {
    account: Option<Account>,
    cost_tracking: Option<CostTracking>,
}

/// In-process ledger store with per-account locking.
pub struct MemoryLedgerStore {
    slots: DashMap<AccountId, Arc<tokio::sync::Mutex<AccountSlot>>>,
    emails: Mutex<HashMap<String, AccountId>>,
    models: RwLock<BTreeMap<String, ModelEntry>>,
    usage_log: Mutex<Vec<UsageLogEntry>>,
    purchases: Mutex<Vec<PurchaseEntry>>,
    lock_timeout: Duration,
    injected_conflicts: AtomicU32,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            emails: Mutex::new(HashMap::new()),
            models: RwLock::new(BTreeMap::new()),
            usage_log: Mutex::new(Vec::new()),
            purchases: Mutex::new(Vec::new()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            injected_conflicts: AtomicU32::new(0),
        }
    }

    /// Bound how long a transaction waits for its account lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Make the next `n` commits fail with [`TollgateError::TransactionConflict`].
    ///
    /// The failing transactions are rolled back like any other.
    pub fn fail_next_commits(&self, n: u32) {
        self.injected_conflicts.store(n, Ordering::SeqCst);
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn slot(&self, id: &AccountId) -> Arc<tokio::sync::Mutex<AccountSlot>> {
        Arc::clone(&self.slots.entry(id.clone()).or_default())
    }

    /// Drop the slot for `id` if it holds no account and no other
    /// transaction has a handle on it.
    fn release_empty_slot(&self, id: &AccountId) {
        self.slots.remove_if(id, |_, slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .map(|slot| slot.account.is_none())
                    .unwrap_or(false)
        });
    }

    /// Run `work` against a staged copy of `slot` and publish on success.
    fn run_staged<T, W>(
        &self,
        scope: &AccountId,
        slot: &mut AccountSlot,
        work: W,
    ) -> Result<T, TollgateError>
    where
        W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError>,
    {
        let mut txn = MemoryTxn {
            scope,
            staged: slot.clone(),
            models: &self.models,
            emails: &self.emails,
            pending_usage: Vec::new(),
            pending_purchases: Vec::new(),
            new_email: None,
        };
        let value = work(&mut txn)?;

        if self.take_injected_conflict() {
            debug!(account_id = %scope, "injected commit conflict");
            return Err(TollgateError::TransactionConflict {
                message: format!("injected conflict on account {scope}"),
            });
        }

        let MemoryTxn {
            staged,
            pending_usage,
            pending_purchases,
            new_email,
            ..
        } = txn;

        let mut emails = lock(&self.emails)?;
        let mut usage_log = lock(&self.usage_log)?;
        let mut purchases = lock(&self.purchases)?;
        if let Some(email) = new_email {
            if emails.contains_key(&email) {
                return Err(TollgateError::Validation(format!(
                    "an account with email {email} already exists"
                )));
            }
            emails.insert(email, scope.clone());
        }
        usage_log.extend(pending_usage);
        purchases.extend(pending_purchases);
        *slot = staged;
        Ok(value)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, TollgateError> {
    mutex
        .lock()
        .map_err(|_| TollgateError::Internal("memory store lock poisoned".into()))
}

#[async_trait]
impl StorageAdapter for MemoryLedgerStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self) -> Result<(), TollgateError> {
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, TollgateError> {
        Ok(HealthStatus::Healthy)
    }

    async fn close(&self) -> Result<(), TollgateError> {
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn transact<T, W>(&self, scope: &AccountId, work: W) -> Result<T, TollgateError>
    where
        T: Send + 'static,
        W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError> + Send + 'static,
    {
        let slot = self.slot(scope);
        let locked = tokio::time::timeout(self.lock_timeout, slot.lock_owned()).await;
        let result = match locked {
            Ok(mut guard) => self.run_staged(scope, &mut guard, work),
            Err(_) => Err(TollgateError::Timeout {
                duration: self.lock_timeout,
            }),
        };
        self.release_empty_slot(scope);
        result
    }

    async fn account_snapshot(
        &self,
        id: &AccountId,
    ) -> Result<Option<AccountSnapshot>, TollgateError> {
        let Some(slot) = self.slots.get(id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(None);
        };
        let slot = tokio::time::timeout(self.lock_timeout, slot.lock())
            .await
            .map_err(|_| TollgateError::Timeout {
                duration: self.lock_timeout,
            })?;
        Ok(slot.account.clone().map(|account| AccountSnapshot {
            account,
            cost_tracking: slot.cost_tracking.clone(),
        }))
    }

    async fn put_model(&self, model: &ModelEntry) -> Result<(), TollgateError> {
        money::check_tokens(model.token_cost, "token_cost")?;
        money::to_micros(model.cost_per_use, "cost_per_use")?;
        self.models
            .write()
            .map_err(|_| TollgateError::Internal("memory store lock poisoned".into()))?
            .insert(model.name.clone(), model.clone());
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, TollgateError> {
        let models = self
            .models
            .read()
            .map_err(|_| TollgateError::Internal("memory store lock poisoned".into()))?;
        Ok(models.values().cloned().collect())
    }

    async fn list_accounts(&self) -> Result<Vec<AccountSnapshot>, TollgateError> {
        let slots: Vec<_> = self
            .slots
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots = Vec::with_capacity(slots.len());
        for slot in slots {
            let slot = slot.lock().await;
            if let Some(account) = &slot.account {
                snapshots.push(AccountSnapshot {
                    account: account.clone(),
                    cost_tracking: slot.cost_tracking.clone(),
                });
            }
        }
        snapshots.sort_by(|a, b| {
            (&a.account.created_at, &a.account.id).cmp(&(&b.account.created_at, &b.account.id))
        });
        Ok(snapshots)
    }

    async fn recent_purchases(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<PurchaseEntry>, TollgateError> {
        let purchases = lock(&self.purchases)?;
        Ok(purchases
            .iter()
            .rev()
            .filter(|p| &p.account_id == id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn recent_usage(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<UsageLogEntry>, TollgateError> {
        let usage_log = lock(&self.usage_log)?;
        Ok(usage_log
            .iter()
            .rev()
            .filter(|u| &u.account_id == id)
            .take(limit)
            .cloned()
            .collect())
    }
}

struct MemoryTxn<'a> {
    scope: &'a AccountId,
    staged: AccountSlot,
    models: &'a RwLock<BTreeMap<String, ModelEntry>>,
    emails: &'a Mutex<HashMap<String, AccountId>>,
    pending_usage: Vec<UsageLogEntry>,
    pending_purchases: Vec<PurchaseEntry>,
    new_email: Option<String>,
}

impl MemoryTxn<'_> {
    fn check_scope(&self, id: &AccountId) -> Result<(), TollgateError> {
        if id == self.scope {
            Ok(())
        } else {
            Err(TollgateError::Internal(format!(
                "transaction scoped to account {} cannot touch account {id}",
                self.scope
            )))
        }
    }
}

impl LedgerTxn for MemoryTxn<'_> {
    fn get_account(&mut self, id: &AccountId) -> Result<Option<Account>, TollgateError> {
        self.check_scope(id)?;
        Ok(self.staged.account.clone())
    }

    fn get_cost_tracking(&mut self, id: &AccountId) -> Result<Option<CostTracking>, TollgateError> {
        self.check_scope(id)?;
        Ok(self.staged.cost_tracking.clone())
    }

    fn get_model(&mut self, name: &str) -> Result<Option<ModelEntry>, TollgateError> {
        let models = self
            .models
            .read()
            .map_err(|_| TollgateError::Internal("memory store lock poisoned".into()))?;
        Ok(models.get(name).cloned())
    }

    fn insert_account(&mut self, account: &Account) -> Result<(), TollgateError> {
        self.check_scope(&account.id)?;
        if self.staged.account.is_some() {
            return Err(TollgateError::Validation(format!(
                "account {} already exists",
                account.id
            )));
        }
        if lock(self.emails)?.contains_key(&account.email) {
            return Err(TollgateError::Validation(format!(
                "an account with email {} already exists",
                account.email
            )));
        }
        self.staged.account = Some(account.clone());
        self.new_email = Some(account.email.clone());
        Ok(())
    }

    fn update_account(
        &mut self,
        id: &AccountId,
        delta: &AccountDelta,
    ) -> Result<Option<Account>, TollgateError> {
        self.check_scope(id)?;
        let Some(account) = self.staged.account.as_mut() else {
            return Ok(None);
        };
        let wallet = match delta.tokens {
            TokenChange::Debit(n) => match account.wallet_tokens.checked_sub(n) {
                Some(wallet) => wallet,
                None => return Ok(None),
            },
            TokenChange::Credit(n) => match account.wallet_tokens.checked_add(n) {
                Some(wallet) if wallet <= MAX_TOKENS => wallet,
                _ => return Ok(None),
            },
        };
        account.wallet_tokens = wallet;
        account.total_spent += delta.spent_increase;
        Ok(Some(account.clone()))
    }

    fn upsert_cost_tracking(
        &mut self,
        id: &AccountId,
        delta: &CostDelta,
    ) -> Result<CostTracking, TollgateError> {
        self.check_scope(id)?;
        let tracking = match self.staged.cost_tracking.take() {
            Some(mut existing) => {
                existing.total_tokens_used = existing
                    .total_tokens_used
                    .checked_add(delta.tokens_used)
                    .filter(|total| *total <= MAX_TOKENS)
                    .ok_or_else(|| {
                        TollgateError::Validation("total_tokens_used overflow".into())
                    })?;
                existing.total_cost_to_owner += delta.cost_to_owner;
                existing.updated_at = now_timestamp();
                existing
            }
            None => CostTracking {
                account_id: id.clone(),
                total_tokens_used: delta.tokens_used,
                total_cost_to_owner: delta.cost_to_owner,
                updated_at: now_timestamp(),
            },
        };
        self.staged.cost_tracking = Some(tracking.clone());
        Ok(tracking)
    }

    fn append_usage_log(&mut self, entry: &UsageLogEntry) -> Result<(), TollgateError> {
        self.check_scope(&entry.account_id)?;
        self.pending_usage.push(entry.clone());
        Ok(())
    }

    fn append_purchase(&mut self, entry: &PurchaseEntry) -> Result<(), TollgateError> {
        self.check_scope(&entry.account_id)?;
        self.pending_purchases.push(entry.clone());
        Ok(())
    }
}
