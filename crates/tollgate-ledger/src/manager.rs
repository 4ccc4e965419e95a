// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional entry points of the ledger.
//!
//! Every mutating operation runs as one store transaction scoped to the
//! caller's account. Business rejections come back as [`ChargeOutcome`]
//! values; [`TollgateError`] is reserved for requests that could not be
//! evaluated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Serialize;
use tollgate_config::{LedgerConfig, TollgateConfig};
use tollgate_core::money::{MAX_TOKENS, check_tokens, to_micros, token_string};
use tollgate_core::types::now_timestamp;
use tollgate_core::{
    Account, AccountDelta, AccountDraft, AccountId, CostDelta, Identity, LedgerStore, LedgerTxn,
    ModelEntry, PurchaseEntry, TollgateError, UsageLogEntry,
};
use tracing::{debug, info, warn};

use crate::catalog::default_models;
use crate::guard::{Decision, GuardPolicy, ProfitGuard, Verdict};
use crate::report::{AccountOverview, RECENT_ACTIVITIES, RECENT_PURCHASES};

/// Longest accepted model name.
pub const MAX_MODEL_NAME_LEN: usize = 128;

/// Result of [`LedgerManager::charge_usage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChargeOutcome {
    Charged(ChargeReceipt),
    Blocked(ProfitBlock),
    InsufficientBalance(BalanceShortfall),
}

impl ChargeOutcome {
    pub fn is_charged(&self) -> bool {
        matches!(self, Self::Charged(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeReceipt {
    pub success: bool,
    #[serde(with = "token_string")]
    pub tokens_deducted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// The profit guard refused the charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitBlock {
    pub blocked: bool,
    pub message: String,
    /// Lifetime spend of the account.
    pub spent: Decimal,
    /// Owner cost the charge would have produced.
    pub cost: Decimal,
    pub margin: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceShortfall {
    pub insufficient_balance: bool,
    #[serde(with = "token_string")]
    pub required: u64,
    #[serde(with = "token_string")]
    pub available: u64,
}

/// Result of [`LedgerManager::purchase_tokens`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    #[serde(with = "token_string")]
    pub wallet_tokens: u64,
    pub total_spent: Decimal,
}

/// Charges usage, records purchases, and enforces the profit guard on top of
/// an injected [`LedgerStore`].
pub struct LedgerManager<S> {
    store: Arc<S>,
    guard: ProfitGuard,
    config: LedgerConfig,
}

impl<S: LedgerStore> LedgerManager<S> {
    /// Wrap a store that is already initialized.
    pub fn new(store: Arc<S>, config: &TollgateConfig) -> Self {
        Self {
            store,
            guard: ProfitGuard::new(GuardPolicy::from(&config.guard)),
            config: config.ledger.clone(),
        }
    }

    /// Initialize `store` and wrap it.
    pub async fn open(store: Arc<S>, config: &TollgateConfig) -> Result<Self, TollgateError> {
        store.initialize().await?;
        info!(store = store.name(), "ledger opened");
        Ok(Self::new(store, config))
    }

    /// Release the store.
    pub async fn close(&self) -> Result<(), TollgateError> {
        self.store.close().await?;
        info!(store = self.store.name(), "ledger closed");
        Ok(())
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn guard(&self) -> ProfitGuard {
        self.guard
    }

    /// Charge the caller's account one use of `model_name`.
    pub async fn charge_usage(
        &self,
        identity: &Identity,
        model_name: &str,
    ) -> Result<ChargeOutcome, TollgateError> {
        validate_model_name(model_name)?;

        let account_id = identity.account_id.clone();
        let model = model_name.to_string();
        let guard = self.guard;
        let outcome = self
            .with_retry("charge_usage", &identity.account_id, move |txn| {
                charge_in_txn(txn, &account_id, &model, guard)
            })
            .await?;

        match &outcome {
            ChargeOutcome::Charged(receipt) => debug!(
                account_id = %identity.account_id,
                model = model_name,
                tokens = receipt.tokens_deducted,
                "usage charged"
            ),
            ChargeOutcome::Blocked(_) => debug!(
                account_id = %identity.account_id,
                "charge refused by profit guard"
            ),
            ChargeOutcome::InsufficientBalance(shortfall) => debug!(
                account_id = %identity.account_id,
                required = shortfall.required,
                available = shortfall.available,
                "charge refused for insufficient balance"
            ),
        }
        Ok(outcome)
    }

    /// Credit `token_amount` tokens to the caller's wallet and add
    /// `price_paid` to its lifetime spend.
    pub async fn purchase_tokens(
        &self,
        identity: &Identity,
        token_amount: u64,
        price_paid: Decimal,
    ) -> Result<PurchaseReceipt, TollgateError> {
        if token_amount == 0 {
            return Err(TollgateError::Validation(
                "token_amount must be greater than zero".into(),
            ));
        }
        check_tokens(token_amount, "token_amount")?;
        to_micros(price_paid, "price_paid")?;

        let account_id = identity.account_id.clone();
        let receipt = self
            .with_retry("purchase_tokens", &identity.account_id, move |txn| {
                purchase_in_txn(txn, &account_id, token_amount, price_paid)
            })
            .await?;

        info!(
            account_id = %identity.account_id,
            tokens = token_amount,
            price_paid = %price_paid,
            wallet_tokens = receipt.wallet_tokens,
            "tokens purchased"
        );
        Ok(receipt)
    }

    /// Register a new account. Admins start with the configured token grant.
    pub async fn open_account(&self, draft: AccountDraft) -> Result<Account, TollgateError> {
        let email = draft.email.trim().to_string();
        if email.is_empty() || !email.contains('@') {
            return Err(TollgateError::Validation(format!(
                "email must be a non-empty address containing '@', got {:?}",
                draft.email
            )));
        }
        let wallet_tokens = if draft.is_admin {
            check_tokens(self.config.initial_admin_tokens, "initial_admin_tokens")?;
            self.config.initial_admin_tokens
        } else {
            0
        };

        let account = Account {
            id: AccountId::generate(),
            email,
            name: draft.name.filter(|n| !n.trim().is_empty()),
            is_admin: draft.is_admin,
            wallet_tokens,
            total_spent: Decimal::ZERO,
            created_at: now_timestamp(),
        };
        let record = account.clone();
        self.store
            .transact(&account.id, move |txn| txn.insert_account(&record))
            .await?;

        info!(
            account_id = %account.id,
            is_admin = account.is_admin,
            wallet_tokens = account.wallet_tokens,
            "account opened"
        );
        Ok(account)
    }

    /// Evaluate the guard for the caller's account with no incremental cost.
    pub async fn profit_status(&self, identity: &Identity) -> Result<Decision, TollgateError> {
        let snapshot = self
            .store
            .account_snapshot(&identity.account_id)
            .await?
            .ok_or_else(|| TollgateError::account_not_found(identity.account_id.as_str()))?;
        Ok(self.guard.evaluate(
            snapshot.cost_tracking.map(|t| t.total_cost_to_owner),
            snapshot.account.total_spent,
            Decimal::ZERO,
        ))
    }

    /// Per-account balances, owner cost, margin, and recent activity.
    ///
    /// Only admins may call this.
    pub async fn account_overview(
        &self,
        identity: &Identity,
    ) -> Result<Vec<AccountOverview>, TollgateError> {
        if !identity.is_admin {
            return Err(TollgateError::Forbidden(format!(
                "account {} is not an admin",
                identity.account_id
            )));
        }

        let cost_per_model: HashMap<String, Decimal> = self
            .store
            .list_models()
            .await?
            .into_iter()
            .map(|m| (m.name, m.cost_per_use))
            .collect();

        let snapshots = self.store.list_accounts().await?;
        let mut rows = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let id = snapshot.account.id.clone();
            let decision = self.guard.evaluate(
                snapshot
                    .cost_tracking
                    .as_ref()
                    .map(|t| t.total_cost_to_owner),
                snapshot.account.total_spent,
                Decimal::ZERO,
            );
            let purchases = self.store.recent_purchases(&id, RECENT_PURCHASES).await?;
            let usage = self.store.recent_usage(&id, RECENT_ACTIVITIES).await?;
            rows.push(AccountOverview::build(
                snapshot,
                decision,
                purchases,
                usage,
                &cost_per_model,
            ));
        }
        debug!(accounts = rows.len(), "account overview built");
        Ok(rows)
    }

    /// Write the default catalog, overwriting same-named entries.
    pub async fn seed_default_models(&self) -> Result<Vec<ModelEntry>, TollgateError> {
        let models = default_models();
        for model in &models {
            self.store.put_model(model).await?;
        }
        info!(count = models.len(), "default models seeded");
        Ok(models)
    }

    pub async fn models(&self) -> Result<Vec<ModelEntry>, TollgateError> {
        self.store.list_models().await
    }

    /// Run `work` in a transaction, re-running it after transaction
    /// conflicts with linear backoff.
    async fn with_retry<T, W>(
        &self,
        operation: &'static str,
        scope: &AccountId,
        work: W,
    ) -> Result<T, TollgateError>
    where
        T: Send + 'static,
        W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError> + Clone + Send + 'static,
    {
        let mut attempt: u32 = 0;
        loop {
            match self.store.transact(scope, work.clone()).await {
                Err(TollgateError::TransactionConflict { message })
                    if attempt < self.config.max_conflict_retries =>
                {
                    attempt += 1;
                    let backoff = Duration::from_millis(
                        self.config.retry_backoff_ms.saturating_mul(u64::from(attempt)),
                    );
                    warn!(
                        operation,
                        account_id = %scope,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %message,
                        "transaction conflict, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }
}

fn validate_model_name(model_name: &str) -> Result<(), TollgateError> {
    if model_name.trim().is_empty() {
        return Err(TollgateError::Validation("model name must not be empty".into()));
    }
    if model_name.chars().count() > MAX_MODEL_NAME_LEN {
        return Err(TollgateError::Validation(format!(
            "model name must be at most {MAX_MODEL_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn charge_in_txn(
    txn: &mut dyn LedgerTxn,
    account_id: &AccountId,
    model_name: &str,
    guard: ProfitGuard,
) -> Result<ChargeOutcome, TollgateError> {
    let account = txn
        .get_account(account_id)?
        .ok_or_else(|| TollgateError::account_not_found(account_id.as_str()))?;
    let model = txn
        .get_model(model_name)?
        .ok_or_else(|| TollgateError::model_not_found(model_name))?;

    if account.wallet_tokens < model.token_cost {
        return Ok(ChargeOutcome::InsufficientBalance(BalanceShortfall {
            insufficient_balance: true,
            required: model.token_cost,
            available: account.wallet_tokens,
        }));
    }

    let tracking = txn.get_cost_tracking(account_id)?;
    let decision = guard.evaluate(
        tracking.map(|t| t.total_cost_to_owner),
        account.total_spent,
        model.cost_per_use,
    );
    if decision.verdict == Verdict::Block {
        return Ok(ChargeOutcome::Blocked(ProfitBlock {
            blocked: true,
            message: decision.message.unwrap_or_default(),
            spent: decision.total_spent,
            cost: decision.projected_cost,
            margin: decision.margin,
        }));
    }

    // The debit re-checks the balance itself; losing that check means the
    // wallet moved under us.
    if txn
        .update_account(account_id, &AccountDelta::debit(model.token_cost))?
        .is_none()
    {
        return Err(TollgateError::TransactionConflict {
            message: format!("wallet of account {account_id} changed during charge"),
        });
    }
    txn.append_usage_log(&UsageLogEntry::new(
        account_id.clone(),
        model.name.clone(),
        model.token_cost,
    ))?;
    txn.upsert_cost_tracking(
        account_id,
        &CostDelta {
            tokens_used: model.token_cost,
            cost_to_owner: model.cost_per_use,
        },
    )?;

    Ok(ChargeOutcome::Charged(ChargeReceipt {
        success: true,
        tokens_deducted: model.token_cost,
        warning: decision.warning().map(str::to_string),
    }))
}

fn purchase_in_txn(
    txn: &mut dyn LedgerTxn,
    account_id: &AccountId,
    token_amount: u64,
    price_paid: Decimal,
) -> Result<PurchaseReceipt, TollgateError> {
    let account = txn
        .get_account(account_id)?
        .ok_or_else(|| TollgateError::account_not_found(account_id.as_str()))?;

    match account.wallet_tokens.checked_add(token_amount) {
        Some(total) if total <= MAX_TOKENS => {}
        _ => {
            return Err(TollgateError::Validation(format!(
                "purchase would push wallet of account {account_id} past {MAX_TOKENS} tokens"
            )));
        }
    }
    let new_spent = account
        .total_spent
        .checked_add(price_paid)
        .ok_or_else(|| TollgateError::Validation("total_spent is out of range".into()))?;
    to_micros(new_spent, "total_spent")?;

    let updated = txn
        .update_account(account_id, &AccountDelta::purchase(token_amount, price_paid))?
        .ok_or_else(|| TollgateError::account_not_found(account_id.as_str()))?;
    txn.append_purchase(&PurchaseEntry::new(
        account_id.clone(),
        token_amount,
        price_paid,
    ))?;

    Ok(PurchaseReceipt {
        wallet_tokens: updated.wallet_tokens,
        total_spent: updated.total_spent,
    })
}
