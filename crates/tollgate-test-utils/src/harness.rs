// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end ledger tests.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tollgate_config::TollgateConfig;
use tollgate_core::{
    Account, AccountDraft, AccountSnapshot, CostTracking, Identity, LedgerStore, MemoryLedgerStore,
    TollgateError,
};
use tollgate_ledger::LedgerManager;
use tollgate_storage::SqliteLedgerStore;

/// Builder for ledger test environments.
pub struct TestHarnessBuilder {
    config: TollgateConfig,
    lock_timeout: Option<Duration>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = TollgateConfig::default();
        config.ledger.retry_backoff_ms = 1;
        Self {
            config,
            lock_timeout: None,
        }
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.config.ledger.max_conflict_retries = retries;
        self
    }

    pub fn with_guard(mut self, cost_ceiling_percent: u32, warning_percent: u32) -> Self {
        self.config.guard.cost_ceiling_percent = cost_ceiling_percent;
        self.config.guard.warning_percent = warning_percent;
        self
    }

    /// Transaction deadline for SQLite and account-lock wait for the memory store.
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.config.storage.transaction_timeout_ms = timeout.as_millis() as u64;
        self.lock_timeout = Some(timeout);
        self
    }

    /// Build over a SQLite database in a fresh temp directory.
    pub async fn build_sqlite(mut self) -> Result<TestHarness<SqliteLedgerStore>, TollgateError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| TollgateError::StoreUnavailable { source: e.into() })?;
        self.config.storage.database_path =
            temp_dir.path().join("ledger.db").to_string_lossy().to_string();

        let store = Arc::new(SqliteLedgerStore::new(self.config.storage.clone()));
        TestHarness::assemble(store, self.config, Some(temp_dir)).await
    }

    /// Build over the in-memory store.
    pub async fn build_memory(self) -> Result<TestHarness<MemoryLedgerStore>, TollgateError> {
        let mut store = MemoryLedgerStore::new();
        if let Some(timeout) = self.lock_timeout {
            store = store.with_lock_timeout(timeout);
        }
        TestHarness::assemble(Arc::new(store), self.config, None).await
    }
}

/// A seeded ledger plus helpers for creating and inspecting accounts.
pub struct TestHarness<S> {
    pub ledger: Arc<LedgerManager<S>>,
    pub store: Arc<S>,
    pub config: TollgateConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness<SqliteLedgerStore> {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default SQLite harness.
    pub async fn sqlite() -> Result<Self, TollgateError> {
        Self::builder().build_sqlite().await
    }
}

impl TestHarness<MemoryLedgerStore> {
    /// Default in-memory harness.
    pub async fn memory() -> Result<Self, TollgateError> {
        TestHarnessBuilder::new().build_memory().await
    }
}

impl<S: LedgerStore> TestHarness<S> {
    async fn assemble(
        store: Arc<S>,
        config: TollgateConfig,
        temp_dir: Option<tempfile::TempDir>,
    ) -> Result<Self, TollgateError> {
        let ledger = LedgerManager::open(Arc::clone(&store), &config).await?;
        ledger.seed_default_models().await?;
        Ok(Self {
            ledger: Arc::new(ledger),
            store,
            config,
            _temp_dir: temp_dir,
        })
    }

    /// Open a non-admin account with a unique email.
    pub async fn open_user(&self) -> Result<Identity, TollgateError> {
        let account = self
            .ledger
            .open_account(AccountDraft {
                email: format!("user-{}@example.com", uuid::Uuid::new_v4()),
                name: None,
                is_admin: false,
            })
            .await?;
        Ok(Identity::user(account.id))
    }

    /// Open an admin account, which starts with the configured token grant.
    pub async fn open_admin(&self) -> Result<Identity, TollgateError> {
        let account = self
            .ledger
            .open_account(AccountDraft {
                email: format!("admin-{}@example.com", uuid::Uuid::new_v4()),
                name: Some("Admin".into()),
                is_admin: true,
            })
            .await?;
        Ok(Identity::admin(account.id))
    }

    /// Open a user and buy `tokens` for `price`.
    pub async fn funded_user(&self, tokens: u64, price: Decimal) -> Result<Identity, TollgateError> {
        let identity = self.open_user().await?;
        self.ledger.purchase_tokens(&identity, tokens, price).await?;
        Ok(identity)
    }

    async fn snapshot(&self, identity: &Identity) -> Result<AccountSnapshot, TollgateError> {
        self.store
            .account_snapshot(&identity.account_id)
            .await?
            .ok_or_else(|| TollgateError::account_not_found(identity.account_id.as_str()))
    }

    pub async fn account(&self, identity: &Identity) -> Result<Account, TollgateError> {
        Ok(self.snapshot(identity).await?.account)
    }

    pub async fn cost_tracking(
        &self,
        identity: &Identity,
    ) -> Result<Option<CostTracking>, TollgateError> {
        Ok(self.snapshot(identity).await?.cost_tracking)
    }

    /// Number of usage log entries recorded for the account.
    pub async fn usage_count(&self, identity: &Identity) -> Result<usize, TollgateError> {
        Ok(self
            .store
            .recent_usage(&identity.account_id, usize::MAX)
            .await?
            .len())
    }

    pub async fn purchase_count(&self, identity: &Identity) -> Result<usize, TollgateError> {
        Ok(self
            .store
            .recent_purchases(&identity.account_id, usize::MAX)
            .await?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn sqlite_harness_is_seeded() {
        let harness = TestHarness::sqlite().await.unwrap();
        assert_eq!(harness.ledger.models().await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn funded_user_has_wallet_and_spend() {
        let harness = TestHarness::memory().await.unwrap();
        let user = harness.funded_user(1_000, dec!(2)).await.unwrap();
        let account = harness.account(&user).await.unwrap();
        assert_eq!(account.wallet_tokens, 1_000);
        assert_eq!(account.total_spent, dec!(2));
        assert_eq!(harness.purchase_count(&user).await.unwrap(), 1);
        assert!(harness.cost_tracking(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guard_thresholds_reach_the_ledger() {
        let harness = TestHarness::builder()
            .with_guard(20, 50)
            .build_memory()
            .await
            .unwrap();
        // Ceiling is 20% of $1; each mindmap use costs the owner $0.02.
        let user = harness.funded_user(1_000_000, dec!(1)).await.unwrap();
        for _ in 0..10 {
            let outcome = harness.ledger.charge_usage(&user, "Ai-mindmapgen").await.unwrap();
            assert!(outcome.is_charged());
        }
        let outcome = harness.ledger.charge_usage(&user, "Ai-mindmapgen").await.unwrap();
        assert!(!outcome.is_charged());
        let tracking = harness.cost_tracking(&user).await.unwrap().unwrap();
        assert_eq!(tracking.total_cost_to_owner, dec!(0.20));
    }

    #[tokio::test]
    async fn unknown_account_is_not_found() {
        let harness = TestHarness::memory().await.unwrap();
        let err = harness.account(&Identity::user("ghost")).await.unwrap_err();
        assert!(matches!(err, TollgateError::NotFound { .. }));
    }
}
