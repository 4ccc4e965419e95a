// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the ledger store.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tollgate_config::model::StorageConfig;
use tollgate_core::{
    AccountId, AccountSnapshot, HealthStatus, LedgerStore, LedgerTxn, ModelEntry, PurchaseEntry,
    StorageAdapter, TollgateError, UsageLogEntry,
};

use crate::database::{Database, map_sqlite_err};
use crate::queries;
use crate::txn::run_transaction;

/// SQLite-backed ledger store.
///
/// The database is opened on [`StorageAdapter::initialize`]. Every
/// transaction runs as `BEGIN IMMEDIATE` on the single tokio-rusqlite
/// connection, so transactions are serialized store-wide.
pub struct SqliteLedgerStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteLedgerStore {
    /// Create a store for the given configuration.
    ///
    /// The database connection is not opened until [`initialize`](StorageAdapter::initialize) is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database (for example [`Database::open_in_memory`]).
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::from(db),
        }
    }

    fn db(&self) -> Result<&Database, TollgateError> {
        self.db.get().ok_or_else(|| TollgateError::StoreUnavailable {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    fn transaction_budget(&self) -> Duration {
        Duration::from_millis(self.config.transaction_timeout_ms)
    }
}

#[async_trait]
impl StorageAdapter for SqliteLedgerStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), TollgateError> {
        if self.db.initialized() {
            return Err(TollgateError::StoreUnavailable {
                source: "storage already initialized".into(),
            });
        }
        let db = Database::open(&self.config).await?;
        self.db.set(db).map_err(|_| TollgateError::StoreUnavailable {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite ledger store initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, TollgateError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("storage not initialized".into()));
        };
        let ping = db
            .run(|conn| conn.execute_batch("SELECT 1;").map_err(map_sqlite_err))
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn close(&self) -> Result<(), TollgateError> {
        let db = self.db()?;
        if self.config.wal_mode {
            db.run(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                    .map_err(map_sqlite_err)
            })
            .await?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn transact<T, W>(&self, scope: &AccountId, work: W) -> Result<T, TollgateError>
    where
        T: Send + 'static,
        W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError> + Send + 'static,
    {
        let budget = self.transaction_budget();
        let scope = scope.clone();
        self.db()?
            .run(move |conn| run_transaction(conn, &scope, budget, work))
            .await
    }

    async fn put_model(&self, model: &ModelEntry) -> Result<(), TollgateError> {
        let model = model.clone();
        self.db()?
            .run(move |conn| queries::catalog::put(conn, &model))
            .await
    }

    async fn list_models(&self) -> Result<Vec<ModelEntry>, TollgateError> {
        self.db()?.run(|conn| queries::catalog::list(conn)).await
    }

    async fn account_snapshot(
        &self,
        id: &AccountId,
    ) -> Result<Option<AccountSnapshot>, TollgateError> {
        let id = id.clone();
        self.db()?
            .run(move |conn| queries::accounts::snapshot(conn, &id))
            .await
    }

    async fn list_accounts(&self) -> Result<Vec<AccountSnapshot>, TollgateError> {
        self.db()?
            .run(|conn| queries::accounts::list_with_tracking(conn))
            .await
    }

    async fn recent_purchases(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<PurchaseEntry>, TollgateError> {
        let id = id.clone();
        self.db()?
            .run(move |conn| queries::journal::recent_purchases(conn, &id, limit))
            .await
    }

    async fn recent_usage(
        &self,
        id: &AccountId,
        limit: usize,
    ) -> Result<Vec<UsageLogEntry>, TollgateError> {
        let id = id.clone();
        self.db()?
            .run(move |conn| queries::journal::recent_usage(conn, &id, limit))
            .await
    }
}
