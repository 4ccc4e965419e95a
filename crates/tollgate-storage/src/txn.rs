// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One ledger transaction on the SQLite connection.

use std::time::{Duration, Instant};

use rusqlite::{Connection, TransactionBehavior};
use tollgate_core::{
    Account, AccountDelta, AccountId, CostDelta, CostTracking, LedgerTxn, ModelEntry,
    PurchaseEntry, TollgateError, UsageLogEntry,
};
use tracing::debug;

use crate::database::map_sqlite_err;
use crate::queries;

/// [`LedgerTxn`] over an open `BEGIN IMMEDIATE` transaction, restricted to one account.
pub(crate) struct SqliteTxn<'a> {
    conn: &'a Connection,
    scope: &'a AccountId,
}

impl<'a> SqliteTxn<'a> {
    fn new(conn: &'a Connection, scope: &'a AccountId) -> Self {
        Self { conn, scope }
    }

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

impl LedgerTxn for SqliteTxn<'_> {
    fn get_account(&mut self, id: &AccountId) -> Result<Option<Account>, TollgateError> {
        self.check_scope(id)?;
        queries::accounts::get(self.conn, id)
    }

    fn get_cost_tracking(&mut self, id: &AccountId) -> Result<Option<CostTracking>, TollgateError> {
        self.check_scope(id)?;
        queries::cost_tracking::get(self.conn, id)
    }

    fn get_model(&mut self, name: &str) -> Result<Option<ModelEntry>, TollgateError> {
        queries::catalog::get(self.conn, name)
    }

    fn insert_account(&mut self, account: &Account) -> Result<(), TollgateError> {
        self.check_scope(&account.id)?;
        queries::accounts::insert(self.conn, account)
    }

    fn update_account(
        &mut self,
        id: &AccountId,
        delta: &AccountDelta,
    ) -> Result<Option<Account>, TollgateError> {
        self.check_scope(id)?;
        queries::accounts::apply_delta(self.conn, id, delta)
    }

    fn upsert_cost_tracking(
        &mut self,
        id: &AccountId,
        delta: &CostDelta,
    ) -> Result<CostTracking, TollgateError> {
        self.check_scope(id)?;
        queries::cost_tracking::upsert(self.conn, id, delta)
    }

    fn append_usage_log(&mut self, entry: &UsageLogEntry) -> Result<(), TollgateError> {
        self.check_scope(&entry.account_id)?;
        queries::journal::append_usage(self.conn, entry)
    }

    fn append_purchase(&mut self, entry: &PurchaseEntry) -> Result<(), TollgateError> {
        self.check_scope(&entry.account_id)?;
        queries::journal::append_purchase(self.conn, entry)
    }
}

/// Run `work` in a `BEGIN IMMEDIATE` transaction that must commit within `budget`.
///
/// The clock starts here, on the connection thread, so time spent queued
/// behind other transactions does not count against it. A transaction still
/// running when the budget expires is rolled back and reported as a timeout.
/// Dropping the uncommitted transaction rolls it back.
pub(crate) fn run_transaction<T, W>(
    conn: &mut Connection,
    scope: &AccountId,
    budget: Duration,
    work: W,
) -> Result<T, TollgateError>
where
    W: FnOnce(&mut dyn LedgerTxn) -> Result<T, TollgateError>,
{
    let started = Instant::now();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(map_sqlite_err)?;
    let value = work(&mut SqliteTxn::new(&tx, scope))?;

    if started.elapsed() >= budget {
        debug!(account_id = %scope, "transaction budget exceeded before commit, rolling back");
        tx.rollback().map_err(map_sqlite_err)?;
        return Err(TollgateError::Timeout { duration: budget });
    }
    tx.commit().map_err(map_sqlite_err)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_connection;
    use rust_decimal::Decimal;
    use tollgate_core::types::now_timestamp;

    fn seed(conn: &Connection, wallet: i64) -> AccountId {
        conn.execute(
            "INSERT INTO accounts (id, email, wallet_tokens) VALUES ('a1', 'a1@example.com', ?1)",
            [wallet],
        )
        .unwrap();
        AccountId::from("a1")
    }

    const BUDGET: Duration = Duration::from_secs(30);

    fn wallet(conn: &Connection, id: &AccountId) -> u64 {
        queries::accounts::get(conn, id).unwrap().unwrap().wallet_tokens
    }

    #[test]
    fn ok_commits() {
        let mut conn = test_connection();
        let id = seed(&conn, 100);
        run_transaction(&mut conn, &id, BUDGET, |txn| {
            txn.update_account(&AccountId::from("a1"), &AccountDelta::debit(30))
        })
        .unwrap();
        assert_eq!(wallet(&conn, &id), 70);
    }

    #[test]
    fn err_rolls_back_every_write() {
        let mut conn = test_connection();
        let id = seed(&conn, 100);
        let result: Result<(), _> = run_transaction(&mut conn, &id, BUDGET, |txn| {
            let id = AccountId::from("a1");
            txn.update_account(&id, &AccountDelta::debit(30))?;
            txn.upsert_cost_tracking(
                &id,
                &CostDelta {
                    tokens_used: 30,
                    cost_to_owner: Decimal::new(3, 2),
                },
            )?;
            Err(TollgateError::Internal("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(wallet(&conn, &id), 100);
        assert!(queries::cost_tracking::get(&conn, &id).unwrap().is_none());
    }

    #[test]
    fn exceeded_budget_rolls_back() {
        let mut conn = test_connection();
        let id = seed(&conn, 100);
        let budget = Duration::from_millis(20);
        let err = run_transaction(&mut conn, &id, budget, |txn| {
            txn.update_account(&AccountId::from("a1"), &AccountDelta::debit(30))?;
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, TollgateError::Timeout { .. }));
        assert_eq!(wallet(&conn, &id), 100);
    }

    #[test]
    fn writes_outside_scope_are_refused() {
        let mut conn = test_connection();
        let id = seed(&conn, 100);
        let intruder = Account {
            id: AccountId::from("a2"),
            email: "a2@example.com".into(),
            name: None,
            is_admin: false,
            wallet_tokens: 0,
            total_spent: Decimal::ZERO,
            created_at: now_timestamp(),
        };
        let err = run_transaction(&mut conn, &id, BUDGET, move |txn| {
            txn.insert_account(&intruder)
        })
        .unwrap_err();
        assert!(matches!(err, TollgateError::Internal(_)));
    }
}
