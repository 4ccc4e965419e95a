// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account rows: lookup, registration, and conditional wallet updates.

use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tollgate_core::money::{self, MAX_TOKENS};
use tollgate_core::{Account, AccountDelta, AccountId, AccountSnapshot, TokenChange, TollgateError};

use crate::database::map_sqlite_err;
use crate::models::{AccountRow, CostTrackingRow};

/// Fetch one account.
pub fn get(conn: &Connection, id: &AccountId) -> Result<Option<Account>, TollgateError> {
    conn.query_row(
        "SELECT id, email, name, is_admin, wallet_tokens, total_spent_micros, created_at
         FROM accounts WHERE id = ?1",
        params![id.as_str()],
        AccountRow::from_row,
    )
    .optional()
    .map_err(map_sqlite_err)?
    .map(AccountRow::into_account)
    .transpose()
}

/// Insert a new account. A taken email (or id) is a validation error.
pub fn insert(conn: &Connection, account: &Account) -> Result<(), TollgateError> {
    let wallet_tokens = money::check_tokens(account.wallet_tokens, "wallet_tokens")?;
    let total_spent = money::to_micros(account.total_spent, "total_spent")?;
    conn.execute(
        "INSERT INTO accounts
            (id, email, name, is_admin, wallet_tokens, total_spent_micros, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            account.id.as_str(),
            account.email,
            account.name,
            account.is_admin,
            wallet_tokens,
            total_spent,
            account.created_at,
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => TollgateError::Validation(format!(
            "an account with email {} already exists",
            account.email
        )),
        _ => map_sqlite_err(e),
    })?;
    Ok(())
}

/// Apply a wallet change and spend increase as one statement.
///
/// A debit only matches while the wallet covers it; a credit only matches
/// while the result stays within [`MAX_TOKENS`]. `None` means no row matched.
pub fn apply_delta(
    conn: &Connection,
    id: &AccountId,
    delta: &AccountDelta,
) -> Result<Option<Account>, TollgateError> {
    let spent = money::to_micros(delta.spent_increase, "spent_increase")?;
    let row = match delta.tokens {
        TokenChange::Debit(tokens) => {
            let tokens = money::check_tokens(tokens, "tokens")?;
            conn.query_row(
                "UPDATE accounts
                 SET wallet_tokens = wallet_tokens - ?2,
                     total_spent_micros = total_spent_micros + ?3
                 WHERE id = ?1 AND wallet_tokens >= ?2
                 RETURNING id, email, name, is_admin, wallet_tokens, total_spent_micros, created_at",
                params![id.as_str(), tokens, spent],
                AccountRow::from_row,
            )
        }
        TokenChange::Credit(tokens) => {
            let tokens = money::check_tokens(tokens, "tokens")?;
            let headroom = MAX_TOKENS as i64 - tokens;
            conn.query_row(
                "UPDATE accounts
                 SET wallet_tokens = wallet_tokens + ?2,
                     total_spent_micros = total_spent_micros + ?3
                 WHERE id = ?1 AND wallet_tokens <= ?4
                 RETURNING id, email, name, is_admin, wallet_tokens, total_spent_micros, created_at",
                params![id.as_str(), tokens, spent, headroom],
                AccountRow::from_row,
            )
        }
    }
    .optional()
    .map_err(map_sqlite_err)?;

    row.map(AccountRow::into_account).transpose()
}

const SNAPSHOT_SELECT: &str = "SELECT a.id AS id, a.email AS email, a.name AS name,
        a.is_admin AS is_admin, a.wallet_tokens AS wallet_tokens,
        a.total_spent_micros AS total_spent_micros, a.created_at AS created_at,
        c.account_id AS tracking_account_id, c.total_tokens_used AS total_tokens_used,
        c.total_cost_micros AS total_cost_micros, c.updated_at AS updated_at
     FROM accounts a
     LEFT JOIN cost_tracking c ON c.account_id = a.id";

type SnapshotRow = (AccountRow, Option<CostTrackingRow>);

fn snapshot_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SnapshotRow> {
    Ok((AccountRow::from_row(row)?, CostTrackingRow::from_joined_row(row)?))
}

fn into_snapshot((account, tracking): SnapshotRow) -> Result<AccountSnapshot, TollgateError> {
    Ok(AccountSnapshot {
        account: account.into_account()?,
        cost_tracking: tracking.map(CostTrackingRow::into_cost_tracking).transpose()?,
    })
}

/// One account with its cost tracking.
pub fn snapshot(conn: &Connection, id: &AccountId) -> Result<Option<AccountSnapshot>, TollgateError> {
    conn.query_row(
        &format!("{SNAPSHOT_SELECT} WHERE a.id = ?1"),
        params![id.as_str()],
        snapshot_row,
    )
    .optional()
    .map_err(map_sqlite_err)?
    .map(into_snapshot)
    .transpose()
}

/// Every account with its cost tracking, in creation order.
pub fn list_with_tracking(conn: &Connection) -> Result<Vec<AccountSnapshot>, TollgateError> {
    let mut stmt = conn
        .prepare(&format!("{SNAPSHOT_SELECT} ORDER BY a.rowid"))
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map([], snapshot_row)
        .map_err(map_sqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;

    rows.into_iter().map(into_snapshot).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_connection;
    use rust_decimal::Decimal;
    use tollgate_core::types::now_timestamp;

    fn account(id: &str, email: &str, wallet: u64) -> Account {
        Account {
            id: AccountId::from(id),
            email: email.to_string(),
            name: Some("Test".to_string()),
            is_admin: false,
            wallet_tokens: wallet,
            total_spent: Decimal::ZERO,
            created_at: now_timestamp(),
        }
    }

    #[test]
    fn insert_then_get() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 500)).unwrap();
        let fetched = get(&conn, &AccountId::from("a1")).unwrap().unwrap();
        assert_eq!(fetched.wallet_tokens, 500);
        assert_eq!(fetched.name.as_deref(), Some("Test"));
        assert!(get(&conn, &AccountId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_validation_error() {
        let conn = test_connection();
        insert(&conn, &account("a1", "same@example.com", 0)).unwrap();
        let err = insert(&conn, &account("a2", "same@example.com", 0)).unwrap_err();
        assert!(matches!(err, TollgateError::Validation(_)));
    }

    #[test]
    fn debit_applies_only_when_covered() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 100)).unwrap();
        let id = AccountId::from("a1");

        let updated = apply_delta(&conn, &id, &AccountDelta::debit(60)).unwrap().unwrap();
        assert_eq!(updated.wallet_tokens, 40);

        assert!(apply_delta(&conn, &id, &AccountDelta::debit(41)).unwrap().is_none());
        assert_eq!(get(&conn, &id).unwrap().unwrap().wallet_tokens, 40);
    }

    #[test]
    fn purchase_credits_tokens_and_spend() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 0)).unwrap();
        let id = AccountId::from("a1");
        let updated = apply_delta(
            &conn,
            &id,
            &AccountDelta::purchase(1_000, Decimal::new(4999, 2)),
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.wallet_tokens, 1_000);
        assert_eq!(updated.total_spent, Decimal::new(4999, 2));
    }

    #[test]
    fn credit_past_max_tokens_does_not_apply() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 10)).unwrap();
        let id = AccountId::from("a1");
        let delta = AccountDelta::purchase(MAX_TOKENS - 5, Decimal::ZERO);
        assert!(apply_delta(&conn, &id, &delta).unwrap().is_none());
    }

    #[test]
    fn list_includes_missing_tracking_as_none() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 0)).unwrap();
        insert(&conn, &account("a2", "a2@example.com", 0)).unwrap();
        conn.execute(
            "INSERT INTO cost_tracking (account_id, total_tokens_used, total_cost_micros, updated_at)
             VALUES ('a2', 20000, 20000, '2026-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        let snapshots = list_with_tracking(&conn).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert!(snapshots[0].cost_tracking.is_none());
        let tracking = snapshots[1].cost_tracking.as_ref().unwrap();
        assert_eq!(tracking.total_tokens_used, 20_000);
        assert_eq!(tracking.total_cost_to_owner, Decimal::new(2, 2));
    }

    #[test]
    fn snapshot_reads_one_account_with_tracking() {
        let conn = test_connection();
        insert(&conn, &account("a1", "a1@example.com", 7)).unwrap();
        conn.execute(
            "INSERT INTO cost_tracking (account_id, total_tokens_used, total_cost_micros, updated_at)
             VALUES ('a1', 100000, 100000, '2026-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();

        let found = snapshot(&conn, &AccountId::from("a1")).unwrap().unwrap();
        assert_eq!(found.account.wallet_tokens, 7);
        assert_eq!(
            found.cost_tracking.unwrap().total_cost_to_owner,
            Decimal::new(10, 2)
        );
        assert!(snapshot(&conn, &AccountId::from("missing")).unwrap().is_none());
    }
}
