// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only usage and purchase journals.

use rusqlite::{Connection, params};
use tollgate_core::money;
use tollgate_core::{AccountId, PurchaseEntry, TollgateError, UsageLogEntry};

use super::sql_limit;
use crate::database::map_sqlite_err;
use crate::models::{PurchaseRow, UsageRow};

pub fn append_usage(conn: &Connection, entry: &UsageLogEntry) -> Result<(), TollgateError> {
    let tokens = money::check_tokens(entry.tokens_used, "tokens_used")?;
    conn.execute(
        "INSERT INTO usage_log (id, account_id, model_name, tokens_used, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.account_id.as_str(),
            entry.model_name,
            tokens,
            entry.created_at
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn append_purchase(conn: &Connection, entry: &PurchaseEntry) -> Result<(), TollgateError> {
    let tokens = money::check_tokens(entry.token_amount, "token_amount")?;
    let price = money::to_micros(entry.price_paid, "price_paid")?;
    conn.execute(
        "INSERT INTO purchases (id, account_id, token_amount, price_paid_micros, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.account_id.as_str(),
            tokens,
            price,
            entry.created_at
        ],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

/// Newest usage entries first.
pub fn recent_usage(
    conn: &Connection,
    id: &AccountId,
    limit: usize,
) -> Result<Vec<UsageLogEntry>, TollgateError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, account_id, model_name, tokens_used, created_at
             FROM usage_log WHERE account_id = ?1
             ORDER BY rowid DESC LIMIT ?2",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![id.as_str(), sql_limit(limit)], UsageRow::from_row)
        .map_err(map_sqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;
    rows.into_iter().map(UsageRow::into_entry).collect()
}

/// Newest purchases first.
pub fn recent_purchases(
    conn: &Connection,
    id: &AccountId,
    limit: usize,
) -> Result<Vec<PurchaseEntry>, TollgateError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, account_id, token_amount, price_paid_micros, created_at
             FROM purchases WHERE account_id = ?1
             ORDER BY rowid DESC LIMIT ?2",
        )
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map(params![id.as_str(), sql_limit(limit)], PurchaseRow::from_row)
        .map_err(map_sqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;
    rows.into_iter().map(PurchaseRow::into_entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_connection;
    use rust_decimal::Decimal;

    fn seed(conn: &Connection) -> AccountId {
        conn.execute(
            "INSERT INTO accounts (id, email) VALUES ('a1', 'a1@example.com')",
            [],
        )
        .unwrap();
        AccountId::from("a1")
    }

    #[test]
    fn recent_usage_is_newest_first_and_limited() {
        let conn = test_connection();
        let id = seed(&conn);
        for model in ["m1", "m2", "m3"] {
            append_usage(&conn, &UsageLogEntry::new(id.clone(), model.into(), 10)).unwrap();
        }
        let recent = recent_usage(&conn, &id, 2).unwrap();
        let models: Vec<_> = recent.iter().map(|u| u.model_name.as_str()).collect();
        assert_eq!(models, vec!["m3", "m2"]);
    }

    #[test]
    fn purchases_round_trip_price_exactly() {
        let conn = test_connection();
        let id = seed(&conn);
        append_purchase(&conn, &PurchaseEntry::new(id.clone(), 5_000, Decimal::new(1999, 2)))
            .unwrap();
        let recent = recent_purchases(&conn, &id, 3).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].token_amount, 5_000);
        assert_eq!(recent[0].price_paid, Decimal::new(1999, 2));
    }

    #[test]
    fn journals_are_per_account() {
        let conn = test_connection();
        let id = seed(&conn);
        append_usage(&conn, &UsageLogEntry::new(id, "m1".into(), 10)).unwrap();
        assert!(recent_usage(&conn, &AccountId::from("other"), 5).unwrap().is_empty());
    }
}
