// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account operator cost totals.

use rusqlite::{Connection, OptionalExtension, params};
use tollgate_core::money;
use tollgate_core::types::now_timestamp;
use tollgate_core::{AccountId, CostDelta, CostTracking, TollgateError};

use crate::database::map_sqlite_err;
use crate::models::CostTrackingRow;

pub fn get(conn: &Connection, id: &AccountId) -> Result<Option<CostTracking>, TollgateError> {
    conn.query_row(
        "SELECT account_id, total_tokens_used, total_cost_micros, updated_at
         FROM cost_tracking WHERE account_id = ?1",
        params![id.as_str()],
        CostTrackingRow::from_row,
    )
    .optional()
    .map_err(map_sqlite_err)?
    .map(CostTrackingRow::into_cost_tracking)
    .transpose()
}

/// Insert the row with `delta` as its totals, or add `delta` to the existing
/// totals, in a single statement.
pub fn upsert(
    conn: &Connection,
    id: &AccountId,
    delta: &CostDelta,
) -> Result<CostTracking, TollgateError> {
    let tokens = money::check_tokens(delta.tokens_used, "tokens_used")?;
    let cost = money::to_micros(delta.cost_to_owner, "cost_to_owner")?;
    conn.query_row(
        "INSERT INTO cost_tracking (account_id, total_tokens_used, total_cost_micros, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account_id) DO UPDATE SET
             total_tokens_used = total_tokens_used + excluded.total_tokens_used,
             total_cost_micros = total_cost_micros + excluded.total_cost_micros,
             updated_at = excluded.updated_at
         RETURNING account_id, total_tokens_used, total_cost_micros, updated_at",
        params![id.as_str(), tokens, cost, now_timestamp()],
        CostTrackingRow::from_row,
    )
    .map_err(map_sqlite_err)?
    .into_cost_tracking()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_connection;
    use rust_decimal::Decimal;

    fn seed_account(conn: &Connection) -> AccountId {
        conn.execute(
            "INSERT INTO accounts (id, email) VALUES ('a1', 'a1@example.com')",
            [],
        )
        .unwrap();
        AccountId::from("a1")
    }

    #[test]
    fn absent_until_first_upsert() {
        let conn = test_connection();
        let id = seed_account(&conn);
        assert!(get(&conn, &id).unwrap().is_none());
    }

    #[test]
    fn upsert_creates_then_increments() {
        let conn = test_connection();
        let id = seed_account(&conn);
        let delta = CostDelta {
            tokens_used: 100_000,
            cost_to_owner: Decimal::new(10, 2),
        };

        let first = upsert(&conn, &id, &delta).unwrap();
        assert_eq!(first.total_tokens_used, 100_000);
        assert_eq!(first.total_cost_to_owner, Decimal::new(10, 2));

        let second = upsert(&conn, &id, &delta).unwrap();
        assert_eq!(second.total_tokens_used, 200_000);
        assert_eq!(second.total_cost_to_owner, Decimal::new(20, 2));
        assert_eq!(get(&conn, &id).unwrap().unwrap(), second);
    }

    #[test]
    fn upsert_for_unknown_account_fails() {
        let conn = test_connection();
        let delta = CostDelta {
            tokens_used: 1,
            cost_to_owner: Decimal::ZERO,
        };
        assert!(upsert(&conn, &AccountId::from("ghost"), &delta).is_err());
    }
}
