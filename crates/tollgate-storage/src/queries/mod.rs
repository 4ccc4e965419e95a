// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Synchronous statements over a borrowed connection.
//!
//! Every function here runs on the tokio-rusqlite background thread, either
//! inside a ledger transaction or as a standalone read.

pub mod accounts;
pub mod catalog;
pub mod cost_tracking;
pub mod journal;

#[cfg(test)]
pub(crate) fn test_connection() -> rusqlite::Connection {
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    crate::migrations::run_migrations(&mut conn).unwrap();
    conn
}

/// Convert a `usize` row limit to SQLite's integer type.
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
