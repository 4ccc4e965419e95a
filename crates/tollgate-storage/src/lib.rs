// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Tollgate ledger.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`. Money is stored as
//! integer micro-units so that increments are exact.

pub mod adapter;
pub mod database;
pub mod migrations;
mod models;
pub mod queries;
mod txn;

pub use adapter::SqliteLedgerStore;
pub use database::Database;
