// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tollgate integration tests.
//!
//! [`TestHarness`] assembles a seeded [`tollgate_ledger::LedgerManager`] over
//! either a temp-file SQLite store or the in-memory store, so the same
//! scenario can be run against both backends.

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
