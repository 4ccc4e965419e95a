// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the store collaborator.
//!
//! Backends implement [`StorageAdapter`] for lifecycle and [`LedgerStore`]
//! for transactional access; `#[async_trait]` is used throughout.

pub mod ledger;
pub mod storage;

pub use ledger::{LedgerStore, LedgerTxn};
pub use storage::StorageAdapter;
