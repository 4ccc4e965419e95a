// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token charging and profit protection for the Tollgate ledger.
//!
//! This crate provides:
//! - **Profit guard**: pure policy deciding whether the next charge keeps an
//!   account's owner cost under its ceiling
//! - **Ledger manager**: transactional charge, purchase, and account operations
//!   over any [`tollgate_core::LedgerStore`]
//! - **Catalog and report**: the default model catalog and the admin overview

pub mod catalog;
pub mod guard;
pub mod manager;
pub mod report;

pub use catalog::default_models;
pub use guard::{Decision, GuardPolicy, ProfitGuard, Verdict, profit_margin};
pub use manager::{
    BalanceShortfall, ChargeOutcome, ChargeReceipt, LedgerManager, ProfitBlock, PurchaseReceipt,
};
pub use report::{AccountOverview, AccountStatus, ActivitySummary, PurchaseSummary};
