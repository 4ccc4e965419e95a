// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin overview of every account's balance, cost exposure, and recent activity.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, EnumString};
use tollgate_core::money::token_string;
use tollgate_core::{AccountSnapshot, PurchaseEntry, UsageLogEntry};

use crate::guard::{Decision, Verdict};

/// Purchases listed per account.
pub const RECENT_PURCHASES: usize = 3;
/// Usage entries listed per account.
pub const RECENT_ACTIVITIES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Warning,
    Blocked,
}

impl From<Verdict> for AccountStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Allow => Self::Active,
            Verdict::AllowWithWarning => Self::Warning,
            Verdict::Block => Self::Blocked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
    pub id: String,
    #[serde(with = "token_string")]
    pub amount: u64,
    pub price: Decimal,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub model: String,
    #[serde(with = "token_string")]
    pub tokens: u64,
    /// Current catalog cost per use; absent once the model is removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
    pub date: String,
}

/// One row of the admin overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub status: AccountStatus,
    #[serde(with = "token_string")]
    pub wallet_tokens: u64,
    pub total_spent: Decimal,
    pub cost_to_owner: Decimal,
    pub profit_margin: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_purchases: Vec<PurchaseSummary>,
    pub recent_activities: Vec<ActivitySummary>,
}

impl AccountOverview {
    /// Assemble a row from an account snapshot, its zero-cost guard decision,
    /// its recent journal entries, and the catalog's cost per model.
    pub fn build(
        snapshot: AccountSnapshot,
        decision: Decision,
        purchases: Vec<PurchaseEntry>,
        usage: Vec<UsageLogEntry>,
        cost_per_model: &HashMap<String, Decimal>,
    ) -> Self {
        let AccountSnapshot {
            account,
            cost_tracking,
        } = snapshot;
        Self {
            id: account.id.0,
            email: account.email,
            name: account.name,
            status: decision.verdict.into(),
            wallet_tokens: account.wallet_tokens,
            total_spent: account.total_spent,
            cost_to_owner: cost_tracking
                .map(|t| t.total_cost_to_owner)
                .unwrap_or_default(),
            profit_margin: decision.margin,
            message: decision.message,
            last_purchases: purchases
                .into_iter()
                .map(|p| PurchaseSummary {
                    id: p.id,
                    amount: p.token_amount,
                    price: p.price_paid,
                    date: p.created_at,
                })
                .collect(),
            recent_activities: usage
                .into_iter()
                .map(|u| ActivitySummary {
                    cost: cost_per_model.get(&u.model_name).copied(),
                    model: u.model_name,
                    tokens: u.tokens_used,
                    date: u.created_at,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ProfitGuard;
    use rust_decimal_macros::dec;
    use tollgate_core::{Account, AccountId, CostTracking};

    fn snapshot(spent: Decimal, cost: Option<Decimal>) -> AccountSnapshot {
        AccountSnapshot {
            account: Account {
                id: AccountId::from("acc-1"),
                email: "a@example.com".into(),
                name: None,
                is_admin: false,
                wallet_tokens: 42,
                total_spent: spent,
                created_at: "2026-01-01T00:00:00.000Z".into(),
            },
            cost_tracking: cost.map(|c| CostTracking {
                account_id: AccountId::from("acc-1"),
                total_tokens_used: 0,
                total_cost_to_owner: c,
                updated_at: "2026-01-01T00:00:00.000Z".into(),
            }),
        }
    }

    #[test]
    fn status_follows_guard_verdict() {
        let guard = ProfitGuard::default();
        for (cost, status) in [
            (None, AccountStatus::Active),
            (Some(dec!(45)), AccountStatus::Warning),
            (Some(dec!(55)), AccountStatus::Blocked),
        ] {
            let decision = guard.evaluate(cost, dec!(100), Decimal::ZERO);
            let row = AccountOverview::build(
                snapshot(dec!(100), cost),
                decision,
                vec![],
                vec![],
                &HashMap::new(),
            );
            assert_eq!(row.status, status);
        }
    }

    #[test]
    fn overview_serializes_original_field_names() {
        let decision = ProfitGuard::default().evaluate(Some(dec!(10)), dec!(100), Decimal::ZERO);
        let usage = vec![UsageLogEntry::new(AccountId::from("acc-1"), "Ai-podcast".into(), 100_000)];
        let mut costs = HashMap::new();
        costs.insert("Ai-podcast".to_string(), dec!(0.10));
        let row = AccountOverview::build(
            snapshot(dec!(100), Some(dec!(10))),
            decision,
            vec![PurchaseEntry::new(AccountId::from("acc-1"), 500, dec!(5))],
            usage,
            &costs,
        );

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["status"], "ACTIVE");
        assert_eq!(json["walletTokens"], "42");
        assert_eq!(row.cost_to_owner, dec!(10));
        assert_eq!(row.profit_margin, dec!(90));
        assert!(json["profitMargin"].is_string());
        assert_eq!(json["lastPurchases"][0]["amount"], "500");
        assert_eq!(json["recentActivities"][0]["cost"], "0.10");
        assert!(json.get("message").is_none());
    }
}
