// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Profit-protection guard.
//!
//! The guard caps an account's accumulated operator cost at a fraction of
//! its lifetime spend (50% by default). It warns once the projected cost
//! passes a share of that cap (80% by default) and blocks above the cap.
//! It is a pure function of its inputs and never touches the store.

use rust_decimal::Decimal;
use serde::Serialize;
use strum::{Display, EnumString};
use tollgate_config::model::GuardConfig;
use tollgate_core::money::round_display;
use tracing::{info, warn};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Outcome class of a guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allow,
    AllowWithWarning,
    Block,
}

/// Thresholds applied by [`ProfitGuard`], as whole percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Accumulated owner cost may not exceed this share of lifetime spend.
    pub cost_ceiling_percent: u32,
    /// Share of the ceiling where warnings start.
    pub warning_percent: u32,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            cost_ceiling_percent: 50,
            warning_percent: 80,
        }
    }
}

impl From<&GuardConfig> for GuardPolicy {
    fn from(config: &GuardConfig) -> Self {
        Self {
            cost_ceiling_percent: config.cost_ceiling_percent,
            warning_percent: config.warning_percent,
        }
    }
}

/// Result of [`ProfitGuard::evaluate`], with the figures it was based on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub verdict: Verdict,
    /// Block reason or warning text; `None` for a plain allow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub projected_cost: Decimal,
    pub cost_limit: Decimal,
    pub total_spent: Decimal,
    /// Projected profit margin in percent, two decimals.
    pub margin: Decimal,
}

impl Decision {
    pub fn is_blocked(&self) -> bool {
        self.verdict == Verdict::Block
    }

    /// The warning text, if this decision is an allow-with-warning.
    pub fn warning(&self) -> Option<&str> {
        match self.verdict {
            Verdict::AllowWithWarning => self.message.as_deref(),
            _ => None,
        }
    }
}

/// Decides whether one more unit of usage keeps an account within the
/// operator's cost ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfitGuard {
    policy: GuardPolicy,
}

impl ProfitGuard {
    pub fn new(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// Evaluate the next action's `incremental_cost` against the account's
    /// `current_cost` (absent when the account has no cost history yet) and
    /// lifetime `total_spent`.
    pub fn evaluate(
        &self,
        current_cost: Option<Decimal>,
        total_spent: Decimal,
        incremental_cost: Decimal,
    ) -> Decision {
        let cost_limit = total_spent * percent(self.policy.cost_ceiling_percent);

        // No cost history: always allowed.
        let Some(current_cost) = current_cost else {
            return decision(Verdict::Allow, None, incremental_cost, cost_limit, total_spent);
        };

        let projected = current_cost + incremental_cost;
        if projected > cost_limit {
            let message = format!(
                "User has reached {}% profit margin threshold. Total spent: ${:.2}, Current cost: ${:.2}",
                self.policy.cost_ceiling_percent,
                round_display(total_spent, 2),
                round_display(projected, 2),
            );
            info!(
                total_spent = %total_spent,
                projected_cost = %projected,
                cost_limit = %cost_limit,
                "usage blocked by profit guard"
            );
            return decision(Verdict::Block, Some(message), projected, cost_limit, total_spent);
        }

        let warning_threshold = cost_limit * percent(self.policy.warning_percent);
        if projected > warning_threshold && !cost_limit.is_zero() {
            let share = round_display(projected / cost_limit * HUNDRED, 1);
            warn!(
                total_spent = %total_spent,
                projected_cost = %projected,
                share_of_limit = %share,
                "approaching profit margin threshold"
            );
            let message =
                format!("User is approaching profit margin threshold ({share:.1}%)");
            return decision(
                Verdict::AllowWithWarning,
                Some(message),
                projected,
                cost_limit,
                total_spent,
            );
        }

        decision(Verdict::Allow, None, projected, cost_limit, total_spent)
    }
}

fn percent(value: u32) -> Decimal {
    Decimal::from(value) / HUNDRED
}

fn decision(
    verdict: Verdict,
    message: Option<String>,
    projected_cost: Decimal,
    cost_limit: Decimal,
    total_spent: Decimal,
) -> Decision {
    Decision {
        verdict,
        message,
        projected_cost,
        cost_limit,
        total_spent,
        margin: profit_margin(projected_cost, total_spent),
    }
}

/// `100 - cost / spent * 100`, two decimals; zero when nothing was spent.
pub fn profit_margin(cost: Decimal, total_spent: Decimal) -> Decimal {
    if total_spent.is_zero() {
        return Decimal::ZERO;
    }
    round_display(HUNDRED - cost / total_spent * HUNDRED, 2)
}
