// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output formatting for CLI results.

use std::fmt::Write;

use serde::Serialize;
use tollgate_core::TollgateError;
use tollgate_ledger::{AccountOverview, AccountStatus};

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), TollgateError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| TollgateError::Internal(format!("failed to serialize output: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Render the admin overview as a fixed-width table.
pub fn overview_table(rows: &[AccountOverview], use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  tollgate report");
    let _ = writeln!(out, "  {}", "-".repeat(86));
    let _ = writeln!(
        out,
        "  {:<30} {:<8} {:>14} {:>10} {:>10} {:>8}",
        "EMAIL", "STATUS", "WALLET", "SPENT", "COST", "MARGIN"
    );
    for row in rows {
        let status = format!("{:<8}", row.status.to_string());
        let status = if use_color {
            colorize(row.status, &status)
        } else {
            status
        };
        let _ = writeln!(
            out,
            "  {:<30} {} {:>14} {:>10.2} {:>10.2} {:>7.2}%",
            truncate(&row.email, 30),
            status,
            row.wallet_tokens,
            row.total_spent,
            row.cost_to_owner,
            row.profit_margin,
        );
        if let Some(message) = &row.message {
            let _ = writeln!(out, "    {message}");
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} account(s)", rows.len());
    out
}

fn colorize(status: AccountStatus, text: &str) -> String {
    use colored::Colorize;
    match status {
        AccountStatus::Active => text.green().to_string(),
        AccountStatus::Warning => text.yellow().to_string(),
        AccountStatus::Blocked => text.red().to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
