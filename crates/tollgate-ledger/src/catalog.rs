// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default model catalog.

use rust_decimal_macros::dec;
use tollgate_core::ModelEntry;

/// The models every fresh ledger offers, with their token price and
/// operator cost per use.
pub fn default_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::new("Ai-podcast", 100_000, dec!(0.10)),
        ModelEntry::new("Ai-musicgen", 150_000, dec!(0.15)),
        ModelEntry::new("Ai-mindmapgen", 20_000, dec!(0.02)),
        ModelEntry::new("Ai-textTOimage", 50_000, dec!(0.05)),
    ]
}
