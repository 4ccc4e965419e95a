// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-point money and token arithmetic.
//!
//! Monetary amounts are [`Decimal`] in memory and integer micro-units
//! (scale 6) at rest, so increments performed by the store are exact integer
//! additions. Token quantities are `u64` in memory but must fit the store's
//! signed 64-bit integer column.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::TollgateError;

/// Fractional digits kept for monetary amounts.
pub const MONEY_SCALE: u32 = 6;

/// Largest token quantity any wallet, model, or purchase may hold.
pub const MAX_TOKENS: u64 = i64::MAX as u64;

/// Convert a monetary amount to integer micro-units.
///
/// Rejects negative amounts, amounts with more than [`MONEY_SCALE`]
/// fractional digits, and amounts that overflow an `i64`.
pub fn to_micros(amount: Decimal, field: &str) -> Result<i64, TollgateError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TollgateError::Validation(format!(
            "{field} must be non-negative, got {amount}"
        )));
    }
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(TollgateError::Validation(format!(
            "{field} has more than {MONEY_SCALE} decimal places: {amount}"
        )));
    }
    let scaled = normalized
        .checked_mul(Decimal::from(1_000_000u32))
        .ok_or_else(|| TollgateError::Validation(format!("{field} is out of range: {amount}")))?;
    scaled
        .to_i64()
        .ok_or_else(|| TollgateError::Validation(format!("{field} is out of range: {amount}")))
}

/// Convert stored micro-units back to a monetary amount.
pub fn from_micros(micros: i64) -> Decimal {
    Decimal::new(micros, MONEY_SCALE).normalize()
}

/// Check a token quantity against the store's integer range.
pub fn check_tokens(tokens: u64, field: &str) -> Result<i64, TollgateError> {
    i64::try_from(tokens).map_err(|_| {
        TollgateError::Validation(format!("{field} exceeds the maximum of {MAX_TOKENS}: {tokens}"))
    })
}

/// Read a token quantity from the store, refusing negative values.
pub fn tokens_from_store(raw: i64, field: &str) -> Result<u64, TollgateError> {
    u64::try_from(raw)
        .map_err(|_| TollgateError::Internal(format!("stored {field} is negative: {raw}")))
}

/// Round for display using midpoint-away-from-zero.
pub fn round_display(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Serde helpers that render token quantities as decimal strings.
///
/// Accepts either a string or a JSON number on input.
pub mod token_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn micros_round_trip_is_exact() {
        for amount in [dec!(0), dec!(0.01), dec!(0.15), dec!(49.99), dec!(1234.567891)] {
            let micros = to_micros(amount, "amount").unwrap();
            assert_eq!(from_micros(micros), amount.normalize());
        }
        assert_eq!(to_micros(dec!(0.10), "amount").unwrap(), 100_000);
    }

    #[test]
    fn too_many_decimal_places_rejected() {
        let err = to_micros(dec!(0.0000001), "price_paid").unwrap_err();
        assert!(matches!(err, TollgateError::Validation(ref m) if m.contains("price_paid")));
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        assert_eq!(to_micros(dec!(1.50000000), "amount").unwrap(), 1_500_000);
    }

    #[test]
    fn negative_amount_rejected() {
        assert!(to_micros(dec!(-0.01), "amount").is_err());
    }

    #[test]
    fn token_bounds() {
        assert_eq!(check_tokens(42, "tokens").unwrap(), 42);
        assert!(check_tokens(u64::MAX, "tokens").is_err());
        assert!(tokens_from_store(-1, "wallet_tokens").is_err());
    }

    #[test]
    fn display_rounding_is_midpoint_away_from_zero() {
        assert_eq!(round_display(dec!(99.95), 1), dec!(100.0));
        assert_eq!(round_display(dec!(0.125), 2), dec!(0.13));
        assert_eq!(round_display(dec!(49.994), 2), dec!(49.99));
    }

    #[test]
    fn token_string_accepts_text_and_numbers() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "token_string")]
            tokens: u64,
        }

        let json = serde_json::to_string(&Wrapper { tokens: u64::MAX }).unwrap();
        assert_eq!(json, format!("{{\"tokens\":\"{}\"}}", u64::MAX));

        let parsed: Wrapper = serde_json::from_str(r#"{"tokens":"150000"}"#).unwrap();
        assert_eq!(parsed.tokens, 150_000);
        let parsed: Wrapper = serde_json::from_str(r#"{"tokens":20000}"#).unwrap();
        assert_eq!(parsed.tokens, 20_000);
    }
}
