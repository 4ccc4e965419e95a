// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tollgate ledger.
//!
//! Business rejections (a profit-protection block, an insufficient wallet)
//! are not errors: they are reported through `ChargeOutcome` in
//! `tollgate-ledger`. Everything here is a failure to evaluate a request.

use thiserror::Error;

/// The primary error type used across the store contract and ledger operations.
#[derive(Debug, Error)]
pub enum TollgateError {
    /// Missing or malformed input, rejected before any transaction opens.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// The caller's identity is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Store-level contention. Safe to retry.
    #[error("transaction conflict: {message}")]
    TransactionConflict { message: String },

    /// The store could not serve the call (connection, query, or commit failure).
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The transaction could not complete within its deadline. Nothing was committed.
    #[error("transaction timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Configuration errors (invalid values, unreadable files).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TollgateError {
    /// Shorthand for a [`TollgateError::NotFound`] on an account.
    pub fn account_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "account",
            key: key.into(),
        }
    }

    /// Shorthand for a [`TollgateError::NotFound`] on a catalog model.
    pub fn model_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "model",
            key: key.into(),
        }
    }

    /// Whether the failed call may succeed if issued again unchanged.
    ///
    /// Conflicts and timeouts are transient: neither leaves partial state behind.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict { .. } | Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(
            TollgateError::TransactionConflict {
                message: "busy".into()
            }
            .is_retryable()
        );
        assert!(
            TollgateError::Timeout {
                duration: std::time::Duration::from_millis(10)
            }
            .is_retryable()
        );
        assert!(!TollgateError::Validation("bad".into()).is_retryable());
        assert!(!TollgateError::model_not_found("x").is_retryable());
        assert!(
            !TollgateError::StoreUnavailable {
                source: Box::new(std::io::Error::other("down")),
            }
            .is_retryable()
        );
    }

    #[test]
    fn not_found_display_names_entity() {
        let err = TollgateError::model_not_found("Ai-podcast");
        assert_eq!(err.to_string(), "model not found: Ai-podcast");
        let err = TollgateError::account_not_found("acc-1");
        assert_eq!(err.to_string(), "account not found: acc-1");
    }
}
