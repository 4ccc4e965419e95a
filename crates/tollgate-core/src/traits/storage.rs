// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter lifecycle shared by every ledger backend.

use async_trait::async_trait;

use crate::error::TollgateError;
use crate::types::HealthStatus;

/// Lifecycle of a persistence backend.
///
/// A backend is constructed cold, opened with [`initialize`](Self::initialize),
/// and released with [`close`](Self::close). The ledger owns the handle it is
/// given; there is no process-wide store.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &str;

    /// Initializes the backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), TollgateError>;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, TollgateError>;

    /// Closes the backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), TollgateError>;
}
