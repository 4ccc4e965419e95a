// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;
use std::time::Duration;

use rusqlite::ErrorCode;
use tollgate_config::model::StorageConfig;
use tollgate_core::TollgateError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the ledger database: one tokio-rusqlite connection, migrated.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    wal_mode: bool,
}

impl Database {
    /// Open (creating if needed) the database at `config.database_path`,
    /// apply PRAGMAs, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, TollgateError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| TollgateError::StoreUnavailable {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| TollgateError::StoreUnavailable {
                source: Box::new(e),
            })?;
        let db = Self {
            conn,
            wal_mode: config.wal_mode,
        };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        debug!(path = %config.database_path, wal_mode = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, TollgateError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| TollgateError::StoreUnavailable {
                source: Box::new(e),
            })?;
        let db = Self {
            conn,
            wal_mode: false,
        };
        db.prepare(false, 5_000).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), TollgateError> {
        self.run(move |conn| {
            if wal_mode {
                conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
                    .map_err(map_sqlite_err)?;
                conn.execute_batch("PRAGMA synchronous = NORMAL;")
                    .map_err(map_sqlite_err)?;
            }
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(map_sqlite_err)?;
            conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
                .map_err(map_sqlite_err)?;
            run_migrations(conn)
        })
        .await
    }

    /// Run `f` on the connection's background thread.
    ///
    /// `f` reports its own failures as [`TollgateError`]; only a dead
    /// connection surfaces through tokio-rusqlite's error type.
    pub async fn run<T, F>(&self, f: F) -> Result<T, TollgateError>
    where
        T: Send + 'static,
        F: FnOnce(&mut rusqlite::Connection) -> Result<T, TollgateError> + Send + 'static,
    {
        self.conn
            .call(move |conn| -> Result<Result<T, TollgateError>, rusqlite::Error> { Ok(f(conn)) })
            .await
            .map_err(map_tr_err)?
    }

    /// Checkpoint the WAL (if enabled) and close the connection.
    pub async fn close(self) -> Result<(), TollgateError> {
        if self.wal_mode {
            self.run(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                    .map_err(map_sqlite_err)
            })
            .await?;
            debug!("WAL checkpoint complete");
        }
        self.conn
            .close()
            .await
            .map_err(|e| TollgateError::StoreUnavailable {
                source: Box::new(e),
            })
    }
}

/// Convert a tokio-rusqlite failure (closed connection, failed call) into a [`TollgateError`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TollgateError {
    TollgateError::StoreUnavailable {
        source: Box::new(e),
    }
}

/// Classify a SQLite error. Lock contention is a retryable conflict.
pub fn map_sqlite_err(e: rusqlite::Error) -> TollgateError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            TollgateError::TransactionConflict {
                message: e.to_string(),
            }
        }
        _ => TollgateError::StoreUnavailable {
            source: Box::new(e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(path: &Path) -> StorageConfig {
        StorageConfig {
            database_path: path.display().to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn open_creates_parent_directories_and_enables_wal() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/ledger.db");
        let db = Database::open(&config_for(&db_path)).await.unwrap();
        assert!(db_path.exists());

        let mode = db
            .run(|conn| {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))
                    .map_err(map_sqlite_err)
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let db = Database::open_in_memory().await.unwrap();
        let result = db
            .run(|conn| {
                conn.execute(
                    "INSERT INTO usage_log (id, account_id, model_name, tokens_used) \
                     VALUES ('u1', 'missing', 'm', 1)",
                    [],
                )
                .map_err(map_sqlite_err)
            })
            .await;
        assert!(matches!(result, Err(TollgateError::StoreUnavailable { .. })));
    }

    #[test]
    fn busy_errors_are_conflicts() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(map_sqlite_err(busy).is_retryable());

        let other = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CORRUPT),
            None,
        );
        assert!(!map_sqlite_err(other).is_retryable());
    }
}
