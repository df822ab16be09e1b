// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Clone [`Database::connection`] to share it; do NOT open a second connection
//! for writes.

use std::path::Path;
use std::time::Duration;

use meetlr_core::MeetlrError;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Convert a tokio-rusqlite error into `MeetlrError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> MeetlrError {
    MeetlrError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a domain error raised inside a `call` closure, wrapping only
/// connection-level failures as storage errors.
pub fn flatten_tr_err(e: tokio_rusqlite::Error<MeetlrError>) -> MeetlrError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => MeetlrError::Storage {
            source: format!("{other:?}").into(),
        },
    }
}

/// Handle to the pipeline database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
}

impl Database {
    /// Open (or create) the database at `path` in WAL mode and run migrations.
    pub async fn open(path: &str) -> Result<Self, MeetlrError> {
        Self::open_with(path, true).await
    }

    /// Open the database, choosing the journal mode explicitly.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, MeetlrError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(MeetlrError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(MeetlrError::storage)?;
        initialize(&conn, wal_mode).await?;
        info!(path, wal_mode, "database opened");

        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, MeetlrError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(MeetlrError::storage)?;
        initialize(&conn, false).await?;
        Ok(Self {
            conn,
            path: ":memory:".to_string(),
        })
    }

    /// The single-writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), MeetlrError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(MeetlrError::storage)?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

async fn initialize(conn: &tokio_rusqlite::Connection, wal_mode: bool) -> Result<(), MeetlrError> {
    conn.call(move |conn| -> Result<(), rusqlite::Error> {
        if wal_mode {
            conn.pragma_update(None, "journal_mode", "WAL")?;
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)?;

    conn.call(|conn| -> Result<(), MeetlrError> { run_migrations(conn) })
        .await
        .map_err(flatten_tr_err)
}
