// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite storage exposed through the [`PluginAdapter`] lifecycle.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use meetlr_config::model::StorageConfig;
use meetlr_core::{AdapterType, HealthStatus, MeetlrError, PluginAdapter, TaskStatus};

use crate::database::{Database, map_tr_err};
use crate::queries::pending_tasks;

/// SQLite-backed storage adapter sharing one [`Database`] handle.
pub struct SqliteStorage {
    db: Arc<Database>,
}

impl SqliteStorage {
    /// Open the configured database and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, MeetlrError> {
        let db = Database::open_with(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite storage initialized");
        Ok(Self { db: Arc::new(db) })
    }

    pub fn from_database(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    /// Healthy when the database answers; degraded when rows are piling up
    /// in `processing`, which usually means a stuck executor.
    async fn health_check(&self) -> Result<HealthStatus, MeetlrError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        let counts = pending_tasks::count_by_status(&self.db).await?;
        let processing = counts
            .iter()
            .find(|(status, _)| *status == TaskStatus::Processing)
            .map_or(0, |(_, n)| *n);
        if processing > 1000 {
            return Ok(HealthStatus::Degraded(format!(
                "{processing} tasks stuck in processing"
            )));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MeetlrError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}
