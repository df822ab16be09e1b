// SPDX-FileCopyrightText: 2026 Meetlr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Migrated databases for integration tests.

use std::sync::Arc;

use meetlr_core::MeetlrError;
use meetlr_storage::Database;

/// A file-backed database in a temp directory that lives as long as the value.
pub struct TestDatabase {
    db: Arc<Database>,
    _dir: Option<tempfile::TempDir>,
}

impl TestDatabase {
    /// WAL-mode database on disk, exercising the same PRAGMAs as production.
    pub async fn on_disk() -> Result<Self, MeetlrError> {
        let dir = tempfile::TempDir::new().map_err(MeetlrError::storage)?;
        let path = dir.path().join("meetlr.db");
        let db = Database::open(&path.to_string_lossy()).await?;
        Ok(Self {
            db: Arc::new(db),
            _dir: Some(dir),
        })
    }

    pub async fn in_memory() -> Result<Self, MeetlrError> {
        Ok(Self {
            db: Arc::new(Database::open_in_memory().await?),
            _dir: None,
        })
    }

    pub fn db(&self) -> Arc<Database> {
        Arc::clone(&self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn on_disk_database_is_migrated() {
        let t = TestDatabase::on_disk().await.unwrap();
        let n: i64 = t
            .db()
            .connection()
            .call(|conn| {
                conn.query_row("SELECT COUNT(*) FROM pending_tasks", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}
