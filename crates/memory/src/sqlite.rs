//! SQLite checkpoint store.
//!
//! A single `checkpoints` table keyed by session. Every `put` is one upsert
//! statement, so concurrent writers to the same key resolve last-write-wins
//! inside SQLite and a reader never observes a partial snapshot.

use async_trait::async_trait;
use chrono::Utc;
use intellicore_core::checkpoint::CheckpointStore;
use intellicore_core::error::CheckpointError;
use intellicore_core::state::WorkflowState;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    /// Open (or create) the database at `path`.
    pub async fn new(path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {}", path.display());
        Ok(store)
    }

    /// An ephemeral in-process database (single connection).
    pub async fn in_memory() -> Result<Self, CheckpointError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CheckpointError::Storage(format!("Invalid SQLite options: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| CheckpointError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), CheckpointError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                session_key  TEXT PRIMARY KEY NOT NULL,
                state        TEXT NOT NULL,
                updated_at   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::MigrationFailed(format!("checkpoints table: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn put(&self, session_key: &str, state: &WorkflowState) -> Result<(), CheckpointError> {
        let body = serde_json::to_string(state)?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (session_key, state, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_key) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(session_key)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| CheckpointError::Storage(format!("upsert failed: {e}")))?;

        Ok(())
    }

    async fn get(&self, session_key: &str) -> Result<Option<WorkflowState>, CheckpointError> {
        let row = sqlx::query("SELECT state FROM checkpoints WHERE session_key = ?1")
            .bind(session_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("select failed: {e}")))?;

        match row {
            Some(row) => {
                let body: String = row.get("state");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, session_key: &str) -> Result<bool, CheckpointError> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE session_key = ?1")
            .bind(session_key)
            .execute(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("delete failed: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sessions(&self) -> Result<Vec<String>, CheckpointError> {
        let rows = sqlx::query("SELECT session_key FROM checkpoints ORDER BY session_key")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CheckpointError::Storage(format!("list failed: {e}")))?;
        Ok(rows.iter().map(|r| r.get("session_key")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn round_trip_in_memory() {
        let store = SqliteCheckpointStore::in_memory().await.unwrap();
        let state = WorkflowState::new()
            .with("request", "r")
            .with("findings", "f");
        store.put("s1", &state).await.unwrap();
        assert_eq!(store.get("s1").await.unwrap(), Some(state));
        assert!(store.get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_overwrites() {
        let store = SqliteCheckpointStore::in_memory().await.unwrap();
        store.put("s", &WorkflowState::new().with("v", "old")).await.unwrap();
        store.put("s", &WorkflowState::new().with("v", "new")).await.unwrap();
        assert_eq!(
            store.get("s").await.unwrap().unwrap().get_str("v"),
            Some("new")
        );
        assert_eq!(store.list_sessions().await.unwrap(), vec!["s"]);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("checkpoints.db");
        let state = WorkflowState::new().with("topic", "t");

        {
            let store = SqliteCheckpointStore::new(&path).await.unwrap();
            store.put("user-123", &state).await.unwrap();
        }

        let reopened = SqliteCheckpointStore::new(&path).await.unwrap();
        assert_eq!(reopened.get("user-123").await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn concurrent_sessions_write_independently() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            SqliteCheckpointStore::new(&dir.path().join("c.db"))
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let key = format!("session-{i}");
                store
                    .put(&key, &WorkflowState::new().with("n", i))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(store.list_sessions().await.unwrap().len(), 8);
        let s3 = store.get("session-3").await.unwrap().unwrap();
        assert_eq!(s3.get("n"), Some(&serde_json::json!(3)));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let store = SqliteCheckpointStore::in_memory().await.unwrap();
        store.put("s", &WorkflowState::new()).await.unwrap();
        assert!(store.delete("s").await.unwrap());
        assert!(!store.delete("s").await.unwrap());
    }
}
