use std::path::PathBuf;

use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;

#[derive(Debug, Clone)]
pub struct EpisodeRecord {
    pub id: String,
    pub thread_id: String,
    pub user_input: String,
    pub assistant_output: String,
    pub content: String,
    pub content_hash: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct EpisodicStore {
    pool: SqlitePool,
}

impl EpisodicStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, ApiError> {
        Self::with_path(paths.episodic_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS episodes (
                id TEXT PRIMARY KEY,
                thread_id TEXT NOT NULL,
                user_input TEXT NOT NULL,
                assistant_output TEXT NOT NULL,
                content TEXT NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_episodes_thread_created_at
             ON episodes(thread_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    /// Inserts one episode, deduplicated by content hash. Returns whether
    /// a new row was actually added.
    pub async fn insert_episode(
        &self,
        id: &str,
        thread_id: &str,
        user_input: &str,
        assistant_output: &str,
        content: &str,
    ) -> Result<bool, ApiError> {
        let hash = content_hash(content);

        let result = sqlx::query(
            "INSERT OR IGNORE INTO episodes
                (id, thread_id, user_input, assistant_output, content, content_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(id)
        .bind(thread_id)
        .bind(user_input)
        .bind(assistant_output)
        .bind(content)
        .bind(&hash)
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_episodes(&self, thread_id: Option<&str>) -> Result<usize, ApiError> {
        let count: i64 = if let Some(thread_id) = thread_id {
            sqlx::query_scalar("SELECT COUNT(*) FROM episodes WHERE thread_id = ?1")
                .bind(thread_id)
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?
        } else {
            sqlx::query_scalar("SELECT COUNT(*) FROM episodes")
                .fetch_one(&self.pool)
                .await
                .map_err(ApiError::internal)?
        };

        Ok(count as usize)
    }

    pub async fn recent_episodes(&self, limit: usize) -> Result<Vec<EpisodeRecord>, ApiError> {
        let rows = sqlx::query(
            "SELECT id, thread_id, user_input, assistant_output, content, content_hash, created_at
             FROM episodes
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut episodes = Vec::new();
        for row in rows {
            episodes.push(EpisodeRecord {
                id: row.get("id"),
                thread_id: row.get("thread_id"),
                user_input: row.get("user_input"),
                assistant_output: row.get("assistant_output"),
                content: row.get("content"),
                content_hash: row.get("content_hash"),
                created_at: row.get("created_at"),
            });
        }

        Ok(episodes)
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> EpisodicStore {
        let tmp = std::env::temp_dir().join(format!(
            "repuragent-episodic-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        EpisodicStore::with_path(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn insert_deduplicates_by_content_hash() {
        let store = test_store().await;

        let first = store
            .insert_episode("e1", "t1", "what is Q3 revenue", "12.4M", "User: what is Q3 revenue\nAssistant: 12.4M")
            .await
            .unwrap();
        let second = store
            .insert_episode("e2", "t1", "what is Q3 revenue", "12.4M", "User: what is Q3 revenue\nAssistant: 12.4M")
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.count_episodes(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn counts_are_scoped_by_thread() {
        let store = test_store().await;

        store
            .insert_episode("e1", "t1", "u1", "a1", "User: u1\nAssistant: a1")
            .await
            .unwrap();
        store
            .insert_episode("e2", "t2", "u2", "a2", "User: u2\nAssistant: a2")
            .await
            .unwrap();

        assert_eq!(store.count_episodes(Some("t1")).await.unwrap(), 1);
        assert_eq!(store.count_episodes(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn persistence_reload() {
        let tmp = std::env::temp_dir().join(format!(
            "repuragent-episodic-persist-test-{}.db",
            uuid::Uuid::new_v4()
        ));

        {
            let store = EpisodicStore::with_path(tmp.clone()).await.unwrap();
            store
                .insert_episode("persist-1", "t1", "u", "a", "User: u\nAssistant: a")
                .await
                .unwrap();
            assert_eq!(store.count_episodes(None).await.unwrap(), 1);
        }

        let reloaded = EpisodicStore::with_path(tmp).await.unwrap();
        assert_eq!(reloaded.count_episodes(None).await.unwrap(), 1);
        let recent = reloaded.recent_episodes(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, "persist-1");
    }
}
