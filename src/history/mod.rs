use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

/// Seeded as the first assistant message of every new thread.
pub const WELCOME_MESSAGE: &str = "Hello! I'm RepurAgent. I coordinate research, \
data, prediction and reporting agents to work through your tasks. Pick a \
conversation from the sidebar to review what the agents did.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadInfo {
    pub id: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub message_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: i64,
    pub thread_id: String,
    pub role: String,
    pub content: String,
    pub tool_calls: Option<Value>,
    pub created_at: String,
}

/// Everything the page needs to show one conversation, including the
/// bookkeeping id sets the recording system tracks per thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub thread_id: String,
    pub messages: Vec<StoredMessage>,
    pub processed_message_ids: Vec<i64>,
    pub processed_tool_ids: Vec<i64>,
}

#[derive(Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl ConversationStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to open conversation db: {}", e)))?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS threads (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init threads table: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tool_calls JSON,
                created_at TEXT NOT NULL,
                FOREIGN KEY(thread_id) REFERENCES threads(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to init messages table: {}", e)))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_thread_id ON messages(thread_id)")
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    /// Threads in creation order, oldest first. Callers that want the
    /// sidebar order reverse this.
    pub async fn list_threads(&self) -> Result<Vec<ThreadInfo>, ApiError> {
        let rows = sqlx::query(
            "SELECT t.id, t.title, t.created_at, t.updated_at, \
             COUNT(m.id) as msg_count \
             FROM threads t \
             LEFT JOIN messages m ON t.id = m.thread_id \
             GROUP BY t.id \
             ORDER BY t.created_at ASC, t.id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        let mut threads = Vec::new();
        for row in rows {
            threads.push(ThreadInfo {
                id: row.try_get::<String, _>("id").unwrap_or_default(),
                title: row.try_get::<String, _>("title").unwrap_or_default(),
                created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
                updated_at: row.try_get::<String, _>("updated_at").unwrap_or_default(),
                message_count: row.try_get::<i64, _>("msg_count").unwrap_or(0),
            });
        }
        Ok(threads)
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Option<ThreadInfo>, ApiError> {
        let row = sqlx::query("SELECT * FROM threads WHERE id = ?")
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let count: i64 = sqlx::query("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get(0))
            .unwrap_or(0);

        Ok(Some(ThreadInfo {
            id: row.try_get::<String, _>("id").unwrap_or_default(),
            title: row.try_get::<String, _>("title").unwrap_or_default(),
            created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
            updated_at: row.try_get::<String, _>("updated_at").unwrap_or_default(),
            message_count: count,
        }))
    }

    /// New thread seeded with the welcome message. An empty or missing
    /// title becomes "New Task <short-id>".
    pub async fn create_thread(
        &self,
        title: Option<String>,
    ) -> Result<ConversationSnapshot, ApiError> {
        let thread_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        let title = match title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => format!("New Task {}", &thread_id[..8]),
        };

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("INSERT INTO threads (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(&thread_id)
            .bind(&title)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create thread: {}", e)))?;

        sqlx::query(
            "INSERT INTO messages (thread_id, role, content, tool_calls, created_at) \
             VALUES (?, 'assistant', ?, NULL, ?)",
        )
        .bind(&thread_id)
        .bind(WELCOME_MESSAGE)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;

        self.load_conversation(&thread_id).await
    }

    /// Full snapshot of one thread: every message in insertion order plus
    /// the processed-id bookkeeping derived from the stored rows.
    pub async fn load_conversation(
        &self,
        thread_id: &str,
    ) -> Result<ConversationSnapshot, ApiError> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        if exists == 0 {
            return Err(ApiError::NotFound(format!(
                "Thread '{}' does not exist",
                thread_id
            )));
        }

        let messages = self.get_history(thread_id, 0).await?;
        let processed_message_ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let processed_tool_ids: Vec<i64> = messages
            .iter()
            .filter(|m| m.tool_calls.as_ref().is_some_and(|v| !v.is_null()))
            .map(|m| m.id)
            .collect();

        Ok(ConversationSnapshot {
            thread_id: thread_id.to_string(),
            messages,
            processed_message_ids,
            processed_tool_ids,
        })
    }

    /// Up to `limit` most recent messages in chronological order.
    /// `limit <= 0` returns everything.
    pub async fn get_history(
        &self,
        thread_id: &str,
        limit: i64,
    ) -> Result<Vec<StoredMessage>, ApiError> {
        let rows = if limit > 0 {
            sqlx::query(
                "SELECT * FROM (SELECT * FROM messages WHERE thread_id = ? ORDER BY id DESC LIMIT ?) ORDER BY id ASC",
            )
            .bind(thread_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?
        } else {
            sqlx::query("SELECT * FROM messages WHERE thread_id = ? ORDER BY id ASC")
                .bind(thread_id)
                .fetch_all(&self.pool)
                .await
                .map_err(ApiError::internal)?
        };

        let mut messages = Vec::new();
        for row in rows {
            messages.push(StoredMessage {
                id: row.try_get::<i64, _>("id").unwrap_or_default(),
                thread_id: row.try_get::<String, _>("thread_id").unwrap_or_default(),
                role: row.try_get::<String, _>("role").unwrap_or_default(),
                content: row.try_get::<String, _>("content").unwrap_or_default(),
                tool_calls: row.try_get::<Option<Value>, _>("tool_calls").unwrap_or(None),
                created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
            });
        }

        Ok(messages)
    }

    pub async fn add_message(
        &self,
        thread_id: &str,
        role: &str,
        content: &str,
        tool_calls: Option<Value>,
    ) -> Result<i64, ApiError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT OR IGNORE INTO threads (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(format!("New Task {}", thread_id.chars().take(8).collect::<String>()))
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("UPDATE threads SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(thread_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        let result = sqlx::query(
            "INSERT INTO messages (thread_id, role, content, tool_calls, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(thread_id)
        .bind(role)
        .bind(content)
        .bind(tool_calls)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)?;

        Ok(result.last_insert_rowid())
    }

    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query("UPDATE threads SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(now)
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!(
                "Thread '{}' does not exist",
                thread_id
            )));
        }
        Ok(())
    }

    /// Idempotent: deleting an unknown thread succeeds.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM threads WHERE id = ?")
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn touch_thread(&self, thread_id: &str) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query("UPDATE threads SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(thread_id)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    pub async fn message_count(&self, thread_id: &str) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM messages WHERE thread_id = ?")
            .bind(thread_id)
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get(0))
            .unwrap_or(0);
        Ok(count)
    }

    /// 全スレッドを横断してメッセージ総数を返す。
    pub async fn total_message_count(&self) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get(0))
            .unwrap_or(0);
        Ok(count)
    }

    pub async fn thread_count(&self) -> Result<i64, ApiError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) FROM threads")
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get(0))
            .unwrap_or(0);
        Ok(count)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Size of the database file on disk, None until it exists.
    pub fn db_size_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.db_path).ok().map(|m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn test_store() -> ConversationStore {
        let tmp = std::env::temp_dir().join(format!(
            "repuragent-conversations-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        ConversationStore::new(tmp).await.unwrap()
    }

    #[tokio::test]
    async fn create_thread_seeds_welcome_message() {
        let store = test_store().await;

        let snapshot = store.create_thread(Some("Market analysis".into())).await.unwrap();

        assert_eq!(snapshot.messages.len(), 1);
        assert_eq!(snapshot.messages[0].role, "assistant");
        assert_eq!(snapshot.messages[0].content, WELCOME_MESSAGE);
        assert_eq!(snapshot.processed_message_ids, vec![snapshot.messages[0].id]);
        assert!(snapshot.processed_tool_ids.is_empty());

        let info = store.get_thread(&snapshot.thread_id).await.unwrap().unwrap();
        assert_eq!(info.title, "Market analysis");
        assert_eq!(info.message_count, 1);
    }

    #[tokio::test]
    async fn empty_title_gets_short_id_default() {
        let store = test_store().await;

        let snapshot = store.create_thread(Some("   ".into())).await.unwrap();
        let info = store.get_thread(&snapshot.thread_id).await.unwrap().unwrap();

        assert!(info.title.starts_with("New Task "));
        assert_eq!(info.title.len(), "New Task ".len() + 8);
    }

    #[tokio::test]
    async fn load_conversation_tracks_tool_message_ids() {
        let store = test_store().await;
        let snapshot = store.create_thread(None).await.unwrap();
        let thread_id = snapshot.thread_id;

        store
            .add_message(&thread_id, "user", "Analyze Q3 revenue", None)
            .await
            .unwrap();
        let tool_msg_id = store
            .add_message(
                &thread_id,
                "assistant",
                "**DATA_AGENT**\nFetched the revenue table.",
                Some(json!([{ "name": "fetch_table", "args": { "quarter": "Q3" } }])),
            )
            .await
            .unwrap();

        let loaded = store.load_conversation(&thread_id).await.unwrap();

        assert_eq!(loaded.messages.len(), 3);
        assert_eq!(loaded.processed_message_ids.len(), 3);
        assert_eq!(loaded.processed_tool_ids, vec![tool_msg_id]);
    }

    #[tokio::test]
    async fn load_conversation_unknown_thread_is_not_found() {
        let store = test_store().await;

        let result = store.load_conversation("no-such-thread").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_history_windows_most_recent_in_order() {
        let store = test_store().await;
        let snapshot = store.create_thread(None).await.unwrap();
        let thread_id = snapshot.thread_id;

        for i in 0..5 {
            store
                .add_message(&thread_id, "user", &format!("message {}", i), None)
                .await
                .unwrap();
        }

        let window = store.get_history(&thread_id, 2).await.unwrap();

        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "message 3");
        assert_eq!(window[1].content, "message 4");
    }

    #[tokio::test]
    async fn list_threads_is_oldest_first_with_counts() {
        let store = test_store().await;

        let first = store.create_thread(Some("first".into())).await.unwrap();
        let second = store.create_thread(Some("second".into())).await.unwrap();
        store
            .add_message(&second.thread_id, "user", "hello", None)
            .await
            .unwrap();

        let threads = store.list_threads().await.unwrap();

        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, first.thread_id);
        assert_eq!(threads[1].id, second.thread_id);
        assert_eq!(threads[0].message_count, 1);
        assert_eq!(threads[1].message_count, 2);
    }

    #[tokio::test]
    async fn delete_thread_cascades_and_is_idempotent() {
        let store = test_store().await;
        let snapshot = store.create_thread(None).await.unwrap();
        let thread_id = snapshot.thread_id;

        store.delete_thread(&thread_id).await.unwrap();
        store.delete_thread(&thread_id).await.unwrap();

        assert!(store.get_thread(&thread_id).await.unwrap().is_none());
        assert_eq!(store.total_message_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rename_unknown_thread_is_not_found() {
        let store = test_store().await;

        let result = store.rename_thread("missing", "new title").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }
}
