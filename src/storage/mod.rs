//! SQLite persistence shared by the document and feedback stores.
//!
//! One database file holds `documents`, `user_feedback` and `query_log`.
//! Embeddings are stored as little-endian `f32` blobs.

mod documents;

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::core::errors::RagError;

pub use documents::{Document, DocumentStore, SqliteDocumentStore};

pub async fn open_pool(db_path: &Path) -> Result<SqlitePool, RagError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(RagError::storage)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(8)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), RagError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            embedding BLOB
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS user_feedback (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query TEXT NOT NULL,
            response TEXT NOT NULL,
            rating INTEGER NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS query_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query TEXT NOT NULL,
            response TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn deserialize_embedding(bytes: &[u8]) -> Result<Vec<f32>, RagError> {
    if bytes.len() % 4 != 0 {
        return Err(RagError::Storage(format!(
            "corrupt embedding blob of {} bytes",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let path = std::env::temp_dir().join(format!("rag-chatbot-test-{}.db", uuid::Uuid::new_v4()));
    open_pool(&path).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_blob_is_little_endian_f32() {
        let blob = serialize_embedding(&[1.0, -0.5]);
        assert_eq!(blob.len(), 8);
        assert_eq!(&blob[0..4], &1.0f32.to_le_bytes());
        assert_eq!(deserialize_embedding(&blob).unwrap(), vec![1.0, -0.5]);
    }

    #[test]
    fn truncated_blob_is_a_storage_error() {
        let err = deserialize_embedding(&[0, 0, 128]).unwrap_err();
        assert_eq!(err.code(), "storage_error");
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let pool = test_pool().await;
        init_schema(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["documents", "query_log", "user_feedback"]);
    }
}
