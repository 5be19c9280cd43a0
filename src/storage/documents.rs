use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use super::{deserialize_embedding, serialize_embedding};
use crate::core::errors::RagError;

/// A stored corpus entry. Immutable once written, except that a missing
/// embedding may be filled in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub content: String,
    pub embedding: Option<Vec<f32>>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document atomically and return its id.
    async fn add(&self, content: &str, embedding: Option<Vec<f32>>) -> Result<i64, RagError>;

    async fn get(&self, id: i64) -> Result<Document, RagError>;

    /// Snapshot of every document, ordered by id.
    async fn all(&self) -> Result<Vec<Document>, RagError>;

    /// Fill in an embedding computed after ingestion.
    ///
    /// Returns `false` when the document already had one.
    async fn set_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, RagError>;

    /// Documents still waiting for an embedding.
    async fn pending_embeddings(&self) -> Result<Vec<Document>, RagError>;

    async fn count(&self) -> Result<usize, RagError>;
}

#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn row_to_document(row: &SqliteRow) -> Result<Document, RagError> {
        let blob: Option<Vec<u8>> = row.try_get("embedding")?;
        let embedding = match blob {
            Some(bytes) if !bytes.is_empty() => Some(deserialize_embedding(&bytes)?),
            _ => None,
        };

        Ok(Document {
            id: row.try_get("id")?,
            content: row.try_get("content")?,
            embedding,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add(&self, content: &str, embedding: Option<Vec<f32>>) -> Result<i64, RagError> {
        if content.trim().is_empty() {
            return Err(RagError::Validation(
                "document content cannot be empty".to_string(),
            ));
        }
        let blob = embedding.as_deref().map(serialize_embedding);

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("INSERT INTO documents (content, embedding) VALUES (?1, ?2)")
            .bind(content)
            .bind(blob)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.last_insert_rowid())
    }

    async fn get(&self, id: i64) -> Result<Document, RagError> {
        let row = sqlx::query("SELECT id, content, embedding FROM documents WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_document(&row),
            None => Err(RagError::NotFound(format!("document {}", id))),
        }
    }

    async fn all(&self) -> Result<Vec<Document>, RagError> {
        let rows = sqlx::query("SELECT id, content, embedding FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn set_embedding(&self, id: i64, embedding: &[f32]) -> Result<bool, RagError> {
        let blob = serialize_embedding(embedding);

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;
        let result =
            sqlx::query("UPDATE documents SET embedding = ?1 WHERE id = ?2 AND embedding IS NULL")
                .bind(&blob)
                .bind(id)
                .execute(&mut *tx)
                .await?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM documents WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match exists {
                Some(_) => Ok(false),
                None => Err(RagError::NotFound(format!("document {}", id))),
            };
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn pending_embeddings(&self) -> Result<Vec<Document>, RagError> {
        let rows = sqlx::query(
            "SELECT id, content, embedding FROM documents WHERE embedding IS NULL ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_document).collect()
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
