//! SQLite-backed [`VectorStore`].
//!
//! Each row of the `chunks` table holds one page chunk with its embedding as a
//! little-endian `f32` BLOB. Queries are brute-force cosine similarity over
//! the collection's rows, which is plenty for a handful of PDFs.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, embed_query, vec_to_blob, EmbeddingProvider};
use crate::models::{Chunk, RetrievedChunk};

use super::{top_k, VectorStore};

/// A named collection inside the SQLite vector store.
pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl SqliteVectorStore {
    pub fn new(
        pool: SqlitePool,
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            collection: collection.into(),
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Chunks that are new, changed, or were embedded by a different model.
    async fn pending<'a>(&self, chunks: &'a [Chunk]) -> Result<Vec<&'a Chunk>> {
        let model = self.embedder.model_name();
        let mut pending = Vec::new();
        for chunk in chunks {
            let row = sqlx::query(
                "SELECT hash, embedding_model FROM chunks WHERE collection = ? AND id = ?",
            )
            .bind(&self.collection)
            .bind(&chunk.id)
            .fetch_optional(&self.pool)
            .await?;

            let up_to_date = row
                .map(|r| {
                    let hash: String = r.get("hash");
                    let stored_model: String = r.get("embedding_model");
                    hash == chunk.hash && stored_model == model
                })
                .unwrap_or(false);

            if !up_to_date {
                pending.push(chunk);
            }
        }
        Ok(pending)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        let pending = self.pending(chunks).await?;
        tracing::debug!(
            collection = %self.collection,
            total = chunks.len(),
            pending = pending.len(),
            "upserting chunks"
        );

        let mut vectors = Vec::with_capacity(pending.len());
        for batch in pending.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let batch_vectors = self.embedder.embed(&texts).await?;
            if batch_vectors.len() != batch.len() {
                bail!(
                    "embedding provider returned {} vectors for {} texts",
                    batch_vectors.len(),
                    batch.len()
                );
            }
            vectors.extend(batch_vectors);
        }

        let now = chrono::Utc::now().timestamp();
        let model = self.embedder.model_name();
        let mut tx = self.pool.begin().await?;

        for (chunk, vector) in pending.iter().zip(vectors.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunks (collection, id, source, page_index, text, hash,
                                    embedding, embedding_model, dims, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    source = excluded.source,
                    page_index = excluded.page_index,
                    text = excluded.text,
                    hash = excluded.hash,
                    embedding = excluded.embedding,
                    embedding_model = excluded.embedding_model,
                    dims = excluded.dims,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.collection)
            .bind(&chunk.id)
            .bind(&chunk.source)
            .bind(chunk.page_index as i64)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .bind(model)
            .bind(vector.len() as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(pending.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let model = self.embedder.model_name();

        let searchable: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunks WHERE collection = ? AND embedding_model = ?",
        )
        .bind(&self.collection)
        .bind(model)
        .fetch_one(&self.pool)
        .await?;

        if searchable == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(self.embedder.as_ref(), text).await?;

        let rows = sqlx::query(
            "SELECT id, text, embedding FROM chunks WHERE collection = ? AND embedding_model = ?",
        )
        .bind(&self.collection)
        .bind(model)
        .fetch_all(&self.pool)
        .await?;

        let candidates = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedChunk {
                    id: row.get("id"),
                    text: row.get("text"),
                    score: cosine_similarity(&query_vec, &blob_to_vec(&blob)) as f64,
                }
            })
            .collect();

        Ok(top_k(candidates, k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks WHERE collection = ?")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
