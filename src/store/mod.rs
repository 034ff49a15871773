//! Vector store abstraction.
//!
//! A [`VectorStore`] keeps page chunks of one collection together with their
//! embeddings and answers nearest-neighbour queries over them. Embeddings are
//! computed by the store's [`EmbeddingProvider`]; callers only deal in text.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert`](VectorStore::upsert) | Insert or replace chunks by ID |
//! | [`query`](VectorStore::query) | k nearest chunks to a query text |
//! | [`count`](VectorStore::count) | Number of chunks in the collection |
//!
//! Implementations: [`SqliteVectorStore`] (persistent) and
//! [`InMemoryVectorStore`] (ephemeral, for tests).
//!
//! [`EmbeddingProvider`]: crate::embedding::EmbeddingProvider

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, RetrievedChunk};

pub use memory::InMemoryVectorStore;
pub use sqlite::SqliteVectorStore;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or overwrite chunks keyed by [`Chunk::id`].
    ///
    /// Returns the number of chunks embedded and written. A store may skip
    /// chunks it already holds with the same text and embedding model, so
    /// this can be less than `chunks.len()`. Upserting the same IDs twice
    /// leaves the collection size unchanged.
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize>;

    /// Up to `k` chunks closest to `text`, best first. Empty when the
    /// collection is empty.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>>;

    async fn count(&self) -> Result<usize>;
}

/// Sort candidates by descending score and keep the top `k`.
pub(crate) fn top_k(mut candidates: Vec<RetrievedChunk>, k: usize) -> Vec<RetrievedChunk> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(k);
    candidates
}
