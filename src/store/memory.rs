//! In-memory [`VectorStore`] for tests and throwaway sessions.
//!
//! Same semantics as the SQLite store, minus persistence: upsert by ID,
//! brute-force cosine search, nothing survives the process.

use std::sync::{Arc, RwLock};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::models::{Chunk, RetrievedChunk};

use super::{top_k, VectorStore};

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

pub struct InMemoryVectorStore {
    embedder: Arc<dyn EmbeddingProvider>,
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryVectorStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            chunks: RwLock::new(Vec::new()),
        }
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory vector store lock poisoned")
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                chunks.len()
            );
        }

        let mut stored = self.chunks.write().map_err(poisoned)?;
        for (chunk, vector) in chunks.iter().zip(vectors) {
            stored.retain(|s| s.chunk.id != chunk.id);
            stored.push(StoredChunk {
                chunk: chunk.clone(),
                vector,
            });
        }
        Ok(chunks.len())
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let query_vec = embed_query(self.embedder.as_ref(), text).await?;

        let stored = self.chunks.read().map_err(poisoned)?;
        let candidates = stored
            .iter()
            .map(|s| RetrievedChunk {
                id: s.chunk.id.clone(),
                text: s.chunk.text.clone(),
                score: cosine_similarity(&query_vec, &s.vector) as f64,
            })
            .collect();
        Ok(top_k(candidates, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().map_err(poisoned)?.len())
    }
}
