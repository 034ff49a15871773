//! Core data models.
//!
//! These types flow through the write path (PDF → [`Chunk`] → store) and the
//! read path (question → [`RetrievedChunk`] → prompt → [`Message`]).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One page of extracted PDF text, the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// `"<source>_page_<page_index>"`, unique within a collection.
    pub id: String,
    /// File name the page came from.
    pub source: String,
    /// 0-based page number within the source PDF.
    pub page_index: usize,
    pub text: String,
    /// SHA-256 hex digest of `text`, used to skip re-embedding unchanged pages.
    pub hash: String,
}

/// A nearest-neighbour hit returned by a vector store query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    /// Cosine similarity to the query, higher is closer.
    pub score: f64,
}

/// Outcome of ingesting one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub source: String,
    /// Pages read from the PDF, before filtering.
    pub pages: usize,
    /// Pages that qualified and were upserted.
    pub chunks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat turn in an interactive session.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
