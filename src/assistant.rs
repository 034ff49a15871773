//! Retrieval-augmented question answering.
//!
//! The [`Assistant`] ties the pieces together:
//!
//! ```text
//! ingest: PDF ─► pages ─► chunks (> 50 chars) ─► VectorStore::upsert
//! answer: question ─► VectorStore::query(k = 1) ─► prompt ─► TextGenerator
//! ```
//!
//! Each front end owns one `Assistant` with its own [`Persona`] and
//! collection-scoped store. The assistant keeps no state of its own.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::config::{CliConfig, UiConfig};
use crate::inference::{GenerationParams, InferenceError, TextGenerator};
use crate::models::{IngestReport, RetrievedChunk};
use crate::pdf::{self, LoadError, PdfPages};
use crate::prompt::build_prompt;
use crate::store::VectorStore;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to store chunks: {0:#}")]
    Store(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),
    #[error("model invocation failed: {0}")]
    Inference(#[from] InferenceError),
}

/// System instruction and canned fallback of one front end.
#[derive(Debug, Clone)]
pub struct Persona {
    pub system_prompt: String,
    pub fallback_answer: String,
}

impl From<&CliConfig> for Persona {
    fn from(config: &CliConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            fallback_answer: config.fallback_answer.clone(),
        }
    }
}

impl From<&UiConfig> for Persona {
    fn from(config: &UiConfig) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            fallback_answer: config.fallback_answer.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Answer {
    /// Nothing was retrieved; the model was not called.
    NoContext { message: String },
    Generated {
        text: String,
        context: RetrievedChunk,
    },
}

impl Answer {
    pub fn text(&self) -> &str {
        match self {
            Answer::NoContext { message } => message,
            Answer::Generated { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Answer::NoContext { message } => message,
            Answer::Generated { text, .. } => text,
        }
    }
}

pub struct Assistant {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
    persona: Persona,
    params: GenerationParams,
}

impl Assistant {
    pub fn new(
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn TextGenerator>,
        persona: Persona,
        params: GenerationParams,
    ) -> Self {
        Self {
            store,
            generator,
            persona,
            params,
        }
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Extract a PDF from disk on the blocking pool.
    pub async fn read_file(&self, path: &Path) -> Result<PdfPages, LoadError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf::load_file(&path))
            .await
            .map_err(|e| LoadError::Extract(format!("extraction task failed: {}", e)))?
    }

    /// Extract an in-memory PDF on the blocking pool.
    pub async fn read_bytes(&self, source: &str, bytes: Vec<u8>) -> Result<PdfPages, LoadError> {
        let source = source.to_string();
        tokio::task::spawn_blocking(move || pdf::load_bytes(&source, &bytes))
            .await
            .map_err(|e| LoadError::Extract(format!("extraction task failed: {}", e)))?
    }

    /// Chunk extracted pages and upsert the informative ones.
    pub async fn memorize(&self, pages: PdfPages) -> Result<IngestReport, IngestError> {
        memorize_into(self.store.as_ref(), pages).await
    }

    pub async fn ingest_file(&self, path: &Path) -> Result<IngestReport, IngestError> {
        let pages = self.read_file(path).await?;
        self.memorize(pages).await
    }

    pub async fn ingest_bytes(
        &self,
        source: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestReport, IngestError> {
        let pages = self.read_bytes(source, bytes).await?;
        self.memorize(pages).await
    }

    /// The single closest stored chunk, if the collection has any.
    pub async fn retrieve(&self, question: &str) -> Result<Option<RetrievedChunk>> {
        Ok(self.store.query(question, 1).await?.into_iter().next())
    }

    /// Prompt the model with `question` grounded in `context`.
    pub async fn generate(
        &self,
        question: &str,
        context: &RetrievedChunk,
    ) -> Result<String, InferenceError> {
        let prompt = build_prompt(&self.persona.system_prompt, &context.text, question);
        tracing::debug!(chunk = %context.id, score = context.score, "generating answer");
        self.generator.generate(&prompt, &self.params).await
    }

    /// Retrieve the closest page and answer from it, or fall back to the
    /// persona's canned answer when nothing is stored.
    pub async fn answer(&self, question: &str) -> Result<Answer, AnswerError> {
        self.answer_with(question, |_| {}).await
    }

    /// Like [`answer`](Self::answer), calling `on_context` once context is
    /// found and before the model is invoked.
    pub async fn answer_with<F>(
        &self,
        question: &str,
        on_context: F,
    ) -> Result<Answer, AnswerError>
    where
        F: FnOnce(&RetrievedChunk),
    {
        let Some(context) = self
            .retrieve(question)
            .await
            .map_err(AnswerError::Retrieval)?
        else {
            return Ok(Answer::NoContext {
                message: self.persona.fallback_answer.clone(),
            });
        };

        on_context(&context);
        let text = self.generate(question, &context).await?;
        Ok(Answer::Generated { text, context })
    }
}

/// Chunk `pages` and upsert the informative ones into `store`.
///
/// Nothing is written when no page qualifies.
pub async fn memorize_into(
    store: &dyn VectorStore,
    pages: PdfPages,
) -> Result<IngestReport, IngestError> {
    let source = pages.source.clone();
    let page_count = pages.pages.len();
    let chunks = pages.into_chunks();

    if chunks.is_empty() {
        tracing::info!(%source, pages = page_count, "no page long enough to store");
    } else {
        store.upsert(&chunks).await.map_err(IngestError::Store)?;
    }

    Ok(IngestReport {
        source,
        pages: page_count,
        chunks: chunks.len(),
    })
}
