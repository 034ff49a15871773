//! Embedding provider abstraction and implementations.
//!
//! The vector store never computes embeddings itself; it hands chunk text and
//! query text to an [`EmbeddingProvider`]:
//! - **[`DisabledProvider`]**: every call fails; used when embeddings are turned off.
//! - **[`OpenAIProvider`]**: `POST /v1/embeddings` on the OpenAI API.
//! - **[`OllamaProvider`]**: `POST /api/embed` on a local Ollama instance.
//! - **`LocalProvider`**: runs a sentence-transformer locally through fastembed
//!   (feature `local-embeddings`). `all-minilm-l6-v2` is the default model.
//!
//! Also provides vector utilities:
//! - [`cosine_similarity`]: similarity between two embedding vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding for SQLite
//!
//! Calls are made once; there is no retry or backoff.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Computes embedding vectors for text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier stored next to every vector (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Vector dimensionality, or 0 when unknown until the first call.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single query text.
pub async fn embed_query(provider: &dyn EmbeddingProvider, text: &str) -> Result<Vec<f32>> {
    let results = provider.embed(&[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty embedding response"))
}

// ============ Disabled Provider ============

/// A provider that refuses every call.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.")
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Requires the `OPENAI_API_KEY` environment variable, read once at
/// construction.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            dims: config.dims.unwrap_or(0),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_openai_response(&json)
    }
}

/// Extract `data[].embedding`, ordered by `data[].index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, json_to_vec(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). The model must already be pulled.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow!("embedding.model required for Ollama provider"))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model,
            dims: config.dims.unwrap_or(0),
            url: url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/api/embed", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.url,
                    e
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow!("Invalid Ollama response: missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .map(|values| json_to_vec(values))
                .ok_or_else(|| anyhow!("Invalid Ollama response: embedding is not an array"))
        })
        .collect()
}

fn json_to_vec(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

// ============ Local Provider (fastembed) ============

#[cfg(feature = "local-embeddings")]
pub use local::LocalProvider;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Runs an ONNX sentence-transformer in-process.
    ///
    /// The model is downloaded from Hugging Face on first use and cached;
    /// after that, embedding needs no network. The loaded model is kept for
    /// the lifetime of the provider.
    pub struct LocalProvider {
        model_name: String,
        dims: usize,
        batch_size: usize,
        model: Arc<Mutex<Option<fastembed::TextEmbedding>>>,
    }

    impl LocalProvider {
        pub fn new(config: &EmbeddingConfig) -> Result<Self> {
            let model_name = config
                .model
                .clone()
                .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
            // Fail early on an unknown name rather than on the first upload.
            to_fastembed_model(&model_name)?;
            let dims = config.dims.unwrap_or(match model_name.as_str() {
                "bge-base-en-v1.5" | "nomic-embed-text-v1.5" => 768,
                "bge-large-en-v1.5" => 1024,
                _ => 384,
            });

            Ok(Self {
                model_name,
                dims,
                batch_size: config.batch_size,
                model: Arc::new(Mutex::new(None)),
            })
        }
    }

    fn to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
        match name {
            "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
            "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
            "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
            other => bail!(
                "Unknown local embedding model: '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
                 nomic-embed-text-v1.5",
                other
            ),
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LocalProvider {
        fn model_name(&self) -> &str {
            &self.model_name
        }
        fn dims(&self) -> usize {
            self.dims
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let texts = texts.to_vec();
            let model = Arc::clone(&self.model);
            let model_name = self.model_name.clone();
            let batch_size = self.batch_size;

            tokio::task::spawn_blocking(move || {
                let mut guard = model
                    .lock()
                    .map_err(|_| anyhow!("local embedding model lock poisoned"))?;
                if guard.is_none() {
                    tracing::info!(model = %model_name, "loading local embedding model");
                    let loaded = fastembed::TextEmbedding::try_new(
                        fastembed::InitOptions::new(to_fastembed_model(&model_name)?)
                            .with_show_download_progress(true),
                    )
                    .map_err(|e| anyhow!("Failed to initialize local embedding model: {}", e))?;
                    *guard = Some(loaded);
                }
                let embedder = guard
                    .as_mut()
                    .ok_or_else(|| anyhow!("local embedding model not loaded"))?;
                embedder
                    .embed(texts, Some(batch_size))
                    .map_err(|e| anyhow!("Local embedding failed: {}", e))
            })
            .await?
        }
    }
}

/// Create the [`EmbeddingProvider`] named by `[embedding] provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"openai"` | [`OpenAIProvider`] |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"local"` | `LocalProvider` (feature `local-embeddings`) |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalProvider::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => bail!("Local embedding provider requires --features local-embeddings"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use pagechat::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, zero vectors, or vectors of different
/// lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
