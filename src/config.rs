//! TOML configuration.
//!
//! Every section has defaults, so `pagechat` runs without a config file and
//! then behaves like the stock setup: `notes.pdf` for the console, a SQLite
//! index under `./my_vector_db`, local embeddings and Llama 3 8B on Bedrock in
//! `us-east-1`.
//!
//! ```toml
//! [db]
//! path = "./my_vector_db/pagechat.sqlite"
//!
//! [embedding]
//! provider = "local"          # local | openai | ollama | disabled
//! model = "all-minilm-l6-v2"
//!
//! [model]
//! model_id = "meta.llama3-8b-instruct-v1:0"
//! region = "us-east-1"
//! max_tokens = 512
//! temperature = 0.3
//!
//! [cli]
//! pdf_path = "notes.pdf"
//! collection = "university_knowledge"
//!
//! [ui]
//! collection = "web_uploads"
//!
//! [server]
//! bind = "127.0.0.1:8501"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/pagechat.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub db: DbConfig,
    pub embedding: EmbeddingConfig,
    pub model: ModelConfig,
    pub cli: CliConfig,
    pub ui: UiConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./my_vector_db/pagechat.sqlite"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Overrides `https://bedrock-runtime.<region>.amazonaws.com`.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
    /// TOML file holding explicit AWS keys; skipped when missing.
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            region: default_region(),
            endpoint_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_model_timeout_secs(),
            secrets_path: default_secrets_path(),
        }
    }
}

fn default_model_id() -> String {
    "meta.llama3-8b-instruct-v1:0".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.3
}
fn default_model_timeout_secs() -> u64 {
    60
}
fn default_secrets_path() -> PathBuf {
    PathBuf::from("./config/secrets.toml")
}

/// Console front end.
#[derive(Debug, Deserialize, Clone)]
pub struct CliConfig {
    #[serde(default = "default_pdf_path")]
    pub pdf_path: PathBuf,
    #[serde(default = "default_cli_collection")]
    pub collection: String,
    #[serde(default = "default_cli_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_cli_fallback")]
    pub fallback_answer: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            pdf_path: default_pdf_path(),
            collection: default_cli_collection(),
            system_prompt: default_cli_system_prompt(),
            fallback_answer: default_cli_fallback(),
        }
    }
}

fn default_pdf_path() -> PathBuf {
    PathBuf::from("notes.pdf")
}
fn default_cli_collection() -> String {
    "university_knowledge".to_string()
}
fn default_cli_system_prompt() -> String {
    "You are a university tutor. Answer the question using ONLY the context below.".to_string()
}
fn default_cli_fallback() -> String {
    "I don't know the answer to that based on the documents.".to_string()
}

/// Interactive (browser) front end.
#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "default_ui_collection")]
    pub collection: String,
    #[serde(default = "default_ui_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_ui_fallback")]
    pub fallback_answer: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            collection: default_ui_collection(),
            system_prompt: default_ui_system_prompt(),
            fallback_answer: default_ui_fallback(),
        }
    }
}

fn default_ui_collection() -> String {
    "web_uploads".to_string()
}
fn default_ui_system_prompt() -> String {
    "Answer using ONLY the context below.".to_string()
}
fn default_ui_fallback() -> String {
    "I don't have enough info in the documents to answer that.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Open chat sessions kept in memory before the least recently used one
    /// is dropped.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_max_sessions() -> usize {
    crate::conversation::DEFAULT_MAX_SESSIONS
}

fn default_bind() -> String {
    "127.0.0.1:8501".to_string()
}

/// Load the config named on the command line, or fall back to
/// [`DEFAULT_CONFIG_PATH`] and then to built-in defaults.
///
/// An explicitly named file must exist.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                tracing::debug!("no config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Config::default())
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.model.max_tokens == 0 {
        bail!("model.max_tokens must be > 0");
    }

    if !(0.0..=1.0).contains(&config.model.temperature) {
        bail!("model.temperature must be in [0.0, 1.0]");
    }

    if config.model.model_id.trim().is_empty() {
        bail!("model.model_id must not be empty");
    }

    if config.cli.collection.trim().is_empty() || config.ui.collection.trim().is_empty() {
        bail!("cli.collection and ui.collection must not be empty");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    if config.server.max_sessions == 0 {
        bail!("server.max_sessions must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "local" => {}
        "openai" | "ollama" => {
            if config.embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    config.embedding.provider
                );
            }
        }
        other => bail!(
            "Unknown embedding provider: '{}'. Must be local, openai, ollama, or disabled.",
            other
        ),
    }

    Ok(())
}
