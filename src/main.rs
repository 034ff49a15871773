//! # pagechat CLI
//!
//! ## Usage
//!
//! ```bash
//! pagechat [--config ./config/pagechat.toml] [command]
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pagechat` / `pagechat chat` | Ingest `[cli] pdf_path`, then answer questions typed in the terminal |
//! | `pagechat ingest <file>` | Add a PDF to the console collection |
//! | `pagechat ask "<question>"` | Answer one question from the console collection |
//! | `pagechat serve` | Start the browser chat on `[server] bind` |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;

use pagechat::assistant::{memorize_into, Assistant, Persona};
use pagechat::aws::CredentialSource;
use pagechat::config::{self, Config};
use pagechat::console::{run_console, ANSWER_FOOTER, ANSWER_HEADER};
use pagechat::embedding::{self, EmbeddingProvider};
use pagechat::inference::{BedrockClient, GenerationParams};
use pagechat::store::SqliteVectorStore;
use pagechat::{db, pdf, server};

/// Chat with your PDFs using page-level retrieval and Llama 3 on Amazon Bedrock.
#[derive(Parser, Debug)]
#[command(name = "pagechat", version)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pagechat.toml` when that file exists; otherwise
    /// built-in defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Ingest the configured PDF and start the question loop (default).
    Chat,

    /// Start the browser chat UI and JSON API.
    Serve,

    /// Extract a PDF and store its informative pages in the console collection.
    Ingest {
        /// PDF file to ingest.
        file: PathBuf,
    },

    /// Answer a single question from the console collection.
    Ask {
        /// The question; multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::resolve_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let assistant = build_assistant(&cfg, &cfg.cli.collection, Persona::from(&cfg.cli)).await?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            run_console(&assistant, &cfg.cli.pdf_path, stdin.lock(), stdout.lock()).await?;
        }
        Commands::Serve => {
            let assistant = build_assistant(&cfg, &cfg.ui.collection, Persona::from(&cfg.ui)).await?;
            server::run_server(&cfg.server, Arc::new(assistant)).await?;
        }
        Commands::Ingest { file } => {
            run_ingest(&cfg, &file).await?;
        }
        Commands::Ask { question } => {
            let assistant = build_assistant(&cfg, &cfg.cli.collection, Persona::from(&cfg.cli)).await?;
            let answer = assistant.answer(&question.join(" ")).await?;            println!("{}", ANSWER_HEADER);
            println!("{}", answer.text());
            println!("{}", ANSWER_FOOTER);
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(cfg: &Config, pool: SqlitePool, collection: &str) -> Result<SqliteVectorStore> {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::from(
        embedding::create_provider(&cfg.embedding).context("Failed to set up embeddings")?,
    );
    Ok(SqliteVectorStore::new(
        pool,
        collection,
        embedder,
        cfg.embedding.batch_size,
    ))
}

/// Wire store, credentials, and model client into an [`Assistant`].
async fn build_assistant(cfg: &Config, collection: &str, persona: Persona) -> Result<Assistant> {
    let pool = db::connect(cfg).await?;
    let store = open_store(cfg, pool, collection)?;

    // Missing credentials only fail the questions that reach the model.
    let generator = match CredentialSource::resolve(&cfg.model.secrets_path) {
        Ok(source) => {
            tracing::info!(source = %source.describe(), "AWS credentials resolved");
            BedrockClient::new(&cfg.model, source.credentials().clone())?
        }
        Err(e) => {
            tracing::warn!(error = %e, "AWS credentials unavailable; model calls will fail");
            BedrockClient::without_credentials(&cfg.model, e)?
        }
    };

    Ok(Assistant::new(
        Arc::new(store),
        Arc::new(generator),
        persona,
        GenerationParams::from(&cfg.model),
    ))
}

/// Ingest without touching AWS: only the store is needed.
async fn run_ingest(cfg: &Config, file: &Path) -> Result<()> {
    let pool = db::connect(cfg).await?;
    let store = open_store(cfg, pool, &cfg.cli.collection)?;

    let path = file.to_path_buf();
    let pages = tokio::task::spawn_blocking(move || pdf::load_file(&path)).await??;
    let report = memorize_into(&store, pages).await?;

    println!(
        "Ingested {}: {} pages read, {} stored in '{}'.",
        report.source,
        report.pages,
        report.chunks,
        store.collection()
    );
    Ok(())
}
