//! # pagechat
//!
//! Ask questions about your PDFs. Pages are embedded into a local vector
//! store, the single best-matching page is retrieved for each question, and
//! Llama 3 on Amazon Bedrock answers from that page alone.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │   PDF    │──▶│ Page chunks  │──▶│ SQLite store │
//! │ (pages)  │   │  (> 50 ch)   │   │  + vectors   │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │ k = 1
//!                                          ▼
//!                ┌──────────┐       ┌──────────────┐
//!                │ Console  │◀─────▶│  Assistant   │──▶ Bedrock
//!                │ Web chat │       │ (prompt)     │    (Llama 3)
//!                └──────────┘       └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pagechat                      # ingest ./notes.pdf, then ask in the terminal
//! pagechat ingest lecture.pdf   # add another PDF to the console collection
//! pagechat ask "What is osmosis?"
//! pagechat serve                # browser chat on http://127.0.0.1:8501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`pdf`] | PDF text extraction per page |
//! | [`chunk`] | Page filtering and chunk IDs |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`aws`] | AWS credentials and SigV4 signing |
//! | [`inference`] | Bedrock text generation |
//! | [`prompt`] | Llama 3 prompt template |
//! | [`assistant`] | Ingest and answer orchestration |
//! | [`conversation`] | Per-session chat transcripts |
//! | [`console`] | Terminal front end |
//! | [`server`] | Browser front end and JSON API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod assistant;
pub mod aws;
pub mod chunk;
pub mod config;
pub mod console;
pub mod conversation;
pub mod db;
pub mod embedding;
pub mod inference;
pub mod migrate;
pub mod models;
pub mod pdf;
pub mod prompt;
pub mod server;
pub mod store;
