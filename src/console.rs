//! Interactive console front end.
//!
//! Ingests one fixed PDF at startup, then answers questions read line by line
//! until `exit` or end of input:
//!
//! ```text
//! --- INITIALIZING SYSTEMS ---
//! Reading notes.pdf...
//! Memorizing 12 pages...
//! Ingestion Complete.
//!
//! System Ready. Type 'exit' to quit.
//!
//! Ask a question: what is osmosis?
//! ...
//! === AI ANSWER ===
//! Osmosis is ...
//! =================
//! ```
//!
//! Input and output are generic so the loop can be driven from tests.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::assistant::Assistant;
use crate::pdf::LoadError;

pub const ANSWER_HEADER: &str = "=== AI ANSWER ===";
pub const ANSWER_FOOTER: &str = "=================";

/// Run the startup ingest and the question loop.
///
/// Load failures are reported and the loop still starts. A failed model call
/// ends the loop with the error.
pub async fn run_console<R: BufRead, W: Write>(
    assistant: &Assistant,
    pdf_path: &Path,
    mut input: R,
    mut output: W,
) -> Result<()> {
    writeln!(output, "--- INITIALIZING SYSTEMS ---")?;
    ingest(assistant, pdf_path, &mut output).await?;

    writeln!(output)?;
    writeln!(output, "System Ready. Type 'exit' to quit.")?;

    loop {
        writeln!(output)?;
        write!(output, "Ask a question: ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            break;
        }
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let answer = ask(assistant, question, &mut output).await?;
        writeln!(output)?;
        writeln!(output, "{}", ANSWER_HEADER)?;
        writeln!(output, "{}", answer)?;
        writeln!(output, "{}", ANSWER_FOOTER)?;
    }

    Ok(())
}

async fn ingest<W: Write>(assistant: &Assistant, pdf_path: &Path, output: &mut W) -> Result<()> {
    let file = pdf_path.display();
    if !pdf_path.exists() {
        writeln!(
            output,
            "ERROR: Could not find {}. Please put a PDF in this folder.",
            file
        )?;
        return Ok(());
    }

    writeln!(output, "Reading {}...", file)?;
    let pages = match assistant.read_file(pdf_path).await {
        Ok(pages) => pages,
        Err(LoadError::NotFound(_)) => {
            writeln!(
                output,
                "ERROR: Could not find {}. Please put a PDF in this folder.",
                file
            )?;
            return Ok(());
        }
        Err(e) => {
            tracing::warn!(path = %file, error = %e, "pdf ingestion skipped");
            writeln!(output, "ERROR: {}", e)?;
            return Ok(());
        }
    };

    let qualifying = pages
        .pages
        .iter()
        .filter(|p| crate::chunk::is_informative(p))
        .count();
    writeln!(output, "Memorizing {} pages...", qualifying)?;

    let report = assistant
        .memorize(pages)
        .await
        .context("Failed to store document")?;
    tracing::info!(source = %report.source, chunks = report.chunks, "ingested");
    writeln!(output, "Ingestion Complete.")?;
    Ok(())
}

async fn ask<W: Write>(assistant: &Assistant, question: &str, output: &mut W) -> Result<String> {
    writeln!(output)?;
    writeln!(output, "User Question: {}", question)?;
    writeln!(output, "Searching database...")?;

    let mut notice = Ok(());
    let answer = assistant
        .answer_with(question, |_| {
            notice = writeln!(output, "Found relevant context! Asking the model...")
                .and_then(|()| output.flush());
        })
        .await;
    notice?;
    Ok(answer?.into_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::Persona;
    use crate::embedding::EmbeddingProvider;
    use crate::inference::{GenerationParams, InferenceError, TextGenerator};
    use crate::models::Chunk;
    use crate::store::{InMemoryVectorStore, VectorStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        fn model_name(&self) -> &str {
            "constant"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, InferenceError> {
            Ok("An answer from the notes.".to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, InferenceError> {
            Err(InferenceError::Status {
                status: 403,
                body: "AccessDeniedException".to_string(),
            })
        }
    }

    fn assistant(generator: Arc<dyn TextGenerator>) -> Assistant {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(ConstantEmbedder)));
        Assistant::new(
            store,
            generator,
            Persona {
                system_prompt: "tutor".to_string(),
                fallback_answer: "I don't know the answer to that based on the documents."
                    .to_string(),
            },
            GenerationParams::default(),
        )
    }

    async fn seed(assistant: &Assistant) {
        let text = "Photosynthesis converts light energy into chemical energy in plants.";
        assistant
            .store()
            .upsert(&[Chunk {
                id: "notes.pdf_page_0".to_string(),
                source: "notes.pdf".to_string(),
                page_index: 0,
                text: text.to_string(),
                hash: crate::chunk::content_hash(text),
            }])
            .await
            .unwrap();
    }

    async fn run(assistant: &Assistant, stdin: &str) -> (Result<()>, String) {
        let mut out = Vec::new();
        let result = run_console(
            assistant,
            Path::new("/no/such/dir/notes.pdf"),
            stdin.as_bytes(),
            &mut out,
        )
        .await;
        (result, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn missing_pdf_is_reported_and_loop_continues() {
        let a = assistant(Arc::new(Echo));
        let (result, out) = run(&a, "exit\n").await;
        result.unwrap();
        assert!(out.starts_with("--- INITIALIZING SYSTEMS ---\n"));
        assert!(out.contains(
            "ERROR: Could not find /no/such/dir/notes.pdf. Please put a PDF in this folder."
        ));
        assert!(out.contains("System Ready. Type 'exit' to quit."));
        assert!(out.contains("Ask a question: "));
        assert!(!out.contains(ANSWER_HEADER));
    }

    #[tokio::test]
    async fn empty_store_prints_fallback() {
        let a = assistant(Arc::new(Echo));
        let (result, out) = run(&a, "What is osmosis?\n  EXIT  \n").await;
        result.unwrap();
        assert!(out.contains(
            "=== AI ANSWER ===\nI don't know the answer to that based on the documents.\n=================\n"
        ));
        assert!(!out.contains("Found relevant context"));
    }

    #[tokio::test]
    async fn answers_are_framed() {
        let a = assistant(Arc::new(Echo));
        seed(&a).await;
        let (result, out) = run(&a, "What is photosynthesis?\n").await;
        result.unwrap();
        assert!(out.contains("User Question: What is photosynthesis?"));
        assert!(out.contains("Found relevant context!"));
        assert!(out.contains("=== AI ANSWER ===\nAn answer from the notes.\n=================\n"));
    }

    #[tokio::test]
    async fn eof_ends_loop() {
        let a = assistant(Arc::new(Echo));
        let (result, out) = run(&a, "").await;
        result.unwrap();
        assert_eq!(out.matches("Ask a question: ").count(), 1);
    }

    #[tokio::test]
    async fn inference_failure_ends_loop_with_error() {
        let a = assistant(Arc::new(Failing));
        seed(&a).await;
        let (result, out) = run(&a, "first?\nsecond?\n").await;
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("403"));
        assert!(!out.contains("User Question: second?"));
    }
}
