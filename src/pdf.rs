//! PDF loading.
//!
//! Reads a PDF from disk or memory and returns one text string per page via
//! `pdf-extract`. Extraction happens entirely in memory; nothing is written
//! to disk. Failures are returned as [`LoadError`], never panics, so callers
//! can report them and carry on.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::chunk::chunk_pages;
use crate::models::Chunk;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not find {}", .0.display())]
    NotFound(PathBuf),
    #[error("Could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("PDF extraction failed: {0}")]
    Extract(String),
}

/// Text of every page of a PDF, in page order.
#[derive(Debug, Clone)]
pub struct PdfPages {
    /// File name used to build chunk IDs.
    pub source: String,
    pub pages: Vec<String>,
}

impl PdfPages {
    /// Informative pages as chunks (see [`crate::chunk`]).
    pub fn into_chunks(self) -> Vec<Chunk> {
        chunk_pages(&self.source, &self.pages)
    }
}

/// Read and extract a PDF file. The source name is the file name without
/// its directory.
pub fn load_file(path: &Path) -> Result<PdfPages, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_bytes(&source_name(path), &bytes)
}

/// Extract a PDF held in memory, e.g. an upload.
pub fn load_bytes(source: &str, bytes: &[u8]) -> Result<PdfPages, LoadError> {
    let pages = extract_pages(bytes)?;
    tracing::debug!(source, pages = pages.len(), "extracted pdf");
    Ok(PdfPages {
        source: source.to_string(),
        pages,
    })
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, LoadError> {
    // pdf-extract panics on some malformed documents.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(LoadError::Extract(e.to_string())),
        Err(_) => Err(LoadError::Extract(
            "the PDF parser rejected this document".to_string(),
        )),
    }
}

/// File name component of `path`, falling back to the full display string.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
