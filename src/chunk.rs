//! Page-level chunking.
//!
//! Every PDF page becomes at most one [`Chunk`]. Pages whose extracted text is
//! [`MIN_PAGE_CHARS`] characters or shorter are treated as empty or scanned
//! and dropped. Chunk IDs are derived from the source name and the page's
//! original index, so re-ingesting a file overwrites rather than duplicates.

use sha2::{Digest, Sha256};

use crate::models::Chunk;

/// Pages with this many characters or fewer are discarded.
pub const MIN_PAGE_CHARS: usize = 50;

/// Turn per-page text into chunks, keeping only informative pages.
///
/// `pages[i]` must be the text of page `i`; skipped pages leave gaps in the
/// page indices of the result.
pub fn chunk_pages<S: AsRef<str>>(source: &str, pages: &[S]) -> Vec<Chunk> {
    pages
        .iter()
        .enumerate()
        .filter(|(_, text)| is_informative(text.as_ref()))
        .map(|(index, text)| make_chunk(source, index, text.as_ref()))
        .collect()
}

/// Whether a page carries enough text to be worth storing.
pub fn is_informative(text: &str) -> bool {
    text.chars().count() > MIN_PAGE_CHARS
}

pub fn chunk_id(source: &str, page_index: usize) -> String {
    format!("{}_page_{}", source, page_index)
}

/// SHA-256 hex digest of page text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(source: &str, page_index: usize, text: &str) -> Chunk {
    Chunk {
        id: chunk_id(source, page_index),
        source: source.to_string(),
        page_index,
        text: text.to_string(),
        hash: content_hash(text),
    }
}
