//! Fixed-size overlapping word windows.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default window length in words.
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default number of words shared by adjacent windows.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;
/// Number of chunks assumed to cover one page when estimating page numbers.
pub const CHUNKS_PER_PAGE: usize = 3;

/// Window parameters for the word chunker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    chunk_size: usize,
    overlap: usize,
}

impl ChunkingConfig {
    /// Builds a validated configuration; the overlap must leave a positive stride.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk overlap {overlap} must be smaller than chunk size {chunk_size}"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Window length in words.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Words shared by adjacent windows.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in words between the starts of adjacent windows.
    pub fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// One word window of the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential position of the window, starting at zero.
    pub chunk_id: usize,
    /// Rough page estimate derived from the chunk position.
    pub page: usize,
    /// Window text, words joined by single spaces.
    pub text: String,
}

impl Chunk {
    fn new(chunk_id: usize, text: String) -> Self {
        Self {
            chunk_id,
            page: estimate_page(chunk_id),
            text,
        }
    }
}

/// Page estimate for a chunk position. Not the true source page.
pub fn estimate_page(chunk_id: usize) -> usize {
    chunk_id / CHUNKS_PER_PAGE
}

/// Splits text on whitespace and emits overlapping windows as plain strings.
pub fn chunk_words(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = Vec::with_capacity(words.len().div_ceil(config.stride()));
    let mut start = 0;
    while start < words.len() {
        let end = (start + config.chunk_size).min(words.len());
        let window = words[start..end].join(" ");
        if !window.trim().is_empty() {
            out.push(window);
        }
        start += config.stride();
    }
    out
}

/// Chunks text and attaches sequential ids and page estimates.
pub fn chunk_document(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    chunk_words(text, config)
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Chunk::new(idx, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered_words(count: usize) -> String {
        (0..count)
            .map(|idx| format!("w{idx}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(10, 11).is_err());
        assert!(ChunkingConfig::new(0, 0).is_err());
        assert_eq!(ChunkingConfig::new(10, 9).expect("valid").stride(), 1);
    }

    #[test]
    fn windows_overlap_by_configured_words() {
        let config = ChunkingConfig::new(4, 1).expect("valid");
        let chunks = chunk_words("a b c d e f g h", &config);
        assert_eq!(chunks, vec!["a b c d", "d e f g", "g h"]);
    }

    #[test]
    fn collapses_irregular_whitespace() {
        let config = ChunkingConfig::new(3, 0).expect("valid");
        let chunks = chunk_words("  alpha\n\nbeta\t gamma   delta \n", &config);
        assert_eq!(chunks, vec!["alpha beta gamma", "delta"]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        let config = ChunkingConfig::default();
        assert!(chunk_words("", &config).is_empty());
        assert!(chunk_words(" \n\t ", &config).is_empty());
    }

    #[test]
    fn six_thousand_words_make_fourteen_chunks() {
        let text = numbered_words(6000);
        let chunks = chunk_words(&text, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 14);
        assert!(chunks[0].starts_with("w0 "));
        assert!(chunks[1].starts_with("w450 "));
        assert_eq!(chunks[0].split(' ').count(), 500);
        // last window starts at 5850 and holds the trailing 150 words
        assert!(chunks[13].starts_with("w5850 "));
        assert_eq!(chunks[13].split(' ').count(), 150);
    }

    #[test]
    fn trailing_overlap_window_is_kept() {
        // offsets 0 and 450; the second window only repeats the overlap tail
        let text = numbered_words(500);
        let chunks = chunk_words(&text, &ChunkingConfig::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].split(' ').count(), 50);
    }

    #[test]
    fn documents_carry_ids_and_page_estimates() {
        let config = ChunkingConfig::new(2, 0).expect("valid");
        let chunks = chunk_document(&numbered_words(14), &config);
        let positions: Vec<(usize, usize)> = chunks
            .iter()
            .map(|chunk| (chunk.chunk_id, chunk.page))
            .collect();
        assert_eq!(
            positions,
            vec![(0, 0), (1, 0), (2, 0), (3, 1), (4, 1), (5, 1), (6, 2)]
        );
        assert_eq!(chunks[6].text, "w12 w13");
    }
}
