//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`] - the separator cascade from [`crate::splitter`]
//! - [`FixedSizeChunker`] - a sliding character window with overlap

use crate::config::RagConfig;
use crate::document::{CHUNK_INDEX_KEY, Chunk, Document, URL_KEY};
use crate::error::{RagError, Result};
use crate::splitter::{self, DEFAULT_SEPARATORS, Segment};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>>;
}

/// Splits text on a prioritized list of separators, falling back to finer
/// separators only for pieces that are still too large.
///
/// Chunk IDs are generated as `{document_id}_{chunk_index}`. Each chunk inherits
/// the parent document's metadata plus a `chunk_index` field.
///
/// # Example
///
/// ```rust
/// use veritas_rag::{Chunker, Document, RecursiveChunker};
///
/// let chunker = RecursiveChunker::new(300, 50);
/// let doc = Document::new("a1", "First paragraph.\n\nSecond paragraph.");
/// let chunks = chunker.chunk(&doc).unwrap();
/// assert_eq!(chunks.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker` using [`DEFAULT_SEPARATORS`].
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - maximum number of characters shared by consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a chunker from the chunking fields of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        }
    }

    /// Replace the separator cascade.
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        let segments =
            splitter::split(&document.text, self.chunk_size, self.chunk_overlap, &self.separators)?;
        Ok(segments
            .into_iter()
            .enumerate()
            .map(|(i, Segment { text, span, hard_cut, .. })| {
                build_chunk(document, i, text, span, hard_cut)
            })
            .collect())
    }
}

/// Splits text into fixed-size windows by character count with configurable overlap.
///
/// Window boundaries ignore word and sentence structure.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Result<Vec<Chunk>> {
        if self.chunk_size == 0 {
            return Err(RagError::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if document.text.is_empty() {
            return Ok(Vec::new());
        }

        let text = &document.text;
        // Byte offset of every char plus the end of the text.
        let bounds: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = bounds.len() - 1;
        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < char_count {
            let end = (start + self.chunk_size).min(char_count);
            let span = bounds[start]..bounds[end];
            let index = chunks.len();
            chunks.push(build_chunk(document, index, text[span.clone()].to_string(), span, false));
            if end == char_count {
                break;
            }
            start += step;
        }

        Ok(chunks)
    }
}

fn build_chunk(
    document: &Document,
    index: usize,
    text: String,
    span: std::ops::Range<usize>,
    oversized: bool,
) -> Chunk {
    let mut metadata = document.metadata.clone();
    metadata.insert(CHUNK_INDEX_KEY.to_string(), index.to_string());
    if let Some(uri) = &document.source_uri {
        metadata.entry(URL_KEY.to_string()).or_insert_with(|| uri.clone());
    }

    Chunk {
        id: format!("{}_{index}", document.id),
        document_id: document.id.clone(),
        text,
        metadata,
        sequence_index: index,
        span,
        oversized,
    }
}
