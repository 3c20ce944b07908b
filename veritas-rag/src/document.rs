//! Data types for documents, chunks, and search results.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Metadata key holding the article URL used for citations.
pub const URL_KEY: &str = "url";

/// Metadata key holding the claim a fact-check article rates.
pub const CLAIM_KEY: &str = "claim";

/// A source article containing text content and provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The full article text.
    pub text: String,
    /// Key-value provenance metadata (claim, url, rating, ...).
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: HashMap::new(), source_uri: None }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set the source URI.
    pub fn with_source_uri(mut self, uri: impl Into<String>) -> Self {
        self.source_uri = Some(uri.into());
        self
    }
}

/// A bounded, retrievable segment of a [`Document`].
///
/// `text` is always `&document.text[span]`. Adjacent chunks of the same
/// document may duplicate a few characters of each other as overlap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{document_id}_{sequence_index}`.
    pub id: String,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// The text content of the chunk.
    pub text: String,
    /// Metadata inherited from the parent document plus `chunk_index`.
    pub metadata: HashMap<String, String>,
    /// Position of the chunk within its document.
    pub sequence_index: usize,
    /// Byte range of `text` within the parent document text.
    pub span: Range<usize>,
    /// Set when the chunk exceeds the configured size because no separator
    /// could split it further.
    pub oversized: bool,
}

impl Chunk {
    /// The citation URL for this chunk, if the parent carried one.
    pub fn source_url(&self) -> Option<&str> {
        self.metadata.get(URL_KEY).map(String::as_str).filter(|s| !s.is_empty())
    }
}

/// A retrieved [`Chunk`] paired with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Dot product of the query and chunk embeddings (higher is more relevant).
    pub score: f32,
}
