//! Retrieval orchestrator.
//!
//! The [`Retriever`] coordinates index construction (chunk → embed → build)
//! and query execution (embed → search → threshold) by composing an
//! [`EmbeddingProvider`], a [`Chunker`], and an optional [`EmbeddingCache`].
//!
//! # Example
//!
//! ```rust,ignore
//! use veritas_rag::{HashEmbeddingProvider, RagConfig, RecursiveChunker, Retriever};
//!
//! let config = RagConfig::default();
//! let mut retriever = Retriever::builder()
//!     .chunker(Arc::new(RecursiveChunker::from_config(&config)))
//!     .config(config)
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .build()?;
//!
//! retriever.index_documents(&documents).await?;
//! let retrieval = retriever.retrieve("were the ballots counted twice?").await?;
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::cache::{EmbeddingCache, cache_key};
use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::context::RetrievedContext;
use crate::document::{Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{VectorIndex, embed_chunks};

/// Where the embeddings of the last build came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No cache is configured.
    Disabled,
    /// Embeddings were loaded from the cache.
    Hit,
    /// Embeddings were computed (and written to the cache).
    Miss,
}

/// Summary of an [`Retriever::index_documents`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Number of input documents.
    pub document_count: usize,
    /// Number of indexed chunks.
    pub chunk_count: usize,
    /// Chunks that exceed `chunk_size` because they could not be split.
    pub oversized_count: usize,
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Cache outcome.
    pub cache: CacheStatus,
}

/// The ranked results of a query and the context built from them.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Results at or above the similarity threshold, best first.
    pub results: Vec<SearchResult>,
    /// Joined chunk texts and deduplicated sources.
    pub context: RetrievedContext,
}

/// Builds and queries a [`VectorIndex`] over a document corpus.
///
/// Construct one via [`Retriever::builder()`].
pub struct Retriever {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    cache: Option<EmbeddingCache>,
    index: Option<Arc<VectorIndex>>,
}

impl Retriever {
    /// Create a new [`RetrieverBuilder`].
    pub fn builder() -> RetrieverBuilder {
        RetrieverBuilder::default()
    }

    /// Return a reference to the retriever configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// The current index, if one has been built.
    pub fn index(&self) -> Option<&Arc<VectorIndex>> {
        self.index.as_ref()
    }

    /// Chunk, embed, and index `documents`, replacing any previous index.
    ///
    /// When a cache is configured and holds embeddings for exactly this chunk
    /// sequence and model, the provider is not called for chunks at all.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] for bad chunking parameters
    /// and propagates embedding provider failures. Cache failures are logged
    /// and never fail the build.
    pub async fn index_documents(&mut self, documents: &[Document]) -> Result<IndexReport> {
        let mut chunks = Vec::new();
        for document in documents {
            chunks.extend(self.chunker.chunk(document)?);
        }
        let oversized_count = chunks.iter().filter(|c| c.oversized).count();
        let dimensions = self.embedding_provider.dimensions();
        let model_id = self.embedding_provider.model_id();

        let key = self.cache.as_ref().map(|_| cache_key(&model_id, dimensions, &chunks));
        let cached = match (&self.cache, &key) {
            (Some(cache), Some(key)) => match cache.load(key, chunks.len(), dimensions) {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable embedding cache");
                    None
                }
            },
            _ => None,
        };

        let (index, status) = match cached {
            Some(matrix) => (VectorIndex::from_matrix(chunks, matrix, dimensions)?, CacheStatus::Hit),
            None => {
                let rows = embed_chunks(&chunks, self.embedding_provider.as_ref(), self.config.embed_batch_size)
                    .await
                    .map_err(|e| {
                        error!(chunk_count = chunks.len(), error = %e, "embedding failed during indexing");
                        with_context(e, &format!("indexing {} chunks", chunks.len()))
                    })?;
                let index = VectorIndex::from_rows(chunks, rows, dimensions)?;
                let status = match (&self.cache, &key) {
                    (Some(cache), Some(key)) => {
                        if let Err(e) = cache.store(key, &model_id, dimensions, index.matrix()) {
                            warn!(error = %e, "failed to write embedding cache");
                        }
                        CacheStatus::Miss
                    }
                    _ => CacheStatus::Disabled,
                };
                (index, status)
            }
        };

        let report = IndexReport {
            document_count: documents.len(),
            chunk_count: index.len(),
            oversized_count,
            dimensions,
            cache: status,
        };
        info!(
            document_count = report.document_count,
            chunk_count = report.chunk_count,
            oversized_count,
            cache = ?status,
            "indexed corpus"
        );

        self.index = Some(Arc::new(index));
        Ok(report)
    }

    /// Embed `query` once and return the `k` best chunks.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `k == 0`,
    /// [`RagError::IndexNotBuilt`] before [`index_documents`](Self::index_documents),
    /// and propagates embedding failures.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::InvalidConfiguration("k must be greater than zero".to_string()));
        }
        let index = self.index.as_ref().ok_or(RagError::IndexNotBuilt)?;
        index.query(self.embedding_provider.as_ref(), query, k).await.map_err(|e| {
            error!(error = %e, "query failed");
            with_context(e, "embedding query")
        })
    }

    /// Search with the configured `top_k`, drop results below the similarity
    /// threshold, and assemble the generation context.
    pub async fn retrieve(&self, query: &str) -> Result<Retrieval> {
        let threshold = self.config.similarity_threshold;
        let results: Vec<SearchResult> = self
            .search(query, self.config.top_k)
            .await?
            .into_iter()
            .filter(|r| r.score >= threshold)
            .collect();
        let context = RetrievedContext::from_results(&results);

        info!(result_count = results.len(), source_count = context.sources.len(), "query completed");
        Ok(Retrieval { results, context })
    }
}

/// Prefix provider failures with what the retriever was doing.
fn with_context(error: RagError, context: &str) -> RagError {
    match error {
        RagError::EmbeddingError { provider, message } => {
            RagError::EmbeddingError { provider, message: format!("{context}: {message}") }
        }
        other => other,
    }
}

/// Builder for constructing a [`Retriever`].
///
/// `config`, `embedding_provider` and `chunker` are required; `cache` is
/// optional. Call [`build()`](RetrieverBuilder::build) to validate and produce
/// the retriever.
#[derive(Default)]
pub struct RetrieverBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    cache: Option<EmbeddingCache>,
}

impl RetrieverBuilder {
    /// Set the retriever configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Persist build-time embeddings in `cache`.
    pub fn cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the [`Retriever`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if a required field is
    /// missing or the config is invalid.
    pub fn build(self) -> Result<Retriever> {
        let config = self
            .config
            .ok_or_else(|| RagError::InvalidConfiguration("config is required".to_string()))?;
        config.validate()?;
        let embedding_provider = self.embedding_provider.ok_or_else(|| {
            RagError::InvalidConfiguration("embedding_provider is required".to_string())
        })?;
        let chunker = self
            .chunker
            .ok_or_else(|| RagError::InvalidConfiguration("chunker is required".to_string()))?;

        Ok(Retriever { config, embedding_provider, chunker, cache: self.cache, index: None })
    }
}
