//! # veritas-rag
//!
//! Retrieval core for question answering over fact-check articles.
//!
//! ## Overview
//!
//! Articles are split into bounded, overlapping chunks, embedded once, and
//! held in an immutable dense index that answers top-k dot-product queries.
//!
//! - [`split`] / [`RecursiveChunker`] - recursive separator-cascade chunking
//! - [`FixedSizeChunker`] - plain character windows
//! - [`EmbeddingProvider`] - text → vector capability, with
//!   [`HashEmbeddingProvider`] for offline use and `OpenAIEmbeddingProvider`
//!   behind the `openai` feature
//! - [`VectorIndex`] - exact top-k search over a row-major matrix
//! - [`EmbeddingCache`] - content-addressed persistence of build-time embeddings
//! - [`Retriever`] - chunk → embed → index, then embed → search → threshold
//! - [`RetrievedContext`] - joined context text and deduplicated citations
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use veritas_rag::{HashEmbeddingProvider, RagConfig, RecursiveChunker, Retriever};
//!
//! # async fn run() -> veritas_rag::Result<()> {
//! let config = RagConfig::builder().chunk_size(400).chunk_overlap(50).build()?;
//! let mut retriever = Retriever::builder()
//!     .chunker(Arc::new(RecursiveChunker::from_config(&config)))
//!     .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
//!     .config(config)
//!     .build()?;
//!
//! let documents = veritas_rag::load_jsonl("data/factchecks.jsonl")?;
//! retriever.index_documents(&documents).await?;
//!
//! let retrieval = retriever.retrieve("Do vaccines contain microchips?").await?;
//! for source in &retrieval.context.sources {
//!     println!("{source}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `openai` - OpenAI (and compatible) embeddings over HTTP

pub mod cache;
pub mod chunking;
pub mod config;
pub mod context;
pub mod corpus;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
#[cfg(feature = "openai")]
pub mod openai;
pub mod retriever;
pub mod splitter;

pub use cache::{EmbeddingCache, cache_key};
pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use context::{CONTEXT_SEPARATOR, RetrievedContext};
pub use corpus::{load_jsonl, parse_jsonl};
pub use document::{CHUNK_INDEX_KEY, CLAIM_KEY, Chunk, Document, SearchResult, URL_KEY};
pub use embedding::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{RagError, Result};
pub use index::{VectorIndex, dot};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use retriever::{CacheStatus, IndexReport, Retrieval, Retriever, RetrieverBuilder};
pub use splitter::{DEFAULT_SEPARATORS, Segment, split, split_text};
