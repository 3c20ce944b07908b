//! Turn arguments into configured components.

use std::sync::Arc;

use anyhow::{Context, Result};
use veritas_model::{Generator, MockGenerator, OllamaGenerator, OpenAICompatibleGenerator};
use veritas_rag::{
    EmbeddingCache, EmbeddingProvider, HashEmbeddingProvider, IndexReport, OpenAIEmbeddingProvider,
    RagConfig, RecursiveChunker, Retriever, load_jsonl,
};

use crate::args::{EmbedderKind, GeneratorKind, GlobalArgs};

pub fn rag_config(args: &GlobalArgs) -> Result<RagConfig> {
    RagConfig::builder()
        .chunk_size(args.chunk_size)
        .chunk_overlap(args.chunk_overlap)
        .top_k(args.top_k)
        .similarity_threshold(args.threshold)
        .build()
        .context("invalid retrieval settings")
}

pub fn embedder(args: &GlobalArgs) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(match args.embedder {
        EmbedderKind::Hash => {
            let provider = match args.embedding_dims {
                Some(dims) => HashEmbeddingProvider::new(dims),
                None => HashEmbeddingProvider::default(),
            };
            Arc::new(provider)
        }
        EmbedderKind::Openai => {
            let mut provider = OpenAIEmbeddingProvider::from_env()?;
            if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &args.embedding_model {
                provider = provider.with_model(model.as_str());
            }
            if let Some(dims) = args.embedding_dims {
                provider = provider.with_dimensions(dims);
            }
            Arc::new(provider)
        }
    })
}

pub fn generator(args: &GlobalArgs) -> Result<Arc<dyn Generator>> {
    Ok(match args.generator {
        GeneratorKind::Mock => Arc::new(MockGenerator::new()),
        GeneratorKind::Openai => {
            let mut generator = OpenAICompatibleGenerator::from_env()?;
            if let Some(model) = &args.model {
                generator = generator.with_model(model.as_str());
            }
            Arc::new(generator)
        }
        GeneratorKind::Ollama => {
            let mut generator = OllamaGenerator::from_env()?;
            if let Some(model) = &args.model {
                generator = generator.with_model(model.as_str());
            }
            Arc::new(generator)
        }
    })
}

/// Load the corpus and build the index, reusing cached embeddings when possible.
pub async fn load_retriever(args: &GlobalArgs) -> Result<(Retriever, IndexReport)> {
    let config = rag_config(args)?;
    let documents = load_jsonl(&args.corpus)
        .with_context(|| format!("failed to load corpus {}", args.corpus.display()))?;

    let mut builder = Retriever::builder()
        .chunker(Arc::new(RecursiveChunker::from_config(&config)))
        .embedding_provider(embedder(args)?)
        .config(config);
    if !args.no_cache {
        builder = builder.cache(EmbeddingCache::new(&args.cache_dir));
    }

    let mut retriever = builder.build()?;
    let report = retriever.index_documents(&documents).await.context("indexing failed")?;
    Ok((retriever, report))
}
