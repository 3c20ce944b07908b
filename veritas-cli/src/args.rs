//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use veritas_telemetry::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "veritas", version, about = "Ask questions of a fact-check corpus")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// JSON Lines file of fact-check articles
    #[arg(long, global = true, env = "VERITAS_CORPUS", default_value = "data/factchecks.jsonl")]
    pub corpus: PathBuf,

    /// Directory for the persisted embedding matrix
    #[arg(long, global = true, env = "VERITAS_CACHE_DIR", default_value = ".veritas/cache")]
    pub cache_dir: PathBuf,

    /// Always re-embed instead of using the cache
    #[arg(long, global = true, env = "VERITAS_NO_CACHE")]
    pub no_cache: bool,

    /// Maximum chunk length in characters
    #[arg(long, global = true, env = "VERITAS_CHUNK_SIZE", default_value_t = 512)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, global = true, env = "VERITAS_CHUNK_OVERLAP", default_value_t = 100)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, global = true, env = "VERITAS_TOP_K", default_value_t = 4)]
    pub top_k: usize,

    /// Drop results scoring below this value
    #[arg(long, global = true, env = "VERITAS_SIMILARITY_THRESHOLD", default_value_t = 0.0)]
    pub threshold: f32,

    #[arg(long, global = true, env = "VERITAS_EMBEDDER", value_enum, default_value_t = EmbedderKind::Hash)]
    pub embedder: EmbedderKind,

    /// Embedding width (hash embedder) or requested dimensions (OpenAI)
    #[arg(long, global = true, env = "VERITAS_EMBEDDING_DIMS")]
    pub embedding_dims: Option<usize>,

    /// Embedding model name for remote embedders
    #[arg(long, global = true, env = "VERITAS_EMBEDDING_MODEL")]
    pub embedding_model: Option<String>,

    #[arg(long, global = true, env = "VERITAS_GENERATOR", value_enum, default_value_t = GeneratorKind::Mock)]
    pub generator: GeneratorKind,

    /// Chat model name for remote generators
    #[arg(long, global = true, env = "VERITAS_MODEL")]
    pub model: Option<String>,

    #[arg(long, global = true, env = "VERITAS_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build (or load) the index and report its size
    Index,
    /// Show the best-matching chunks for a query
    Search {
        query: String,
        /// Override --top-k for this search
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Answer one question and list its sources
    Ask { question: String },
    /// Interactive question answering with conversation history
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Offline feature hashing
    Hash,
    /// OpenAI-compatible embeddings API
    Openai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    /// Quote the top passage, no model
    Mock,
    /// OpenAI-compatible chat completions
    Openai,
    /// Local Ollama server
    Ollama,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}
