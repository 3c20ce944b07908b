//! # veritas-model
//!
//! Answer generators for grounded question answering.
//!
//! ## Overview
//!
//! A [`Generator`] turns retrieved context, a question, and caller-owned chat
//! history into a stream of answer tokens. Available generators:
//!
//! - [`MockGenerator`] - offline, quotes the top passage (tests and demos)
//! - `OpenAICompatibleGenerator` - OpenAI chat completions or any compatible
//!   server, streamed over SSE (feature `openai`)
//! - `OllamaGenerator` - a local Ollama server, streamed as NDJSON (feature `ollama`)
//!
//! ## Quick Start
//!
//! ```rust
//! use veritas_model::{ChatTurn, GenerationRequest, Generator, MockGenerator, collect_answer};
//!
//! # async fn run() -> veritas_model::Result<()> {
//! let generator = MockGenerator::new();
//! let request = GenerationRequest::new("Bats are not blind.", "Are bats blind?")
//!     .with_history(vec![ChatTurn::new("Hi", "Hello! Ask me about a claim.")]);
//!
//! let answer = collect_answer(generator.generate(request).await?).await?;
//! assert_eq!(answer, "Bats are not blind.");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod generator;
#[cfg(any(feature = "openai", feature = "ollama"))]
mod http;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod prompt;

pub use error::{ModelError, Result};
pub use generator::{Generator, TokenStream, collect_answer};
pub use mock::MockGenerator;
#[cfg(feature = "ollama")]
pub use ollama::OllamaGenerator;
#[cfg(feature = "openai")]
pub use openai::OpenAICompatibleGenerator;
pub use prompt::{ChatTurn, GenerationRequest, Message, Role, build_messages, system_prompt};
