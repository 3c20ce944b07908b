//! Offline generator for tests and demos.

use async_trait::async_trait;
use futures::stream;
use tracing::debug;

use crate::error::{ModelError, Result};
use crate::generator::{Generator, TokenStream};
use crate::prompt::GenerationRequest;

const EMPTY_ANSWER: &str = "No fact-check covering that question was found.";

#[derive(Debug, Clone)]
enum Reply {
    /// Quote the best-ranked passage.
    TopPassage,
    Fixed(String),
    Fail(String),
}

/// A generator that answers without a model.
///
/// By default it quotes the first passage of the context, so the result is
/// still grounded in what retrieval found. The answer is streamed one word at a
/// time.
#[derive(Debug, Clone)]
pub struct MockGenerator {
    name: String,
    reply: Reply,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self { name: "mock".to_string(), reply: Reply::TopPassage }
    }

    /// Always answer `answer`.
    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self { name: "mock".to_string(), reply: Reply::Fixed(answer.into()) }
    }

    /// Always fail with a [`ModelError::Generation`].
    pub fn failing(message: impl Into<String>) -> Self {
        Self { name: "mock".to_string(), reply: Reply::Fail(message.into()) }
    }

    fn answer_for(&self, request: &GenerationRequest) -> Result<String> {
        match &self.reply {
            Reply::Fixed(answer) => Ok(answer.clone()),
            Reply::Fail(message) => Err(ModelError::Generation {
                provider: self.name.clone(),
                message: message.clone(),
            }),
            Reply::TopPassage => {
                let passage = request.context.split("\n\n").map(str::trim).find(|p| !p.is_empty());
                Ok(passage.unwrap_or(EMPTY_ANSWER).to_string())
            }
        }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Split text into tokens that concatenate back to the original.
pub(crate) fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if c == ' ' {
            tokens.push(text[start..=i].to_string());
            start = i + 1;
        }
    }
    if start < text.len() {
        tokens.push(text[start..].to_string());
    }
    tokens
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream> {
        let answer = self.answer_for(&request)?;
        debug!(generator = %self.name, history_len = request.history.len(), "mock generation");
        Ok(Box::pin(stream::iter(word_tokens(&answer).into_iter().map(Ok::<String, ModelError>))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_tokens_rejoin_exactly() {
        let text = "Bats  are not blind. ";
        assert_eq!(word_tokens(text).concat(), text);
        assert_eq!(word_tokens("one"), vec!["one"]);
        assert!(word_tokens("").is_empty());
    }
}
