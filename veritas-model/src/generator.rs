//! The answer generation capability.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};

use crate::error::Result;
use crate::prompt::GenerationRequest;

/// Answer text, delivered incrementally.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Produces an answer for a question grounded in retrieved context.
///
/// Implementations are stateless with respect to the conversation: whatever
/// history should influence the answer travels in the [`GenerationRequest`].
#[async_trait]
pub trait Generator: Send + Sync {
    /// A short identifier for logs and errors.
    fn name(&self) -> &str;

    /// Start generating. Errors before the first token are returned here;
    /// later failures arrive as stream items.
    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream>;
}

/// Drain a token stream into the full answer.
pub async fn collect_answer(stream: TokenStream) -> Result<String> {
    stream
        .try_fold(String::new(), |mut answer, token| async move {
            answer.push_str(&token);
            Ok(answer)
        })
        .await
}
