//! Chat completions over the OpenAI HTTP contract, streamed as server-sent events.
//!
//! Works with OpenAI itself and with compatible servers (vLLM, LM Studio,
//! llama.cpp, Groq, ...) via [`OpenAICompatibleGenerator::with_base_url`].

use async_stream::try_stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, Result};
use crate::generator::{Generator, TokenStream};
use crate::http;
use crate::prompt::{GenerationRequest, Message, build_messages};

/// The default OpenAI API base.
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// The default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const DONE_MARKER: &str = "[DONE]";

/// Streaming chat-completion generator.
///
/// ```rust,ignore
/// use veritas_model::OpenAICompatibleGenerator;
///
/// let local = OpenAICompatibleGenerator::new("qwen2.5-7b-instruct")?
///     .with_base_url("http://127.0.0.1:8000/v1");
/// ```
pub struct OpenAICompatibleGenerator {
    http: reqwest::Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl OpenAICompatibleGenerator {
    /// A generator for `model` against the public OpenAI API, without a key.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ModelError::InvalidConfiguration("model must not be empty".to_string()));
        }
        Ok(Self {
            http: http::client("openai")?,
            name: format!("openai:{model}"),
            base_url: OPENAI_API_BASE.to_string(),
            api_key: None,
            model,
            temperature: None,
            max_tokens: None,
        })
    }

    /// Configure from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    ///
    /// A missing key is only an error for the public API; local servers
    /// usually accept anonymous requests.
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let mut generator = Self::new(model)?;
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            generator = generator.with_base_url(base_url);
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => Ok(generator.with_api_key(key)),
            Err(_) if generator.base_url == OPENAI_API_BASE => Err(
                ModelError::InvalidConfiguration("OPENAI_API_KEY environment variable not set".to_string()),
            ),
            Err(_) => Ok(generator),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Switch models. Empty names are ignored.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.name = format!("openai:{model}");
            self.model = model;
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

/// What one SSE `data:` payload contributes to the answer.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Token(String),
    Skip,
    Done,
}

pub(crate) fn parse_event(provider: &str, data: &str) -> Result<Event> {
    let data = data.trim();
    if data == DONE_MARKER {
        return Ok(Event::Done);
    }
    if data.is_empty() {
        return Ok(Event::Skip);
    }

    let chunk: ChatChunk = serde_json::from_str(data).map_err(|e| ModelError::MalformedStream {
        provider: provider.to_string(),
        message: format!("{e}: {data}"),
    })?;
    if let Some(error) = chunk.error {
        return Err(ModelError::Generation { provider: provider.to_string(), message: error.message });
    }

    let token: String = chunk.choices.into_iter().filter_map(|c| c.delta.content).collect();
    Ok(if token.is_empty() { Event::Skip } else { Event::Token(token) })
}

#[async_trait]
impl Generator for OpenAICompatibleGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(&request),
            stream: true,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!(generator = %self.name, messages = body.messages.len(), "sending chat request");

        let mut builder = self.http.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await.map_err(|e| http::request_error(&self.name, &e))?;
        let response = http::check_status(&self.name, response).await?;
        info!(generator = %self.name, "streaming answer");

        let provider = self.name.clone();
        let mut events = Box::pin(response.bytes_stream().eventsource());
        let stream = try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| ModelError::MalformedStream {
                    provider: provider.clone(),
                    message: e.to_string(),
                })?;
                match parse_event(&provider, &event.data)? {
                    Event::Token(token) => yield token,
                    Event::Skip => {}
                    Event::Done => break,
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_delta_content() {
        let data = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Bats"}}]}"#;
        assert_eq!(parse_event("p", data).unwrap(), Event::Token("Bats".to_string()));
    }

    #[test]
    fn role_only_and_empty_chunks_are_skipped() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_event("p", data).unwrap(), Event::Skip);
        assert_eq!(parse_event("p", r#"{"choices":[]}"#).unwrap(), Event::Skip);
        assert_eq!(parse_event("p", "  ").unwrap(), Event::Skip);
    }

    #[test]
    fn done_marker_ends_stream() {
        assert_eq!(parse_event("p", " [DONE]").unwrap(), Event::Done);
    }

    #[test]
    fn errors_in_stream_surface() {
        let err = parse_event("p", r#"{"error":{"message":"overloaded"}}"#).unwrap_err();
        assert!(matches!(err, ModelError::Generation { ref message, .. } if message == "overloaded"));
        assert!(matches!(parse_event("p", "{oops"), Err(ModelError::MalformedStream { .. })));
    }
}
