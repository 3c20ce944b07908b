//! Local generation through an Ollama server's `/api/chat` endpoint.
//!
//! Ollama streams newline-delimited JSON objects, one per token batch, ending
//! with an object whose `done` flag is set.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ModelError, Result};
use crate::generator::{Generator, TokenStream};
use crate::http;
use crate::prompt::{GenerationRequest, Message, build_messages};

/// The default Ollama address.
pub const DEFAULT_HOST: &str = "http://localhost:11434";

/// The default local model.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Streaming generator for a locally hosted model.
pub struct OllamaGenerator {
    http: reqwest::Client,
    name: String,
    host: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaGenerator {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ModelError::InvalidConfiguration("model must not be empty".to_string()));
        }
        Ok(Self {
            http: http::client("ollama")?,
            name: format!("ollama:{model}"),
            host: DEFAULT_HOST.to_string(),
            model,
            temperature: None,
        })
    }

    /// Configure from `OLLAMA_HOST` and `OLLAMA_MODEL`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let generator = Self::new(model)?;
        Ok(match std::env::var("OLLAMA_HOST") {
            Ok(host) => generator.with_host(host),
            Err(_) => generator,
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into().trim_end_matches('/').to_string();
        self
    }

    /// Switch models. Empty names are ignored.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.name = format!("ollama:{model}");
            self.model = model;
        }
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
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
    options: Option<Options>,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatLine {
    #[serde(default)]
    message: Option<LineMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct LineMessage {
    #[serde(default)]
    content: String,
}

/// Decoded content of one NDJSON line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Line {
    pub token: Option<String>,
    pub done: bool,
}

pub(crate) fn parse_line(provider: &str, line: &str) -> Result<Line> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Line { token: None, done: false });
    }
    let parsed: ChatLine = serde_json::from_str(line).map_err(|e| ModelError::MalformedStream {
        provider: provider.to_string(),
        message: format!("{e}: {line}"),
    })?;
    if let Some(message) = parsed.error {
        return Err(ModelError::Generation { provider: provider.to_string(), message });
    }
    let token = parsed.message.map(|m| m.content).filter(|c| !c.is_empty());
    Ok(Line { token, done: parsed.done })
}

/// Reassembles lines from arbitrarily split byte chunks.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `bytes` and return every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Whatever remains after the final newline.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        (!rest.is_empty()).then_some(rest)
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: GenerationRequest) -> Result<TokenStream> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(&request),
            stream: true,
            options: self.temperature.map(|temperature| Options { temperature }),
        };
        debug!(generator = %self.name, messages = body.messages.len(), "sending chat request");

        let response = self
            .http
            .post(format!("{}/api/chat", self.host))
            .json(&body)
            .send()
            .await
            .map_err(|e| http::request_error(&self.name, &e))?;
        let response = http::check_status(&self.name, response).await?;
        info!(generator = %self.name, "streaming answer");

        let provider = self.name.clone();
        let mut bytes = Box::pin(response.bytes_stream());
        let stream = try_stream! {
            let mut buffer = LineBuffer::default();
            let mut done = false;
            while !done {
                let chunk = match bytes.next().await {
                    Some(chunk) => chunk.map_err(|e| http::request_error(&provider, &e))?,
                    None => break,
                };
                for raw in buffer.push(&chunk) {
                    let line = parse_line(&provider, &raw)?;
                    if let Some(token) = line.token {
                        yield token;
                    }
                    if line.done {
                        done = true;
                        break;
                    }
                }
            }
            if !done {
                if let Some(rest) = buffer.finish() {
                    if let Some(token) = parse_line(&provider, &rest)?.token {
                        yield token;
                    }
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
    fn line_buffer_joins_split_chunks() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"{\"a\":").is_empty());
        assert_eq!(buffer.push(b"1}\r\n{\"b\""), vec!["{\"a\":1}"]);
        assert_eq!(buffer.push(b":2}\n\n"), vec!["{\"b\":2}", ""]);
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn line_buffer_keeps_unterminated_tail() {
        let mut buffer = LineBuffer::default();
        buffer.push(b"{\"done\":true}");
        assert_eq!(buffer.finish().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn parses_token_and_done_lines() {
        let line = parse_line("p", r#"{"message":{"role":"assistant","content":"Bats"},"done":false}"#);
        assert_eq!(line.unwrap(), Line { token: Some("Bats".to_string()), done: false });

        let line = parse_line("p", r#"{"message":{"role":"assistant","content":""},"done":true}"#);
        assert_eq!(line.unwrap(), Line { token: None, done: true });
    }

    #[test]
    fn server_error_line_is_an_error() {
        let err = parse_line("p", r#"{"error":"model 'x' not found"}"#).unwrap_err();
        assert!(matches!(err, ModelError::Generation { .. }));
        assert!(matches!(parse_line("p", "not json"), Err(ModelError::MalformedStream { .. })));
    }
}
