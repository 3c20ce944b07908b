//! Chat records and prompt assembly.
//!
//! Conversation history is owned by the caller and passed in with every
//! request. Generators never remember previous turns.

use serde::{Deserialize, Serialize};

/// One completed question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub answer: String,
}

impl ChatTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }
}

/// Everything a generator needs to answer one question.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Retrieved passages, already joined.
    pub context: String,
    /// The user's question.
    pub question: String,
    /// Earlier turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl GenerationRequest {
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self { context: context.into(), question: question.into(), history: Vec::new() }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat-completion message as sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

const INSTRUCTION: &str = "You are a fact-checking assistant. Answer the question using only \
the fact-check articles in the context below. If the context does not cover the question, \
say that no fact-check was found. Be concise.";

const NO_CONTEXT: &str = "(no relevant fact-check articles were found)";

/// Build the system instruction carrying `context`.
pub fn system_prompt(context: &str) -> String {
    let context = if context.trim().is_empty() { NO_CONTEXT } else { context };
    format!("{INSTRUCTION}\n\nContext:\n{context}")
}

/// Lay out a request as chat messages: the system instruction with the
/// context, then each history turn as a user/assistant pair, then the question.
pub fn build_messages(request: &GenerationRequest) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2 + request.history.len() * 2);
    messages.push(Message::new(Role::System, system_prompt(&request.context)));
    for turn in &request.history {
        messages.push(Message::new(Role::User, turn.question.as_str()));
        messages.push(Message::new(Role::Assistant, turn.answer.as_str()));
    }
    messages.push(Message::new(Role::User, request.question.as_str()));
    messages
}
