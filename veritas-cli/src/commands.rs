//! Subcommand handlers.
//!
//! Handlers write to a caller-supplied sink so they can be exercised without
//! a terminal.

use std::io::Write;

use anyhow::{Context, Result};
use futures::StreamExt;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{info, warn};
use veritas_model::{ChatTurn, GenerationRequest, Generator};
use veritas_rag::{CacheStatus, IndexReport, Retriever};

const PROMPT: &str = "veritas> ";

pub fn print_report(report: &IndexReport, out: &mut dyn Write) -> Result<()> {
    let cache = match report.cache {
        CacheStatus::Hit => "loaded from cache",
        CacheStatus::Miss => "computed and cached",
        CacheStatus::Disabled => "computed",
    };
    writeln!(
        out,
        "Indexed {} documents into {} chunks ({} dims, embeddings {cache}).",
        report.document_count, report.chunk_count, report.dimensions
    )?;
    if report.oversized_count > 0 {
        writeln!(
            out,
            "{} chunks exceed the size limit because they could not be split.",
            report.oversized_count
        )?;
    }
    Ok(())
}

pub async fn search(
    retriever: &Retriever,
    query: &str,
    k: usize,
    out: &mut dyn Write,
) -> Result<()> {
    let results = retriever.search(query, k).await?;
    if results.is_empty() {
        writeln!(out, "No matching chunks.")?;
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        let source = result.chunk.source_url().unwrap_or("-");
        writeln!(out, "{}. [{:.4}] {} ({})", rank + 1, result.score, result.chunk.id, source)?;
        writeln!(out, "   {}", result.chunk.text.replace('\n', " "))?;
    }
    Ok(())
}

/// Retrieve context for `question`, stream the answer to `out`, and list the
/// sources. Returns the full answer text.
pub async fn answer(
    retriever: &Retriever,
    generator: &dyn Generator,
    question: &str,
    history: &[ChatTurn],
    out: &mut dyn Write,
) -> Result<String> {
    let retrieval = retriever.retrieve(question).await?;
    if retrieval.context.is_empty() {
        warn!(question, "no context retrieved");
    }

    let request = GenerationRequest::new(retrieval.context.text.clone(), question)
        .with_history(history.to_vec());
    let mut tokens = generator
        .generate(request)
        .await
        .with_context(|| format!("{} failed to start generating", generator.name()))?;

    let mut text = String::new();
    while let Some(token) = tokens.next().await {
        let token = token.with_context(|| format!("{} failed mid-answer", generator.name()))?;
        write!(out, "{token}")?;
        out.flush()?;
        text.push_str(&token);
    }
    writeln!(out)?;

    if !retrieval.context.sources.is_empty() {
        writeln!(out, "\nSources:")?;
        for source in &retrieval.context.sources {
            writeln!(out, "  - {source}")?;
        }
    }
    info!(generator = generator.name(), answer_len = text.len(), "answered question");
    Ok(text)
}

/// A chat-loop line, after trimming.
#[derive(Debug, PartialEq, Eq)]
pub enum ChatInput<'a> {
    Empty,
    Quit,
    Reset,
    History,
    Question(&'a str),
}

pub fn parse_chat_input(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "" => ChatInput::Empty,
        "exit" | "quit" | "/exit" | "/quit" => ChatInput::Quit,
        "/reset" => ChatInput::Reset,
        "/history" => ChatInput::History,
        question => ChatInput::Question(question),
    }
}

pub async fn chat(retriever: &Retriever, generator: &dyn Generator) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut history: Vec<ChatTurn> = Vec::new();
    let mut stdout = std::io::stdout();

    println!("Ask about a claim. /reset clears the conversation, /history shows it, exit quits.");
    loop {
        let line = match editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        match parse_chat_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Reset => {
                history.clear();
                println!("Conversation cleared.");
            }
            ChatInput::History => {
                for (i, turn) in history.iter().enumerate() {
                    println!("{}. Q: {}\n   A: {}", i + 1, turn.question, turn.answer);
                }
            }
            ChatInput::Question(question) => {
                editor.add_history_entry(question)?;
                match answer(retriever, generator, question, &history, &mut stdout).await {
                    Ok(text) => history.push(ChatTurn::new(question, text)),
                    Err(e) => eprintln!("error: {e:#}"),
                }
            }
        }
    }
    Ok(())
}
