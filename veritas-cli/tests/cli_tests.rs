use std::fs;
use std::path::Path;

use clap::Parser;
use veritas_cli::args::{EmbedderKind, GeneratorKind};
use veritas_cli::commands::{self, ChatInput, parse_chat_input};
use veritas_cli::{Cli, Command, setup};
use veritas_model::{ChatTurn, MockGenerator};
use veritas_rag::CacheStatus;

const CORPUS: &str = r#"{"id": "bats", "claim": "Bats are blind", "url": "https://fc.example/bats", "text": "Bats are not blind. Most species see well in low light."}
{"id": "moon", "claim": "The moon landing was faked", "url": "https://fc.example/moon", "text": "The moon landing was tracked by independent observatories."}
"#;

fn cli_for(dir: &Path, extra: &[&str]) -> Cli {
    let corpus = dir.join("corpus.jsonl");
    fs::write(&corpus, CORPUS).unwrap();
    let cache = dir.join("cache");
    let mut argv = vec![
        "veritas".to_string(),
        "--corpus".to_string(),
        corpus.display().to_string(),
        "--cache-dir".to_string(),
        cache.display().to_string(),
        "--chunk-size".to_string(),
        "60".to_string(),
        "--chunk-overlap".to_string(),
        "10".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Cli::try_parse_from(argv).unwrap()
}

#[test]
fn parses_subcommands_and_defaults() {
    let cli = Cli::try_parse_from(["veritas", "search", "bats", "-k", "2"]).unwrap();
    assert!(matches!(cli.command, Command::Search { ref query, k: Some(2) } if query == "bats"));
    assert_eq!(cli.global.embedder, EmbedderKind::Hash);
    assert_eq!(cli.global.generator, GeneratorKind::Mock);

    let cli = Cli::try_parse_from(["veritas", "ask", "are bats blind?", "--generator", "ollama"])
        .unwrap();
    assert_eq!(cli.global.generator, GeneratorKind::Ollama);

    assert!(Cli::try_parse_from(["veritas", "index", "--embedder", "word2vec"]).is_err());
}

#[test]
fn rejects_overlap_not_smaller_than_size() {
    let cli = Cli::try_parse_from(["veritas", "index", "--chunk-size", "10", "--chunk-overlap", "10"])
        .unwrap();
    assert!(setup::rag_config(&cli.global).is_err());
}

#[test]
fn chat_input_commands() {
    assert_eq!(parse_chat_input("   "), ChatInput::Empty);
    assert_eq!(parse_chat_input("exit"), ChatInput::Quit);
    assert_eq!(parse_chat_input("/reset"), ChatInput::Reset);
    assert_eq!(parse_chat_input("/history"), ChatInput::History);
    assert_eq!(parse_chat_input(" are bats blind? "), ChatInput::Question("are bats blind?"));
}

#[tokio::test]
async fn index_then_reuse_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli_for(dir.path(), &["index"]);

    let (_, first) = setup::load_retriever(&cli.global).await.unwrap();
    assert_eq!(first.document_count, 2);
    assert_eq!(first.cache, CacheStatus::Miss);

    let (_, second) = setup::load_retriever(&cli.global).await.unwrap();
    assert_eq!(second.cache, CacheStatus::Hit);
    assert_eq!(second.chunk_count, first.chunk_count);

    let mut out = Vec::new();
    commands::print_report(&second, &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().contains("loaded from cache"));
}

#[tokio::test]
async fn search_prints_ranked_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli_for(dir.path(), &["--no-cache", "search", "bats blind"]);
    let (retriever, _) = setup::load_retriever(&cli.global).await.unwrap();

    let mut out = Vec::new();
    commands::search(&retriever, "are bats blind", 1, &mut out).await.unwrap();
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("1. ["));
    assert!(printed.contains("https://fc.example/bats"));
}

#[tokio::test]
async fn answer_streams_text_and_sources() {
    let dir = tempfile::tempdir().unwrap();
    let cli = cli_for(dir.path(), &["--no-cache", "--top-k", "1", "ask", "q"]);
    let (retriever, _) = setup::load_retriever(&cli.global).await.unwrap();
    let generator = MockGenerator::with_answer("Bats can see.");

    let history = vec![ChatTurn::new("hello", "hi")];
    let mut out = Vec::new();
    let text = commands::answer(&retriever, &generator, "are bats blind", &history, &mut out)
        .await
        .unwrap();

    assert_eq!(text, "Bats can see.");
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.starts_with("Bats can see.\n"));
    assert!(printed.contains("Sources:\n  - https://fc.example/bats"));
}

#[tokio::test]
async fn missing_corpus_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.jsonl");
    let cli = Cli::try_parse_from([
        "veritas",
        "--corpus",
        missing.to_str().unwrap(),
        "--no-cache",
        "index",
    ])
    .unwrap();
    let err = setup::load_retriever(&cli.global).await.err().unwrap();
    assert!(format!("{err:#}").contains("failed to load corpus"));
}
