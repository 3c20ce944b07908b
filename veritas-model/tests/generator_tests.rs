//! Prompt layout and generator behaviour.

use futures::StreamExt;
use veritas_model::{
    ChatTurn, GenerationRequest, Generator, MockGenerator, ModelError, Role, build_messages,
    collect_answer,
};

#[test]
fn messages_interleave_history_in_order() {
    let request = GenerationRequest::new("Bats are not blind.", "What about owls?").with_history(vec![
        ChatTurn::new("Are bats blind?", "No."),
        ChatTurn::new("Do they echolocate?", "Most do."),
    ]);
    let messages = build_messages(&request);

    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
    );
    assert!(messages[0].content.contains("Bats are not blind."));
    assert_eq!(messages[1].content, "Are bats blind?");
    assert_eq!(messages[2].content, "No.");
    assert_eq!(messages[3].content, "Do they echolocate?");
    assert_eq!(messages[4].content, "Most do.");
    assert_eq!(messages[5].content, "What about owls?");
}

#[test]
fn empty_context_is_stated_in_the_prompt() {
    let messages = build_messages(&GenerationRequest::new("", "Is the earth flat?"));
    assert_eq!(messages.len(), 2);
    assert!(messages[0].content.contains("no relevant fact-check articles"));
}

#[test]
fn roles_serialize_lowercase() {
    let json = serde_json::to_string(&build_messages(&GenerationRequest::new("c", "q"))[1]).unwrap();
    assert_eq!(json, r#"{"role":"user","content":"q"}"#);
}

#[tokio::test]
async fn mock_quotes_top_passage() {
    let generator = MockGenerator::new();
    let request = GenerationRequest::new("First passage.\n\nSecond passage.", "q");
    let answer = collect_answer(generator.generate(request).await.unwrap()).await.unwrap();
    assert_eq!(answer, "First passage.");
}

#[tokio::test]
async fn mock_without_context_says_so() {
    let generator = MockGenerator::new();
    let answer =
        collect_answer(generator.generate(GenerationRequest::new("", "q")).await.unwrap())
            .await
            .unwrap();
    assert!(answer.starts_with("No fact-check"));
}

#[tokio::test]
async fn mock_streams_word_tokens() {
    let generator = MockGenerator::with_answer("The claim is false.");
    let tokens: Vec<String> = generator
        .generate(GenerationRequest::new("ctx", "q"))
        .await
        .unwrap()
        .map(|t| t.unwrap())
        .collect()
        .await;
    assert_eq!(tokens, vec!["The ", "claim ", "is ", "false."]);
}

#[tokio::test]
async fn same_request_gives_same_answer() {
    let generator = MockGenerator::new();
    let request = GenerationRequest::new("Passage.", "q")
        .with_history(vec![ChatTurn::new("earlier", "answer")]);
    let first = collect_answer(generator.generate(request.clone()).await.unwrap()).await.unwrap();
    let second = collect_answer(generator.generate(request).await.unwrap()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn failing_mock_reports_provider() {
    let generator = MockGenerator::failing("quota exceeded");
    let err = generator.generate(GenerationRequest::default()).await.err().unwrap();
    assert!(matches!(err, ModelError::Generation { ref provider, .. } if provider == "mock"));
    assert!(!err.is_retryable());
}
