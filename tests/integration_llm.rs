#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Chat-completion client and query expansion against a mock OpenAI-compatible API

use std::sync::Arc;
use study_rag::config::{ExpansionConfig, LlmProviderConfig};
use study_rag::llm::{ChatMessage, CompletionBackend, CompletionRequest, LlmError};
use study_rag::search::QueryExpander;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok(); // Ignore error if already initialized
}

fn provider_for(server: &MockServer, model: &str) -> LlmProviderConfig {
    LlmProviderConfig {
        name: "mock".to_string(),
        base_url: format!("{}/v1", server.uri()),
        model: model.to_string(),
        api_key_env: None,
        timeout_seconds: 5,
    }
}

fn completion_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn client_for(
    server: &MockServer,
    model: &str,
    api_key: Option<&str>,
) -> study_rag::llm::OpenAiCompatibleClient {
    study_rag::llm::OpenAiCompatibleClient::new(
        &provider_for(server, model),
        api_key.map(str::to_string),
    )
    .expect("Failed to create completion client")
}

#[tokio::test]
async fn completion_success() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 2048,
            "messages": [
                { "role": "system", "content": "Kamu asisten belajar." },
                { "role": "user", "content": "Apa itu sel?" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("  Sel adalah unit terkecil kehidupan.\n")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "gpt-4o-mini", Some("sk-test"));
    let request = CompletionRequest::new(vec![
        ChatMessage::system("Kamu asisten belajar."),
        ChatMessage::user("Apa itu sel?"),
    ])
    .with_max_tokens(2048)
    .with_temperature(0.5);

    let reply = client.complete(&request).await;
    assert_eq!(reply, Ok("Sel adalah unit terkecil kehidupan.".to_string()));
}

#[tokio::test]
async fn rate_limit_is_reported() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "error": { "message": "Rate limit reached", "type": "requests" }
        })))
        .mount(&server)
        .await;

    let client = client_for(&server, "gpt-4o-mini", None);
    let result = client
        .complete(&CompletionRequest::new(vec![ChatMessage::user("halo")]))
        .await;

    assert_eq!(result, Err(LlmError::RateLimited));
    assert!(result.is_err_and(|e| e.is_rate_limited()));
}

#[tokio::test]
async fn unauthorized_and_server_errors() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server, "gpt-4o-mini", Some("wrong"));
    let result = client
        .complete(&CompletionRequest::new(vec![ChatMessage::user("halo")]))
        .await;
    assert_eq!(result, Err(LlmError::Unauthorized(401)));

    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let result = client
        .complete(&CompletionRequest::new(vec![ChatMessage::user("halo")]))
        .await;
    assert_eq!(result, Err(LlmError::Status(500)));
}

#[tokio::test]
async fn empty_content_is_an_error() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("   ")))
        .mount(&server)
        .await;

    let client = client_for(&server, "gpt-4o-mini", None);
    let result = client
        .complete(&CompletionRequest::new(vec![ChatMessage::user("halo")]))
        .await;

    assert_eq!(result, Err(LlmError::EmptyResponse));
}

#[tokio::test]
async fn expander_rewrites_query_through_provider() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "model": "llama-3.1-8b-instant",
            "max_tokens": 100
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(
            "\"fotosintesis tumbuhan klorofil cahaya matahari glukosa oksigen\"",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "llama-3.1-8b-instant", None);
    let expander = QueryExpander::new(Arc::new(client), &ExpansionConfig::default());

    let expanded = expander.expand("proses fotosintesis").await;
    assert!(expanded.was_expanded);
    assert_eq!(expanded.original, "proses fotosintesis");
    assert_eq!(
        expanded.expanded,
        "fotosintesis tumbuhan klorofil cahaya matahari glukosa oksigen"
    );
}

#[tokio::test]
async fn expander_keeps_query_when_provider_fails() {
    init_test_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = client_for(&server, "llama-3.1-8b-instant", None);
    let expander = QueryExpander::new(Arc::new(client), &ExpansionConfig::default());

    let expanded = expander.expand("hukum newton").await;
    assert!(!expanded.was_expanded);
    assert_eq!(expanded.expanded, "hukum newton");

    // Too short to be worth a request
    let short = expander.expand("sel").await;
    assert!(!short.was_expanded);
}
