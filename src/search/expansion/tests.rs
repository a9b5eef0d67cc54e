use super::*;
use crate::llm::LlmError;
use async_trait::async_trait;
use std::sync::Mutex;

struct FixedCompletion {
    reply: Result<String, LlmError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FixedCompletion {
    fn new(reply: Result<&str, LlmError>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(ToString::to_string),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl CompletionBackend for FixedCompletion {
    fn model(&self) -> &str {
        "llama-3.1-8b-instant"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.reply.clone()
    }
}

fn expander(backend: &Arc<FixedCompletion>) -> QueryExpander {
    QueryExpander::new(
        Arc::clone(backend) as Arc<dyn CompletionBackend>,
        &ExpansionConfig::default(),
    )
}

#[tokio::test]
async fn same_text_is_not_expanded() {
    let backend = FixedCompletion::new(Ok("siapa sophie?"));
    let result = expander(&backend).expand("siapa sophie?").await;

    assert_eq!(result.expanded, "siapa sophie?");
    assert!(!result.was_expanded);
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn expanded_text_is_used() {
    let backend = FixedCompletion::new(Ok(
        "  siapa sophie karakter utama novel dunia filsafat jostein gaarder\n",
    ));
    let result = expander(&backend).expand("siapa sophie?").await;

    assert_eq!(result.original, "siapa sophie?");
    assert_eq!(
        result.expanded,
        "siapa sophie karakter utama novel dunia filsafat jostein gaarder"
    );
    assert!(result.was_expanded);

    let requests = backend.requests.lock().expect("requests lock");
    let request = &requests[0];
    assert_eq!(request.max_tokens, Some(100));
    assert_eq!(request.temperature, Some(0.3));
    assert_eq!(request.messages[0], ChatMessage::system(QUERY_EXPANSION_PROMPT));
    assert_eq!(request.messages[1], ChatMessage::user("siapa sophie?"));
}

#[tokio::test]
async fn surrounding_quotes_are_removed() {
    let backend = FixedCompletion::new(Ok("\"rumus teorema pythagoras segitiga\""));
    let result = expander(&backend).expand("rumus pythagoras").await;
    assert_eq!(result.expanded, "rumus teorema pythagoras segitiga");
}

#[tokio::test]
async fn quoted_echo_counts_as_unchanged() {
    let backend = FixedCompletion::new(Ok("\"rumus pythagoras\""));
    let result = expander(&backend).expand("rumus pythagoras").await;

    assert_eq!(result.expanded, "rumus pythagoras");
    assert!(!result.was_expanded);
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn short_and_long_queries_are_skipped() {
    let backend = FixedCompletion::new(Ok("should not be used"));
    let expander = expander(&backend);

    let short = expander.expand("halo").await;
    assert_eq!(short, ExpandedQuery::unchanged("halo"));

    let long = "a".repeat(201);
    let result = expander.expand(&long).await;
    assert!(!result.was_expanded);

    assert_eq!(backend.request_count(), 0);
}

#[test]
fn bounds_are_inclusive_and_count_characters() {
    let backend = FixedCompletion::new(Ok(""));
    let expander = expander(&backend);

    assert!(expander.should_expand("halo!"));
    assert!(!expander.should_expand("halo"));
    assert!(expander.should_expand(&"é".repeat(200)));
    assert!(!expander.should_expand(&"é".repeat(201)));
}

#[tokio::test]
async fn failure_returns_original() {
    let backend = FixedCompletion::new(Err(LlmError::Status(500)));
    let result = expander(&backend).expand("apa itu demokrasi").await;

    assert_eq!(result, ExpandedQuery::unchanged("apa itu demokrasi"));
}

#[tokio::test]
async fn blank_output_returns_original() {
    let backend = FixedCompletion::new(Ok("   "));
    let result = expander(&backend).expand("apa itu demokrasi").await;

    assert!(!result.was_expanded);
    assert_eq!(result.expanded, "apa itu demokrasi");
}
