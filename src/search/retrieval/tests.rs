use super::*;
use crate::config::{EmbeddingConfig, ExpansionConfig};
use crate::embeddings::{EmbeddingBackend, EmbeddingError, HashEmbedder};
use crate::llm::{CompletionBackend, CompletionRequest, LlmError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Embeds every text as the same vector and records what it was asked to embed
struct RecordingEmbedder {
    vector: Option<Vec<f32>>,
    seen: Mutex<Vec<String>>,
}

impl RecordingEmbedder {
    fn returning(vector: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            vector: Some(vector),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            vector: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock").clone()
    }

    fn answer(&self) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.vector.clone().ok_or(EmbeddingError::Status(500))
    }
}

#[async_trait]
impl EmbeddingBackend for RecordingEmbedder {
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        self.seen.lock().expect("seen lock").push(text.to_string());
        self.answer()
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, EmbeddingError> {
        self.seen
            .lock()
            .expect("seen lock")
            .extend(texts.iter().cloned());
        texts.iter().map(|_| self.answer()).collect()
    }
}

struct CannedExpansion {
    reply: String,
    calls: Mutex<usize>,
}

#[async_trait]
impl CompletionBackend for CannedExpansion {
    fn model(&self) -> &str {
        "canned"
    }

    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> std::result::Result<String, LlmError> {
        *self.calls.lock().expect("calls lock") += 1;
        Ok(self.reply.clone())
    }
}

fn canned(reply: &str) -> Arc<CannedExpansion> {
    Arc::new(CannedExpansion {
        reply: reply.to_string(),
        calls: Mutex::new(0),
    })
}

fn embedding_config(dimension: usize) -> EmbeddingConfig {
    EmbeddingConfig {
        dimension,
        ..EmbeddingConfig::default()
    }
}

fn retriever(
    backend: &Arc<RecordingEmbedder>,
    dimension: usize,
    expansion: Option<&Arc<CannedExpansion>>,
    retrieval: &RetrievalConfig,
) -> Retriever {
    let provider = EmbeddingProvider::new(
        Arc::clone(backend) as Arc<dyn EmbeddingBackend>,
        &embedding_config(dimension),
    );
    let expander = expansion.map(|backend| {
        QueryExpander::new(
            Arc::clone(backend) as Arc<dyn CompletionBackend>,
            &ExpansionConfig::default(),
        )
    });
    Retriever::new(provider, expander, retrieval, ChunkingConfig::default())
}

fn semantic_candidate(id: i64, vector: Vec<f32>) -> KnowledgeCandidate {
    KnowledgeCandidate {
        id,
        content: format!("document {}", id),
        embedding: Some(
            Embedding::semantic(vector)
                .to_stored()
                .expect("should serialize"),
        ),
    }
}

#[tokio::test]
async fn threshold_keeps_only_relevant_record() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let retriever = retriever(&backend, 2, None, &RetrievalConfig::default());

    let candidates = vec![
        semantic_candidate(1, vec![0.8, 0.6]),
        semantic_candidate(2, vec![0.2, 0.979_795_9]),
    ];
    let results = retriever
        .retrieve("apa itu fotosintesis", &candidates, 3)
        .await
        .expect("retrieval should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 1);
    assert!((results[0].score - 0.8).abs() < 1e-5);
}

#[tokio::test]
async fn unparsable_record_is_skipped() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let retriever = retriever(&backend, 2, None, &RetrievalConfig::default());

    let candidates = vec![
        KnowledgeCandidate {
            id: 1,
            content: "corrupt".to_string(),
            embedding: Some("[0.1, oops]".to_string()),
        },
        semantic_candidate(2, vec![0.95, 0.312_249_9]),
    ];
    let results = retriever
        .retrieve("ringkasan bab dua", &candidates, 1)
        .await
        .expect("retrieval should succeed");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 2);
}

#[tokio::test]
async fn preconditions_are_checked() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let retriever = retriever(&backend, 2, None, &RetrievalConfig::default());
    let candidates = vec![semantic_candidate(1, vec![1.0, 0.0])];

    assert!(matches!(
        retriever.retrieve("query", &candidates, 0).await,
        Err(RagError::InvalidArgument(_))
    ));
    assert!(matches!(
        retriever.retrieve("  \n", &candidates, 3).await,
        Err(RagError::InvalidArgument(_))
    ));
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn empty_candidates_make_no_calls() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let expansion = canned("expanded query text");
    let retriever = retriever(&backend, 2, Some(&expansion), &RetrievalConfig::default());

    let details = retriever
        .retrieve_with_details("apa itu demokrasi", &[], 3)
        .await
        .expect("retrieval should succeed");

    assert!(details.results.is_empty());
    assert_eq!(details.embedding_source, None);
    assert!(backend.seen().is_empty());
    assert_eq!(*expansion.calls.lock().expect("calls lock"), 0);
}

#[tokio::test]
async fn expanded_query_is_embedded() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let expansion = canned("apa itu demokrasi sistem pemerintahan rakyat");
    let retriever = retriever(&backend, 2, Some(&expansion), &RetrievalConfig::default());

    let candidates = vec![semantic_candidate(1, vec![1.0, 0.0])];
    let details = retriever
        .retrieve_with_details("apa itu demokrasi", &candidates, 3)
        .await
        .expect("retrieval should succeed");

    assert!(details.query.was_expanded);
    assert_eq!(details.embedding_source, Some(EmbeddingSource::Semantic));
    assert_eq!(
        backend.seen(),
        vec!["apa itu demokrasi sistem pemerintahan rakyat".to_string()]
    );
}

#[tokio::test]
async fn expansion_can_be_disabled() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let expansion = canned("something else entirely");
    let config = RetrievalConfig {
        expand_queries: false,
        ..RetrievalConfig::default()
    };
    let retriever = retriever(&backend, 2, Some(&expansion), &config);

    let candidates = vec![semantic_candidate(1, vec![1.0, 0.0])];
    retriever
        .retrieve("apa itu demokrasi", &candidates, 3)
        .await
        .expect("retrieval should succeed");

    assert_eq!(backend.seen(), vec!["apa itu demokrasi".to_string()]);
    assert_eq!(*expansion.calls.lock().expect("calls lock"), 0);
}

#[tokio::test]
async fn fallback_query_only_matches_fallback_records() {
    let backend = RecordingEmbedder::failing();
    let retriever = retriever(&backend, 384, None, &RetrievalConfig::default());

    let hashed = HashEmbedder::new(384).embed("hukum newton gaya massa percepatan");
    let candidates = vec![
        semantic_candidate(1, hashed.clone()),
        KnowledgeCandidate {
            id: 2,
            content: "hukum newton".to_string(),
            embedding: Some(
                Embedding::hashed(hashed)
                    .to_stored()
                    .expect("should serialize"),
            ),
        },
    ];

    let details = retriever
        .retrieve_with_details("hukum newton gaya massa", &candidates, 3)
        .await
        .expect("retrieval should succeed");

    assert_eq!(details.embedding_source, Some(EmbeddingSource::Hashed));
    let ids: Vec<i64> = details.results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn ingestion_chunks_and_embeds() {
    let backend = RecordingEmbedder::returning(vec![0.6, 0.8]);
    let retriever = retriever(&backend, 2, None, &RetrievalConfig::default());

    let text = (0..1000)
        .map(|i| format!("kata{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    let chunks = retriever.prepare_ingestion(&text).await;

    assert_eq!(chunks.len(), 4);
    let counts: Vec<usize> = chunks.iter().map(|c| c.word_count).collect();
    assert_eq!(counts, vec![300, 300, 300, 250]);
    assert!(chunks.iter().enumerate().all(|(i, c)| c.index == i));
    assert!(chunks.iter().all(|c| !c.embedding.is_fallback()));
    assert_eq!(backend.seen().len(), 4);
}

#[tokio::test]
async fn ingestion_of_short_text_is_empty() {
    let backend = RecordingEmbedder::returning(vec![1.0, 0.0]);
    let retriever = retriever(&backend, 2, None, &RetrievalConfig::default());

    assert!(retriever.prepare_ingestion("").await.is_empty());
    assert!(
        retriever
            .prepare_ingestion("terlalu pendek untuk disimpan")
            .await
            .is_empty()
    );
    assert!(backend.seen().is_empty());
}
