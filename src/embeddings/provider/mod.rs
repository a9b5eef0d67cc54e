
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::EmbeddingConfig;
use crate::embeddings::fallback::HashEmbedder;
use crate::embeddings::remote::{EmbeddingBackend, EmbeddingError};

/// Which backend produced a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSource {
    /// The remote semantic embedding service
    Semantic,
    /// The local hash fallback
    Hashed,
}

impl fmt::Display for EmbeddingSource {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            EmbeddingSource::Semantic => write!(f, "semantic"),
            EmbeddingSource::Hashed => write!(f, "hashed"),
        }
    }
}

/// A vector together with the backend that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub source: EmbeddingSource,
    pub vector: Vec<f32>,
}

impl Embedding {
    #[inline]
    pub fn semantic(vector: Vec<f32>) -> Self {
        Self {
            source: EmbeddingSource::Semantic,
            vector,
        }
    }

    #[inline]
    pub fn hashed(vector: Vec<f32>) -> Self {
        Self {
            source: EmbeddingSource::Hashed,
            vector,
        }
    }

    #[inline]
    pub fn is_fallback(&self) -> bool {
        self.source == EmbeddingSource::Hashed
    }

    /// Serialize for storage next to a knowledge record
    #[inline]
    pub fn to_stored(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A vector read back from storage
///
/// Records written before vectors were tagged hold a bare JSON array; those
/// have no known source.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding {
    pub source: Option<EmbeddingSource>,
    pub vector: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredShape {
    Tagged(Embedding),
    Bare(Vec<f32>),
}

impl StoredEmbedding {
    /// Parse a serialized vector, tagged or bare
    #[inline]
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str::<StoredShape>(raw)? {
            StoredShape::Tagged(embedding) => Self {
                source: Some(embedding.source),
                vector: embedding.vector,
            },
            StoredShape::Bare(vector) => Self {
                source: None,
                vector,
            },
        })
    }
}

/// Collapse whitespace runs (newlines included) to single spaces, trim, and
/// keep at most `max_chars` characters
#[inline]
pub fn clean_text(text: &str, max_chars: usize) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(max_chars)
        .collect()
}

/// Turns text into vectors, preferring the semantic backend and falling back
/// to the hash embedder whenever the backend fails
#[derive(Clone)]
pub struct EmbeddingProvider {
    backend: Arc<dyn EmbeddingBackend>,
    fallback: HashEmbedder,
    max_input_chars: usize,
    batch_size: usize,
}

impl fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("fallback", &self.fallback)
            .field("max_input_chars", &self.max_input_chars)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl EmbeddingProvider {
    #[inline]
    pub fn new(backend: Arc<dyn EmbeddingBackend>, config: &EmbeddingConfig) -> Self {
        Self {
            backend,
            fallback: HashEmbedder::new(config.dimension),
            max_input_chars: config.max_input_chars,
            batch_size: config.batch_size.max(1),
        }
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.fallback.dimension()
    }

    /// Embed one text; never fails
    #[inline]
    pub async fn embed(&self, text: &str) -> Embedding {
        let cleaned = clean_text(text, self.max_input_chars);

        match self.backend.embed(&cleaned).await {
            Ok(vector) => {
                debug!("Generated semantic embedding with {} dimensions", vector.len());
                Embedding::semantic(vector)
            }
            Err(error) => {
                warn!(
                    event = "EMBEDDING_FALLBACK",
                    %error,
                    "Embedding service failed, using hash embedding"
                );
                Embedding::hashed(self.fallback.embed(&cleaned))
            }
        }
    }

    /// Embed several texts; one result per input, in input order. Never fails.
    #[inline]
    pub async fn embed_many(&self, texts: &[String]) -> Vec<Embedding> {
        let cleaned: Vec<String> = texts
            .iter()
            .map(|text| clean_text(text, self.max_input_chars))
            .collect();

        let mut embeddings = Vec::with_capacity(cleaned.len());

        for batch in cleaned.chunks(self.batch_size) {
            let result = self
                .backend
                .embed_batch(batch)
                .await
                .and_then(|vectors| ensure_count(vectors, batch.len()));

            match result {
                Ok(vectors) => {
                    debug!("Generated {} semantic embeddings", vectors.len());
                    embeddings.extend(vectors.into_iter().map(Embedding::semantic));
                }
                Err(error) => {
                    warn!(
                        event = "EMBEDDING_FALLBACK",
                        %error,
                        batch_len = batch.len(),
                        "Batch embedding failed, using hash embeddings"
                    );
                    embeddings.extend(
                        batch
                            .iter()
                            .map(|text| Embedding::hashed(self.fallback.embed(text))),
                    );
                }
            }
        }

        embeddings
    }
}

fn ensure_count(vectors: Vec<Vec<f32>>, expected: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        })
    }
}
