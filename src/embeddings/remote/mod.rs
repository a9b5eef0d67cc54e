
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{ConfigError, EmbeddingConfig};

/// Failure talking to the semantic embedding service
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Embedding service returned HTTP {0}")]
    Status(u16),
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
    #[error("Expected {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Mismatch between request and response counts: {expected} vs {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("Embedding task failed: {0}")]
    Task(String),
}

impl From<ureq::Error> for EmbeddingError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status) => Self::Status(status),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// A semantic embedding service
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed one cleaned text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several cleaned texts; the result has one vector per input, in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Client for a HuggingFace-style feature-extraction endpoint
#[derive(Debug, Clone)]
pub struct HttpEmbeddingClient {
    endpoint: Url,
    api_key: Option<String>,
    dimension: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct RequestOptions {
    wait_for_model: bool,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
    options: RequestOptions,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    inputs: &'a [String],
    options: RequestOptions,
}

/// Accepted response shapes: a bare vector or a list of vectors
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureExtractionResponse {
    Nested(Vec<Vec<f32>>),
    Flat(Vec<f32>),
}

impl HttpEmbeddingClient {
    /// Build a client from configuration; `api_key` is sent as a bearer token when present
    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: Option<String>) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            dimension: config.dimension,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, body: String) -> Result<String, EmbeddingError> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        tokio::task::spawn_blocking(move || {
            let mut request = agent
                .post(endpoint.as_str())
                .header("Content-Type", "application/json");
            if let Some(key) = api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }
            request
                .send(&body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
                .map_err(EmbeddingError::from)
        })
        .await
        .map_err(|e| EmbeddingError::Task(e.to_string()))?
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!("Requesting embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            inputs: text,
            options: RequestOptions {
                wait_for_model: true,
            },
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let response_text = self.post(body).await?;
        decode_single(&response_text, self.dimension)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Requesting embeddings for {} texts", texts.len());

        let request = BatchEmbedRequest {
            inputs: texts,
            options: RequestOptions {
                wait_for_model: true,
            },
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let response_text = self.post(body).await?;
        decode_batch(&response_text, texts.len(), self.dimension)
    }
}

/// Decode the response to a single-text request
pub(crate) fn decode_single(body: &str, dimension: usize) -> Result<Vec<f32>, EmbeddingError> {
    let vector = match parse_response(body)? {
        FeatureExtractionResponse::Flat(vector) => vector,
        FeatureExtractionResponse::Nested(vectors) => vectors
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::MalformedResponse("empty vector list".to_string()))?,
    };

    validate_vector(vector, dimension)
}

/// Decode the response to a batch request of `expected` texts
pub(crate) fn decode_batch(
    body: &str,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let vectors = match parse_response(body)? {
        FeatureExtractionResponse::Nested(vectors) => vectors,
        FeatureExtractionResponse::Flat(vector) if expected == 1 => vec![vector],
        FeatureExtractionResponse::Flat(_) => {
            return Err(EmbeddingError::MalformedResponse(
                "expected one vector per input".to_string(),
            ));
        }
    };

    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }

    vectors
        .into_iter()
        .map(|vector| validate_vector(vector, dimension))
        .collect()
}

fn parse_response(body: &str) -> Result<FeatureExtractionResponse, EmbeddingError> {
    serde_json::from_str(body).map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))
}

fn validate_vector(vector: Vec<f32>, dimension: usize) -> Result<Vec<f32>, EmbeddingError> {
    if vector.len() != dimension {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }

    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::MalformedResponse(
            "vector contains non-finite values".to_string(),
        ));
    }

    Ok(vector)
}
