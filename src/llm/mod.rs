// Chat-completion module
// Message types and the backend trait shared by query expansion and answering

pub mod openai_compatible;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use openai_compatible::OpenAiCompatibleClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    #[inline]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
        }
    }

    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Failure talking to a chat-completion provider
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("Provider rejected credentials (HTTP {0})")]
    Unauthorized(u16),
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("Provider returned an empty completion")]
    EmptyResponse,
    #[error("Completion task failed: {0}")]
    Task(String),
}

impl LlmError {
    /// Whether another provider should be tried
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

impl From<ureq::Error> for LlmError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(429) => Self::RateLimited,
            ureq::Error::StatusCode(status @ (401 | 403)) => Self::Unauthorized(status),
            ureq::Error::StatusCode(status) => Self::Status(status),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// A chat-completion provider
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Generate the assistant reply for `request`
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
