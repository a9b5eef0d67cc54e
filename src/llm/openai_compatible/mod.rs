
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{ChatMessage, CompletionBackend, CompletionRequest, LlmError};
use crate::config::{ConfigError, LlmProviderConfig};

/// Client for any `/chat/completions` endpoint speaking the OpenAI wire format
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    name: String,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    #[inline]
    pub fn new(config: &LlmProviderConfig, api_key: Option<String>) -> Result<Self, ConfigError> {
        let base_url = config.base_url()?;
        let raw = format!(
            "{}/chat/completions",
            base_url.as_str().trim_end_matches('/')
        );
        let endpoint = Url::parse(&raw).map_err(|_| ConfigError::InvalidUrl(raw))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            name: config.name.clone(),
            endpoint,
            model: config.model.clone(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            agent,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        debug!(
            "Requesting completion from {} ({}) with {} messages",
            self.name,
            self.model,
            request.messages.len()
        );

        let body = serde_json::to_string(&ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        })
        .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();

        let response_text = tokio::task::spawn_blocking(move || {
            let mut request = agent
                .post(endpoint.as_str())
                .header("Content-Type", "application/json");
            if let Some(key) = api_key {
                request = request.header("Authorization", format!("Bearer {}", key));
            }
            request
                .send(&body)
                .and_then(|mut resp| resp.body_mut().read_to_string())
                .map_err(LlmError::from)
        })
        .await
        .map_err(|e| LlmError::Task(e.to_string()))??;

        decode_completion(&response_text)
    }
}

/// Extract the trimmed text of the first choice
pub(crate) fn decode_completion(body: &str) -> Result<String, LlmError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("no choices in response".to_string()))?
        .message
        .content
        .unwrap_or_default();

    let content = content.trim();
    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(content.to_string())
}
