//! Completion client capability and the Anthropic Messages implementation.
//!
//! The engine only ever talks to the trait; swapping providers (or mocking
//! in tests) is a drop-in substitution.

use std::time::Duration;

use async_trait::async_trait;
use blastshield_core::LlmError;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl CompletionResponse {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Capability boundary to the LLM provider.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// Anthropic Messages API client with bounded retries.
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    max_retries: u32,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, LlmError> {
        if api_key.is_empty() {
            return Err(LlmError::MissingCredentials);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: ANTHROPIC_API_BASE.to_string(),
            model,
            timeout,
            max_retries,
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("x-api-key", value);
        }
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system,
            "messages": [{"role": "user", "content": request.prompt}],
        });

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(format!("{}/messages", self.base_url))
                .headers(self.build_headers())
                .json(&body)
                .send(),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidJson(e.to_string()))?;

        let text = parsed
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            text,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }

    /// Whether a failure is worth retrying: transport faults, timeouts,
    /// rate limits, and server errors. Client errors are final.
    fn retryable(error: &LlmError) -> bool {
        match error {
            LlmError::Transport(_) | LlmError::Timeout { .. } => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut attempt = 0u32;
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.max_retries && Self::retryable(&error) => {
                    // Exponential backoff: 1s → 2s → 4s.
                    let delay = Duration::from_secs(1 << attempt.min(2));
                    tracing::warn!(attempt, error = %error, "LLM call failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_api_key_is_rejected() {
        let result = AnthropicClient::new(
            String::new(),
            "claude-sonnet-4-20250514".into(),
            Duration::from_secs(5),
            2,
        );
        assert!(matches!(result, Err(LlmError::MissingCredentials)));
    }

    #[test]
    fn server_errors_are_retryable_but_client_errors_are_not() {
        assert!(AnthropicClient::retryable(&LlmError::Api {
            status: 529,
            message: String::new()
        }));
        assert!(AnthropicClient::retryable(&LlmError::Api {
            status: 429,
            message: String::new()
        }));
        assert!(!AnthropicClient::retryable(&LlmError::Api {
            status: 400,
            message: String::new()
        }));
        assert!(AnthropicClient::retryable(&LlmError::Timeout { seconds: 30 }));
    }
}
