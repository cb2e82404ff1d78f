//! OpenRouter-compatible HTTP backend
//!
//! Implements [`GenerativeBackend`] against a chat-completions API with:
//! - Streaming accumulation of partial output
//! - Cooperative cancellation at every await point
//! - Error responses surfaced distinctly from successful-but-empty output
//!
//! Retry is deliberately not handled here; the step executor owns the
//! retry-with-escalation policy and treats this client as a single attempt.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as HttpClient;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::GenerativeBackend;
use super::streaming::{StreamEvent, event_stream};
use super::types::{ChatRequest, Message, QueryRequest, QueryResponse};

/// Default API base URL (OpenRouter)
const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// HTTP generative backend
///
/// Thread-safe client for running step prompts against a chat-completions
/// endpoint. One instance is shared across a whole run.
#[derive(Clone)]
pub struct HttpBackend {
    http_client: HttpClient,
    config: LlmConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Builder for creating an HttpBackend
pub struct HttpBackendBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl Default for HttpBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpBackendBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            api_key: None,
            base_url: None,
            timeout_secs: None,
        }
    }

    /// Set the LLM configuration
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (defaults to OpenRouter)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Build the HttpBackend
    pub fn build(self) -> Result<HttpBackend> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .ok_or_else(|| Error::ConfigError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);

        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        Ok(HttpBackend {
            http_client,
            config,
            api_key,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

impl HttpBackend {
    /// Create a new HttpBackend with the given configuration and API key
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        HttpBackendBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    /// Create a new builder for HttpBackend
    pub fn builder() -> HttpBackendBuilder {
        HttpBackendBuilder::new()
    }

    /// Build chat messages for one step prompt
    fn build_messages(&self, request: &QueryRequest) -> Vec<Message> {
        vec![
            Message::system(format!(
                "You are a website build agent. Work inside the workspace at {} \
                 and report every file you create as `created <path>`.",
                request.workspace.display()
            )),
            Message::user(request.prompt.clone()),
        ]
    }

    /// Stream the response body, accumulating content until done or cancelled
    async fn accumulate_stream(
        &self,
        response: reqwest::Response,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        let mut events = std::pin::pin!(event_stream(response.bytes_stream()));
        let mut text = String::new();
        let mut tokens_used = 0u32;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                event = events.next() => event,
            };

            match event {
                Some(Ok(StreamEvent::Chunk(chunk))) => {
                    if let Some(content) = chunk.content() {
                        text.push_str(content);
                    }
                    if let Some(usage) = chunk.usage {
                        tokens_used = usage.total();
                    }
                }
                Some(Ok(StreamEvent::Done)) | None => break,
                Some(Ok(StreamEvent::Error(msg))) => {
                    debug!(error = %msg, "Skipping malformed stream chunk");
                }
                Some(Err(e)) => return Err(e),
            }
        }

        Ok(QueryResponse { text, tokens_used })
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => Err(Error::BackendError(
                "Unauthorized: Invalid API key. Set SITEWRIGHT_API_KEY or OPENROUTER_API_KEY \
                 environment variable."
                    .to_string(),
            )),
            429 => {
                let wait_secs = extract_retry_after(&body).unwrap_or(60);
                Err(Error::RateLimited(wait_secs))
            }
            400 => Err(Error::BackendError(format!("Bad request: {}", body))),
            402 => Err(Error::BackendError(
                "Payment required: Insufficient credits on the provider account".to_string(),
            )),
            404 => Err(Error::BackendError(format!(
                "Model not found or endpoint unavailable: {}",
                body
            ))),
            500..=599 => Err(Error::BackendError(format!(
                "Server error ({}): {}",
                status, body
            ))),
            _ => Err(Error::BackendError(format!(
                "HTTP error {}: {}",
                status, body
            ))),
        }
    }
}

#[async_trait]
impl GenerativeBackend for HttpBackend {
    async fn run_query(
        &self,
        request: QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryResponse> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let url = format!("{}/chat/completions", self.base_url);
        let chat_request = ChatRequest::new(&request.model, self.build_messages(&request))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_streaming(true);

        debug!(
            model = %request.model,
            workspace = %request.workspace.display(),
            "Sending streaming completion request"
        );

        let send = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Sitewright")
            .json(&chat_request)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = send => response.map_err(Error::NetworkError)?,
        };

        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        self.accumulate_stream(response, cancel).await
    }
}

/// Extract retry-after value from error response
fn extract_retry_after(body: &str) -> Option<u64> {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(retry_after) = json.get("retry_after").and_then(|v| v.as_u64()) {
            return Some(retry_after);
        }
        if let Some(error) = json.get("error")
            && let Some(retry_after) = error.get("retry_after").and_then(|v| v.as_u64())
        {
            return Some(retry_after);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config() -> LlmConfig {
        LlmConfig::default()
    }

    #[test]
    fn test_backend_builder() {
        let backend = HttpBackend::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://example.com")
            .timeout_secs(60)
            .build()
            .unwrap();

        assert_eq!(backend.base_url, "https://example.com");
    }

    #[test]
    fn test_backend_builder_requires_api_key() {
        let result = HttpBackend::builder().config(test_config()).build();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_backend_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpBackend>();
    }

    #[test]
    fn test_build_messages_mentions_workspace() {
        let backend = HttpBackend::new(test_config(), "test-key").unwrap();
        let request = QueryRequest::new("Build the hero", "test/model", PathBuf::from("/tmp/site"));

        let messages = backend.build_messages(&request);
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("/tmp/site"));
        assert_eq!(messages[1].content, "Build the hero");
    }

    #[test]
    fn test_extract_retry_after() {
        assert_eq!(extract_retry_after(r#"{"retry_after": 30}"#), Some(30));
        assert_eq!(
            extract_retry_after(r#"{"error": {"retry_after": 60}}"#),
            Some(60)
        );
        assert_eq!(extract_retry_after(r#"{"message": "rate limited"}"#), None);
    }

    #[tokio::test]
    async fn test_run_query_rejects_when_already_cancelled() {
        let backend = HttpBackend::new(test_config(), "test-key").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = QueryRequest::new("prompt", "test/model", PathBuf::from("."));
        let result = backend.run_query(request, &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
