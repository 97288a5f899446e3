//! Generation-backend client. One OpenAI-compatible chat-completions client
//! covers every configured provider; the rest of the crate only sees the
//! `LlmClient` trait.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use sierra_core::config::{LlmConfig, LlmProvider};
use sierra_core::ServiceError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError>;
}

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OpenAiCompatClient {
    /// Builds a client from config, or `None` when the fallback is disabled.
    pub fn from_config(config: &LlmConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_base_url(config.provider).to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

fn default_base_url(provider: LlmProvider) -> &'static str {
    match provider {
        LlmProvider::OpenAi => "https://api.openai.com/v1",
        LlmProvider::Anthropic => "https://api.anthropic.com/v1",
        LlmProvider::Ollama => "http://localhost:11434/v1",
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens: 128,
            temperature: 0.0,
        };

        let mut request = self.http.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|error| ServiceError::Unavailable(format!("llm request failed: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(event_name = "llm.error_status", status = %status, "llm call failed");
            return Err(ServiceError::Unavailable(format!(
                "llm returned status {status}"
            )));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|error| ServiceError::Unavailable(format!("llm response malformed: {error}")))?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| ServiceError::Unavailable("llm returned no choices".to_string()))
    }
}

/// Runs a fallible external call with a per-attempt timeout and bounded
/// retries. Only transient failures are retried; exhaustion surfaces as
/// `ServiceUnavailable`.
pub async fn call_with_retries<T, F, Fut>(
    max_retries: u32,
    attempt_timeout: Duration,
    operation: F,
) -> Result<T, ServiceError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_error = ServiceError::Unavailable("no attempts were made".to_string());

    for attempt in 0..=max_retries {
        match tokio::time::timeout(attempt_timeout, operation()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(error)) => {
                if !error.is_retryable() {
                    return Err(error);
                }
                warn!(
                    event_name = "call.retry",
                    attempt = attempt + 1,
                    error = %error,
                    "transient failure, will retry if attempts remain"
                );
                last_error = error;
            }
            Err(_) => {
                last_error =
                    ServiceError::Unavailable(format!("call timed out after {attempt_timeout:?}"));
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use sierra_core::ServiceError;

    use super::call_with_retries;

    #[tokio::test]
    async fn retries_transient_failures_until_exhausted() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retries(2, Duration::from_secs(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Unavailable("flaky".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::Unavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_returned_without_retry() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), _> = call_with_retries(2, Duration::from_secs(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::order_not_found("W999")) }
        })
        .await;

        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let result = call_with_retries(2, Duration::from_secs(1), || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ServiceError::Unavailable("cold start".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
