//! Anthropic Messages API client.
//!
//! Only server-side (5xx) failures are retried, with exponential backoff
//! starting at one second. Auth failures, rate limits, and malformed
//! requests propagate immediately.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

/// Model used for all classification calls.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Default response budget.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Total attempts for transient failures (1 initial + 2 retries).
const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server-side failure (5xx). Retried with backoff before surfacing.
    #[error("server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Client-side rejection (auth, rate limit, bad request). Never retried.
    #[error("request rejected with {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed API response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether the failure class qualifies for a backoff retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Server { .. })
    }
}

/// Seam between the stages and the network. Stages are generic over this so
/// tests drive them with scripted replies.
#[allow(async_fn_in_trait)]
pub trait Completion {
    /// Send one prompt and return the model's reply text.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ApiError>;
}

/// Run `op`, retrying transient failures with exponential backoff
/// (`base`, `2*base`, ...) up to `max_attempts` total attempts.
pub async fn with_retry<T, F, Fut>(
    max_attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Err(err) if err.is_transient() && attempt + 1 < max_attempts => {
                let wait = base * 2u32.pow(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    wait_secs = wait.as_secs_f64(),
                    error = %err,
                    "transient API failure, retrying"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Client for the Anthropic Messages API.
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    backoff_base: Duration,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn send_once(&self, prompt: &str, max_tokens: u32) -> Result<String, ApiError> {
        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let resp = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ApiError::Server {
                    status: status.as_u16(),
                    body,
                });
            }
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = resp.json().await?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ApiError::Malformed("empty content block".to_string()))?;
        debug!(chars = text.len(), "received reply");
        Ok(text)
    }
}

impl Completion for LlmClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ApiError> {
        with_retry(MAX_ATTEMPTS, self.backoff_base, || {
            self.send_once(prompt, max_tokens)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn server_error() -> ApiError {
        ApiError::Server {
            status: 500,
            body: "overloaded".to_string(),
        }
    }

    fn rejected() -> ApiError {
        ApiError::Rejected {
            status: 401,
            body: "invalid api key".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_then_succeeds() {
        let calls = RefCell::new(0u32);
        let result = with_retry(3, Duration::from_secs(1), || {
            let n = {
                let mut calls = calls.borrow_mut();
                *calls += 1;
                *calls
            };
            async move {
                if n <= 2 {
                    Err(server_error())
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        // Two transient failures mean exactly two backoff waits.
        assert_eq!(*calls.borrow(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_retries_and_propagates() {
        let calls = RefCell::new(0u32);
        let result: Result<String, _> = with_retry(3, Duration::from_secs(1), || {
            *calls.borrow_mut() += 1;
            async { Err(server_error()) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Server { status: 500, .. })));
        assert_eq!(*calls.borrow(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_fail_on_first_attempt() {
        let calls = RefCell::new(0u32);
        let result: Result<String, _> = with_retry(3, Duration::from_secs(1), || {
            *calls.borrow_mut() += 1;
            async { Err(rejected()) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Rejected { status: 401, .. })));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn only_server_errors_are_transient() {
        assert!(server_error().is_transient());
        assert!(!rejected().is_transient());
        assert!(!ApiError::Malformed("x".into()).is_transient());
    }
}
