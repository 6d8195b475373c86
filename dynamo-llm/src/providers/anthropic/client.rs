//! Anthropic Messages API client: rate-limited request/response plus SSE streaming.
//!
//! Generalizes `caliber-llm/src/providers/anthropic/client.rs`'s `AnthropicClient` -
//! same semaphore-bounded permit pool and minimum-inter-request-interval throttle,
//! same typed-error mapping by status code, now also exposing a streaming entry
//! point and a configurable base URL/model-version header.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::Stream;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Semaphore;

use super::types::{ApiError, MessageRequest, MessageResponse, StreamEvent};
use crate::error::LlmError;
use crate::streaming::parse_sse_events;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
    epoch: Instant,
    last_request_ms: Arc<AtomicU64>,
    min_request_interval_ms: u64,
}

impl AnthropicClient {
    /// `requests_per_minute` bounds both the permit pool size and the minimum
    /// spacing between requests - belt and suspenders against bursts.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, requests_per_minute: u32) -> Self {
        let permits = (requests_per_minute as usize).max(1);
        let min_interval_ms = (60_000 / requests_per_minute.max(1) as u64).max(10);

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            rate_limiter: Arc::new(Semaphore::new(permits)),
            epoch: Instant::now(),
            last_request_ms: Arc::new(AtomicU64::new(0)),
            min_request_interval_ms: min_interval_ms,
        }
    }

    async fn throttle(&self) -> Result<tokio::sync::SemaphorePermit<'_>, LlmError> {
        let permit = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| LlmError::ProviderError { message: format!("rate limiter error: {e}") })?;

        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let last_ms = self.last_request_ms.load(Ordering::Relaxed);
        let elapsed = now_ms.saturating_sub(last_ms);
        if elapsed < self.min_request_interval_ms {
            tokio::time::sleep(Duration::from_millis(self.min_request_interval_ms - elapsed)).await;
        }
        self.last_request_ms.store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);

        Ok(permit)
    }

    fn map_error_status(status: StatusCode, error_text: &str) -> LlmError {
        let message = serde_json::from_str::<ApiError>(error_text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| error_text.to_string());

        match status {
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => LlmError::Overloaded,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey,
            _ => LlmError::ProviderError { message },
        }
    }

    /// Non-streaming call.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Req,
    ) -> Result<Res, LlmError> {
        let _permit = self.throttle().await?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError { message: format!("HTTP request failed: {e}") })?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| LlmError::ProviderError { message: format!("failed to parse response: {e}") })
        } else {
            let text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            Err(Self::map_error_status(status, &text))
        }
    }

    pub async fn send_message(&self, request: MessageRequest) -> Result<MessageResponse, LlmError> {
        self.request("messages", request).await
    }

    /// Streaming call - the request body must already carry `stream: Some(true)`.
    /// Returns a stream of parsed SSE events; the permit is dropped once the
    /// initial HTTP response headers have arrived (long-lived streams do not hold
    /// the rate-limit slot for their full duration).
    pub async fn stream_message(
        &self,
        request: MessageRequest,
    ) -> Result<impl Stream<Item = Result<StreamEvent, LlmError>>, LlmError> {
        let _permit = self.throttle().await?;

        let url = format!("{}/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::ProviderError { message: format!("HTTP request failed: {e}") })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            return Err(Self::map_error_status(status, &text));
        }

        Ok(parse_sse_events(response))
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
