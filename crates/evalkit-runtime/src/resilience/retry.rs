//! Bounded retry with exponential backoff for endpoint calls.
//!
//! A call makes at most `max_retries` attempts. After failed attempt `k`
//! (1-based) the client sleeps `backoff_base * 2^(k-1)`; no sleep follows
//! the last attempt. Network failures and unusable replies are both retried.
//! Missing credentials fail before anything is sent.

use backon::{BackoffBuilder, ExponentialBuilder};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::providers::{CompletionRequest, EndpointConfig, EndpointError, EndpointErrorKind};
use crate::transport::{HttpRequest, Transport};

/// Delay after the first failed attempt.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// How much of an error body makes it into the failure detail.
const BODY_PREVIEW_CHARS: usize = 200;

struct AttemptFailure {
    kind: EndpointErrorKind,
    detail: String,
}

impl AttemptFailure {
    fn network(detail: impl Into<String>) -> Self {
        Self {
            kind: EndpointErrorKind::Network,
            detail: detail.into(),
        }
    }

    fn invalid(detail: impl Into<String>) -> Self {
        Self {
            kind: EndpointErrorKind::InvalidResponse,
            detail: detail.into(),
        }
    }
}

enum RetryState<T> {
    Attempt(u32),
    BackingOff { next: u32, delay: Duration },
    Succeeded { value: T, attempts: u32 },
    Exhausted { attempts: u32, failure: AttemptFailure },
}

/// Sends requests to an endpoint, retrying transient failures.
#[derive(Clone)]
pub struct RetryingEndpointClient {
    transport: Arc<dyn Transport>,
    backoff_base: Duration,
}

impl RetryingEndpointClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    /// Sleeps between attempts for a budget of `max_retries` attempts.
    pub fn backoff_schedule(&self, max_retries: u32) -> impl Iterator<Item = Duration> {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff_base)
            .with_factor(2.0)
            .without_max_delay()
            .with_max_times(max_retries.saturating_sub(1) as usize)
            .build()
    }

    /// Send a prompt and return the extracted reply text.
    pub async fn send(
        &self,
        endpoint: &EndpointConfig,
        request: &CompletionRequest,
    ) -> Result<String, EndpointError> {
        self.send_with(endpoint, request, |text| Ok(text.to_string()))
            .await
    }

    /// Send a prompt and convert the reply with `accept`.
    ///
    /// A rejected reply counts as [`EndpointErrorKind::InvalidResponse`] and
    /// is retried like any other failed attempt.
    pub async fn send_with<T, F>(
        &self,
        endpoint: &EndpointConfig,
        request: &CompletionRequest,
        accept: F,
    ) -> Result<T, EndpointError>
    where
        F: Fn(&str) -> Result<T, String> + Send + Sync,
        T: Send,
    {
        if let Err(detail) = endpoint.check_credentials() {
            tracing::error!(
                endpoint = %endpoint.provider,
                model = %endpoint.model,
                detail = %detail,
                "Endpoint not configured, skipping request"
            );
            return Err(EndpointError::auth_missing(detail));
        }

        let http = endpoint.build_request(request);
        let max_attempts = endpoint.max_retries.max(1);
        let mut delays = self.backoff_schedule(max_attempts);
        let mut state = RetryState::Attempt(1);

        loop {
            state = match state {
                RetryState::Attempt(attempt) => {
                    match self.attempt(endpoint, &http, &accept).await {
                        Ok(value) => RetryState::Succeeded {
                            value,
                            attempts: attempt,
                        },
                        Err(failure) => {
                            tracing::warn!(
                                endpoint = %endpoint.provider,
                                model = %endpoint.model,
                                attempt,
                                max_attempts,
                                outcome = %failure.kind,
                                detail = %failure.detail,
                                "Endpoint attempt failed"
                            );
                            match delays.next() {
                                Some(delay) => RetryState::BackingOff {
                                    next: attempt + 1,
                                    delay,
                                },
                                None => RetryState::Exhausted {
                                    attempts: attempt,
                                    failure,
                                },
                            }
                        }
                    }
                }
                RetryState::BackingOff { next, delay } => {
                    tracing::debug!(next_attempt = next, delay = ?delay, "Backing off");
                    tokio::time::sleep(delay).await;
                    RetryState::Attempt(next)
                }
                RetryState::Succeeded { value, attempts } => {
                    tracing::info!(
                        endpoint = %endpoint.provider,
                        model = %endpoint.model,
                        attempt = attempts,
                        max_attempts,
                        outcome = "success",
                        "Endpoint call succeeded"
                    );
                    return Ok(value);
                }
                RetryState::Exhausted { attempts, failure } => {
                    tracing::error!(
                        endpoint = %endpoint.provider,
                        model = %endpoint.model,
                        attempts,
                        outcome = %failure.kind,
                        "Retries exhausted"
                    );
                    return Err(EndpointError::new(failure.kind, failure.detail, attempts));
                }
            };
        }
    }

    async fn attempt<T, F>(
        &self,
        endpoint: &EndpointConfig,
        http: &HttpRequest,
        accept: &F,
    ) -> Result<T, AttemptFailure>
    where
        F: Fn(&str) -> Result<T, String>,
    {
        let response = self
            .transport
            .post_json(http)
            .await
            .map_err(|e| AttemptFailure::network(e.to_string()))?;

        if !response.is_success() {
            let preview: String = response.body.chars().take(BODY_PREVIEW_CHARS).collect();
            return Err(AttemptFailure::network(format!(
                "HTTP {}: {}",
                response.status, preview
            )));
        }

        let body: JsonValue = serde_json::from_str(&response.body)
            .map_err(|e| AttemptFailure::invalid(format!("malformed JSON body: {}", e)))?;
        let text = endpoint
            .response_shape()
            .extract_text(&body)
            .map_err(AttemptFailure::invalid)?;

        accept(&text).map_err(AttemptFailure::invalid)
    }
}

impl fmt::Debug for RetryingEndpointClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingEndpointClient")
            .field("backoff_base", &self.backoff_base)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ApiCredential, CredentialSource, ProviderKind};
    use crate::testing::{
        connect_error, ollama_reply, status, timeout, CapturedLogs, ScriptedTransport,
    };
    use crate::transport::HttpResponse;
    use tokio::time::Instant;

    const URL: &str = "http://candidate.test/api/generate";

    fn endpoint(max_retries: u32) -> EndpointConfig {
        EndpointConfig::new(ProviderKind::Ollama, URL, "qwen3:0.6b").with_max_retries(max_retries)
    }

    fn client(transport: &Arc<ScriptedTransport>) -> RetryingEndpointClient {
        RetryingEndpointClient::new(transport.clone())
    }

    #[test]
    fn test_backoff_schedule_doubles() {
        let transport = Arc::new(ScriptedTransport::new());
        let delays: Vec<_> = client(&transport).backoff_schedule(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(client(&transport).backoff_schedule(1).count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_success() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![ollama_reply("hi")]));
        let started = Instant::now();

        let text = client(&transport)
            .send(&endpoint(3), &CompletionRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(text, "hi");
        assert_eq!(transport.calls_to(URL), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_backoff() {
        let transport = Arc::new(ScriptedTransport::new().route(
            URL,
            vec![connect_error(), connect_error(), ollama_reply("recovered")],
        ));
        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let started = Instant::now();

        let text = client(&transport)
            .send(&endpoint(3), &CompletionRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(text, "recovered");
        assert_eq!(transport.calls_to(URL), 3);
        assert_eq!(logs.count("Endpoint attempt failed"), 2);
        assert_eq!(logs.count("Endpoint call succeeded"), 1);
        // 1s after the first failure, 2s after the second
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(3) + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried() {
        let transport =
            Arc::new(ScriptedTransport::new().route(URL, vec![timeout(), ollama_reply("ok")]));
        let started = Instant::now();

        let text = client(&transport)
            .send(&endpoint(3), &CompletionRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(text, "ok");
        assert_eq!(transport.calls_to(URL), 2);
        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_BACKOFF_BASE, "elapsed {:?}", elapsed);
        assert!(elapsed < DEFAULT_BACKOFF_BASE + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reports_last_failure() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![status(503)]));
        let started = Instant::now();

        let err = client(&transport)
            .send(&endpoint(3), &CompletionRequest::new("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, EndpointErrorKind::Network);
        assert_eq!(err.attempts, 3);
        assert!(err.detail.starts_with("HTTP 503"));
        assert!(err.is_exhausted());
        assert_eq!(transport.calls_to(URL), 3);
        // No sleep after the final attempt
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_is_retried_as_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new().route(
            URL,
            vec![
                Ok(HttpResponse::new(200, "<html>oops</html>")),
                Ok(HttpResponse::new(200, r#"{"done": true}"#)),
            ],
        ));

        let err = client(&transport)
            .send(&endpoint(2), &CompletionRequest::new("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, EndpointErrorKind::InvalidResponse);
        assert!(err.detail.contains("response"));
        assert_eq!(transport.calls_to(URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_reply_is_retried() {
        let transport = Arc::new(
            ScriptedTransport::new().route(URL, vec![ollama_reply("n/a"), ollama_reply("0.5")]),
        );

        let score = client(&transport)
            .send_with(&endpoint(3), &CompletionRequest::new("score"), |text| {
                text.parse::<f64>().map_err(|e| e.to_string())
            })
            .await
            .unwrap();

        assert_eq!(score, 0.5);
        assert_eq!(transport.calls_to(URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_budget() {
        let transport = Arc::new(ScriptedTransport::new().route(URL, vec![connect_error()]));
        let started = Instant::now();

        let err = client(&transport)
            .send(&endpoint(1), &CompletionRequest::new("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(transport.calls_to(URL), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_auth_missing_sends_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let endpoint = EndpointConfig::new(ProviderKind::Azure, "https://judge.test", "gpt-4o");

        let err = client(&transport)
            .send(&endpoint, &CompletionRequest::new("hello"))
            .await
            .unwrap_err();

        assert_eq!(err.kind, EndpointErrorKind::AuthMissing);
        assert_eq!(err.attempts, 0);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_auth_header_reaches_transport() {
        let transport = Arc::new(ScriptedTransport::new().route(
            "judge.test",
            vec![crate::testing::chat_reply("0.7")],
        ));
        let endpoint = EndpointConfig::new(ProviderKind::Azure, "https://judge.test", "gpt-4o")
            .with_api_key(ApiCredential::new(
                "sk-1",
                CredentialSource::Programmatic,
                "judge API key",
            ));

        let text = client(&transport)
            .send(&endpoint, &CompletionRequest::new("hello"))
            .await
            .unwrap();

        assert_eq!(text, "0.7");
        assert_eq!(transport.requests()[0].header("api-key"), Some("sk-1"));
    }
}
