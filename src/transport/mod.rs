//! Retrying HTTP transport for the poll loop.
//!
//! The transport facade stays small:
//! - session ownership and wire I/O live in `session`.
//! - backoff math and `Retry-After` parsing live in `retry`.
//! - this module classifies attempts and drives the retry loop.

mod retry;
mod session;

use std::collections::BTreeSet;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use tokio::time::sleep;

use crate::request::RequestSpec;

pub use crate::error::TransportError;
pub use retry::{
    exponential_delay, retry_after_hint, Backoff, RetryPolicy, RetryPolicyBuilder,
    DEFAULT_ERROR_SLEEP_TIME_SECS, DEFAULT_MAX_ERRORS, DEFAULT_MAX_RETRIES,
    DEFAULT_SLEEP_TIME_SECS,
};
pub use session::ReqwestTransport;

/// Status, headers and raw body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Minimal "send one request" primitive used by [`RetryingTransport`].
///
/// Tests script this trait to exercise retry behavior without sockets; the
/// production path uses [`ReqwestTransport`].
#[async_trait]
pub trait HttpTransport: Send {
    async fn execute(&mut self, request: &RequestSpec) -> Result<HttpResponse, TransportError>;

    /// Release the underlying session. Later calls to `execute` may reopen it.
    async fn close(&mut self) {}
}

/// Result of one `RetryingTransport::send`.
#[derive(Debug)]
pub enum Outcome {
    /// A response whose status is in the accepted set.
    Success(HttpResponse),
    /// Every allowed attempt failed with a retryable error.
    RetryableFailure {
        status: Option<u16>,
        retry_after: Option<Duration>,
        attempts: u32,
        reason: String,
    },
    /// The request cannot succeed as built; no further attempts were made.
    FatalFailure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Why one attempt did not produce an accepted response.
struct AttemptFailure {
    status: Option<u16>,
    retry_after: Option<Duration>,
    reason: String,
}

/// Sends requests with bounded retries and exponential backoff.
pub struct RetryingTransport<T> {
    inner: T,
    accept_status_codes: BTreeSet<u16>,
    policy: RetryPolicy,
}

impl<T: HttpTransport> RetryingTransport<T> {
    pub fn new(inner: T, accept_status_codes: BTreeSet<u16>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            accept_status_codes,
            policy,
        }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Send `request`, retrying up to `max_retries` times. Exhaustion is
    /// reported as an [`Outcome`], never raised.
    pub async fn send(&mut self, request: &RequestSpec) -> Outcome {
        let max_attempts = self.policy.max_attempts();
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            let failure = match self.inner.execute(request).await {
                Ok(response) if self.accept_status_codes.contains(&response.status) => {
                    tracing::debug!(attempt, status = response.status, "request succeeded");
                    return Outcome::Success(response);
                }
                Ok(response) => AttemptFailure {
                    status: Some(response.status),
                    retry_after: retry_after_hint(&response.headers, SystemTime::now()),
                    reason: status_reason(response.status),
                },
                Err(err) if !err.is_retryable() => {
                    tracing::error!(attempt, error = %err, "request cannot be sent");
                    return Outcome::FatalFailure(err.to_string());
                }
                Err(err) => AttemptFailure {
                    status: None,
                    retry_after: None,
                    reason: err.to_string(),
                },
            };

            if attempt >= max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    status = failure.status,
                    reason = %failure.reason,
                    "request attempts exhausted"
                );
                return Outcome::RetryableFailure {
                    status: failure.status,
                    retry_after: failure.retry_after,
                    attempts: attempt,
                    reason: failure.reason,
                };
            }

            let hint = failure
                .retry_after
                .filter(|_| self.policy.respect_retry_after());
            let delay = backoff.next_delay(hint);
            tracing::warn!(
                attempt,
                status = failure.status,
                reason = %failure.reason,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                server_hint = hint.is_some(),
                "request failed, retrying"
            );
            if !delay.is_zero() {
                sleep(delay).await;
            }
        }
    }

    /// Release the session held by the inner transport.
    pub async fn close(&mut self) {
        self.inner.close().await;
    }
}

fn status_reason(status: u16) -> String {
    let reason = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason());
    match reason {
        Some(text) => format!("unaccepted status {status} {text}"),
        None => format!("unaccepted status {status}"),
    }
}
