//! Shared test fixtures for transport and poller test modules.
//!
//! `ScriptedTransport` replays a fixed list of attempt results so retry and
//! poll-loop tests stay deterministic and socket-free.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tokio::time::Instant;

use crate::error::{TransportError, TransportErrorKind};
use crate::request::RequestSpec;
use crate::transport::{HttpResponse, HttpTransport};

/// 200 response with a JSON body.
pub fn ok_response(body: &str) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    HttpResponse {
        status: 200,
        headers,
        body: body.as_bytes().to_vec(),
    }
}

/// Response with the given status and an empty body.
pub fn status_response(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        headers: HeaderMap::new(),
        body: Vec::new(),
    }
}

/// Connection-refused style transport error.
pub fn connect_error() -> TransportError {
    TransportError::new(TransportErrorKind::Connect, "connection refused")
}

/// In-memory transport that replays scripted attempt results in order.
///
/// Once the script runs out every further attempt fails with a connect error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: VecDeque<Result<HttpResponse, TransportError>>,
    requests: Vec<RequestSpec>,
    call_times: Vec<Instant>,
    closes: u32,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<HttpResponse, TransportError>>,
    {
        Self {
            script: script.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Delay every attempt by `latency` before it resolves.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of attempts executed so far.
    pub fn calls(&self) -> usize {
        self.requests.len()
    }

    /// Requests in the order they were executed.
    pub fn requests(&self) -> &[RequestSpec] {
        &self.requests
    }

    /// Time between consecutive attempts.
    pub fn gaps(&self) -> Vec<Duration> {
        self.call_times
            .windows(2)
            .map(|pair| pair[1].duration_since(pair[0]))
            .collect()
    }

    pub fn closes(&self) -> u32 {
        self.closes
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&mut self, request: &RequestSpec) -> Result<HttpResponse, TransportError> {
        self.requests.push(request.clone());
        self.call_times.push(Instant::now());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.script.pop_front().unwrap_or_else(|| Err(connect_error()))
    }

    async fn close(&mut self) {
        self.closes += 1;
    }
}
