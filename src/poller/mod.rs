//! The polling loop: build, send, decode, emit, sleep, repeat.
//!
//! A [`Poller`] owns everything mutable for one endpoint (session, failure
//! counter) and runs as a single sequential flow. Cancellation is a
//! `watch::Receiver<bool>` raced against every suspension point.

mod handle;
mod sink;

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;

use crate::decode::decode;
use crate::error::{CycleFailure, PollError};
use crate::request::EndpointConfig;
use crate::transport::{HttpTransport, Outcome, ReqwestTransport, RetryPolicy, RetryingTransport};
use crate::types::RecordBatch;

pub use handle::{spawn_poller, PollerHandle};
pub use sink::{BatchSink, SinkClosed};

/// Lifecycle state of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    /// Too many consecutive failed cycles. Terminal.
    Aborted,
    /// Cancelled or the sink closed. Terminal, not an error.
    Stopped,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Cancelled,
    SinkClosed,
}

/// Resilient poller for a single endpoint.
pub struct Poller<T = ReqwestTransport> {
    endpoint: EndpointConfig,
    policy: RetryPolicy,
    transport: RetryingTransport<T>,
    consecutive_failures: u32,
    state: PollState,
}

impl Poller<ReqwestTransport> {
    pub fn new(endpoint: EndpointConfig, policy: RetryPolicy) -> Self {
        Self::with_transport(endpoint, policy, ReqwestTransport::new())
    }
}

impl<T: HttpTransport> Poller<T> {
    pub fn with_transport(endpoint: EndpointConfig, policy: RetryPolicy, transport: T) -> Self {
        let transport =
            RetryingTransport::new(transport, endpoint.accept_status_codes().clone(), policy);
        Self {
            endpoint,
            policy,
            transport,
            consecutive_failures: 0,
            state: PollState::Polling,
        }
    }

    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        self.transport.inner()
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Idle wait between cycles, `None` when pacing is disabled.
    pub fn idle_delay(&self) -> Option<Duration> {
        let delay = self.policy.sleep_time();
        (!delay.is_zero()).then_some(delay)
    }

    /// Run one cycle and update failure accounting.
    ///
    /// Returns the batch to emit, or `None` when the cycle produced no
    /// records or failed within the error budget.
    pub async fn poll_once(&mut self) -> Result<Option<RecordBatch>, PollError> {
        if self.state != PollState::Polling {
            return Err(PollError::NotPolling);
        }
        match self.cycle().await {
            Ok(batch) => {
                if self.consecutive_failures > 0 {
                    tracing::info!(
                        previous_failures = self.consecutive_failures,
                        "endpoint recovered"
                    );
                }
                self.consecutive_failures = 0;
                if batch.is_empty() {
                    tracing::debug!("cycle returned no records");
                    Ok(None)
                } else {
                    tracing::debug!(records = batch.len(), "cycle decoded batch");
                    Ok(Some(batch))
                }
            }
            Err(failure) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if self.consecutive_failures > self.policy.max_errors() {
                    tracing::error!(
                        failures = self.consecutive_failures,
                        error = %failure,
                        "max consecutive errors exceeded, aborting"
                    );
                    self.state = PollState::Aborted;
                    return Err(PollError::MaxErrorsExceeded {
                        failures: self.consecutive_failures,
                        last: failure,
                    });
                }
                tracing::warn!(
                    failures = self.consecutive_failures,
                    max_errors = self.policy.max_errors(),
                    error = %failure,
                    "poll cycle failed"
                );
                Ok(None)
            }
        }
    }

    /// Poll until cancelled, the sink closes, or the error budget runs out.
    ///
    /// The session is released on every exit path.
    pub async fn run<S>(
        &mut self,
        sink: &mut S,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<PollExit, PollError>
    where
        S: BatchSink + ?Sized,
    {
        tracing::info!(
            url = %self.endpoint.url(),
            method = %self.endpoint.method(),
            "polling started"
        );
        let result = self.drive(sink, &mut cancel).await;
        self.transport.close().await;
        match &result {
            Ok(exit) => {
                self.state = PollState::Stopped;
                tracing::info!(?exit, "polling stopped");
            }
            Err(_) => self.state = PollState::Aborted,
        }
        result
    }

    async fn drive<S>(
        &mut self,
        sink: &mut S,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<PollExit, PollError>
    where
        S: BatchSink + ?Sized,
    {
        loop {
            let step = tokio::select! {
                biased;
                _ = wait_for_cancellation(cancel) => return Ok(PollExit::Cancelled),
                step = self.poll_once() => step?,
            };

            if let Some(batch) = step {
                tokio::select! {
                    biased;
                    _ = wait_for_cancellation(cancel) => return Ok(PollExit::Cancelled),
                    sent = sink.emit(batch) => {
                        if sent.is_err() {
                            return Ok(PollExit::SinkClosed);
                        }
                    }
                }
            }

            if let Some(delay) = self.idle_delay() {
                tokio::select! {
                    biased;
                    _ = wait_for_cancellation(cancel) => return Ok(PollExit::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
        }
    }

    /// Build, send and decode once, with no accounting.
    async fn cycle(&mut self) -> Result<RecordBatch, CycleFailure> {
        let request = self.endpoint.build_request()?;
        match self.transport.send(&request).await {
            Outcome::Success(response) => Ok(decode(&response.body, self.endpoint.format())?),
            Outcome::RetryableFailure {
                status,
                attempts,
                reason,
                ..
            } => Err(CycleFailure::Exhausted {
                attempts,
                status,
                reason,
            }),
            Outcome::FatalFailure(reason) => Err(CycleFailure::Fatal(reason)),
        }
    }
}

/// Wait for cancellation signal state change (or return immediately if set).
async fn wait_for_cancellation(cancel_rx: &mut watch::Receiver<bool>) {
    if *cancel_rx.borrow() {
        return;
    }
    // A dropped sender means nobody can cancel any more.
    let sender_dropped = cancel_rx.wait_for(|cancelled| *cancelled).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await;
    }
}
