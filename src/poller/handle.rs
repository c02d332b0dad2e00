//! Background poller task lifecycle helpers.
//!
//! This module isolates task spawning so callers only deal with a batch
//! receiver plus a handle for cancellation and join.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::{PollExit, Poller};
use crate::error::PollError;
use crate::transport::HttpTransport;
use crate::types::RecordBatch;

/// Owner-side controls for a spawned poller.
pub struct PollerHandle {
    /// Cancellation signal observed at every poller suspension point.
    cancel_tx: watch::Sender<bool>,
    /// Final run result captured when the poll loop returns.
    join: JoinHandle<Result<PollExit, PollError>>,
}

impl PollerHandle {
    /// Ask the poller to stop. In-flight requests and sleeps are interrupted.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the poll loop to return.
    pub async fn join(self) -> Result<PollExit, PollError> {
        match self.join.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Ok(PollExit::Cancelled),
        }
    }

    /// Cancel, then wait for the poll loop to return.
    pub async fn shutdown(self) -> Result<PollExit, PollError> {
        self.cancel();
        self.join().await
    }
}

/// Spawn `poller` on its own tokio task.
///
/// Batches arrive on the returned receiver in cycle order; `capacity` bounds
/// how far the poller may run ahead of the consumer.
pub fn spawn_poller<T>(
    mut poller: Poller<T>,
    capacity: usize,
) -> (PollerHandle, mpsc::Receiver<RecordBatch>)
where
    T: HttpTransport + 'static,
{
    let (batch_tx, batch_rx) = mpsc::channel(capacity.max(1));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let join = tokio::spawn(async move {
        let mut sink = batch_tx;
        poller.run(&mut sink, cancel_rx).await
    });
    (PollerHandle { cancel_tx, join }, batch_rx)
}
