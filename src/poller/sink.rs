//! Downstream batch consumers.

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::types::RecordBatch;

/// The consumer went away; no further batches can be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch sink closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Receives non-empty batches in cycle order.
///
/// `emit` completes before the poller builds its next request, so a slow
/// sink applies backpressure to the poll rate.
#[async_trait]
pub trait BatchSink: Send {
    async fn emit(&mut self, batch: RecordBatch) -> Result<(), SinkClosed>;
}

#[async_trait]
impl BatchSink for mpsc::Sender<RecordBatch> {
    async fn emit(&mut self, batch: RecordBatch) -> Result<(), SinkClosed> {
        self.send(batch).await.map_err(|_| SinkClosed)
    }
}

#[async_trait]
impl BatchSink for Vec<RecordBatch> {
    async fn emit(&mut self, batch: RecordBatch) -> Result<(), SinkClosed> {
        self.push(batch);
        Ok(())
    }
}
