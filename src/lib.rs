//! restpoll: a resilient REST polling engine.
//!
//! A [`poller::Poller`] repeatedly requests one endpoint, retries transient
//! failures with exponential backoff (honoring `Retry-After`), decodes each
//! accepted body into a [`types::RecordBatch`], and hands non-empty batches
//! to a [`poller::BatchSink`]. Too many consecutive failed cycles abort the
//! run.
//!
//! # Quick start
//!
//! ```no_run
//! use restpoll::poller::{spawn_poller, Poller};
//! use restpoll::request::EndpointConfig;
//! use restpoll::transport::RetryPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = EndpointConfig::builder("api.example.com/v1/events").build()?;
//! let policy = RetryPolicy::builder().sleep_time_secs(5.0).build()?;
//! let (handle, mut batches) = spawn_poller(Poller::new(endpoint, policy), 16);
//! while let Some(batch) = batches.recv().await {
//!     println!("{} records", batch.len());
//! }
//! handle.join().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decode;
pub mod endpoint;
pub mod error;
pub mod poller;
pub mod request;
#[cfg(test)]
pub mod testsupport;
pub mod transport;
pub mod types;
