//! CLI entry point for restpoll.

mod cli;

use std::io::Write;

use clap::Parser;
use restpoll::config::load_config_with_diagnostics;
use restpoll::error::PollError;
use restpoll::poller::{spawn_poller, PollExit, Poller};
use restpoll::types::RecordBatch;
use tracing_subscriber::EnvFilter;

/// Batches buffered between the poll task and stdout.
const BATCH_CHANNEL_CAPACITY: usize = 16;

const EXIT_OK: i32 = 0;
const EXIT_CONFIG: i32 = 1;
const EXIT_POLL_FAILED: i32 = 2;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();
    init_tracing();
    std::process::exit(run(args).await);
}

async fn run(args: cli::Args) -> i32 {
    let loaded = match load_config_with_diagnostics(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    for warning in &loaded.diagnostics.warnings {
        tracing::warn!("{warning}");
    }

    let mut config = loaded.config;
    args.apply_to(&mut config);

    let endpoint = match config.endpoint_config() {
        Ok(endpoint) => endpoint,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };
    let policy = match config.retry_policy() {
        Ok(policy) => policy,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_CONFIG;
        }
    };

    tracing::debug!(
        sleep_ms = u64::try_from(policy.sleep_time().as_millis()).unwrap_or(u64::MAX),
        max_retries = policy.max_retries(),
        max_errors = policy.max_errors(),
        "configuration resolved"
    );

    let (handle, mut batches) =
        spawn_poller(Poller::new(endpoint, policy), BATCH_CHANNEL_CAPACITY);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut stdout = std::io::stdout().lock();

    loop {
        tokio::select! {
            signal = &mut ctrl_c, if !interrupted => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c; stopping");
                }
                tracing::info!("interrupt received; stopping poller");
                interrupted = true;
                handle.cancel();
            }
            batch = batches.recv() => {
                let Some(batch) = batch else { break };
                if let Err(e) = write_batch(&mut stdout, &batch) {
                    tracing::warn!(error = %e, "stdout closed; stopping poller");
                    handle.cancel();
                    break;
                }
            }
        }
    }
    drop(batches);

    match handle.join().await {
        Ok(PollExit::Cancelled) | Ok(PollExit::SinkClosed) => EXIT_OK,
        Err(e @ PollError::MaxErrorsExceeded { .. }) => {
            tracing::error!("giving up: {e}");
            EXIT_POLL_FAILED
        }
        Err(e) => {
            tracing::error!("{e}");
            EXIT_POLL_FAILED
        }
    }
}

/// Write each record as one JSON line.
fn write_batch(out: &mut impl Write, batch: &RecordBatch) -> std::io::Result<()> {
    for record in batch {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Logs go to stderr; `RESTPOLL_LOG` wins over `RUST_LOG`, default `info`.
fn init_tracing() {
    let directives = ["RESTPOLL_LOG", "RUST_LOG"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty());
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(&directives).unwrap_or_else(|e| {
            eprintln!("warning: ignoring invalid log filter `{directives}`: {e}");
            EnvFilter::new("info")
        }),
        None => EnvFilter::new("info"),
    };

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if let Err(err) = init_result {
        eprintln!("warning: tracing already initialized: {err}");
    }
}
