//! # Poll Loop
//!
//! Drives the pipeline on a fixed interval until shutdown.
//!
//! Cycles never overlap: each cycle is awaited inside the loop and ticks
//! missed while a cycle is in flight are skipped, not queued. A failed cycle
//! is logged and the loop waits for the next tick. Cancellation is observed
//! both between ticks and while a cycle is in flight; an in-flight cycle is
//! dropped, which aborts its HTTP request.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, field, info, info_span, Instrument};

use crate::pipeline::Pipeline;

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    pub aircraft_forwarded: u64,
}

/// Periodic fetch → push driver
#[derive(Debug)]
pub struct Bridge {
    pipeline: Pipeline,
    interval: Duration,
}

impl Bridge {
    pub fn new(pipeline: Pipeline, interval: Duration) -> Self {
        Self { pipeline, interval }
    }

    /// Run cycles every `interval` until `shutdown` is cancelled
    ///
    /// The first cycle starts one interval after the call.
    ///
    /// # Returns
    ///
    /// * `LoopStats` - Cycle counters at the time of shutdown
    pub async fn run(&self, shutdown: CancellationToken) -> LoopStats {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut stats = LoopStats::default();

        info!(
            interval_ms = self.interval.as_millis() as u64,
            source = %self.pipeline.fetcher().url(),
            destination = %self.pipeline.pusher().push_url(),
            "Starting data fetch loop"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Context cancelled");
                    break;
                }

                _ = ticker.tick() => {
                    debug!("Ticker fired - fetching data");

                    let span = info_span!(
                        "adsb2loki.fetch_cycle",
                        otel.status_code = field::Empty,
                        error = field::Empty,
                    );

                    let outcome = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => None,
                        result = self.pipeline.run_cycle().instrument(span.clone()) => Some(result),
                    };

                    match outcome {
                        None => {
                            info!("Shutdown requested during in-flight cycle, abandoning it");
                            break;
                        }
                        Some(Ok(report)) => {
                            stats.cycles_succeeded += 1;
                            stats.aircraft_forwarded += report.entries_pushed as u64;
                            debug!("Data fetch and push completed successfully");
                        }
                        Some(Err(e)) => {
                            stats.cycles_failed += 1;
                            span.record("otel.status_code", "ERROR");
                            span.record("error", field::display(&e));
                            error!(parent: &span, error = %e, "Error fetching and pushing data");
                        }
                    }
                }
            }
        }

        info!(
            cycles_succeeded = stats.cycles_succeeded,
            cycles_failed = stats.cycles_failed,
            aircraft_forwarded = stats.aircraft_forwarded,
            "Data fetch loop stopped"
        );

        stats
    }
}

/// Cancel `shutdown` on SIGINT or SIGTERM
///
/// Signal handlers are installed before this returns, so a setup failure is
/// reported to the caller instead of being lost in a background task.
///
/// # Errors
///
/// Returns error if the SIGTERM handler cannot be installed.
pub fn watch_signals(shutdown: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_interrupt(tokio::signal::ctrl_c()) => {
                    info!(signal = "SIGINT", "Received shutdown signal");
                }
                _ = terminate.recv() => {
                    info!(signal = "SIGTERM", "Received shutdown signal");
                }
                _ = shutdown.cancelled() => return,
            }
            debug!("Graceful shutdown initiated");
            shutdown.cancel();
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            tokio::select! {
                _ = wait_for_interrupt(tokio::signal::ctrl_c()) => {
                    info!(signal = "ctrl-c", "Received shutdown signal");
                }
                _ = shutdown.cancelled() => return,
            }
            shutdown.cancel();
        }))
    }
}

/// Resolve when the interrupt listener fires
///
/// If the listener cannot be installed the failure is logged and this never
/// resolves, leaving shutdown to the other signal sources.
async fn wait_for_interrupt<F>(listener: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = listener.await {
        error!(error = %e, "Failed to install interrupt handler, Ctrl+C will not stop the process");
        std::future::pending::<()>().await;
    }
}
