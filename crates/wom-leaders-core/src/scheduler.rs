use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::models::LeaderSnapshot;
use crate::reconciler::{CycleReport, CycleSummary, Reconciler};
use crate::traits::{HiscoreClient, LeaderboardClient};

/// Events emitted by the scheduler for monitoring/logging.
#[derive(Debug, Clone)]
pub enum SchedulerEvent<'a> {
    Started {
        metrics: usize,
        delay: Duration,
    },
    CycleStarted {
        cycle: u64,
    },
    CycleCompleted {
        cycle: u64,
        summary: CycleSummary,
        elapsed_ms: i64,
    },
    CyclePanicked {
        cycle: u64,
        message: &'a str,
    },
    Sleeping {
        delay: Duration,
    },
    Stopped {
        cycles: u64,
    },
}

/// Trait for receiving scheduler events (decoupled logging).
pub trait SchedulerReporter: Send + Sync {
    fn report(&self, event: SchedulerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSchedulerReporter;

impl SchedulerReporter for TracingSchedulerReporter {
    fn report(&self, event: SchedulerEvent<'_>) {
        match event {
            SchedulerEvent::Started { metrics, delay } => {
                tracing::info!(%metrics, delay_secs = delay.as_secs(), "Scheduler started");
            }
            SchedulerEvent::CycleStarted { cycle } => {
                tracing::info!(%cycle, "Cycle started");
            }
            SchedulerEvent::CycleCompleted {
                cycle,
                summary,
                elapsed_ms,
            } => {
                tracing::info!(
                    %cycle,
                    issued = summary.issued,
                    no_op = summary.no_op,
                    fetch_failed = summary.fetch_failed,
                    submission_failed = summary.submission_failed,
                    %elapsed_ms,
                    "Cycle complete"
                );
            }
            SchedulerEvent::CyclePanicked { cycle, message } => {
                tracing::error!(%cycle, %message, "Cycle panicked, keeping previous snapshot");
            }
            SchedulerEvent::Sleeping { delay } => {
                tracing::info!("Sleeping for {} seconds...", delay.as_secs());
            }
            SchedulerEvent::Stopped { cycles } => {
                tracing::info!(%cycles, "Scheduler stopped");
            }
        }
    }
}

/// Cadence of the polling loop.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Constant pause between the end of one cycle and the start of the next.
    pub delay: Duration,
    /// Stop after this many cycles; `None` runs until cancelled.
    pub max_cycles: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_cycles: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }
}

/// Result of a single `Running` phase.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// The cycle panicked; the previous snapshot stays authoritative.
    Panicked(String),
}

/// Drives the [`Reconciler`] forever at a fixed cadence.
pub struct Scheduler<H, L>
where
    H: HiscoreClient,
    L: LeaderboardClient,
{
    reconciler: Arc<Reconciler<H, L>>,
    config: SchedulerConfig,
}

impl<H, L> Scheduler<H, L>
where
    H: HiscoreClient + 'static,
    L: LeaderboardClient + 'static,
{
    pub fn new(reconciler: Reconciler<H, L>, config: SchedulerConfig) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            config,
        }
    }

    /// Run exactly one cycle against `previous`.
    ///
    /// The cycle runs on its own task so that a panic anywhere inside it is
    /// contained here instead of unwinding through the loop.
    pub async fn tick(&self, previous: &LeaderSnapshot) -> CycleOutcome {
        let reconciler = Arc::clone(&self.reconciler);
        let previous = previous.clone();
        let handle = tokio::spawn(async move { reconciler.reconcile_cycle(&previous).await });

        match handle.await {
            Ok(report) => CycleOutcome::Completed(report),
            Err(e) if e.is_panic() => CycleOutcome::Panicked(panic_message(e.into_panic())),
            Err(e) => CycleOutcome::Panicked(e.to_string()),
        }
    }

    /// Run cycles until cancellation (or `max_cycles`), returning the last
    /// snapshot.
    ///
    /// Cancellation is observed between cycles and while sleeping; a cycle
    /// that has started always runs to completion.
    pub async fn run<R: SchedulerReporter>(
        &self,
        initial: LeaderSnapshot,
        cancel_token: CancellationToken,
        reporter: &R,
    ) -> LeaderSnapshot {
        reporter.report(SchedulerEvent::Started {
            metrics: self.reconciler.metrics().len(),
            delay: self.config.delay,
        });

        let mut snapshot = initial;
        let mut cycle = 0;

        loop {
            if cancel_token.is_cancelled() {
                break;
            }

            cycle += 1;
            reporter.report(SchedulerEvent::CycleStarted { cycle });

            snapshot = match self.tick(&snapshot).await {
                CycleOutcome::Completed(report) => {
                    reporter.report(SchedulerEvent::CycleCompleted {
                        cycle,
                        summary: report.summary(),
                        elapsed_ms: (report.finished_at - report.started_at).num_milliseconds(),
                    });
                    report.snapshot
                }
                CycleOutcome::Panicked(message) => {
                    reporter.report(SchedulerEvent::CyclePanicked {
                        cycle,
                        message: &message,
                    });
                    snapshot
                }
            };

            if self.config.max_cycles.is_some_and(|max| cycle >= max) {
                break;
            }

            reporter.report(SchedulerEvent::Sleeping {
                delay: self.config.delay,
            });
            tokio::select! {
                () = tokio::time::sleep(self.config.delay) => {}
                () = cancel_token.cancelled() => break,
            }
        }

        reporter.report(SchedulerEvent::Stopped { cycles: cycle });
        snapshot
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
