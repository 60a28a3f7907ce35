//! One reconciliation cycle: fetch → normalize → diff → submit.
//!
//! Every tracked metric is handled independently. A failure for one metric
//! is recorded in the [`CycleReport`] and never stops the others.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::diff::{LeaderChange, diff_leaders};
use crate::error::AppError;
use crate::metric::Metric;
use crate::models::{LeaderSnapshot, normalize_entries};
use crate::traits::{HiscoreClient, LeaderboardClient};

/// What a cycle decided to do for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leaders changed and the full list was submitted.
    Issued,
    /// Leaders unchanged; nothing was written.
    NoOp,
}

#[derive(Debug, Clone)]
pub struct MetricDecision {
    pub metric: Metric,
    pub decision: Decision,
    pub changes: Vec<LeaderChange>,
}

/// A per-metric failure inside a cycle. Never fatal to the cycle.
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("Failed to fetch leaders for {metric}: {cause}")]
    FetchFailed { metric: Metric, cause: AppError },

    #[error("Failed to submit leaders for {metric}: {cause}")]
    SubmissionFailed { metric: Metric, cause: AppError },
}

impl MetricError {
    pub fn metric(&self) -> Metric {
        match self {
            MetricError::FetchFailed { metric, .. }
            | MetricError::SubmissionFailed { metric, .. } => *metric,
        }
    }

    pub fn cause(&self) -> &AppError {
        match self {
            MetricError::FetchFailed { cause, .. }
            | MetricError::SubmissionFailed { cause, .. } => cause,
        }
    }
}

/// Everything a cycle produced.
#[derive(Debug)]
pub struct CycleReport {
    /// Snapshot to hand to the next cycle.
    pub snapshot: LeaderSnapshot,
    pub decisions: Vec<MetricDecision>,
    pub errors: Vec<MetricError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn summary(&self) -> CycleSummary {
        let issued = self
            .decisions
            .iter()
            .filter(|d| d.decision == Decision::Issued)
            .count();
        let fetch_failed = self
            .errors
            .iter()
            .filter(|e| matches!(e, MetricError::FetchFailed { .. }))
            .count();
        CycleSummary {
            issued,
            no_op: self.decisions.len() - issued,
            fetch_failed,
            submission_failed: self.errors.len() - fetch_failed,
        }
    }

    pub fn decision_for(&self, metric: &Metric) -> Option<Decision> {
        self.decisions
            .iter()
            .find(|d| d.metric == *metric)
            .map(|d| d.decision)
    }

    pub fn error_for(&self, metric: &Metric) -> Option<&MetricError> {
        self.errors.iter().find(|e| e.metric() == *metric)
    }
}

/// Per-cycle counts, logged at the end of every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub issued: usize,
    pub no_op: usize,
    pub fetch_failed: usize,
    pub submission_failed: usize,
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} issued, {} no-op, {} fetch failed, {} submission failed",
            self.issued, self.no_op, self.fetch_failed, self.submission_failed
        )
    }
}

/// Static inputs of every cycle.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Leaderboard group receiving submissions.
    pub group_name: String,
    /// Top-N players tracked per metric.
    pub leader_limit: usize,
    /// Metrics polled each cycle, in order.
    pub metrics: Vec<Metric>,
}

/// Brings the leaderboard in sync with the hiscores, one cycle at a time.
///
/// Generic over both remote services so cycles can run against fakes.
pub struct Reconciler<H, L>
where
    H: HiscoreClient,
    L: LeaderboardClient,
{
    hiscores: H,
    leaderboard: L,
    config: ReconcilerConfig,
}

impl<H, L> Reconciler<H, L>
where
    H: HiscoreClient,
    L: LeaderboardClient,
{
    pub fn new(hiscores: H, leaderboard: L, config: ReconcilerConfig) -> Self {
        Self {
            hiscores,
            leaderboard,
            config,
        }
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.config.metrics
    }

    /// Run one cycle against `previous` and return the resulting snapshot
    /// together with every decision and error.
    ///
    /// Metrics whose fetch or submission failed keep their entries from
    /// `previous`, so a failed submission is retried by the next cycle.
    pub async fn reconcile_cycle(&self, previous: &LeaderSnapshot) -> CycleReport {
        let started_at = Utc::now();
        let mut snapshot = LeaderSnapshot::new();
        let mut decisions = Vec::with_capacity(self.config.metrics.len());
        let mut errors = Vec::new();

        for &metric in &self.config.metrics {
            match self.reconcile_metric(metric, previous, &mut snapshot).await {
                Ok(decision) => decisions.push(decision),
                Err(e) => {
                    if e.cause().is_retryable() {
                        tracing::warn!(
                            %metric,
                            error = %e,
                            "Metric failed, keeping previous leaders"
                        );
                    } else {
                        tracing::error!(
                            %metric,
                            error = %e,
                            "Metric failed, keeping previous leaders"
                        );
                    }
                    snapshot.carry_over(metric, previous);
                    errors.push(e);
                }
            }
        }

        CycleReport {
            snapshot,
            decisions,
            errors,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn reconcile_metric(
        &self,
        metric: Metric,
        previous: &LeaderSnapshot,
        next: &mut LeaderSnapshot,
    ) -> Result<MetricDecision, MetricError> {
        tracing::info!(%metric, "Fetching leaders");
        let fetched = self
            .hiscores
            .fetch_top(metric, self.config.leader_limit)
            .await
            .map_err(|cause| MetricError::FetchFailed { metric, cause })?;

        let entries = normalize_entries(fetched);
        tracing::info!(%metric, count = entries.len(), "Found leaders");
        for entry in &entries {
            tracing::debug!(%metric, "{entry}");
        }

        let changes = diff_leaders(previous.get(&metric), &entries);
        if changes.is_empty() {
            tracing::info!(%metric, "Leaders unchanged, skipping submission");
            next.insert(metric, entries);
            return Ok(MetricDecision {
                metric,
                decision: Decision::NoOp,
                changes,
            });
        }

        tracing::info!(%metric, changes = changes.len(), "Leaders changed");
        for change in &changes {
            tracing::debug!(%metric, "{change}");
        }

        let receipt = self
            .leaderboard
            .submit_leaders(&self.config.group_name, metric, &entries)
            .await
            .map_err(|cause| MetricError::SubmissionFailed { metric, cause })?;
        tracing::info!(
            %metric,
            members = receipt.members,
            message = %receipt.message,
            "Submitted leaders"
        );

        next.insert(metric, entries);
        Ok(MetricDecision {
            metric,
            decision: Decision::Issued,
            changes,
        })
    }
}
