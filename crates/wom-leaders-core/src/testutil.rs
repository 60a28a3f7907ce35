//! Test utilities: mock implementations of the client traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls and changing remote state between
//! cycles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::metric::{self, Metric};
use crate::models::PlayerRankEntry;
use crate::traits::{HiscoreClient, LeaderboardClient, PLAYERS_PER_PAGE, SubmissionReceipt};

/// Look up a regular-mode metric by name, panicking if it does not exist.
pub fn metric(name: &str) -> Metric {
    metric::find(name, false).unwrap_or_else(|| panic!("unknown metric {name}"))
}

/// Build leader entries from `(player, rank, score)` rows.
pub fn leaders(rows: &[(&str, u32, u64)]) -> Vec<PlayerRankEntry> {
    rows.iter()
        .map(|(p, r, s)| PlayerRankEntry::new(*p, *r, *s))
        .collect()
}

/// A full ranking of `count` generated players, ranks 1..=count.
pub fn ranking(count: u32) -> Vec<PlayerRankEntry> {
    (1..=count)
        .map(|rank| {
            PlayerRankEntry::new(format!("player{rank}"), rank, u64::from(count - rank + 1))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MockHiscoreClient
// ---------------------------------------------------------------------------

/// Mock hiscores holding a full ranking per metric name.
///
/// Pages are sliced from the ranking on demand. Metrics registered with
/// [`fail`](Self::fail) return a network error; metrics never registered
/// have an empty ranking.
#[derive(Clone, Default)]
pub struct MockHiscoreClient {
    rankings: Arc<Mutex<HashMap<String, Vec<PlayerRankEntry>>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    /// Every `(metric name, page)` requested.
    pub requests: Arc<Mutex<Vec<(String, u32)>>>,
}

impl MockHiscoreClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranking(self, metric: &str, entries: Vec<PlayerRankEntry>) -> Self {
        self.set_ranking(metric, entries);
        self
    }

    /// Replace a metric's ranking and clear any failure for it.
    pub fn set_ranking(&self, metric: &str, entries: Vec<PlayerRankEntry>) {
        self.failures.lock().unwrap().remove(metric);
        self.rankings
            .lock()
            .unwrap()
            .insert(metric.to_string(), entries);
    }

    /// Make every fetch for a metric fail with a network error.
    pub fn fail(&self, metric: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(metric.to_string(), message.to_string());
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HiscoreClient for MockHiscoreClient {
    async fn fetch_page(
        &self,
        metric: Metric,
        page: u32,
    ) -> Result<Vec<PlayerRankEntry>, AppError> {
        self.requests
            .lock()
            .unwrap()
            .push((metric.name().to_string(), page));

        if let Some(message) = self.failures.lock().unwrap().get(metric.name()) {
            return Err(AppError::NetworkError(message.clone()));
        }

        let rankings = self.rankings.lock().unwrap();
        let Some(entries) = rankings.get(metric.name()) else {
            return Ok(Vec::new());
        };

        let start = (page.saturating_sub(1) as usize) * PLAYERS_PER_PAGE;
        if page == 0 || start >= entries.len() {
            return Ok(Vec::new());
        }
        let end = (start + PLAYERS_PER_PAGE).min(entries.len());
        Ok(entries[start..end].to_vec())
    }
}

/// Mock hiscores whose every fetch panics, for failure-isolation tests.
#[derive(Clone, Default)]
pub struct PanickingHiscoreClient;

impl HiscoreClient for PanickingHiscoreClient {
    async fn fetch_page(
        &self,
        metric: Metric,
        _page: u32,
    ) -> Result<Vec<PlayerRankEntry>, AppError> {
        panic!("hiscore client exploded while fetching {metric}");
    }
}

// ---------------------------------------------------------------------------
// MockLeaderboardClient
// ---------------------------------------------------------------------------

/// Recorded submission: (group name, metric name, entries).
pub type SubmissionRecord = (String, String, Vec<PlayerRankEntry>);

/// Mock leaderboard that records submissions.
#[derive(Clone, Default)]
pub struct MockLeaderboardClient {
    pub submissions: Arc<Mutex<Vec<SubmissionRecord>>>,
    failures: Arc<Mutex<HashMap<String, u16>>>,
}

impl MockLeaderboardClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject submissions for a metric with the given HTTP status.
    pub fn fail(&self, metric: &str, status_code: u16) {
        self.failures
            .lock()
            .unwrap()
            .insert(metric.to_string(), status_code);
    }

    pub fn recover(&self, metric: &str) {
        self.failures.lock().unwrap().remove(metric);
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn submissions_for(&self, metric: &str) -> Vec<Vec<PlayerRankEntry>> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m, _)| m == metric)
            .map(|(_, _, entries)| entries.clone())
            .collect()
    }
}

impl LeaderboardClient for MockLeaderboardClient {
    async fn submit_leaders(
        &self,
        group_name: &str,
        metric: Metric,
        entries: &[PlayerRankEntry],
    ) -> Result<SubmissionReceipt, AppError> {
        if let Some(&status_code) = self.failures.lock().unwrap().get(metric.name()) {
            return Err(match status_code {
                401 | 403 => AppError::Unauthorized("invalid api key".into()),
                429 => AppError::RateLimitExceeded,
                _ => AppError::LeaderboardError {
                    message: "mock failure".into(),
                    status_code,
                },
            });
        }

        self.submissions.lock().unwrap().push((
            group_name.to_string(),
            metric.name().to_string(),
            entries.to_vec(),
        ));
        Ok(SubmissionReceipt {
            members: entries.len(),
            message: format!("Updated {} members", entries.len()),
        })
    }
}
