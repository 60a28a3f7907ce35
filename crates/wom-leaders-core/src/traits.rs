use std::future::Future;

use crate::error::AppError;
use crate::metric::Metric;
use crate::models::PlayerRankEntry;

/// Players listed per hiscore page.
pub const PLAYERS_PER_PAGE: usize = 25;

/// Reads ranked players from the hiscores.
pub trait HiscoreClient: Send + Sync + Clone {
    /// Fetch one hiscore page (1-based) for a metric.
    ///
    /// A page past the end of the ranking yields an empty vector, not an
    /// error.
    fn fetch_page(
        &self,
        metric: Metric,
        page: u32,
    ) -> impl Future<Output = Result<Vec<PlayerRankEntry>, AppError>> + Send;

    /// Fetch the top `limit` players for a metric, walking pages in order
    /// until enough players are collected or a short page ends the ranking.
    fn fetch_top(
        &self,
        metric: Metric,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<PlayerRankEntry>, AppError>> + Send {
        async move {
            let mut entries = Vec::with_capacity(limit);
            let mut page = 1;
            while entries.len() < limit {
                let rows = self.fetch_page(metric, page).await?;
                let short = rows.len() < PLAYERS_PER_PAGE;
                entries.extend(rows);
                if short {
                    break;
                }
                page += 1;
            }
            entries.truncate(limit);
            Ok(entries)
        }
    }
}

/// Outcome of a successful leaderboard submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Number of players sent to the leaderboard.
    pub members: usize,
    /// Human-readable status returned by the service.
    pub message: String,
}

/// Publishes leaders to the downstream leaderboard service.
///
/// Submissions always carry a metric's full top-N list; implementations
/// must be safe to call repeatedly with the same list.
pub trait LeaderboardClient: Send + Sync + Clone {
    fn submit_leaders(
        &self,
        group_name: &str,
        metric: Metric,
        entries: &[PlayerRankEntry],
    ) -> impl Future<Output = Result<SubmissionReceipt, AppError>> + Send;
}
