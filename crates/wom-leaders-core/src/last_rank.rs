//! Finds the player holding the last rank of a metric.
//!
//! The hiscores have no "last page" link, so the final page is located by
//! binary search over page numbers: a non-empty page moves the lower bound
//! up, an empty one moves the upper bound down, and a short page is the
//! end. When a previous search is remembered, the search first walks
//! forward from the old last page in large steps to find tight bounds.

use std::collections::HashMap;

use crate::error::AppError;
use crate::metric::Metric;
use crate::models::PlayerRankEntry;
use crate::traits::{HiscoreClient, PLAYERS_PER_PAGE};

/// Highest page any metric can have (2,000,000 ranks).
pub const MAX_PAGE: u32 = 80_000;

/// Pages skipped per step when moving stale bounds forward (25,000 ranks).
pub const PAGE_SKIP: u32 = 1_000;

/// Last pages found by earlier searches, kept in memory only.
#[derive(Debug, Clone, Default)]
pub struct LastRankState {
    last_pages: HashMap<Metric, u32>,
}

impl LastRankState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_page(&self, metric: &Metric) -> Option<u32> {
        self.last_pages.get(metric).copied()
    }

    pub fn record(&mut self, metric: Metric, rank: u32) {
        self.last_pages.insert(metric, page_of(rank));
    }
}

/// Page (1-based) on which a rank is listed.
pub fn page_of(rank: u32) -> u32 {
    rank.saturating_sub(1) / PLAYERS_PER_PAGE as u32 + 1
}

pub struct LastRankFinder<H: HiscoreClient> {
    hiscores: H,
}

impl<H: HiscoreClient> LastRankFinder<H> {
    pub fn new(hiscores: H) -> Self {
        Self { hiscores }
    }

    /// Find the last ranked player for `metric`, updating `state` with the
    /// page it was found on. Returns `None` when the metric has no ranked
    /// players at all.
    pub async fn find(
        &self,
        metric: Metric,
        state: &mut LastRankState,
    ) -> Result<Option<PlayerRankEntry>, AppError> {
        tracing::info!(%metric, "Finding last ranked player");

        let found = match state.last_page(&metric) {
            None => self.binary_search(metric, 1, MAX_PAGE).await?,
            Some(page) if page >= MAX_PAGE => self.binary_search(metric, page, MAX_PAGE).await?,
            Some(page) => {
                let (low, high) = self.new_bounds(metric, page).await?;
                match self.binary_search(metric, low, high).await? {
                    Some(player) => Some(player),
                    // The ranking shrank below the remembered page.
                    None => self.binary_search(metric, 1, page).await?,
                }
            }
        };

        match &found {
            Some(player) => {
                state.record(metric, player.rank);
                tracing::info!(
                    %metric,
                    player = %player.player,
                    rank = player.rank,
                    "Found last ranked player"
                );
            }
            None => tracing::warn!(%metric, "No ranked players found"),
        }

        Ok(found)
    }

    async fn binary_search(
        &self,
        metric: Metric,
        low: u32,
        high: u32,
    ) -> Result<Option<PlayerRankEntry>, AppError> {
        let mut low = low.max(1);
        let mut high = high.min(MAX_PAGE);
        let mut last_player = None;

        while low <= high {
            let mid = low + (high - low) / 2;
            let board = self.hiscores.fetch_page(metric, mid).await?;
            tracing::debug!(%metric, page = mid, rows = board.len(), "Checked page");

            match board.last() {
                Some(player) => {
                    last_player = Some(player.clone());
                    if board.len() < PLAYERS_PER_PAGE {
                        break;
                    }
                    low = mid + 1;
                }
                None => high = mid - 1,
            }
        }

        Ok(last_player)
    }

    /// Step forward from a previously known last page until an empty page
    /// is hit, returning the bounds to binary-search within.
    async fn new_bounds(&self, metric: Metric, known_page: u32) -> Result<(u32, u32), AppError> {
        let mut low = known_page;
        let mut high = known_page.saturating_add(PAGE_SKIP);

        loop {
            if high >= MAX_PAGE {
                return Ok((low, MAX_PAGE));
            }
            let board = self.hiscores.fetch_page(metric, high).await?;
            if board.is_empty() {
                return Ok((low, high));
            }
            low += PAGE_SKIP;
            high += PAGE_SKIP;
        }
    }
}
