use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;

/// One ranked player for one metric, as read from a hiscore page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRankEntry {
    pub player: String,
    /// 1-based hiscore rank.
    pub rank: u32,
    /// Experience for skills, score/kills/points for everything else.
    pub score: u64,
    /// Skill level; `None` for activities and bosses.
    pub level: Option<u32>,
}

impl PlayerRankEntry {
    pub fn new(player: impl Into<String>, rank: u32, score: u64) -> Self {
        Self {
            player: clean_player_name(&player.into()),
            rank,
            score,
            level: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    /// Case-insensitive identity of the player.
    pub fn player_key(&self) -> String {
        self.player.to_lowercase()
    }
}

impl fmt::Display for PlayerRankEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(
                f,
                "Rank {} -> {} at level {} with {} xp",
                self.rank, self.player, level, self.score
            ),
            None => write!(
                f,
                "Rank {} -> {} with score {}",
                self.rank, self.player, self.score
            ),
        }
    }
}

/// Trim a display name and turn non-breaking spaces into plain spaces.
pub fn clean_player_name(raw: &str) -> String {
    raw.replace('\u{a0}', " ").trim().to_string()
}

/// Sort entries by rank and drop duplicate ranks and duplicate players,
/// keeping the best-ranked occurrence.
pub fn normalize_entries(mut entries: Vec<PlayerRankEntry>) -> Vec<PlayerRankEntry> {
    entries.sort_by_key(|e| e.rank);

    let mut seen_players = HashSet::with_capacity(entries.len());
    let mut last_rank = None;
    entries.retain(|e| {
        if last_rank == Some(e.rank) {
            return false;
        }
        if !seen_players.insert(e.player_key()) {
            return false;
        }
        last_rank = Some(e.rank);
        true
    });
    entries
}

/// Last known leaders per metric.
///
/// Owned by whoever drives the reconciliation loop and handed into each
/// cycle; a cycle never mutates the snapshot it was given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderSnapshot {
    leaders: BTreeMap<Metric, Vec<PlayerRankEntry>>,
}

impl LeaderSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leaders for a metric, or `None` if the metric was never fetched.
    pub fn get(&self, metric: &Metric) -> Option<&[PlayerRankEntry]> {
        self.leaders.get(metric).map(Vec::as_slice)
    }

    /// Replace a metric's leaders. Entries are normalized first.
    pub fn insert(&mut self, metric: Metric, entries: Vec<PlayerRankEntry>) {
        self.leaders.insert(metric, normalize_entries(entries));
    }

    /// Copy a metric's leaders over from another snapshot, if it has any.
    pub fn carry_over(&mut self, metric: Metric, previous: &LeaderSnapshot) {
        if let Some(entries) = previous.leaders.get(&metric) {
            self.leaders.insert(metric, entries.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.leaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Metric, &[PlayerRankEntry])> {
        self.leaders.iter().map(|(m, e)| (m, e.as_slice()))
    }
}
