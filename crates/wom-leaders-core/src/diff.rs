//! Change detection between two leader lists for the same metric.
//!
//! Any numeric difference counts: there is no minimum delta. Players are
//! matched case-insensitively.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::models::PlayerRankEntry;

/// A single difference between the previous and current leaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderChange {
    /// Player was not among the previous leaders.
    New { player: String, rank: u32 },
    RankChanged { player: String, from: u32, to: u32 },
    ScoreChanged { player: String, from: u64, to: u64 },
    /// Player fell out of the tracked top-N.
    Dropped { player: String, rank: u32 },
}

impl fmt::Display for LeaderChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderChange::New { player, rank } => write!(f, "{player} entered at rank {rank}"),
            LeaderChange::RankChanged { player, from, to } => {
                write!(f, "{player} moved from rank {from} to {to}")
            }
            LeaderChange::ScoreChanged { player, from, to } => {
                write!(f, "{player} score {from} -> {to}")
            }
            LeaderChange::Dropped { player, rank } => {
                write!(f, "{player} dropped out from rank {rank}")
            }
        }
    }
}

/// Compute every change from `previous` to `current`.
///
/// `previous == None` means the metric has never been seen, so every
/// current entry is new. An empty result means nothing is worth submitting.
pub fn diff_leaders(
    previous: Option<&[PlayerRankEntry]>,
    current: &[PlayerRankEntry],
) -> Vec<LeaderChange> {
    let previous = previous.unwrap_or_default();
    let before: HashMap<String, &PlayerRankEntry> =
        previous.iter().map(|e| (e.player_key(), e)).collect();

    let mut changes = Vec::new();
    let mut still_present = HashSet::with_capacity(current.len());

    for entry in current {
        let key = entry.player_key();
        match before.get(&key) {
            None => changes.push(LeaderChange::New {
                player: entry.player.clone(),
                rank: entry.rank,
            }),
            Some(old) => {
                if old.rank != entry.rank {
                    changes.push(LeaderChange::RankChanged {
                        player: entry.player.clone(),
                        from: old.rank,
                        to: entry.rank,
                    });
                }
                if old.score != entry.score {
                    changes.push(LeaderChange::ScoreChanged {
                        player: entry.player.clone(),
                        from: old.score,
                        to: entry.score,
                    });
                }
            }
        }
        still_present.insert(key);
    }

    for old in previous {
        if !still_present.contains(&old.player_key()) {
            changes.push(LeaderChange::Dropped {
                player: old.player.clone(),
                rank: old.rank,
            });
        }
    }

    changes
}
