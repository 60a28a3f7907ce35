//! The fixed catalogue of hiscore metrics.
//!
//! Every metric is addressed on the hiscores by a `table` number, plus a
//! `category_type` for everything that is not a skill. Skills render as
//! four-column tables (rank, name, level, xp); activities and bosses as
//! three-column tables (rank, name, score).

use std::fmt;

/// A trackable ranking category (a skill, activity, or boss).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Metric {
    name: &'static str,
    table: u8,
    category: Option<u8>,
}

impl Metric {
    const fn skill(name: &'static str, table: u8) -> Self {
        Self {
            name,
            table,
            category: None,
        }
    }

    const fn activity(name: &'static str, table: u8) -> Self {
        Self {
            name,
            table,
            category: Some(1),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The hiscore table number.
    pub fn table(&self) -> u8 {
        self.table
    }

    /// The hiscore `category_type`; `None` for skills.
    pub fn category(&self) -> Option<u8> {
        self.category
    }

    pub fn is_skill(&self) -> bool {
        self.category.is_none()
    }

    /// Number of populated cells per hiscore table row.
    pub fn columns(&self) -> usize {
        if self.is_skill() { 4 } else { 3 }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

const LEAGUE_POINTS: Metric = Metric::activity("League Points", 0);

const BOUNTY_HUNTER: [Metric; 4] = [
    Metric::activity("Bounty Hunter Hunter", 2),
    Metric::activity("Bounty Hunter Rogue", 3),
    Metric::activity("Bounty Hunter Hunter (Legacy)", 4),
    Metric::activity("Bounty Hunter Rogue (Legacy)", 5),
];

const BASE: [Metric; 93] = [
    Metric::skill("Overall", 0),
    Metric::skill("Attack", 1),
    Metric::skill("Defence", 2),
    Metric::skill("Strength", 3),
    Metric::skill("Hitpoints", 4),
    Metric::skill("Ranged", 5),
    Metric::skill("Prayer", 6),
    Metric::skill("Magic", 7),
    Metric::skill("Cooking", 8),
    Metric::skill("Woodcutting", 9),
    Metric::skill("Fletching", 10),
    Metric::skill("Fishing", 11),
    Metric::skill("Firemaking", 12),
    Metric::skill("Crafting", 13),
    Metric::skill("Smithing", 14),
    Metric::skill("Mining", 15),
    Metric::skill("Herblore", 16),
    Metric::skill("Agility", 17),
    Metric::skill("Thieving", 18),
    Metric::skill("Slayer", 19),
    Metric::skill("Farming", 20),
    Metric::skill("Runecrafting", 21),
    Metric::skill("Hunter", 22),
    Metric::skill("Construction", 23),
    Metric::activity("Clue Scrolls (all)", 6),
    Metric::activity("Clue Scrolls (beginner)", 7),
    Metric::activity("Clue Scrolls (easy)", 8),
    Metric::activity("Clue Scrolls (medium)", 9),
    Metric::activity("Clue Scrolls (hard)", 10),
    Metric::activity("Clue Scrolls (elite)", 11),
    Metric::activity("Clue Scrolls (master)", 12),
    Metric::activity("LMS - Rank", 13),
    Metric::activity("PvP Arena - Rank", 14),
    Metric::activity("Soul Wars Zeal", 15),
    Metric::activity("Rifts Closed", 16),
    Metric::activity("Abyssal Sire", 17),
    Metric::activity("Alchemical Hydra", 18),
    Metric::activity("Artio", 19),
    Metric::activity("Barrows Chests", 20),
    Metric::activity("Bryophyta", 21),
    Metric::activity("Callisto", 22),
    Metric::activity("Calvar'ion", 23),
    Metric::activity("Cerberus", 24),
    Metric::activity("Chambers of Xeric", 25),
    Metric::activity("Chambers of Xeric: Challenge Mode", 26),
    Metric::activity("Chaos Elemental", 27),
    Metric::activity("Chaos Fanatic", 28),
    Metric::activity("Commander Zilyana", 29),
    Metric::activity("Corporeal Beast", 30),
    Metric::activity("Crazy Archaeologist", 31),
    Metric::activity("Dagannoth Prime", 32),
    Metric::activity("Dagannoth Rex", 33),
    Metric::activity("Dagannoth Supreme", 34),
    Metric::activity("Deranged Archaeologist", 35),
    Metric::activity("Duke Sucellus", 36),
    Metric::activity("General Graardor", 37),
    Metric::activity("Giant Mole", 38),
    Metric::activity("Grotesque Guardians", 39),
    Metric::activity("Hespori", 40),
    Metric::activity("Kalphite Queen", 41),
    Metric::activity("King Black Dragon", 42),
    Metric::activity("Kraken", 43),
    Metric::activity("Kree'arra", 44),
    Metric::activity("K'ril Tsutsaroth", 45),
    Metric::activity("Mimic", 46),
    Metric::activity("Nex", 47),
    Metric::activity("Nightmare", 48),
    Metric::activity("Phosani's Nightmare", 49),
    Metric::activity("Obor", 50),
    Metric::activity("Phantom Muspah", 51),
    Metric::activity("Sarachnis", 52),
    Metric::activity("Scorpia", 53),
    Metric::activity("Skotizo", 54),
    Metric::activity("Spindel", 55),
    Metric::activity("Tempoross", 56),
    Metric::activity("The Gauntlet", 57),
    Metric::activity("The Corrupted Gauntlet", 58),
    Metric::activity("The Leviathan", 59),
    Metric::activity("The Whisperer", 60),
    Metric::activity("Theatre of Blood", 61),
    Metric::activity("Theatre of Blood: Hard Mode", 62),
    Metric::activity("Thermonuclear Smoke Devil", 63),
    Metric::activity("Tombs of Amascut", 64),
    Metric::activity("Tombs of Amascut: Expert Mode", 65),
    Metric::activity("TzKal-Zuk", 66),
    Metric::activity("TzTok-Jad", 67),
    Metric::activity("Vardorvis", 68),
    Metric::activity("Venenatis", 69),
    Metric::activity("Vet'ion", 70),
    Metric::activity("Vorkath", 71),
    Metric::activity("Wintertodt", 72),
    Metric::activity("Zalcano", 73),
    Metric::activity("Zulrah", 74),
];

/// All metrics available in the given mode, in hiscore order.
///
/// Seasonal hiscores lead with League Points and have no Bounty Hunter
/// tables; the regular hiscores are the other way around.
pub fn catalogue(seasonal: bool) -> Vec<Metric> {
    let mut metrics = Vec::with_capacity(BASE.len() + BOUNTY_HUNTER.len());
    if seasonal {
        metrics.push(LEAGUE_POINTS);
        metrics.extend_from_slice(&BASE);
    } else {
        metrics.extend_from_slice(&BASE);
        metrics.extend_from_slice(&BOUNTY_HUNTER);
    }
    metrics
}

/// The metrics polled every cycle: the catalogue for the mode, truncated to
/// `limit` when one is set.
pub fn tracked_metrics(seasonal: bool, limit: Option<usize>) -> Vec<Metric> {
    let mut metrics = catalogue(seasonal);
    if let Some(limit) = limit {
        metrics.truncate(limit);
    }
    metrics
}

/// Look up a metric by name (case-insensitive) within the given mode.
pub fn find(name: &str, seasonal: bool) -> Option<Metric> {
    let needle = name.trim();
    catalogue(seasonal)
        .into_iter()
        .find(|m| m.name.eq_ignore_ascii_case(needle))
}
