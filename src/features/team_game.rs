use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::GameCode;

/// Key columns every team-game input must carry.
pub const TEAM_GAME_KEY_COLUMNS: [&str; 7] = [
    "season",
    "round",
    "game_code",
    "team_code",
    "opponent_code",
    "is_home",
    "tipoff",
];

/// Box-score metrics averaged over each team's recent games.
pub const ROLLING_METRICS: [&str; 9] = [
    "points_for",
    "points_against",
    "off_rating",
    "def_rating",
    "pace",
    "efg_pct",
    "tov_pct",
    "orb_pct",
    "ftr",
];

/// One team's line in one game.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamGame {
    pub season: i64,
    pub round: i64,
    pub game_code: GameCode,
    pub team_code: String,
    pub opponent_code: String,
    pub is_home: bool,
    pub tipoff: DateTime<Utc>,
    /// Raw metrics by name; absent entries are unknown, not zero
    pub metrics: BTreeMap<String, f64>,
}

impl TeamGame {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().filter(|v| v.is_finite())
    }
}
