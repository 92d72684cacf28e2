//! Pre-game matchup features from per-team box scores.
//!
//! Each team's metrics are averaged over its previous `window` games. The
//! current game is never part of its own average, so a feature row only uses
//! information available at tip-off.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::team_game::{TeamGame, ROLLING_METRICS};
use crate::domain::{GameCode, GameRecord, GameTable, DEFAULT_FEATURE_PREFIX};
use crate::error::{ElwfError, Result};

pub const DEFAULT_WINDOW: usize = 5;
const REST_DAYS: &str = "rest_days";
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Pre-game form of one team in one game.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamForm {
    pub season: i64,
    pub round: i64,
    pub game_code: GameCode,
    pub team_code: String,
    pub is_home: bool,
    /// Rolling mean per metric; `None` when the team has no prior value
    pub rolling: BTreeMap<String, Option<f64>>,
    /// Days since the team's previous tip-off
    pub rest_days: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    window: usize,
    prefix: String,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FeatureBuilder {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            prefix: DEFAULT_FEATURE_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Rolling metrics present in at least one input row, in canonical order.
    fn active_metrics(games: &[TeamGame]) -> Vec<&'static str> {
        ROLLING_METRICS
            .iter()
            .copied()
            .filter(|m| games.iter().any(|g| g.metrics.contains_key(*m)))
            .collect()
    }

    /// Per-team rolling form, shifted by one game.
    pub fn team_form(&self, games: &[TeamGame]) -> Result<Vec<TeamForm>> {
        if self.window == 0 {
            return Err(ElwfError::Validation("rolling window must be at least 1".to_string()));
        }
        let metrics = Self::active_metrics(games);

        let mut by_team: HashMap<&str, Vec<&TeamGame>> = HashMap::new();
        for game in games {
            by_team.entry(game.team_code.as_str()).or_default().push(game);
        }

        let mut forms = Vec::with_capacity(games.len());
        for (team, mut history) in by_team {
            history.sort_by(|a, b| {
                a.tipoff
                    .cmp(&b.tipoff)
                    .then_with(|| a.game_code.cmp(&b.game_code))
            });
            if let Some(pair) = history
                .windows(2)
                .find(|w| w[0].season == w[1].season && w[0].game_code == w[1].game_code)
            {
                return Err(ElwfError::JoinCardinality(format!(
                    "team {team} appears twice in game {} (season {})",
                    pair[0].game_code, pair[0].season
                )));
            }

            for (k, game) in history.iter().enumerate() {
                let prior = &history[k.saturating_sub(self.window)..k];
                let rolling = metrics
                    .iter()
                    .map(|&m| {
                        let values: Vec<f64> = prior.iter().filter_map(|g| g.metric(m)).collect();
                        let mean = if values.is_empty() {
                            None
                        } else {
                            Some(values.iter().sum::<f64>() / values.len() as f64)
                        };
                        (m.to_string(), mean)
                    })
                    .collect();
                let rest_days = k.checked_sub(1).map(|prev| {
                    (game.tipoff - history[prev].tipoff).num_seconds() as f64 / SECONDS_PER_DAY
                });

                forms.push(TeamForm {
                    season: game.season,
                    round: game.round,
                    game_code: game.game_code.clone(),
                    team_code: game.team_code.clone(),
                    is_home: game.is_home,
                    rolling,
                    rest_days,
                });
            }
        }
        forms.sort_by(|a, b| {
            (a.season, a.round, &a.game_code, !a.is_home).cmp(&(b.season, b.round, &b.game_code, !b.is_home))
        });
        Ok(forms)
    }

    /// One row per game: `<prefix><metric>_diff` = home form − away form.
    ///
    /// A side without prior history contributes a 0.0 difference.
    pub fn build(&self, games: &[TeamGame]) -> Result<GameTable> {
        let metrics = Self::active_metrics(games);
        let forms = self.team_form(games)?;

        let mut sides: HashMap<(i64, GameCode), (Option<&TeamForm>, Option<&TeamForm>)> = HashMap::new();
        for form in &forms {
            let entry = sides
                .entry((form.season, form.game_code.clone()))
                .or_insert((None, None));
            let slot = if form.is_home { &mut entry.0 } else { &mut entry.1 };
            if slot.is_some() {
                return Err(ElwfError::JoinCardinality(format!(
                    "game {} (season {}) has more than one {} team",
                    form.game_code,
                    form.season,
                    if form.is_home { "home" } else { "away" }
                )));
            }
            *slot = Some(form);
        }

        let diff_cols: Vec<(String, Option<&str>)> = metrics
            .iter()
            .map(|&m| (format!("{}{m}_diff", self.prefix), Some(m)))
            .chain(std::iter::once((format!("{}{REST_DAYS}_diff", self.prefix), None)))
            .collect();

        let mut columns = vec!["round".to_string()];
        columns.extend(diff_cols.iter().map(|(c, _)| c.clone()));

        let mut filled = 0usize;
        let mut records = Vec::with_capacity(sides.len());
        for ((season, game_code), pair) in sides {
            let (home, away) = match pair {
                (Some(h), Some(a)) => (h, a),
                (h, _) => {
                    return Err(ElwfError::JoinCardinality(format!(
                        "game {game_code} (season {season}) is missing its {} team",
                        if h.is_some() { "away" } else { "home" }
                    )))
                }
            };

            if home.round != away.round {
                return Err(ElwfError::InvalidData(format!(
                    "game {game_code} (season {season}) has round {} for {} and {} for {}",
                    home.round, home.team_code, away.round, away.team_code
                )));
            }

            let mut record = GameRecord::new(season, game_code).with("round", home.round as f64);
            for (column, metric) in &diff_cols {
                let (h, a) = match metric {
                    Some(m) => (
                        home.rolling.get(*m).copied().flatten(),
                        away.rolling.get(*m).copied().flatten(),
                    ),
                    None => (home.rest_days, away.rest_days),
                };
                let diff = match (h, a) {
                    (Some(h), Some(a)) => h - a,
                    _ => {
                        filled += 1;
                        0.0
                    }
                };
                record.set(column, diff);
            }
            records.push(record);
        }

        let mut table = GameTable::from_records(columns, records)?;
        table.sort_chronological("round")?;
        debug!(
            games = table.len(),
            window = self.window,
            filled_without_history = filled,
            "built game features"
        );
        Ok(table)
    }
}
