//! Game records and the in-memory game table.
//!
//! A [`GameTable`] is a rectangular, name-addressed table: every record carries
//! the key columns (`season`, `game_code`) plus one `f64` value per declared
//! column. The round axis and the label are ordinary numeric columns, so their
//! names stay configurable.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{ElwfError, Result};

pub const SEASON_COL: &str = "season";
pub const GAME_CODE_COL: &str = "game_code";

/// Game identifier, unique within a season.
///
/// Numeric codes order numerically and sort before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameCode {
    Numeric(i64),
    Text(String),
}

impl GameCode {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => GameCode::Numeric(n),
            Err(_) => GameCode::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameCode::Numeric(n) => write!(f, "{n}"),
            GameCode::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for GameCode {
    fn from(n: i64) -> Self {
        GameCode::Numeric(n)
    }
}

impl From<&str> for GameCode {
    fn from(s: &str) -> Self {
        GameCode::parse(s)
    }
}

/// One row of a game table.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub season: i64,
    pub game_code: GameCode,
    values: BTreeMap<String, f64>,
}

impl GameRecord {
    pub fn new(season: i64, game_code: impl Into<GameCode>) -> Self {
        Self {
            season,
            game_code: game_code.into(),
            values: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, column: &str, value: f64) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: f64) {
        self.values.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn values(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    /// Integer value of the round column.
    pub fn round(&self, round_col: &str) -> Result<i64> {
        let value = self.get(round_col).ok_or_else(|| {
            ElwfError::InvalidData(format!(
                "game {} (season {}) has no value for round column {round_col}",
                self.game_code, self.season
            ))
        })?;
        integral(value).ok_or_else(|| {
            ElwfError::InvalidData(format!(
                "round column {round_col} must hold integers, got {value} for game {} (season {})",
                self.game_code, self.season
            ))
        })
    }

    /// Binary label read from `target_col`.
    pub fn label(&self, target_col: &str) -> Result<u8> {
        match self.get(target_col) {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            Some(v) => Err(ElwfError::InvalidData(format!(
                "label column {target_col} must be 0 or 1, got {v} for game {} (season {})",
                self.game_code, self.season
            ))),
            None => Err(ElwfError::missing_columns("games", [target_col])),
        }
    }
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Chronological ordering on `(season, round, game_code)`.
pub fn chronological_cmp(a: &GameRecord, b: &GameRecord, round_col: &str) -> Ordering {
    let ra = a.get(round_col).unwrap_or(f64::NAN);
    let rb = b.get(round_col).unwrap_or(f64::NAN);
    a.season
        .cmp(&b.season)
        .then_with(|| ra.total_cmp(&rb))
        .then_with(|| a.game_code.cmp(&b.game_code))
}

/// Rectangular table of game records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameTable {
    columns: Vec<String>,
    records: Vec<GameRecord>,
}

impl GameTable {
    /// Create an empty table with the given value columns (keys are implicit).
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .map(Into::into)
            .filter(|c: &String| c != SEASON_COL && c != GAME_CODE_COL)
            .filter(|c| seen.insert(c.clone()))
            .collect();
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn from_records<I, S>(columns: I, records: Vec<GameRecord>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        table.records.reserve(records.len());
        for record in records {
            table.push(record)?;
        }
        Ok(table)
    }

    /// Append a record; it must carry exactly the table's value columns.
    pub fn push(&mut self, record: GameRecord) -> Result<()> {
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !record.values.contains_key(c.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ElwfError::InvalidData(format!(
                "game {} (season {}) is missing values for {}",
                record.game_code,
                record.season,
                missing.join(", ")
            )));
        }
        if record.values.len() != self.columns.len() {
            let extra: Vec<&str> = record
                .values
                .keys()
                .filter(|k| !self.columns.iter().any(|c| c == *k))
                .map(String::as_str)
                .collect();
            return Err(ElwfError::InvalidData(format!(
                "game {} (season {}) has undeclared columns {}",
                record.game_code,
                record.season,
                extra.join(", ")
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Value columns in declaration order (keys excluded).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GameRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        column == SEASON_COL || column == GAME_CODE_COL || self.columns.iter().any(|c| c == column)
    }

    /// Fail with a schema violation naming every absent column.
    pub fn require_columns<S: AsRef<str>>(&self, table: &str, required: &[S]) -> Result<()> {
        let missing: Vec<String> = required
            .iter()
            .map(|c| c.as_ref())
            .filter(|c| !self.has_column(c))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ElwfError::missing_columns(table, missing))
        }
    }

    /// Sort in place by `(season, round, game_code)`.
    pub fn sort_chronological(&mut self, round_col: &str) -> Result<()> {
        self.require_columns("games", &[round_col])?;
        for record in &self.records {
            record.round(round_col)?;
        }
        self.records
            .sort_by(|a, b| chronological_cmp(a, b, round_col));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(season: i64, round: f64, code: i64) -> GameRecord {
        GameRecord::new(season, code).with("round", round).with("f_x", 0.5)
    }

    #[test]
    fn test_game_code_parse_and_order() {
        assert_eq!(GameCode::parse(" 12 "), GameCode::Numeric(12));
        assert_eq!(GameCode::parse("E2024_7"), GameCode::Text("E2024_7".into()));
        assert!(GameCode::Numeric(9) < GameCode::Numeric(10));
        assert!(GameCode::Numeric(999) < GameCode::Text("1a".into()));
    }

    #[test]
    fn test_push_rejects_ragged_records() {
        let mut table = GameTable::new(["round", "f_x"]);
        let err = table
            .push(GameRecord::new(2023, 1).with("round", 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("f_x"));

        let err = table
            .push(record(2023, 1.0, 1).with("f_y", 1.0))
            .unwrap_err();
        assert!(err.to_string().contains("f_y"));
    }

    #[test]
    fn test_key_columns_are_implicit() {
        let table = GameTable::new(["season", "game_code", "round"]);
        assert_eq!(table.columns(), &["round".to_string()]);
        assert!(table.has_column("season"));
        assert!(table.has_column("game_code"));
    }

    #[test]
    fn test_require_columns_names_all_missing() {
        let table = GameTable::new(["round"]);
        let err = table
            .require_columns("games", &["round", "y_home_win", "f_pace_diff"])
            .unwrap_err();
        match err {
            ElwfError::MissingColumns { table, columns } => {
                assert_eq!(table, "games");
                assert_eq!(columns, vec!["y_home_win", "f_pace_diff"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sort_chronological() {
        let mut table = GameTable::from_records(
            ["round", "f_x"],
            vec![
                record(2024, 1.0, 3),
                record(2023, 2.0, 1),
                record(2023, 1.0, 7),
                record(2023, 1.0, 2),
            ],
        )
        .unwrap();
        table.sort_chronological("round").unwrap();

        let keys: Vec<(i64, i64, GameCode)> = table
            .records()
            .iter()
            .map(|r| (r.season, r.round("round").unwrap(), r.game_code.clone()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (2023, 1, GameCode::Numeric(2)),
                (2023, 1, GameCode::Numeric(7)),
                (2023, 2, GameCode::Numeric(1)),
                (2024, 1, GameCode::Numeric(3)),
            ]
        );
    }

    #[test]
    fn test_round_must_be_integral() {
        let mut table =
            GameTable::from_records(["round", "f_x"], vec![record(2023, 1.5, 1)]).unwrap();
        assert!(matches!(
            table.sort_chronological("round"),
            Err(ElwfError::InvalidData(_))
        ));
    }

    #[test]
    fn test_label_rejects_non_binary() {
        let r = GameRecord::new(2023, 1).with("y_home_win", 2.0);
        assert!(r.label("y_home_win").is_err());
        let r = GameRecord::new(2023, 1).with("y_home_win", 1.0);
        assert_eq!(r.label("y_home_win").unwrap(), 1);
    }
}
