//! CSV reading and writing of game tables and team-game lines.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::domain::{GameCode, GameRecord, GameTable, GAME_CODE_COL, SEASON_COL};
use crate::error::{ElwfError, Result};
use crate::features::{TeamGame, ROLLING_METRICS, TEAM_GAME_KEY_COLUMNS};

/// Header name → column index.
struct Header {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Header {
    fn new(record: &StringRecord) -> Self {
        let names: Vec<String> = record.iter().map(|h| h.trim().to_string()).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self { names, index }
    }

    fn require(&self, table: &str, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !self.index.contains_key(*c))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ElwfError::missing_columns(table, missing))
        }
    }

    fn cell<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|&i| row.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

fn line_of(row: &StringRecord, fallback: usize) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(fallback as u64)
}

fn parse_number(raw: &str, column: &str, line: u64) -> Result<f64> {
    if raw.is_empty() {
        return Err(ElwfError::InvalidData(format!(
            "empty value in column {column} at line {line}"
        )));
    }
    raw.parse::<f64>().map_err(|_| {
        ElwfError::InvalidData(format!(
            "non-numeric value {raw:?} in column {column} at line {line}"
        ))
    })
}

fn parse_integer(raw: &str, column: &str, line: u64) -> Result<i64> {
    let value = parse_number(raw, column, line)?;
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(ElwfError::InvalidData(format!(
            "non-integer value {raw:?} in column {column} at line {line}"
        )));
    }
    Ok(value as i64)
}

fn parse_game_code(raw: &str, line: u64) -> Result<GameCode> {
    if raw.is_empty() {
        return Err(ElwfError::InvalidData(format!(
            "empty value in column {GAME_CODE_COL} at line {line}"
        )));
    }
    // "12.0" written by float-typed exporters is still game 12
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v.is_finite() => Ok(GameCode::Numeric(v as i64)),
        _ => Ok(GameCode::parse(raw)),
    }
}

fn parse_bool(raw: &str, column: &str, line: u64) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" => Ok(true),
        "0" | "0.0" | "false" | "f" | "no" => Ok(false),
        _ => Err(ElwfError::InvalidData(format!(
            "invalid boolean {raw:?} in column {column} at line {line}"
        ))),
    }
}

fn parse_timestamp(raw: &str, column: &str, line: u64) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            ElwfError::InvalidData(format!(
                "invalid timestamp {raw:?} in column {column} at line {line}"
            ))
        })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Read a game table. `season` and `game_code` are keys; every other column
/// must hold a number in every row.
pub fn read_game_table<P: AsRef<Path>>(path: P, table: &str) -> Result<GameTable> {
    read_game_table_with(path, table, |_| true)
}

/// Read a game table where only columns accepted by `required` must be
/// numeric.
///
/// Other columns are kept when every cell holds a number and dropped
/// otherwise, so text columns such as team names or dates do not fail the
/// read.
pub fn read_game_table_with<P, F>(path: P, table: &str, required: F) -> Result<GameTable>
where
    P: AsRef<Path>,
    F: Fn(&str) -> bool,
{
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let header = Header::new(reader.headers()?);
    header.require(table, &[SEASON_COL, GAME_CODE_COL])?;
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let (kept, dropped): (Vec<String>, Vec<String>) = header
        .names
        .iter()
        .filter(|c| c.as_str() != SEASON_COL && c.as_str() != GAME_CODE_COL)
        .cloned()
        .partition(|c| {
            required(c.as_str())
                || rows.iter().all(|row| {
                    let raw = header.cell(row, c);
                    !raw.is_empty() && raw.parse::<f64>().is_ok()
                })
        });
    if !dropped.is_empty() {
        debug!(?dropped, "ignoring non-numeric columns in {table} table");
    }

    let mut out = GameTable::new(kept);
    let value_cols: Vec<String> = out.columns().to_vec();
    for (i, row) in rows.iter().enumerate() {
        let line = line_of(row, i + 2);
        let season = parse_integer(header.cell(row, SEASON_COL), SEASON_COL, line)?;
        let game_code = parse_game_code(header.cell(row, GAME_CODE_COL), line)?;
        let mut record = GameRecord::new(season, game_code);
        for column in &value_cols {
            record.set(column, parse_number(header.cell(row, column), column, line)?);
        }
        out.push(record)?;
    }

    debug!(path = %path.display(), rows = out.len(), columns = value_cols.len(), "read {table} table");
    Ok(out)
}

/// Write a game table with the key columns first.
pub fn write_game_table<P: AsRef<Path>>(path: P, table: &GameTable) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![SEASON_COL.to_string(), GAME_CODE_COL.to_string()];
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header)?;

    for record in table.records() {
        let mut row = vec![record.season.to_string(), record.game_code.to_string()];
        row.extend(
            table
                .columns()
                .iter()
                .map(|c| record.get(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read one-row-per-team-per-game box scores.
///
/// Rolling metric cells may be empty; an empty cell means the value is
/// unknown for that game.
pub fn read_team_games<P: AsRef<Path>>(path: P) -> Result<Vec<TeamGame>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;
    let header = Header::new(reader.headers()?);
    header.require("team_games", &TEAM_GAME_KEY_COLUMNS)?;

    let metric_cols: Vec<&str> = ROLLING_METRICS
        .iter()
        .copied()
        .filter(|m| header.index.contains_key(*m))
        .collect();

    let mut games = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let line = line_of(&row, i + 2);

        let mut metrics = BTreeMap::new();
        for &metric in &metric_cols {
            let raw = header.cell(&row, metric);
            if !raw.is_empty() {
                metrics.insert(metric.to_string(), parse_number(raw, metric, line)?);
            }
        }

        games.push(TeamGame {
            season: parse_integer(header.cell(&row, "season"), "season", line)?,
            round: parse_integer(header.cell(&row, "round"), "round", line)?,
            game_code: parse_game_code(header.cell(&row, "game_code"), line)?,
            team_code: header.cell(&row, "team_code").to_string(),
            opponent_code: header.cell(&row, "opponent_code").to_string(),
            is_home: parse_bool(header.cell(&row, "is_home"), "is_home", line)?,
            tipoff: parse_timestamp(header.cell(&row, "tipoff"), "tipoff", line)?,
            metrics,
        });
    }

    debug!(path = %path.display(), rows = games.len(), metrics = ?metric_cols, "read team games");
    Ok(games)
}
