//! Label/feature merge ahead of walk-forward evaluation.

use std::collections::HashMap;
use tracing::info;

use super::result::WalkForwardResult;
use super::walkforward::WalkForwardEvaluator;
use crate::domain::{GameCode, GameRecord, GameTable};
use crate::error::{ElwfError, Result};
use crate::ml::BinaryClassifier;

type GameKey = (i64, GameCode);

fn index_unique<'a>(table: &'a GameTable, name: &str) -> Result<HashMap<GameKey, &'a GameRecord>> {
    let mut index = HashMap::with_capacity(table.len());
    for record in table.records() {
        let key = (record.season, record.game_code.clone());
        if index.insert(key, record).is_some() {
            return Err(ElwfError::JoinCardinality(format!(
                "duplicate game {} (season {}) in {name} table",
                record.game_code, record.season
            )));
        }
    }
    Ok(index)
}

fn unmatched(from: &GameTable, other: &HashMap<GameKey, &GameRecord>) -> Vec<String> {
    from.records()
        .iter()
        .filter(|r| !other.contains_key(&(r.season, r.game_code.clone())))
        .map(|r| format!("{}/{}", r.season, r.game_code))
        .collect()
}

/// Inner join of labels and features on `(season, game_code)`.
///
/// The join must be one-to-one: duplicates on either side, or a game present
/// on only one side, fail before anything is evaluated. Columns present in
/// both tables must agree. The merged table is sorted chronologically.
pub fn merge_games_features(games: &GameTable, features: &GameTable, round_col: &str) -> Result<GameTable> {
    let game_index = index_unique(games, "games")?;
    let feature_index = index_unique(features, "features")?;

    for (side, missing) in [
        ("features", unmatched(games, &feature_index)),
        ("games", unmatched(features, &game_index)),
    ] {
        if !missing.is_empty() {
            return Err(ElwfError::JoinCardinality(format!(
                "{} game(s) have no counterpart in the {side} table (first: {})",
                missing.len(),
                missing[0]
            )));
        }
    }

    let shared: Vec<&String> = features
        .columns()
        .iter()
        .filter(|c| games.columns().contains(c))
        .collect();
    let mut columns: Vec<String> = games.columns().to_vec();
    columns.extend(
        features
            .columns()
            .iter()
            .filter(|c| !games.columns().contains(c))
            .cloned(),
    );

    let mut merged = Vec::with_capacity(games.len());
    for game in games.records() {
        let feature_row = feature_index[&(game.season, game.game_code.clone())];
        for column in &shared {
            let (a, b) = (game.get(column), feature_row.get(column));
            if a != b {
                return Err(ElwfError::InvalidData(format!(
                    "column {column} disagrees for game {} (season {}): {a:?} vs {b:?}",
                    game.game_code, game.season
                )));
            }
        }
        let mut record = game.clone();
        for (column, value) in feature_row.values() {
            record.set(column, *value);
        }
        merged.push(record);
    }

    let mut table = GameTable::from_records(columns, merged)?;
    table.sort_chronological(round_col)?;
    info!(
        games = table.len(),
        columns = table.columns().len(),
        "merged labels and features"
    );
    Ok(table)
}

/// Merge labels with features, then evaluate walk-forward.
pub fn run_walkforward<C: BinaryClassifier>(
    games: &GameTable,
    features: &GameTable,
    evaluator: &WalkForwardEvaluator<C>,
    upcoming: Option<&GameTable>,
) -> Result<WalkForwardResult> {
    let merged = merge_games_features(games, features, &evaluator.config().round_col)?;
    evaluator.evaluate(&merged, upcoming)
}
