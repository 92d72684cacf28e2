//! File formats for inputs and artifacts
//!
//! - CSV game tables and team-game box scores
//! - Walk-forward reports (predictions, metrics, round diagnostics, upcoming)
//! - JSON cache for raw provider payloads

pub mod csv_table;
pub mod json_cache;
pub mod report;

pub use csv_table::{read_game_table, read_game_table_with, read_team_games, write_game_table};
pub use json_cache::JsonCache;
pub use report::{
    read_metrics_json, write_metrics_json, write_predictions, write_report, write_rounds,
    write_scores, write_upcoming, ReportPaths,
};
