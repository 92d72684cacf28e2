//! Core tabular domain types shared by the feature builder, the classifier
//! seam and the walk-forward evaluator.

pub mod game;
pub mod selector;

pub use game::{chronological_cmp, GameCode, GameRecord, GameTable, GAME_CODE_COL, SEASON_COL};
pub use selector::{FeatureSelector, DEFAULT_FEATURE_PREFIX};
