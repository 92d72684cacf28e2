//! Matchup feature construction from per-team game lines.

pub mod builder;
pub mod team_game;

pub use builder::{FeatureBuilder, TeamForm, DEFAULT_WINDOW};
pub use team_game::{TeamGame, ROLLING_METRICS, TEAM_GAME_KEY_COLUMNS};
