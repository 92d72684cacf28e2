//! elwf CLI
//!
//! Commands:
//! - `elwf walkforward` - Walk-forward evaluation of labelled games
//! - `elwf features`    - Build matchup features from team box scores
//! - `elwf fit`         - Fit a single static model
//! - `elwf predict`     - Score games with a saved model
//! - `elwf games`       - Export cached season schedules as one JSON list

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

/// EuroLeague walk-forward evaluation toolkit
#[derive(Parser, Debug)]
#[command(name = "elwf")]
#[command(author, version, about = "Walk-forward evaluation of home-win probability models")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration directory (default.toml plus the $ELWF_ENV overlay)
    #[arg(short, long, global = true, env = "ELWF_CONFIG_DIR", default_value = "config")]
    pub config: PathBuf,

    /// Log level override (RUST_LOG still takes precedence)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate round by round: train on earlier rounds, predict the current one
    Walkforward(WalkforwardArgs),

    /// Build per-game feature differences from team-game box scores
    Features(FeaturesArgs),

    /// Fit one model on a labelled table and save it as JSON
    Fit(FitArgs),

    /// Score a table with a model saved by `fit`
    Predict(PredictArgs),

    /// Collect cached season game lists for the configured competition
    Games(GamesArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WalkforwardArgs {
    /// CSV with season, game_code, round and the label column
    pub games: PathBuf,

    /// CSV with season, game_code and feature columns
    pub features: PathBuf,

    /// Predictions CSV; metrics, rounds and upcoming files are written beside it
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Fixtures without results, scored with the last trained model
    #[arg(long)]
    pub upcoming: Option<PathBuf>,

    /// Minimum prior games before a round is evaluated
    #[arg(long)]
    pub min_train_size: Option<usize>,

    /// Label column (1 = home win)
    #[arg(long)]
    pub target: Option<String>,

    /// Column used as the round axis
    #[arg(long)]
    pub round_col: Option<String>,

    /// Explicit feature columns, comma separated
    #[arg(long = "features", value_delimiter = ',')]
    pub feature_cols: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub struct FeaturesArgs {
    /// CSV with one row per team per game
    pub team_games: PathBuf,

    /// Rolling window in games
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Output CSV
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    /// Labelled CSV with feature columns
    pub table: PathBuf,

    /// Where to save the fitted model
    #[arg(long)]
    pub model_out: PathBuf,

    /// Label column (1 = home win)
    #[arg(long)]
    pub target: Option<String>,

    /// Minimum rows required to fit
    #[arg(long)]
    pub min_rows: Option<usize>,

    /// Explicit feature columns, comma separated
    #[arg(long = "features", value_delimiter = ',')]
    pub feature_cols: Option<Vec<String>>,
}

#[derive(Args, Debug, Clone)]
pub struct PredictArgs {
    /// CSV with the model's feature columns
    pub table: PathBuf,

    /// Model saved by `fit`
    #[arg(long)]
    pub model: PathBuf,

    /// Output CSV (season, game_code, p_home_win)
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct GamesArgs {
    /// Seasons to collect, in output order
    #[arg(required = true, num_args = 1..)]
    pub seasons: Vec<i64>,

    /// Competition code (defaults to euroleague.competition_code)
    #[arg(long)]
    pub competition: Option<String>,

    /// Output JSON file
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl Commands {
    pub fn run(self, config: &AppConfig) -> anyhow::Result<()> {
        match self {
            Self::Walkforward(args) => commands::walkforward(args, config).map(|_| ()),
            Self::Features(args) => commands::features(args, config),
            Self::Fit(args) => commands::fit(args, config),
            Self::Predict(args) => commands::predict(args),
            Self::Games(args) => commands::games(args, config).map(|_| ()),
        }
    }
}
