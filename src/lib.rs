pub mod adapters;
pub mod backtest;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod features;
pub mod ml;
pub mod persistence;

pub use backtest::{
    merge_games_features, run_walkforward, Metrics, Prediction, RoundDiagnostic,
    UpcomingPrediction, WalkForwardConfig, WalkForwardEvaluator, WalkForwardResult,
};
pub use config::AppConfig;
pub use domain::{FeatureSelector, GameCode, GameRecord, GameTable};
pub use error::{ElwfError, Result};
pub use features::{FeatureBuilder, TeamGame};
pub use ml::{BinaryClassifier, GameWinnerModel, LogisticRegression, ProbabilityModel};
