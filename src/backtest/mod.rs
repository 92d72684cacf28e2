//! Walk-forward backtesting of home-win probability models.
//!
//! Provides:
//! - Label/feature assembly with one-to-one join checks
//! - Round-by-round refitting with no look-ahead
//! - Log-loss, Brier score and accuracy over out-of-sample predictions
//! - Scoring of upcoming fixtures with the latest model

pub mod assembly;
pub mod metrics;
pub mod result;
pub mod walkforward;

pub use assembly::{merge_games_features, run_walkforward};
pub use metrics::{Metrics, ACCURACY_THRESHOLD};
pub use result::{Prediction, RoundDiagnostic, UpcomingPrediction, WalkForwardResult};
pub use walkforward::{
    round_slices, RoundSlice, WalkForwardConfig, WalkForwardEvaluator, DEFAULT_MIN_TRAIN_SIZE,
    DEFAULT_ROUND_COL, DEFAULT_TARGET_COL,
};
