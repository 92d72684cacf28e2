use serde::Serialize;

use super::metrics::Metrics;
use crate::domain::GameCode;

/// Out-of-sample prediction for a game with a known outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub season: i64,
    pub round: i64,
    pub game_code: GameCode,
    /// True outcome (1 = home win)
    pub label: u8,
    pub p_home_win: f64,
}

/// One entry per visited round, in round order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundDiagnostic {
    pub round: i64,
    pub train_size: usize,
    pub test_size: usize,
    pub skipped: bool,
    /// Empty unless skipped
    pub reason: String,
    /// Present for trained rounds with at least one test game
    pub metrics: Option<Metrics>,
}

impl RoundDiagnostic {
    pub fn skipped(round: i64, train_size: usize, test_size: usize, reason: String) -> Self {
        Self {
            round,
            train_size,
            test_size,
            skipped: true,
            reason,
            metrics: None,
        }
    }

    pub fn trained(round: i64, train_size: usize, test_size: usize, metrics: Option<Metrics>) -> Self {
        Self {
            round,
            train_size,
            test_size,
            skipped: false,
            reason: String::new(),
            metrics,
        }
    }
}

/// Prediction for a fixture without a known outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingPrediction {
    pub season: i64,
    /// Present when the fixtures table carries the round column
    pub round: Option<i64>,
    pub game_code: GameCode,
    pub p_home_win: f64,
    pub is_future: bool,
}

/// Everything a walk-forward run produces.
#[derive(Debug, Clone, Serialize)]
pub struct WalkForwardResult {
    /// Columns the classifier was trained on, in matrix order
    pub feature_cols: Vec<String>,
    pub predictions: Vec<Prediction>,
    pub metrics: Metrics,
    pub rounds: Vec<RoundDiagnostic>,
    pub upcoming: Option<Vec<UpcomingPrediction>>,
}

impl WalkForwardResult {
    pub fn trained_rounds(&self) -> impl Iterator<Item = &RoundDiagnostic> {
        self.rounds.iter().filter(|r| !r.skipped)
    }

    pub fn skipped_rounds(&self) -> impl Iterator<Item = &RoundDiagnostic> {
        self.rounds.iter().filter(|r| r.skipped)
    }

    /// Round whose model scored the upcoming fixtures.
    pub fn last_trained_round(&self) -> Option<i64> {
        self.trained_rounds().last().map(|r| r.round)
    }

    /// One-paragraph human summary.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Walk-forward: {} rounds ({} trained, {} skipped), {} predictions\n\
             logloss={:.4} brier={:.4} acc@0.5={:.3}",
            self.rounds.len(),
            self.trained_rounds().count(),
            self.skipped_rounds().count(),
            self.predictions.len(),
            self.metrics.logloss,
            self.metrics.brier,
            self.metrics.accuracy,
        );
        if let Some(upcoming) = &self.upcoming {
            out.push_str(&format!(
                "\nUpcoming: {} fixtures scored with the round {} model",
                upcoming.len(),
                self.last_trained_round().unwrap_or_default()
            ));
        }
        out
    }
}
