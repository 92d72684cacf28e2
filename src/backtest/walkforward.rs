//! Round-by-round walk-forward evaluation.
//!
//! Flow:
//! 1. Sort games by (season, round, game_code)
//! 2. For each distinct round r, ascending: train on every game with round < r,
//!    test on the games with round == r
//! 3. Rounds with fewer than `min_train_size` training games are recorded and skipped
//! 4. Each trained round fits a fresh classifier; the last fit is kept for
//!    scoring upcoming fixtures
//! 5. Output: out-of-sample predictions, overall and per-round metrics

use tracing::{debug, info, warn};

use super::metrics::Metrics;
use super::result::{Prediction, RoundDiagnostic, UpcomingPrediction, WalkForwardResult};
use crate::config::EvaluationConfig;
use crate::domain::{chronological_cmp, FeatureSelector, GameRecord, GameTable};
use crate::error::{ElwfError, Result};
use crate::ml::{BinaryClassifier, FeatureMatrix, LogisticRegression, ProbabilityModel};

pub const DEFAULT_TARGET_COL: &str = "y_home_win";
pub const DEFAULT_ROUND_COL: &str = "round";
pub const DEFAULT_MIN_TRAIN_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct WalkForwardConfig {
    pub target_col: String,
    pub round_col: String,
    pub features: FeatureSelector,
    /// Inclusive: a round trains when it has at least this many prior games.
    pub min_train_size: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            target_col: DEFAULT_TARGET_COL.to_string(),
            round_col: DEFAULT_ROUND_COL.to_string(),
            features: FeatureSelector::default(),
            min_train_size: DEFAULT_MIN_TRAIN_SIZE,
        }
    }
}

impl From<&EvaluationConfig> for WalkForwardConfig {
    fn from(cfg: &EvaluationConfig) -> Self {
        let features = if cfg.feature_cols.is_empty() {
            FeatureSelector::prefix(cfg.feature_prefix.clone())
        } else {
            FeatureSelector::explicit(cfg.feature_cols.clone())
        };
        Self {
            target_col: cfg.target_col.clone(),
            round_col: cfg.round_col.clone(),
            features,
            min_train_size: cfg.min_train_size,
        }
    }
}

/// Train/test partition of one round, as indices into the sorted games.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSlice {
    pub round: i64,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition for every distinct round in `rounds`, ascending.
///
/// `rounds[i]` is the round of game `i`. Training indices always point at
/// strictly earlier rounds; the history is cumulative, never windowed.
pub fn round_slices(rounds: &[i64]) -> Vec<RoundSlice> {
    let mut axis = rounds.to_vec();
    axis.sort_unstable();
    axis.dedup();

    axis.into_iter()
        .map(|round| {
            let mut train = Vec::new();
            let mut test = Vec::new();
            for (i, &r) in rounds.iter().enumerate() {
                if r < round {
                    train.push(i);
                } else if r == round {
                    test.push(i);
                }
            }
            RoundSlice { round, train, test }
        })
        .collect()
}

pub struct WalkForwardEvaluator<C: BinaryClassifier = LogisticRegression> {
    config: WalkForwardConfig,
    classifier: C,
}

impl WalkForwardEvaluator<LogisticRegression> {
    pub fn logistic(config: WalkForwardConfig) -> Self {
        Self::new(config, LogisticRegression::default())
    }
}

impl<C: BinaryClassifier> WalkForwardEvaluator<C> {
    pub fn new(config: WalkForwardConfig, classifier: C) -> Self {
        Self { config, classifier }
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Run the walk-forward loop over `games`, optionally scoring `upcoming`
    /// fixtures with the model from the last trained round.
    pub fn evaluate(&self, games: &GameTable, upcoming: Option<&GameTable>) -> Result<WalkForwardResult> {
        let cfg = &self.config;
        games.require_columns("games", &[cfg.round_col.as_str(), cfg.target_col.as_str()])?;
        let feature_cols = cfg.features.resolve(
            games,
            "games",
            &[cfg.target_col.as_str(), cfg.round_col.as_str()],
        )?;

        let mut records: Vec<&GameRecord> = games.records().iter().collect();
        records.sort_by(|a, b| chronological_cmp(a, b, &cfg.round_col));

        let rounds = records
            .iter()
            .map(|r| r.round(&cfg.round_col))
            .collect::<Result<Vec<i64>>>()?;
        let labels = records
            .iter()
            .map(|r| r.label(&cfg.target_col))
            .collect::<Result<Vec<u8>>>()?;
        let x_all = FeatureMatrix::from_records(records.iter().copied(), &feature_cols)?;

        info!(
            games = records.len(),
            features = feature_cols.len(),
            min_train_size = cfg.min_train_size,
            "starting walk-forward evaluation"
        );

        let slices = round_slices(&rounds);
        let mut predictions: Vec<Prediction> = Vec::with_capacity(records.len());
        let mut diagnostics: Vec<RoundDiagnostic> = Vec::with_capacity(slices.len());
        let mut latest: Option<C::Model> = None;

        for slice in &slices {
            let train_size = slice.train.len();
            let test_size = slice.test.len();

            let skip_reason = if train_size == 0 {
                Some("no prior games to train on".to_string())
            } else if train_size < cfg.min_train_size {
                Some(format!(
                    "training size {train_size} below min_train_size {}",
                    cfg.min_train_size
                ))
            } else {
                None
            };
            if let Some(reason) = skip_reason {
                debug!(round = slice.round, train_size, test_size, "skipping round");
                diagnostics.push(RoundDiagnostic::skipped(slice.round, train_size, test_size, reason));
                continue;
            }

            let x_train = x_all.select_rows(&slice.train);
            let y_train: Vec<u8> = slice.train.iter().map(|&i| labels[i]).collect();
            let model = self
                .classifier
                .fit(&x_train, &y_train)
                .map_err(|e| match e {
                    ElwfError::Model(msg) => ElwfError::Model(format!("round {}: {msg}", slice.round)),
                    other => other,
                })?;

            let proba = model.predict_proba(&x_all.select_rows(&slice.test))?;
            let start = predictions.len();
            for (&i, &p) in slice.test.iter().zip(&proba) {
                predictions.push(Prediction {
                    season: records[i].season,
                    round: rounds[i],
                    game_code: records[i].game_code.clone(),
                    label: labels[i],
                    p_home_win: p,
                });
            }

            let round_metrics =
                Metrics::compute(predictions[start..].iter().map(|p| (p.label, p.p_home_win)));
            debug!(
                round = slice.round,
                train_size,
                test_size,
                logloss = round_metrics.map(|m| m.logloss),
                "trained round"
            );
            diagnostics.push(RoundDiagnostic::trained(
                slice.round,
                train_size,
                test_size,
                round_metrics,
            ));
            latest = Some(model);
        }

        let no_rounds = || ElwfError::NoEvaluableRounds {
            rounds_visited: diagnostics.len(),
            min_train_size: cfg.min_train_size,
        };
        if predictions.is_empty() {
            warn!(
                rounds = diagnostics.len(),
                min_train_size = cfg.min_train_size,
                "every round was skipped"
            );
            return Err(no_rounds());
        }
        let metrics = Metrics::compute(predictions.iter().map(|p| (p.label, p.p_home_win)))
            .ok_or_else(no_rounds)?;

        let upcoming = match upcoming {
            Some(table) => {
                let model = latest.as_ref().ok_or(ElwfError::NotFitted)?;
                Some(self.score_upcoming(model, table, &feature_cols)?)
            }
            None => None,
        };

        info!(
            rounds = diagnostics.len(),
            predictions = predictions.len(),
            logloss = metrics.logloss,
            brier = metrics.brier,
            accuracy = metrics.accuracy,
            "walk-forward evaluation complete"
        );

        Ok(WalkForwardResult {
            feature_cols,
            predictions,
            metrics,
            rounds: diagnostics,
            upcoming,
        })
    }

    fn score_upcoming(
        &self,
        model: &C::Model,
        table: &GameTable,
        feature_cols: &[String],
    ) -> Result<Vec<UpcomingPrediction>> {
        table.require_columns("upcoming", feature_cols)?;
        let round_col = &self.config.round_col;
        let with_round = table.has_column(round_col);

        let x = FeatureMatrix::from_records(table.records(), feature_cols)?;
        let proba = model.predict_proba(&x)?;

        table
            .records()
            .iter()
            .zip(proba)
            .map(|(record, p)| -> Result<UpcomingPrediction> {
                let round = if with_round {
                    Some(record.round(round_col)?)
                } else {
                    None
                };
                Ok(UpcomingPrediction {
                    season: record.season,
                    round,
                    game_code: record.game_code.clone(),
                    p_home_win: p,
                    is_future: true,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GameCode;

    /// `rounds` rounds of `per_round` games with two noisy features.
    fn season(rounds: i64, per_round: i64) -> GameTable {
        let mut records = Vec::new();
        for r in 1..=rounds {
            for g in 0..per_round {
                let code = r * 100 + g;
                let a = ((code * 37) % 17) as f64 / 17.0 - 0.5;
                let b = ((code * 11) % 13) as f64 / 13.0 - 0.5;
                let y = if a + 0.3 * b + if g % 3 == 0 { 0.4 } else { -0.1 } > 0.0 {
                    1.0
                } else {
                    0.0
                };
                records.push(
                    GameRecord::new(2023, code)
                        .with("round", r as f64)
                        .with("f_a", a)
                        .with("f_b", b)
                        .with("y_home_win", y),
                );
            }
        }
        GameTable::from_records(["round", "f_a", "f_b", "y_home_win"], records).unwrap()
    }

    fn evaluator(min_train_size: usize) -> WalkForwardEvaluator {
        WalkForwardEvaluator::logistic(WalkForwardConfig {
            min_train_size,
            ..Default::default()
        })
    }

    #[test]
    fn test_round_slices_partition() {
        let slices = round_slices(&[1, 1, 2, 3, 3, 3]);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0], RoundSlice { round: 1, train: vec![], test: vec![0, 1] });
        assert_eq!(slices[1], RoundSlice { round: 2, train: vec![0, 1], test: vec![2] });
        assert_eq!(slices[2].train, vec![0, 1, 2]);
        assert_eq!(slices[2].test, vec![3, 4, 5]);
    }

    #[test]
    fn test_round_slices_across_seasons_use_round_value() {
        // season 2023 round 5 precedes season 2024 round 1 in the sorted table
        let slices = round_slices(&[5, 1]);
        assert_eq!(slices[0], RoundSlice { round: 1, train: vec![], test: vec![1] });
        assert_eq!(slices[1], RoundSlice { round: 5, train: vec![1], test: vec![0] });
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        // 19 games before round 2 -> skip; 20 games before round 2 -> train
        let mut records = Vec::new();
        for g in 0..19 {
            records.push(
                GameRecord::new(2023, g)
                    .with("round", 1.0)
                    .with("f_a", g as f64 / 19.0)
                    .with("y_home_win", (g % 2) as f64),
            );
        }
        let round_two = GameRecord::new(2023, 500)
            .with("round", 2.0)
            .with("f_a", 0.3)
            .with("y_home_win", 1.0);
        records.push(round_two.clone());
        let table = GameTable::from_records(["round", "f_a", "y_home_win"], records.clone()).unwrap();
        let err = evaluator(20).evaluate(&table, None).unwrap_err();
        assert!(matches!(err, ElwfError::NoEvaluableRounds { rounds_visited: 2, min_train_size: 20 }));

        records.pop();
        records.push(
            GameRecord::new(2023, 19)
                .with("round", 1.0)
                .with("f_a", 0.9)
                .with("y_home_win", 1.0),
        );
        records.push(round_two);
        let table = GameTable::from_records(["round", "f_a", "y_home_win"], records).unwrap();
        let result = evaluator(20).evaluate(&table, None).unwrap();

        assert!(result.rounds[0].skipped);
        assert!(!result.rounds[1].skipped);
        assert_eq!(result.rounds[1].train_size, 20);
        assert_eq!(result.predictions.len(), 1);
        assert_eq!(result.predictions[0].game_code, GameCode::Numeric(500));
    }

    #[test]
    fn test_skipped_reason_cites_threshold() {
        let result = evaluator(10).evaluate(&season(3, 10), None).unwrap();
        let first = &result.rounds[0];
        assert!(first.skipped);
        assert!(first.reason.contains("min_train_size 10"));
        assert!(first.metrics.is_none());
        assert!(result.rounds[1].reason.is_empty());
        assert!(result.rounds[1].metrics.is_some());
    }

    #[test]
    fn test_per_round_metrics_match_predictions() {
        let result = evaluator(10).evaluate(&season(4, 10), None).unwrap();
        for diag in result.trained_rounds() {
            let pairs: Vec<(u8, f64)> = result
                .predictions
                .iter()
                .filter(|p| p.round == diag.round)
                .map(|p| (p.label, p.p_home_win))
                .collect();
            assert_eq!(pairs.len(), diag.test_size);
            assert_eq!(diag.metrics, Metrics::compute(pairs));
        }
    }

    #[test]
    fn test_missing_target_fails_before_evaluation() {
        let cfg = WalkForwardConfig {
            target_col: "y_away_win".to_string(),
            ..Default::default()
        };
        let err = WalkForwardEvaluator::logistic(cfg)
            .evaluate(&season(3, 10), None)
            .unwrap_err();
        match err {
            ElwfError::MissingColumns { table, columns } => {
                assert_eq!(table, "games");
                assert_eq!(columns, vec!["y_away_win"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_features_restrict_model() {
        let cfg = WalkForwardConfig {
            features: FeatureSelector::explicit(["f_a"]),
            min_train_size: 10,
            ..Default::default()
        };
        let result = WalkForwardEvaluator::logistic(cfg)
            .evaluate(&season(3, 10), None)
            .unwrap();
        assert_eq!(result.feature_cols, vec!["f_a"]);
    }

    #[test]
    fn test_upcoming_missing_feature_is_named() {
        let upcoming = GameTable::from_records(
            ["round", "f_a"],
            vec![GameRecord::new(2023, 999).with("round", 4.0).with("f_a", 0.1)],
        )
        .unwrap();
        let err = evaluator(10)
            .evaluate(&season(3, 10), Some(&upcoming))
            .unwrap_err();
        match err {
            ElwfError::MissingColumns { table, columns } => {
                assert_eq!(table, "upcoming");
                assert_eq!(columns, vec!["f_b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_upcoming_without_round_column() {
        let upcoming = GameTable::from_records(
            ["f_a", "f_b"],
            vec![GameRecord::new(2023, "E2023_999").with("f_a", 0.1).with("f_b", -0.2)],
        )
        .unwrap();
        let result = evaluator(10)
            .evaluate(&season(3, 10), Some(&upcoming))
            .unwrap();
        let upcoming = result.upcoming.unwrap();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].round, None);
        assert!(upcoming[0].is_future);
        assert!((0.0..=1.0).contains(&upcoming[0].p_home_win));
    }

    #[test]
    fn test_no_upcoming_means_none() {
        let result = evaluator(10).evaluate(&season(3, 10), None).unwrap();
        assert!(result.upcoming.is_none());
    }
}
