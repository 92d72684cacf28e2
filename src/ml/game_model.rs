//! Home-win model fitted once on a static frame.
//!
//! Unlike the walk-forward evaluator this helper has no notion of rounds: it
//! fits on whatever table it is handed, subject to its own `min_rows` floor.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use super::classifier::{BinaryClassifier, FeatureMatrix, ProbabilityModel};
use super::logistic::{LogisticModel, LogisticRegression};
use crate::domain::{FeatureSelector, GameTable};
use crate::error::{ElwfError, Result};

pub const DEFAULT_MIN_ROWS: usize = 20;

pub struct GameWinnerModel<C: BinaryClassifier = LogisticRegression> {
    classifier: C,
    selector: FeatureSelector,
    min_rows: usize,
    feature_cols: Vec<String>,
    fitted: Option<C::Model>,
}

impl GameWinnerModel<LogisticRegression> {
    pub fn logistic() -> Self {
        Self::new(LogisticRegression::default())
    }
}

impl<C: BinaryClassifier> GameWinnerModel<C> {
    pub fn new(classifier: C) -> Self {
        Self {
            classifier,
            selector: FeatureSelector::default(),
            min_rows: DEFAULT_MIN_ROWS,
            feature_cols: Vec::new(),
            fitted: None,
        }
    }

    pub fn with_selector(mut self, selector: FeatureSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn feature_cols(&self) -> &[String] {
        &self.feature_cols
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn fitted(&self) -> Option<&C::Model> {
        self.fitted.as_ref()
    }

    /// Fit on every row of `table`, replacing any previous fit.
    pub fn fit(&mut self, table: &GameTable, target_col: &str) -> Result<()> {
        table.require_columns("training", &[target_col])?;
        let feature_cols = self.selector.resolve(table, "training", &[target_col])?;

        if table.len() < self.min_rows {
            return Err(ElwfError::Validation(format!(
                "training table has {} rows, need at least {}",
                table.len(),
                self.min_rows
            )));
        }

        let labels = table
            .records()
            .iter()
            .map(|r| r.label(target_col))
            .collect::<Result<Vec<u8>>>()?;
        let x = FeatureMatrix::from_records(table.records(), &feature_cols)?;
        let model = self.classifier.fit(&x, &labels)?;

        info!(
            rows = table.len(),
            features = feature_cols.len(),
            "fitted game winner model"
        );
        self.feature_cols = feature_cols;
        self.fitted = Some(model);
        Ok(())
    }

    /// P(home win) for each row of `table`.
    pub fn predict_proba(&self, table: &GameTable) -> Result<Vec<f64>> {
        let model = self.fitted.as_ref().ok_or(ElwfError::NotFitted)?;
        table.require_columns("prediction", &self.feature_cols)?;
        let x = FeatureMatrix::from_records(table.records(), &self.feature_cols)?;
        model.predict_proba(&x)
    }
}

/// On-disk form of a fitted logistic [`GameWinnerModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedGameModel {
    pub target_col: String,
    pub feature_cols: Vec<String>,
    pub model: LogisticModel,
}

impl SavedGameModel {
    pub fn from_model(model: &GameWinnerModel<LogisticRegression>, target_col: &str) -> Result<Self> {
        let fitted = model.fitted().ok_or(ElwfError::NotFitted)?;
        Ok(Self {
            target_col: target_col.to_string(),
            feature_cols: model.feature_cols().to_vec(),
            model: fitted.clone(),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let saved: Self = serde_json::from_str(&content)?;
        if saved.feature_cols.len() != saved.model.coefficients.len() {
            return Err(ElwfError::Validation(format!(
                "saved model lists {} feature columns but has {} coefficients",
                saved.feature_cols.len(),
                saved.model.coefficients.len()
            )));
        }
        Ok(saved)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn predict_proba(&self, table: &GameTable) -> Result<Vec<f64>> {
        table.require_columns("prediction", &self.feature_cols)?;
        let x = FeatureMatrix::from_records(table.records(), &self.feature_cols)?;
        self.model.predict_proba(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GameRecord;

    fn table(n: usize) -> GameTable {
        let records = (0..n)
            .map(|i| {
                let x = i as f64 / n as f64 - 0.5;
                let y = if (i % 4 == 0) ^ (x > 0.0) { 1.0 } else { 0.0 };
                GameRecord::new(2023, i as i64)
                    .with("round", (i / 5) as f64)
                    .with("f_net_diff", x)
                    .with("y_home_win", y)
            })
            .collect();
        GameTable::from_records(["round", "f_net_diff", "y_home_win"], records).unwrap()
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = GameWinnerModel::logistic();
        assert!(matches!(
            model.predict_proba(&table(30)),
            Err(ElwfError::NotFitted)
        ));
    }

    #[test]
    fn test_min_rows_is_enforced() {
        let mut model = GameWinnerModel::logistic();
        let err = model.fit(&table(19), "y_home_win").unwrap_err();
        assert!(matches!(err, ElwfError::Validation(_)));
        assert!(!model.is_fitted());

        model.fit(&table(20), "y_home_win").unwrap();
        assert!(model.is_fitted());
    }

    #[test]
    fn test_fit_detects_prefixed_columns_only() {
        let mut model = GameWinnerModel::logistic().with_min_rows(5);
        model.fit(&table(40), "y_home_win").unwrap();
        assert_eq!(model.feature_cols(), &["f_net_diff".to_string()]);

        let probs = model.predict_proba(&table(40)).unwrap();
        assert_eq!(probs.len(), 40);
    }

    #[test]
    fn test_missing_target_is_schema_error() {
        let mut model = GameWinnerModel::logistic();
        let err = model.fit(&table(30), "y_away_win").unwrap_err();
        assert!(matches!(err, ElwfError::MissingColumns { .. }));
    }

    #[test]
    fn test_saved_model_round_trip() {
        let mut model = GameWinnerModel::logistic();
        model.fit(&table(40), "y_home_win").unwrap();
        let saved = SavedGameModel::from_model(&model, "y_home_win").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game_model.json");
        saved.to_file(&path).unwrap();
        let loaded = SavedGameModel::from_file(&path).unwrap();

        let direct = model.predict_proba(&table(40)).unwrap();
        let reloaded = loaded.predict_proba(&table(40)).unwrap();
        for (a, b) in direct.iter().zip(&reloaded) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
