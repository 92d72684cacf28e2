//! Classifier seam: a dense feature matrix plus the fit/predict traits.

use crate::domain::GameRecord;
use crate::error::{ElwfError, Result};

/// Dense row-major feature matrix. All values are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_features: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Build from pre-assembled rows; every row must have `n_features` values.
    pub fn from_rows(n_features: usize, rows: &[Vec<f64>]) -> Result<Self> {
        if n_features == 0 {
            return Err(ElwfError::Validation(
                "feature matrix needs at least one column".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(rows.len() * n_features);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(ElwfError::InvalidData(format!(
                    "row {i} has {} features, expected {n_features}",
                    row.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ElwfError::InvalidData(format!(
                    "row {i} feature {j} is not finite ({})",
                    row[j]
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { n_features, data })
    }

    /// Gather `columns` from each record, in order.
    pub fn from_records<'a, I>(records: I, columns: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = &'a GameRecord>,
    {
        if columns.is_empty() {
            return Err(ElwfError::Validation(
                "feature matrix needs at least one column".to_string(),
            ));
        }
        let mut data = Vec::new();
        for record in records {
            for column in columns {
                let value = record.get(column).ok_or_else(|| {
                    ElwfError::missing_columns("features", [column.as_str()])
                })?;
                if !value.is_finite() {
                    return Err(ElwfError::InvalidData(format!(
                        "feature {column} is not finite ({value}) for game {} (season {})",
                        record.game_code, record.season
                    )));
                }
                data.push(value);
            }
        }
        Ok(Self {
            n_features: columns.len(),
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.data.len() / self.n_features
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_features..(i + 1) * self.n_features]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_features)
    }

    /// Copy of the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.n_features);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            n_features: self.n_features,
            data,
        }
    }
}

/// A trainable binary classifier. Each `fit` call starts from scratch.
pub trait BinaryClassifier {
    type Model: ProbabilityModel;

    /// Fit on `x` with labels in {0, 1}.
    fn fit(&self, x: &FeatureMatrix, y: &[u8]) -> Result<Self::Model>;
}

/// A fitted model producing P(label = 1) per row.
pub trait ProbabilityModel {
    fn n_features(&self) -> usize;

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_round_trip_layout() {
        let m = FeatureMatrix::from_rows(2, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.rows().count(), 2);
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = FeatureMatrix::from_rows(1, &[vec![f64::NAN]]).unwrap_err();
        assert!(matches!(err, ElwfError::InvalidData(_)));

        let record = GameRecord::new(2023, 4).with("f_pace_diff", f64::INFINITY);
        let err = FeatureMatrix::from_records([&record], &["f_pace_diff".to_string()]).unwrap_err();
        assert!(err.to_string().contains("f_pace_diff"));
    }

    #[test]
    fn test_empty_record_set_is_valid() {
        let m = FeatureMatrix::from_records(std::iter::empty(), &["f_a".to_string()]).unwrap();
        assert_eq!(m.n_rows(), 0);
        assert!(m.is_empty());
    }
}
