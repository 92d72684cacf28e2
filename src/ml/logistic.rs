//! L2-regularised logistic regression.
//!
//! Minimises `0.5 * ||w||^2 + C * sum(logloss_i)` with an unpenalised
//! intercept, using damped Newton steps. The problem is strictly convex once
//! both classes are present, so the fit is deterministic: the same training
//! rows always produce the same coefficients.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::classifier::{BinaryClassifier, FeatureMatrix, ProbabilityModel};
use crate::config::ModelConfig;
use crate::error::{ElwfError, Result};

const ARMIJO: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;
const PIVOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iter: usize,
    /// Gradient tolerance, scaled by the number of training rows
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 2000,
            tol: 1e-6,
        }
    }
}

impl From<&ModelConfig> for LogisticConfig {
    fn from(cfg: &ModelConfig) -> Self {
        Self {
            c: cfg.c,
            max_iter: cfg.max_iter,
            tol: cfg.tol,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LogisticRegression {
    config: LogisticConfig,
}

impl LogisticRegression {
    pub fn new(config: LogisticConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LogisticConfig {
        &self.config
    }

    fn check_inputs(&self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if !(self.config.c.is_finite() && self.config.c > 0.0) {
            return Err(ElwfError::Validation(format!(
                "C must be positive, got {}",
                self.config.c
            )));
        }
        if x.n_rows() != y.len() {
            return Err(ElwfError::InvalidData(format!(
                "{} feature rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(ElwfError::Model("cannot fit on zero rows".to_string()));
        }
        if let Some(bad) = y.iter().find(|&&v| v > 1) {
            return Err(ElwfError::InvalidData(format!("label {bad} is not 0 or 1")));
        }
        let positives = y.iter().filter(|&&v| v == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ElwfError::Model(format!(
                "training labels contain a single class ({} rows, all {})",
                y.len(),
                y[0]
            )));
        }
        Ok(())
    }

    fn objective(&self, x: &FeatureMatrix, y: &[u8], beta: &[f64]) -> f64 {
        let d = x.n_features();
        let penalty: f64 = beta[..d].iter().map(|w| w * w).sum::<f64>() * 0.5;
        let data: f64 = x
            .rows()
            .zip(y)
            .map(|(row, &label)| {
                let z = linear(beta, row);
                log1p_exp(z) - f64::from(label) * z
            })
            .sum();
        penalty + self.config.c * data
    }

    /// Gradient and Hessian of the objective; the intercept is the last slot.
    fn gradient_hessian(&self, x: &FeatureMatrix, y: &[u8], beta: &[f64]) -> (Vec<f64>, Vec<Vec<f64>>) {
        let d = x.n_features();
        let k = d + 1;
        let c = self.config.c;
        let mut grad = vec![0.0; k];
        let mut hess = vec![vec![0.0; k]; k];

        for (row, &label) in x.rows().zip(y) {
            let p = sigmoid(linear(beta, row));
            let r = c * (p - f64::from(label));
            let w = c * p * (1.0 - p);
            for i in 0..k {
                let xi = if i < d { row[i] } else { 1.0 };
                grad[i] += r * xi;
                for j in 0..=i {
                    let xj = if j < d { row[j] } else { 1.0 };
                    hess[i][j] += w * xi * xj;
                }
            }
        }

        for i in 0..k {
            if i < d {
                grad[i] += beta[i];
                hess[i][i] += 1.0;
            }
            for j in 0..i {
                hess[j][i] = hess[i][j];
            }
        }
        (grad, hess)
    }
}

impl BinaryClassifier for LogisticRegression {
    type Model = LogisticModel;

    fn fit(&self, x: &FeatureMatrix, y: &[u8]) -> Result<LogisticModel> {
        self.check_inputs(x, y)?;

        let d = x.n_features();
        let tol = self.config.tol * (y.len() as f64).max(1.0);
        let mut beta = vec![0.0; d + 1];
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.config.max_iter {
            let (grad, hess) = self.gradient_hessian(x, y, &beta);
            let grad_max = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if grad_max <= tol {
                converged = true;
                break;
            }

            let step = solve(hess, grad.clone())?;
            let slope: f64 = grad.iter().zip(&step).map(|(g, s)| g * s).sum();
            let current = self.objective(x, y, &beta);

            let mut t = 1.0;
            let mut candidate: Vec<f64>;
            loop {
                candidate = beta.iter().zip(&step).map(|(b, s)| b - t * s).collect();
                let next = self.objective(x, y, &candidate);
                if next <= current - ARMIJO * t * slope || t < MIN_STEP {
                    break;
                }
                t *= 0.5;
            }
            beta = candidate;
            n_iter += 1;
        }

        if !converged {
            tracing::warn!(
                max_iter = self.config.max_iter,
                rows = y.len(),
                "logistic regression did not converge"
            );
        }

        let intercept = beta[d];
        beta.truncate(d);
        Ok(LogisticModel {
            intercept,
            coefficients: beta,
            n_iter,
            converged,
        })
    }
}

/// Fitted logistic regression coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Newton iterations used
    pub n_iter: usize,
    pub converged: bool,
}

impl LogisticModel {
    /// Load model from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&content)?;
        Ok(model)
    }

    /// Save model to JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Raw logit for one row
    pub fn logit(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

impl ProbabilityModel for LogisticModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.n_features() != self.coefficients.len() {
            return Err(ElwfError::Validation(format!(
                "model expects {} features, got {}",
                self.coefficients.len(),
                x.n_features()
            )));
        }
        Ok(x.rows().map(|row| sigmoid(self.logit(row))).collect())
    }
}

fn linear(beta: &[f64], row: &[f64]) -> f64 {
    let d = row.len();
    beta[d] + beta[..d].iter().zip(row).map(|(w, x)| w * x).sum::<f64>()
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// ln(1 + e^z) without overflow.
fn log1p_exp(z: f64) -> f64 {
    if z > 0.0 {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPS {
            return Err(ElwfError::Model(
                "singular Hessian while fitting logistic regression".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (FeatureMatrix, Vec<u8>) {
        let xs = [-3.0, -2.0, -1.5, -1.0, -0.5, 0.5, 1.0, 1.5, 2.0, 3.0, -0.2, 0.2];
        let ys = [0, 0, 0, 0, 1, 0, 1, 1, 1, 1, 0, 1];
        let rows: Vec<Vec<f64>> = xs.iter().map(|&x| vec![x]).collect();
        (FeatureMatrix::from_rows(1, &rows).unwrap(), ys.to_vec())
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0) < 1e-300);
    }

    #[test]
    fn test_fit_converges_and_learns_direction() {
        let (x, y) = toy();
        let model = LogisticRegression::default().fit(&x, &y).unwrap();

        assert!(model.converged);
        assert!(model.coefficients[0] > 0.0);

        let probs = model.predict_proba(&x).unwrap();
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probs[0] < 0.5);
        assert!(probs[9] > 0.5);
    }

    #[test]
    fn test_gradient_vanishes_at_solution() {
        let (x, y) = toy();
        let clf = LogisticRegression::default();
        let model = clf.fit(&x, &y).unwrap();

        let mut beta = model.coefficients.clone();
        beta.push(model.intercept);
        let (grad, _) = clf.gradient_hessian(&x, &y, &beta);
        assert!(grad.iter().all(|g| g.abs() < 1e-4));
    }

    #[test]
    fn test_stronger_penalty_shrinks_coefficients() {
        let (x, y) = toy();
        let loose = LogisticRegression::default().fit(&x, &y).unwrap();
        let tight = LogisticRegression::new(LogisticConfig {
            c: 0.01,
            ..Default::default()
        })
        .fit(&x, &y)
        .unwrap();
        assert!(tight.coefficients[0].abs() < loose.coefficients[0].abs());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = toy();
        let a = LogisticRegression::default().fit(&x, &y).unwrap();
        let b = LogisticRegression::default().fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class_is_rejected() {
        let x = FeatureMatrix::from_rows(1, &[vec![1.0], vec![2.0]]).unwrap();
        let err = LogisticRegression::default().fit(&x, &[1, 1]).unwrap_err();
        assert!(matches!(err, ElwfError::Model(_)));
    }

    #[test]
    fn test_label_count_mismatch() {
        let x = FeatureMatrix::from_rows(1, &[vec![1.0], vec![2.0]]).unwrap();
        assert!(LogisticRegression::default().fit(&x, &[1]).is_err());
    }

    #[test]
    fn test_predict_checks_width() {
        let model = LogisticModel {
            intercept: 0.0,
            coefficients: vec![1.0, 2.0],
            n_iter: 0,
            converged: true,
        };
        let x = FeatureMatrix::from_rows(1, &[vec![1.0]]).unwrap();
        assert!(model.predict_proba(&x).is_err());
    }

    #[test]
    fn test_save_load_model() {
        let (x, y) = toy();
        let model = LogisticRegression::default().fit(&x, &y).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        model.to_file(&path).unwrap();
        let loaded = LogisticModel::from_file(&path).unwrap();
        assert!((model.intercept - loaded.intercept).abs() < 1e-12);
        assert!((model.coefficients[0] - loaded.coefficients[0]).abs() < 1e-12);
        assert_eq!(model.n_iter, loaded.n_iter);
    }

    #[test]
    fn test_solve_small_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let x = solve(a, vec![3.0, 5.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.4).abs() < 1e-12);
    }
}
