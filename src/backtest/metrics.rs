//! Proper scoring rules for binary probability forecasts.
//!
//! ```text
//! logloss  = -mean(y * ln(p) + (1 - y) * ln(1 - p))    p clipped to [eps, 1 - eps]
//! brier    = mean((p - y)^2)
//! acc@0.5  = mean(1[p >= 0.5] == y)
//! ```
//!
//! The same functions score a single round and the full out-of-sample set.

use serde::{Deserialize, Serialize};

/// Fixed decision threshold for accuracy.
pub const ACCURACY_THRESHOLD: f64 = 0.5;

/// Probabilities are clipped away from 0 and 1 before taking logs.
const LOG_EPS: f64 = f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub logloss: f64,
    pub brier: f64,
    #[serde(rename = "acc@0.5")]
    pub accuracy: f64,
    /// Number of scored games
    pub n: usize,
}

impl Metrics {
    /// Score `(label, probability)` pairs; `None` when there are no pairs.
    pub fn compute<I>(pairs: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u8, f64)>,
    {
        let mut n = 0usize;
        let mut log_sum = 0.0;
        let mut sq_sum = 0.0;
        let mut hits = 0usize;

        for (label, p) in pairs {
            let y = f64::from(label);
            let clipped = p.clamp(LOG_EPS, 1.0 - LOG_EPS);
            log_sum += -(y * clipped.ln() + (1.0 - y) * (1.0 - clipped).ln());
            sq_sum += (p - y).powi(2);
            if u8::from(p >= ACCURACY_THRESHOLD) == label {
                hits += 1;
            }
            n += 1;
        }

        if n == 0 {
            return None;
        }
        let count = n as f64;
        Some(Self {
            logloss: log_sum / count,
            brier: sq_sum / count,
            accuracy: hits as f64 / count,
            n,
        })
    }
}
