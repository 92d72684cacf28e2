use std::fmt;
use std::sync::Arc;

use super::game::GameTable;
use crate::error::{ElwfError, Result};

/// Default marker for model input columns produced by the feature builder.
pub const DEFAULT_FEATURE_PREFIX: &str = "f_";

/// Chooses which table columns feed the classifier.
#[derive(Clone)]
pub enum FeatureSelector {
    /// Every value column whose name starts with the prefix.
    Prefix(String),
    /// Exactly these columns, in this order.
    Explicit(Vec<String>),
    /// Every value column accepted by the predicate.
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FeatureSelector {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        FeatureSelector::Prefix(prefix.into())
    }

    pub fn explicit<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureSelector::Explicit(columns.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        FeatureSelector::Predicate(Arc::new(f))
    }

    /// Whether `column` would be used as a feature, ignoring reserved names.
    pub fn accepts(&self, column: &str) -> bool {
        match self {
            FeatureSelector::Prefix(prefix) => column.starts_with(prefix.as_str()),
            FeatureSelector::Explicit(cols) => cols.iter().any(|c| c == column),
            FeatureSelector::Predicate(f) => f(column),
        }
    }

    /// Resolve to concrete column names.
    ///
    /// `reserved` columns (label, round) are never auto-detected. Explicit
    /// lists are checked against `table`; a missing column is a schema error.
    pub fn resolve(&self, table: &GameTable, table_name: &str, reserved: &[&str]) -> Result<Vec<String>> {
        let columns = match self {
            FeatureSelector::Explicit(cols) => {
                table.require_columns(table_name, cols)?;
                cols.clone()
            }
            _ => table
                .columns()
                .iter()
                .filter(|c| !reserved.contains(&c.as_str()) && self.accepts(c.as_str()))
                .cloned()
                .collect(),
        };

        if columns.is_empty() {
            return Err(ElwfError::Validation(format!(
                "no feature columns selected from {table_name} using {self:?}"
            )));
        }
        Ok(columns)
    }
}

impl Default for FeatureSelector {
    fn default() -> Self {
        FeatureSelector::Prefix(DEFAULT_FEATURE_PREFIX.to_string())
    }
}

impl fmt::Debug for FeatureSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSelector::Prefix(p) => write!(f, "Prefix({p:?})"),
            FeatureSelector::Explicit(cols) => write!(f, "Explicit({cols:?})"),
            FeatureSelector::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GameRecord;

    fn table() -> GameTable {
        GameTable::from_records(
            ["round", "y_home_win", "f_pace_diff", "f_ftr_diff", "elo_diff"],
            vec![GameRecord::new(2023, 1)
                .with("round", 1.0)
                .with("y_home_win", 1.0)
                .with("f_pace_diff", 0.2)
                .with("f_ftr_diff", -0.1)
                .with("elo_diff", 12.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_prefix_detection_keeps_column_order() {
        let cols = FeatureSelector::default()
            .resolve(&table(), "games", &["y_home_win", "round"])
            .unwrap();
        assert_eq!(cols, vec!["f_pace_diff", "f_ftr_diff"]);
    }

    #[test]
    fn test_predicate_skips_reserved_columns() {
        let cols = FeatureSelector::predicate(|c| c != "f_ftr_diff")
            .resolve(&table(), "games", &["y_home_win", "round"])
            .unwrap();
        assert_eq!(cols, vec!["f_pace_diff", "elo_diff"]);
    }

    #[test]
    fn test_explicit_list_must_exist() {
        let err = FeatureSelector::explicit(["elo_diff", "f_missing"])
            .resolve(&table(), "games", &[])
            .unwrap_err();
        assert!(matches!(err, ElwfError::MissingColumns { .. }));
        assert!(err.to_string().contains("f_missing"));
    }

    #[test]
    fn test_accepts_matches_each_mode() {
        assert!(FeatureSelector::default().accepts("f_pace_diff"));
        assert!(!FeatureSelector::default().accepts("elo_diff"));
        assert!(FeatureSelector::explicit(["elo_diff"]).accepts("elo_diff"));
        assert!(!FeatureSelector::explicit(["elo_diff"]).accepts("f_pace_diff"));
        assert!(FeatureSelector::predicate(|c| c.ends_with("_diff")).accepts("elo_diff"));
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        let err = FeatureSelector::prefix("x_")
            .resolve(&table(), "games", &[])
            .unwrap_err();
        assert!(matches!(err, ElwfError::Validation(_)));
    }
}
