use thiserror::Error;

/// Main error type for the walk-forward toolkit
#[derive(Error, Debug)]
pub enum ElwfError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    // Schema errors
    #[error("Missing required columns in {table}: {}", .columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Join cardinality violation: {0}")]
    JoinCardinality(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    // Evaluation errors
    #[error(
        "No evaluable rounds: all {rounds_visited} rounds had fewer than {min_train_size} training rows"
    )]
    NoEvaluableRounds {
        rounds_visited: usize,
        min_train_size: usize,
    },

    #[error("Model not fitted")]
    NotFitted,

    #[error("Model error: {0}")]
    Model(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ElwfError {
    pub fn missing_columns<I, S>(table: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ElwfError::MissingColumns {
            table: table.to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result type alias for ElwfError
pub type Result<T> = std::result::Result<T, ElwfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_names_every_column() {
        let err = ElwfError::missing_columns("upcoming", ["f_pace_diff", "f_ftr_diff"]);
        assert_eq!(
            err.to_string(),
            "Missing required columns in upcoming: f_pace_diff, f_ftr_diff"
        );
    }

    #[test]
    fn test_no_evaluable_rounds_message() {
        let err = ElwfError::NoEvaluableRounds {
            rounds_visited: 2,
            min_train_size: 1000,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 rounds"));
        assert!(msg.contains("1000"));
    }
}
