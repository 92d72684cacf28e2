use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub evaluation: EvaluationConfig,
    pub model: ModelConfig,
    pub features: FeaturesConfig,
    pub single_split: SingleSplitConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub euroleague: EuroleagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationConfig {
    /// Binary label column (1 = home win)
    pub target_col: String,
    /// Column used as the chronological round axis
    pub round_col: String,
    /// Prefix that marks model input columns
    pub feature_prefix: String,
    /// Explicit feature columns (overrides prefix detection when non-empty)
    #[serde(default)]
    pub feature_cols: Vec<String>,
    /// Rounds with fewer prior training rows are skipped
    pub min_train_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Maximum Newton iterations
    pub max_iter: usize,
    /// Gradient tolerance for convergence
    pub tol: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    /// Rolling look-back window in games
    pub window: usize,
    /// Prefix written on generated feature columns
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SingleSplitConfig {
    /// Minimum rows required by the static fit helper
    pub min_rows: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for generated artifacts
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Optional directory for daily rotated log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EuroleagueConfig {
    /// Competition code used by the provider (E = EuroLeague)
    #[serde(default = "default_competition_code")]
    pub competition_code: String,
    /// Root of the raw JSON payload cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for EuroleagueConfig {
    fn default() -> Self {
        Self {
            competition_code: default_competition_code(),
            cache_dir: default_cache_dir(),
        }
    }
}

fn default_competition_code() -> String {
    "E".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("evaluation.target_col", "y_home_win")?
            .set_default("evaluation.round_col", "round")?
            .set_default("evaluation.feature_prefix", "f_")?
            .set_default("evaluation.min_train_size", 20)?
            .set_default("model.c", 1.0)?
            .set_default("model.max_iter", 2000)?
            .set_default("model.tol", 1e-6)?
            .set_default("features.window", 5)?
            .set_default("features.prefix", "f_")?
            .set_default("single_split.min_rows", 20)?
            .set_default("output.dir", "artifacts")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("ELWF_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (ELWF__EVALUATION__MIN_TRAIN_SIZE, etc.)
            .add_source(
                Environment::with_prefix("ELWF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.evaluation.target_col.trim().is_empty() {
            errors.push("evaluation.target_col must not be empty".to_string());
        }

        if self.evaluation.round_col.trim().is_empty() {
            errors.push("evaluation.round_col must not be empty".to_string());
        }

        if self.evaluation.target_col == self.evaluation.round_col {
            errors.push("evaluation.target_col and evaluation.round_col must differ".to_string());
        }

        if self.evaluation.feature_cols.is_empty() && self.evaluation.feature_prefix.is_empty() {
            errors.push(
                "evaluation.feature_prefix must be set when feature_cols is empty".to_string(),
            );
        }

        // features writes columns that walkforward auto-detects by prefix
        if self.evaluation.feature_cols.is_empty()
            && self.features.prefix != self.evaluation.feature_prefix
        {
            errors.push(format!(
                "features.prefix ({:?}) must match evaluation.feature_prefix ({:?}) when feature_cols is empty",
                self.features.prefix, self.evaluation.feature_prefix
            ));
        }

        if self.evaluation.min_train_size == 0 {
            errors.push("evaluation.min_train_size must be at least 1".to_string());
        }

        if !(self.model.c.is_finite() && self.model.c > 0.0) {
            errors.push(format!("model.c must be positive, got {}", self.model.c));
        }

        if self.model.max_iter == 0 {
            errors.push("model.max_iter must be at least 1".to_string());
        }

        if !(self.model.tol.is_finite() && self.model.tol > 0.0) {
            errors.push(format!("model.tol must be positive, got {}", self.model.tol));
        }

        if self.euroleague.competition_code.trim().is_empty() {
            errors.push("euroleague.competition_code must not be empty".to_string());
        }

        if self.features.window == 0 {
            errors.push("features.window must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
