//! Binary classification for home-win probabilities.
//!
//! Dependency-light and deterministic: the default classifier is an
//! L2-regularised logistic regression fitted in-process.

pub mod classifier;
pub mod game_model;
pub mod logistic;

pub use classifier::{BinaryClassifier, FeatureMatrix, ProbabilityModel};
pub use game_model::{GameWinnerModel, SavedGameModel};
pub use logistic::{sigmoid, LogisticConfig, LogisticModel, LogisticRegression};
