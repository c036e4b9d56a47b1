//! Error types for scoring configuration

use thiserror::Error;

/// Errors raised while validating or loading a [`crate::ScoringConfig`]
#[derive(Error, Debug)]
pub enum ScoringConfigError {
    /// Weights in a group do not sum to 1
    #[error("Weights for {group} sum to {sum}, expected 1.0")]
    WeightSum {
        /// Group being checked ("categories" or a category name)
        group: String,
        /// Actual sum
        sum: f64,
    },

    /// A weight, threshold, or default is out of range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// A metric policy is missing or listed twice
    #[error("Metric policy error: {0}")]
    Policy(String),

    /// A penalty curve is malformed or not monotonic
    #[error("Invalid penalty curve for {metric}: {reason}")]
    Curve {
        /// Metric the curve belongs to
        metric: String,
        /// What is wrong with it
        reason: String,
    },

    /// TOML parsing/serialization failed
    #[error("TOML error: {0}")]
    Toml(String),
}
