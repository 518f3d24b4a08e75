//! Error types for vantage_core

use thiserror::Error;

/// Errors raised while building a custom blend curve
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveError {
    /// A keyframed curve needs at least two keys
    #[error("curve needs at least 2 keys, got {0}")]
    TooFewKeys(usize),

    /// Key times must strictly increase
    #[error("curve key {index} is not after the previous key")]
    Unordered { index: usize },

    /// Key time or value is NaN or infinite
    #[error("curve key {index} is not finite")]
    NonFinite { index: usize },
}

/// Result type for vantage_core operations
pub type Result<T> = std::result::Result<T, CurveError>;
