//! Error types for vantage_brain
//!
//! Only configuration loading can fail. The per-tick path resolves every
//! missing camera, unknown override id or absent blend to a default instead.

use std::path::PathBuf;
use thiserror::Error;
use vantage_core::CurveError;

/// Errors raised while loading or validating brain configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A custom blend curve failed validation
    #[error("blend '{from}' -> '{to}' has an invalid curve: {source}")]
    InvalidCurve {
        from: String,
        to: String,
        #[source]
        source: CurveError,
    },

    /// A custom style blend is missing its keys
    #[error("blend '{from}' -> '{to}' uses the custom style without a curve")]
    MissingCurve { from: String, to: String },

    /// Blend times must be finite and non-negative
    #[error("blend '{from}' -> '{to}' has invalid time {time}")]
    InvalidBlendTime { from: String, to: String, time: f32 },

    /// Custom blend entries need both camera names
    #[error("custom blend #{0} has an empty camera name")]
    EmptyCameraName(usize),
}

/// Result type for vantage_brain configuration
pub type Result<T> = std::result::Result<T, ConfigError>;
