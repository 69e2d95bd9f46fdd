//! Core error types for timeflow-core.
//!
//! This module defines the error hierarchy using thiserror. Input and
//! validation errors are recoverable and leave the engine untouched;
//! `InvariantViolation` marks an internal bug and is only logged.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timeflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Bad user input at start (zero or unparseable duration)
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Settings field rejected by range validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration persistence errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal consistency check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised when the timer cannot be started from the given input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInputError {
    /// The requested countdown adds up to zero seconds.
    #[error("timer duration is zero")]
    ZeroDuration,

    /// The time text could not be parsed.
    #[error("cannot parse '{0}' as a duration (expected H:M:S, M:S or S)")]
    Unparseable(String),

    /// Mode name not one of timer, stopwatch, pomodoro.
    #[error("unknown mode '{0}' (expected timer, stopwatch or pomodoro)")]
    UnknownMode(String),
}

/// Settings validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Numeric field outside its allowed range
    #[error("'{field}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Sound id not in the known set
    #[error("unknown sound '{0}'")]
    UnknownSound(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Key not present in the settings record
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Value text could not be converted to the key's type
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
