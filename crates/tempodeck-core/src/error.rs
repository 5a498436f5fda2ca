//! Core error types for tempodeck-core.
//!
//! Two families live here. Infrastructure failures (`CoreError` and its
//! children) propagate with `?`. Caller misuse that has no destructive
//! effect (`CommandRejected`) is reported back as an ignored command and
//! never aborts anything.

use std::path::PathBuf;
use thiserror::Error;

use crate::countdown::CountdownStatus;

/// Core error type for tempodeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Durable store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup by id failed
    #[error("No {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        CoreError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Durable store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Store is locked")]
    Locked,

    /// Data directory could not be prepared
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg) => {
                if inner.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
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

    /// Key does not exist in the configuration tree
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors for user-supplied values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Time of day outside 00:00..=23:59 or not `HH:MM`
    #[error("Invalid time of day '{0}' (expected HH:MM)")]
    InvalidTime(String),

    /// Weekday index outside 0..=6
    #[error("Invalid weekday index {0} (expected 0-6, 0 = Sunday)")]
    InvalidWeekday(u8),

    /// Empty text where content is required
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// A command the engine refused without changing any state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRejected {
    /// Non-positive duration passed to `start`.
    #[error("duration must be positive")]
    InvalidDuration,

    /// Duration too long to place a deadline for.
    #[error("duration exceeds the supported range")]
    DurationOutOfRange,

    /// Command not valid from the current status.
    #[error("cannot {command} while {from}")]
    InvalidTransition {
        command: &'static str,
        from: CountdownStatus,
    },
}

/// A durable record that could not be decoded into a valid state.
///
/// Only ever produced inside the reconciler, which heals it to the
/// default value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("corrupt persisted state: {0}")]
pub struct CorruptPersistedState(pub String);

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
