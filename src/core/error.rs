/// splitdb Error Module
///
/// This module defines the error type shared by configuration lookup,
/// credential resolution, driver dispatch and query execution.
use thiserror::Error;

/// Comprehensive error type for splitdb.
///
/// Only the terminal failure of an operation reaches the caller. The
/// `ConfigKeyMissing` variant is also used internally to drive the
/// write/read/general credential fallback chain.
#[derive(Error, Debug)]
pub enum DbError {
    /// A requested configuration key does not exist
    #[error("Configuration key not found: {group}.{key}")]
    ConfigKeyMissing { group: String, key: String },

    /// A configuration source could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A credential string is malformed
    #[error("Invalid credential {key}: {reason}")]
    InvalidCredential { key: String, reason: String },

    /// No registered driver matches the configured driver name
    #[error("Unknown database driver: {0}")]
    UnknownDriver(String),

    /// The native client failed to open a handle
    #[error("Connection error ({database}): {source}")]
    Connection {
        database: String,
        #[source]
        source: rusqlite::Error,
    },

    /// The native client failed to prepare or execute a statement
    #[error("Execution error: {source} [{sql}]")]
    Execution {
        sql: String,
        #[source]
        source: rusqlite::Error,
    },

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Builds a `ConfigKeyMissing` error for `group`/`key`.
    pub fn key_missing(group: impl Into<String>, key: impl Into<String>) -> Self {
        DbError::ConfigKeyMissing {
            group: group.into(),
            key: key.into(),
        }
    }

    pub(crate) fn execution(sql: &str, source: rusqlite::Error) -> Self {
        DbError::Execution {
            sql: sql.to_string(),
            source,
        }
    }

    /// Whether this error is the "key not found" signal of a configuration lookup.
    pub fn is_key_missing(&self) -> bool {
        matches!(self, DbError::ConfigKeyMissing { .. })
    }
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;
