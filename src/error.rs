//! Error types for schema compilation and rule registration

use thiserror::Error;

/// Result type for schema and registry operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Compile-time and registration errors.
///
/// These are programmer errors raised while building a schema or registering
/// a rule. Validation findings about record data are never reported through
/// this type; see [`crate::validator::ValidationErrors`].
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema for '{path}': {reason}")]
    InvalidSchema { path: String, reason: String },

    #[error("Unknown validation rule: {0}")]
    UnknownRule(String),

    #[error("Validation rule already registered: {0}")]
    DuplicateRule(String),

    #[error("Invalid attribute path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl SchemaError {
    pub(crate) fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidSchema {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn bad_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
