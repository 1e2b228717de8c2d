//! Error types shared by every Instalarm crate.

use std::fmt::Display;

use thiserror::Error;

/// Result type alias for alarm operations.
pub type AlarmResult<T> = Result<T, AlarmError>;

/// Errors that abort a reconciliation pass.
///
/// None of these are retried internally. The invoking runtime re-runs the
/// whole pass, which is safe because every entry point converges.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// A collaborator call (scaling, alarms, blob storage) did not succeed.
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// A template rendered to invalid data or references an unbound variable.
    #[error("template {key}: {reason}")]
    Template { key: String, reason: String },

    /// A field's raw text cannot be coerced to its declared type.
    #[error("field {field}: {reason}")]
    Coercion { field: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl AlarmError {
    pub fn backend(operation: &'static str, err: impl Display) -> Self {
        AlarmError::Backend {
            operation,
            message: err.to_string(),
        }
    }

    pub fn template(key: &str, reason: impl Display) -> Self {
        AlarmError::Template {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn coercion(field: &str, reason: impl Display) -> Self {
        AlarmError::Coercion {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid(reason: impl Display) -> Self {
        AlarmError::InvalidArgument(reason.to_string())
    }
}
