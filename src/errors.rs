//! Unified error type for the service.
//!
//! Every core operation returns [`Result`]. The HTTP layer maps each variant to a
//! status code (see `api::response`); nothing here knows about HTTP.

use serde::Serialize;
use thiserror::Error;

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Name of the offending input field
    pub field: String,
    /// Human-readable explanation
    pub message: String,
}

impl FieldError {
    /// Builds a field error from anything string-like.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// All errors surfaced by the service.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input: bad period string, missing KPI inputs, invalid activity fields.
    #[error("Validation failed: {message}")]
    Validation {
        /// Summary message
        message: String,
        /// Per-field details, possibly empty
        fields: Vec<FieldError>,
    },

    /// A referenced row does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of resource, e.g. `"KPI entry"`
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// A unique-constraint style conflict, e.g. a second KPI entry for the same month.
    #[error("Duplicate entry: {message}")]
    DuplicateEntry {
        /// Description of the conflicting record
        message: String,
    },

    /// A write based on a stale version of a row.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict
        message: String,
    },

    /// Underlying datastore failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Document bucket failure.
    #[error("Storage error: {message}")]
    Storage {
        /// What went wrong
        message: String,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// I/O error outside the bucket (binding the listener, reading config).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure talking to the narrative collaborator.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for a validation error without field details.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Shorthand for a validation error carrying field details.
    pub fn invalid_fields(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    /// Shorthand for a missing row.
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Whether the underlying database error is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
        matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        )
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
