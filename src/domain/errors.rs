//! Domain error types
//!
//! All errors are domain-specific and don't expose third-party types.
//! Per-entity and per-row failures are carried as values of [`MdError`] and
//! logged locally; only configuration and connection failures at startup are
//! treated as fatal by the CLI.

use thiserror::Error;

/// SQLSTATE code for `unique_violation`
const PG_UNIQUE_VIOLATION: &str = "23505";

/// Main mdsync error type
#[derive(Debug, Error)]
pub enum MdError {
    /// Record is not present in the store. Drives inserts, never logged as a failure.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store or directory unreachable, or a malformed response
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// Malformed upstream payload or invalid input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Downstream delivery call failed, timed out or returned non-success
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Duplicate observer/owner pair or other unique-key violation
    #[error("Uniqueness violation: {0}")]
    Uniqueness(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Database errors other than lookups
    #[error("Database error: {0}")]
    Database(String),

    /// Network/connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Directory service errors
    #[error("Directory error: {0}")]
    Directory(String),

    /// Mail transport errors
    #[error("Mail error: {0}")]
    Mail(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl MdError {
    /// Whether this error is the expected "no row yet" outcome of a lookup
    pub fn is_not_found(&self) -> bool {
        matches!(self, MdError::NotFound(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for MdError {
    fn from(err: std::io::Error) -> Self {
        MdError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for MdError {
    fn from(err: serde_json::Error) -> Self {
        MdError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for MdError {
    fn from(err: toml::de::Error) -> Self {
        MdError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<tokio_postgres::Error> for MdError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.code().map(|c| c.code()) == Some(PG_UNIQUE_VIOLATION) {
            return MdError::Uniqueness(err.to_string());
        }
        MdError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for MdError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MdError::Delivery(format!("request timed out: {err}"))
        } else if err.is_connect() {
            MdError::Connection(err.to_string())
        } else {
            MdError::Delivery(err.to_string())
        }
    }
}
