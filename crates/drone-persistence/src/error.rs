//! Persistence layer error types

use thiserror::Error;

/// Persistence layer errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("ScyllaDB error: {0}")]
    Scylla(String),

    #[error("Row decoding error: {0}")]
    Decode(String),

    #[error("Unique constraint violated: {entity_type} with key {key} already exists")]
    Conflict { entity_type: String, key: String },

    #[error("Corrupt {entity_type} record {key}: {reason}")]
    Corrupt {
        entity_type: String,
        key: String,
        reason: String,
    },

    #[error("Invalid query parameters: {0}")]
    InvalidQuery(String),
}

impl PersistenceError {
    pub fn conflict(entity_type: &str, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity_type: entity_type.to_string(),
            key: key.into(),
        }
    }

    pub fn corrupt(entity_type: &str, key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Corrupt {
            entity_type: entity_type.to_string(),
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the store rejected a write because the key already exists
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::transport::errors::NewSessionError> for PersistenceError {
    fn from(err: scylla::transport::errors::NewSessionError) -> Self {
        Self::Scylla(err.to_string())
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::transport::errors::QueryError> for PersistenceError {
    fn from(err: scylla::transport::errors::QueryError) -> Self {
        Self::Scylla(err.to_string())
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::transport::query_result::IntoRowsResultError> for PersistenceError {
    fn from(err: scylla::transport::query_result::IntoRowsResultError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::transport::query_result::RowsError> for PersistenceError {
    fn from(err: scylla::transport::query_result::RowsError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::transport::query_result::MaybeFirstRowError> for PersistenceError {
    fn from(err: scylla::transport::query_result::MaybeFirstRowError) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(feature = "scylla")]
impl From<scylla::deserialize::DeserializationError> for PersistenceError {
    fn from(err: scylla::deserialize::DeserializationError) -> Self {
        Self::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PersistenceError>;
