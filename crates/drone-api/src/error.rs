//! # API Error Types
//!
//! Unified error handling for the REST and GraphQL layers.

use async_graphql::{Error as GraphQLError, ErrorExtensions};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drone_fleet::{ErrorKind, FleetError};
use thiserror::Error;

/// Message returned for every unknown drone, whatever the operation
pub const DRONE_NOT_FOUND: &str = "drone not found";

/// API-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("drone not found")]
    DroneNotFound { serial_number: String },

    #[error(transparent)]
    Fleet(FleetError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<FleetError> for ApiError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::DroneNotFound { serial_number } => Self::DroneNotFound { serial_number },
            other => Self::Fleet(other),
        }
    }
}

impl ApiError {
    /// Get HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::DroneNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Fleet(err) => match err.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Validation
                | ErrorKind::Conflict
                | ErrorKind::StateConflict
                | ErrorKind::CapacityExceeded => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Get error code for response bodies and GraphQL extensions
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DroneNotFound { .. } => "DRONE_NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Fleet(err) => err.error_code(),
        }
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> GraphQLError {
        GraphQLError::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.error_code());
            e.set("status", self.status_code().as_u16());

            match self {
                Self::DroneNotFound { serial_number } => {
                    e.set("serial_number", serial_number.as_str());
                }
                Self::Fleet(FleetError::Validation(domain)) => {
                    e.set("field", domain.field());
                }
                _ => {}
            }
        })
    }
}

/// Convert anything the API can fail with into a GraphQL error with extensions
pub fn graphql_error(err: impl Into<ApiError>) -> GraphQLError {
    err.into().extend()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "message": self.to_string(),
            "code": self.error_code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
