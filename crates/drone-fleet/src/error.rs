//! # Fleet Error Types
//!
//! Every failure the engine reports, grouped into the kinds the boundary
//! layer maps onto transport status codes.

use drone_domain::DomainError;
use drone_persistence::PersistenceError;
use thiserror::Error;

/// Broad error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input field
    Validation,
    /// Duplicate identity
    Conflict,
    /// Referenced drone is absent
    NotFound,
    /// Operation not permitted in the drone's current lifecycle state
    StateConflict,
    /// Aggregate weight over the drone's limit
    CapacityExceeded,
    /// Storage failure or broken invariant
    Internal,
}

/// Fleet engine errors
#[derive(Debug, Error)]
pub enum FleetError {
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("drone '{serial_number}' already exists")]
    DuplicateDrone { serial_number: String },

    #[error("medication item '{code}' is already loaded on drone '{serial_number}'")]
    DuplicateMedication { serial_number: String, code: String },

    #[error("drone '{serial_number}' not found")]
    DroneNotFound { serial_number: String },

    #[error("drone '{serial_number}' already in loading state")]
    AlreadyLoading { serial_number: String },

    #[error("drone '{serial_number}' without enough battery level (requires at least {required}%)")]
    BatteryTooLow { serial_number: String, required: u8 },

    #[error("drone '{serial_number}' weight limit reached ({attempted}g > {limit}g)")]
    WeightLimitExceeded {
        serial_number: String,
        limit: u32,
        attempted: u32,
    },

    #[error("internal error: {0}")]
    Internal(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

impl FleetError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::DuplicateDrone { .. } | Self::DuplicateMedication { .. } => ErrorKind::Conflict,
            Self::DroneNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyLoading { .. } | Self::BatteryTooLow { .. } => ErrorKind::StateConflict,
            Self::WeightLimitExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::Internal(_) | Self::Persistence(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for this error
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DuplicateDrone { .. } => "DUPLICATE_DRONE",
            Self::DuplicateMedication { .. } => "DUPLICATE_MEDICATION",
            Self::DroneNotFound { .. } => "DRONE_NOT_FOUND",
            Self::AlreadyLoading { .. } => "ALREADY_LOADING",
            Self::BatteryTooLow { .. } => "BATTERY_TOO_LOW",
            Self::WeightLimitExceeded { .. } => "WEIGHT_LIMIT_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    pub(crate) fn not_found(serial_number: &str) -> Self {
        Self::DroneNotFound {
            serial_number: serial_number.to_string(),
        }
    }
}

/// Result type alias for fleet operations
pub type FleetResult<T> = Result<T, FleetError>;
