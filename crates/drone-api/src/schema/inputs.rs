//! # GraphQL Input Types
//!
//! Numeric fields are plain `Int`s so range checks produce the same
//! validation errors as the REST API.

use async_graphql::InputObject;

use super::enums::DroneModel;
use drone_domain as domain;

/// Input for registering a drone
#[derive(Debug, Clone, InputObject)]
pub struct RegisterDroneInput {
    /// Unique, at most 100 characters
    pub serial_number: String,
    pub model: DroneModel,
    /// Initial charge, 0 to 100
    pub battery_level: i32,
}

/// One medication item to put on a drone
#[derive(Debug, Clone, InputObject)]
pub struct MedicationItemInput {
    /// Upper-case letters, digits and underscores
    pub code: String,
    /// Letters, digits, `-` and `_`
    pub name: String,
    /// Grams, 0 to 500
    pub weight: i32,
    /// Image as a `data:` URI
    pub image_base64: String,
}

impl From<MedicationItemInput> for domain::NewMedicationItem {
    fn from(i: MedicationItemInput) -> Self {
        Self {
            code: i.code,
            name: i.name,
            weight: i64::from(i.weight),
            image_base64: i.image_base64,
        }
    }
}

/// Input for loading a batch of items onto a drone
#[derive(Debug, Clone, InputObject)]
pub struct LoadDroneInput {
    pub serial_number: String,
    pub items: Vec<MedicationItemInput>,
}
