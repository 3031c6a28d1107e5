//! # Medical Drone Fleet - Domain Model
//!
//! Core entities, value objects and enums for a fleet of drones that carry
//! medication items. These types are the single source of truth across all
//! layers: persistence, fleet engine and API.
//!
//! Every field constraint lives here so that a value which made it past
//! validation can be persisted without further checks.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum battery charge, in percent.
pub const MAXIMUM_BATTERY_CAPACITY: u8 = 100;

/// Maximum length of a drone serial number, in characters.
pub const MAXIMUM_SERIAL_NUMBER_LENGTH: usize = 100;

/// Heaviest payload any model can carry, in grams.
pub const MAXIMUM_WEIGHT_LIMIT: u32 = 500;

/// Default battery floor for moving a drone into `LOADING`.
pub const DEFAULT_MIN_LOADING_BATTERY: u8 = 25;

/// Default discharge applied to every drone per monitor tick.
pub const DEFAULT_DISCHARGE_PER_TICK: u8 = 1;

static MEDICATION_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9_]*$").expect("static code pattern"));

static MEDICATION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]*$").expect("static name pattern"));

// =============================================================================
// ENUMS
// =============================================================================

/// Drone airframe model. Fixes the weight the drone can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DroneModel {
    Lightweight,
    Middleweight,
    Cruiserweight,
    Heavyweight,
}

impl DroneModel {
    pub const ALL: [Self; 4] = [
        Self::Lightweight,
        Self::Middleweight,
        Self::Cruiserweight,
        Self::Heavyweight,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lightweight => "Lightweight",
            Self::Middleweight => "Middleweight",
            Self::Cruiserweight => "Cruiserweight",
            Self::Heavyweight => "Heavyweight",
        }
    }

    /// Carrying capacity in grams
    #[must_use]
    pub const fn weight_limit(&self) -> u32 {
        match self {
            Self::Lightweight => 100,
            Self::Middleweight => 200,
            Self::Cruiserweight => 300,
            Self::Heavyweight => MAXIMUM_WEIGHT_LIMIT,
        }
    }
}

impl fmt::Display for DroneModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DroneModel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| DomainError::InvalidModel(s.to_string()))
    }
}

/// Drone lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneState {
    Idle,
    Loading,
    Loaded,
    Delivering,
    Delivered,
    Returning,
}

impl DroneState {
    pub const ALL: [Self; 6] = [
        Self::Idle,
        Self::Loading,
        Self::Loaded,
        Self::Delivering,
        Self::Delivered,
        Self::Returning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Loading => "LOADING",
            Self::Loaded => "LOADED",
            Self::Delivering => "DELIVERING",
            Self::Delivered => "DELIVERED",
            Self::Returning => "RETURNING",
        }
    }

    /// Next state in the delivery cycle.
    ///
    /// Only `IDLE -> LOADING` and `LOADING -> LOADED` are driven by the load
    /// transaction; the remaining edges are here for dispatch and return
    /// flows to build on.
    #[must_use]
    pub const fn successor(&self) -> Self {
        match self {
            Self::Idle => Self::Loading,
            Self::Loading => Self::Loaded,
            Self::Loaded => Self::Delivering,
            Self::Delivering => Self::Delivered,
            Self::Delivered => Self::Returning,
            Self::Returning => Self::Idle,
        }
    }
}

impl fmt::Display for DroneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DroneState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::InvalidState(s.to_string()))
    }
}

// =============================================================================
// ENTITY TYPES
// =============================================================================

/// Drone entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drone {
    pub serial_number: String,
    pub model: DroneModel,
    pub weight_limit: u32,
    pub battery_level: u8,
    pub state: DroneState,
}

impl Drone {
    /// Validate a registration request and build the initial `IDLE` record.
    ///
    /// Fields are checked in order (serial number, model, battery level) and
    /// the first violation is returned.
    pub fn register(
        serial_number: &str,
        model: &str,
        battery_level: i64,
    ) -> Result<Self, DomainError> {
        validate_serial_number(serial_number)?;
        let model: DroneModel = model.parse()?;
        let battery_level = validate_battery_level(battery_level)?;

        Ok(Self {
            serial_number: serial_number.to_string(),
            model,
            weight_limit: model.weight_limit(),
            battery_level,
            state: DroneState::Idle,
        })
    }
}

/// Medication item as submitted for loading, not yet validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicationItem {
    pub code: String,
    pub name: String,
    pub weight: i64,
    pub image_base64: String,
}

impl NewMedicationItem {
    /// Check every field and bind the item to a drone.
    ///
    /// Fields are checked in order (code, name, weight, image).
    pub fn validate(&self, drone_serial_number: &str) -> Result<MedicationItem, DomainError> {
        if !MEDICATION_CODE.is_match(&self.code) {
            return Err(DomainError::InvalidCode(self.code.clone()));
        }
        if !MEDICATION_NAME.is_match(&self.name) {
            return Err(DomainError::InvalidName(self.name.clone()));
        }
        let weight = u32::try_from(self.weight)
            .ok()
            .filter(|w| *w <= MAXIMUM_WEIGHT_LIMIT)
            .ok_or(DomainError::InvalidWeight(self.weight))?;
        if !self.image_base64.starts_with("data:") {
            return Err(DomainError::InvalidImage);
        }

        Ok(MedicationItem {
            drone_serial_number: drone_serial_number.to_string(),
            code: self.code.clone(),
            name: self.name.clone(),
            weight,
            image_base64: self.image_base64.clone(),
        })
    }
}

/// Medication item loaded on a drone. Identity is `(drone_serial_number, code)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationItem {
    pub drone_serial_number: String,
    pub code: String,
    pub name: String,
    pub weight: u32,
    pub image_base64: String,
}

/// Battery level snapshot, appended once per discharge tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatteryReading {
    pub serial_number: String,
    pub battery_level: u8,
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Serial numbers are non-empty and at most 100 characters.
pub fn validate_serial_number(serial_number: &str) -> Result<(), DomainError> {
    if serial_number.is_empty() {
        return Err(DomainError::SerialNumberRequired);
    }
    let length = serial_number.chars().count();
    if length > MAXIMUM_SERIAL_NUMBER_LENGTH {
        return Err(DomainError::SerialNumberTooLong { length });
    }
    Ok(())
}

/// Battery levels are percentages in `0..=100`.
pub fn validate_battery_level(level: i64) -> Result<u8, DomainError> {
    u8::try_from(level)
        .ok()
        .filter(|l| *l <= MAXIMUM_BATTERY_CAPACITY)
        .ok_or(DomainError::InvalidBatteryLevel(level))
}

// =============================================================================
// ERRORS
// =============================================================================

/// Domain-level validation errors. Each one names the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("serialNumber string field required")]
    SerialNumberRequired,

    #[error("maximum serialNumber length reached ({length} > {max})", max = MAXIMUM_SERIAL_NUMBER_LENGTH)]
    SerialNumberTooLong { length: usize },

    #[error("invalid model field value: '{0}'")]
    InvalidModel(String),

    #[error("invalid batteryLevel field value: {0}")]
    InvalidBatteryLevel(i64),

    #[error("invalid state field value: '{0}'")]
    InvalidState(String),

    #[error("invalid code field value: '{0}'")]
    InvalidCode(String),

    #[error("invalid name field value: '{0}'")]
    InvalidName(String),

    #[error("invalid weight field value: {0}")]
    InvalidWeight(i64),

    #[error("invalid imageBase64 field value: must be a data URI")]
    InvalidImage,

    #[error("medicationItems must not be empty")]
    EmptyManifest,
}

impl DomainError {
    /// Name of the field that failed validation, as the API spells it
    pub fn field(&self) -> &'static str {
        match self {
            Self::SerialNumberRequired | Self::SerialNumberTooLong { .. } => "serialNumber",
            Self::InvalidModel(_) => "model",
            Self::InvalidBatteryLevel(_) => "batteryLevel",
            Self::InvalidState(_) => "state",
            Self::InvalidCode(_) => "code",
            Self::InvalidName(_) => "name",
            Self::InvalidWeight(_) => "weight",
            Self::InvalidImage => "imageBase64",
            Self::EmptyManifest => "medicationItems",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::Fake;
    use fake::faker::lorem::en::Word;

    const IMAGE: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

    fn item(code: &str, name: &str, weight: i64) -> NewMedicationItem {
        NewMedicationItem {
            code: code.to_string(),
            name: name.to_string(),
            weight,
            image_base64: IMAGE.to_string(),
        }
    }

    #[test]
    fn weight_limit_follows_model() {
        let expected = [
            (DroneModel::Lightweight, 100),
            (DroneModel::Middleweight, 200),
            (DroneModel::Cruiserweight, 300),
            (DroneModel::Heavyweight, 500),
        ];
        for (model, limit) in expected {
            let drone = Drone::register("SN-1", model.as_str(), 50).unwrap();
            assert_eq!(drone.weight_limit, limit);
            assert_eq!(drone.state, DroneState::Idle);
        }
    }

    #[test]
    fn registration_reports_the_first_bad_field() {
        assert_eq!(Drone::register("", "Lightweight", 50), Err(DomainError::SerialNumberRequired));
        assert_eq!(
            Drone::register(&"a".repeat(101), "Lightweight", 50),
            Err(DomainError::SerialNumberTooLong { length: 101 })
        );
        assert!(Drone::register(&"a".repeat(100), "Lightweight", 50).is_ok());

        let err = Drone::register("SN-1", "invalidModel", 500).unwrap_err();
        assert_eq!(err.field(), "model");

        for level in [-1, 101, 150] {
            let err = Drone::register("SN-1", "Heavyweight", level).unwrap_err();
            assert_eq!(err, DomainError::InvalidBatteryLevel(level));
            assert_eq!(err.field(), "batteryLevel");
        }
        assert!(Drone::register("SN-1", "Heavyweight", 0).is_ok());
        assert!(Drone::register("SN-1", "Heavyweight", 100).is_ok());
    }

    #[test]
    fn serial_number_length_counts_characters() {
        let serial: String = "é".repeat(100);
        assert!(validate_serial_number(&serial).is_ok());
    }

    #[test]
    fn medication_item_validation_order() {
        let bad_everything = NewMedicationItem {
            code: "lower".into(),
            name: "bad name".into(),
            weight: -1,
            image_base64: "nope".into(),
        };
        assert_eq!(bad_everything.validate("SN").unwrap_err().field(), "code");

        assert_eq!(item("A1", "bad name", 10).validate("SN").unwrap_err().field(), "name");
        assert_eq!(item("A1", "Aspirin", 501).validate("SN").unwrap_err(), DomainError::InvalidWeight(501));
        assert_eq!(item("A1", "Aspirin", -5).validate("SN").unwrap_err(), DomainError::InvalidWeight(-5));

        let mut no_uri = item("A1", "Aspirin", 10);
        no_uri.image_base64 = "R0lGODlh".into();
        assert_eq!(no_uri.validate("SN").unwrap_err(), DomainError::InvalidImage);
    }

    #[test]
    fn valid_medication_item_is_bound_to_drone() {
        let name: String = Word().fake();
        let validated = item("PARACETAMOL_500", &name, 500).validate("SN-9").unwrap();
        assert_eq!(validated.drone_serial_number, "SN-9");
        assert_eq!(validated.weight, 500);
        assert_eq!(validated.name, name);
    }

    #[test]
    fn lifecycle_is_a_cycle() {
        let mut state = DroneState::Idle;
        let mut seen = Vec::new();
        for _ in 0..DroneState::ALL.len() {
            seen.push(state);
            state = state.successor();
        }
        assert_eq!(state, DroneState::Idle);
        assert_eq!(seen, DroneState::ALL);
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for state in DroneState::ALL {
            assert_eq!(state.as_str().parse::<DroneState>(), Ok(state));
        }
        assert!("SLEEPING".parse::<DroneState>().is_err());
        assert_eq!(serde_json::to_string(&DroneState::Loading).unwrap(), "\"LOADING\"");
        assert_eq!(serde_json::to_string(&DroneModel::Heavyweight).unwrap(), "\"Heavyweight\"");
    }

    #[test]
    fn drone_serializes_in_camel_case() {
        let drone = Drone::register("SN-7", "Middleweight", 33).unwrap();
        let json = serde_json::to_value(&drone).unwrap();
        assert_eq!(json["serialNumber"], "SN-7");
        assert_eq!(json["weightLimit"], 200);
        assert_eq!(json["batteryLevel"], 33);
        assert_eq!(json["state"], "IDLE");
    }
}
