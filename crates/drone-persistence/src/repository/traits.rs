//! # Repository Traits
//!
//! Abstract store interface for the fleet's three record kinds.
//! Implementations can be swapped for different backends (ScyllaDB, memory, etc.)
//!
//! Every method is a single store operation. Conditional writes report the
//! number of rows they touched (0 or 1) and are evaluated atomically by the
//! backend, never as a read followed by a write.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use drone_domain::{BatteryReading, Drone, DroneState, MedicationItem};

// =============================================================================
// FILTERS
// =============================================================================

/// Predicate over persisted drones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DroneFilter {
    #[default]
    All,
    /// Drones with any charge left (`battery_level > 0`)
    Charged,
    /// `IDLE` drones with at least `min_battery` charge
    AvailableForLoading { min_battery: u8 },
}

impl DroneFilter {
    pub const fn matches(&self, drone: &Drone) -> bool {
        match self {
            Self::All => true,
            Self::Charged => drone.battery_level > 0,
            Self::AvailableForLoading { min_battery } => {
                matches!(drone.state, DroneState::Idle) && drone.battery_level >= *min_battery
            }
        }
    }
}

// =============================================================================
// FLEET STORE
// =============================================================================

/// Persistence adapter for drones, medication items and battery readings
#[async_trait]
pub trait FleetStore: Send + Sync {
    /// Insert a drone, failing with `Conflict` if the serial number is taken
    async fn create_drone_if_absent(&self, drone: &Drone) -> Result<()>;

    /// Get drone by serial number
    async fn get_drone(&self, serial_number: &str) -> Result<Option<Drone>>;

    /// List drones matching `filter`, ordered by serial number
    async fn list_drones(&self, filter: DroneFilter) -> Result<Vec<Drone>>;

    /// Set `state` only if the persisted battery level is at least `min_battery`
    async fn update_state_if_battery(
        &self,
        serial_number: &str,
        state: DroneState,
        min_battery: u8,
    ) -> Result<u64>;

    /// Overwrite the battery level of an existing drone
    async fn update_battery(&self, serial_number: &str, battery_level: u8) -> Result<u64>;

    /// Total weight loaded on a drone, zero when it carries nothing
    async fn sum_item_weight(&self, drone_serial_number: &str) -> Result<u32>;

    /// Insert a batch of items atomically.
    ///
    /// Fails with `Conflict` and writes nothing if any `(drone, code)` key
    /// already exists.
    async fn insert_items(&self, drone_serial_number: &str, items: &[MedicationItem])
        -> Result<u64>;

    /// Items loaded on a drone, ordered by code
    async fn list_items(&self, drone_serial_number: &str) -> Result<Vec<MedicationItem>>;

    /// Append a battery snapshot stamped with the store clock
    async fn append_reading(&self, serial_number: &str, battery_level: u8)
        -> Result<BatteryReading>;

    /// Battery history, most recent first
    async fn list_readings(&self, serial_number: &str) -> Result<Vec<BatteryReading>>;

    /// Remove every drone, item and reading
    async fn clear_all(&self) -> Result<()>;
}

/// Shared handle used by every fleet component
pub type SharedFleetStore = Arc<dyn FleetStore>;

#[cfg(test)]
mod tests {
    use super::*;

    fn drone(battery_level: u8, state: DroneState) -> Drone {
        let mut drone = Drone::register("SN", "Lightweight", i64::from(battery_level)).unwrap();
        drone.state = state;
        drone
    }

    #[test]
    fn availability_requires_idle_and_charge() {
        let filter = DroneFilter::AvailableForLoading { min_battery: 25 };
        assert!(filter.matches(&drone(25, DroneState::Idle)));
        assert!(filter.matches(&drone(100, DroneState::Idle)));
        assert!(!filter.matches(&drone(24, DroneState::Idle)));
        for state in DroneState::ALL.into_iter().filter(|s| *s != DroneState::Idle) {
            assert!(!filter.matches(&drone(80, state)));
        }
    }

    #[test]
    fn charged_excludes_empty_batteries() {
        assert!(DroneFilter::Charged.matches(&drone(1, DroneState::Loaded)));
        assert!(!DroneFilter::Charged.matches(&drone(0, DroneState::Idle)));
        assert!(DroneFilter::All.matches(&drone(0, DroneState::Idle)));
    }
}
