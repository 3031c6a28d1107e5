//! Store wrapper with switchable faults, for exercising failure paths

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use drone_domain::{BatteryReading, Drone, DroneState, MedicationItem};
use drone_persistence::{DroneFilter, FleetStore, MemoryStore, PersistenceError, Result};

/// Delegates to a `MemoryStore` unless a fault is switched on
#[derive(Debug, Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    /// `LOADING -> LOADED` touches no rows
    pub stuck_loading: AtomicBool,
    /// `insert_items` fails with a backend error
    pub insert_down: AtomicBool,
    /// `insert_items` reports a key conflict without any stored clash
    pub phantom_conflict: AtomicBool,
    /// `update_battery` for this drone touches no rows
    pub lost_drone: Mutex<Option<String>>,
}

impl FaultyStore {
    pub fn lose(&self, serial_number: &str) {
        *self.lost_drone.lock().unwrap() = Some(serial_number.to_string());
    }
}

#[async_trait]
impl FleetStore for FaultyStore {
    async fn create_drone_if_absent(&self, drone: &Drone) -> Result<()> {
        self.inner.create_drone_if_absent(drone).await
    }

    async fn get_drone(&self, serial_number: &str) -> Result<Option<Drone>> {
        self.inner.get_drone(serial_number).await
    }

    async fn list_drones(&self, filter: DroneFilter) -> Result<Vec<Drone>> {
        self.inner.list_drones(filter).await
    }

    async fn update_state_if_battery(
        &self,
        serial_number: &str,
        state: DroneState,
        min_battery: u8,
    ) -> Result<u64> {
        if state == DroneState::Loaded && self.stuck_loading.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner
            .update_state_if_battery(serial_number, state, min_battery)
            .await
    }

    async fn update_battery(&self, serial_number: &str, battery_level: u8) -> Result<u64> {
        if self.lost_drone.lock().unwrap().as_deref() == Some(serial_number) {
            return Ok(0);
        }
        self.inner.update_battery(serial_number, battery_level).await
    }

    async fn sum_item_weight(&self, drone_serial_number: &str) -> Result<u32> {
        self.inner.sum_item_weight(drone_serial_number).await
    }

    async fn insert_items(
        &self,
        drone_serial_number: &str,
        items: &[MedicationItem],
    ) -> Result<u64> {
        if self.insert_down.load(Ordering::SeqCst) {
            return Err(PersistenceError::Scylla("connection reset".to_string()));
        }
        if self.phantom_conflict.load(Ordering::SeqCst) {
            return Err(PersistenceError::conflict("MedicationItem", drone_serial_number));
        }
        self.inner.insert_items(drone_serial_number, items).await
    }

    async fn list_items(&self, drone_serial_number: &str) -> Result<Vec<MedicationItem>> {
        self.inner.list_items(drone_serial_number).await
    }

    async fn append_reading(
        &self,
        serial_number: &str,
        battery_level: u8,
    ) -> Result<BatteryReading> {
        self.inner.append_reading(serial_number, battery_level).await
    }

    async fn list_readings(&self, serial_number: &str) -> Result<Vec<BatteryReading>> {
        self.inner.list_readings(serial_number).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.inner.clear_all().await
    }
}
