//! In-process store backend.
//!
//! All tables sit behind one `RwLock` and every trait method takes it exactly
//! once, so each operation (conditional updates and batch inserts included)
//! is atomic with respect to every other.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{PersistenceError, Result};
use crate::repository::traits::{DroneFilter, FleetStore};
use drone_domain::{BatteryReading, Drone, DroneState, MedicationItem};

#[derive(Debug, Default)]
struct Tables {
    drones: BTreeMap<String, Drone>,
    /// Keyed by drone serial number, then item code
    items: HashMap<String, BTreeMap<String, MedicationItem>>,
    /// Append order doubles as the tie-breaker for equal timestamps
    readings: HashMap<String, Vec<BatteryReading>>,
}

/// Store backed by process memory. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn create_drone_if_absent(&self, drone: &Drone) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.drones.contains_key(&drone.serial_number) {
            return Err(PersistenceError::conflict("Drone", &drone.serial_number));
        }
        tables
            .drones
            .insert(drone.serial_number.clone(), drone.clone());
        Ok(())
    }

    async fn get_drone(&self, serial_number: &str) -> Result<Option<Drone>> {
        Ok(self.tables.read().await.drones.get(serial_number).cloned())
    }

    async fn list_drones(&self, filter: DroneFilter) -> Result<Vec<Drone>> {
        let tables = self.tables.read().await;
        Ok(tables
            .drones
            .values()
            .filter(|drone| filter.matches(drone))
            .cloned()
            .collect())
    }

    async fn update_state_if_battery(
        &self,
        serial_number: &str,
        state: DroneState,
        min_battery: u8,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        match tables.drones.get_mut(serial_number) {
            Some(drone) if drone.battery_level >= min_battery => {
                drone.state = state;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn update_battery(&self, serial_number: &str, battery_level: u8) -> Result<u64> {
        let mut tables = self.tables.write().await;
        Ok(tables.drones.get_mut(serial_number).map_or(0, |drone| {
            drone.battery_level = battery_level;
            1
        }))
    }

    async fn sum_item_weight(&self, drone_serial_number: &str) -> Result<u32> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(drone_serial_number)
            .map_or(0, |items| items.values().map(|item| item.weight).sum()))
    }

    async fn insert_items(
        &self,
        drone_serial_number: &str,
        items: &[MedicationItem],
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let loaded = tables
            .items
            .entry(drone_serial_number.to_string())
            .or_default();

        // Check every key before touching the table so a conflict writes nothing
        let mut seen = Vec::with_capacity(items.len());
        for item in items {
            if loaded.contains_key(&item.code) || seen.contains(&item.code.as_str()) {
                return Err(PersistenceError::conflict(
                    "MedicationItem",
                    format!("{drone_serial_number}/{}", item.code),
                ));
            }
            seen.push(item.code.as_str());
        }

        for item in items {
            let mut item = item.clone();
            item.drone_serial_number = drone_serial_number.to_string();
            loaded.insert(item.code.clone(), item);
        }
        Ok(items.len() as u64)
    }

    async fn list_items(&self, drone_serial_number: &str) -> Result<Vec<MedicationItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(drone_serial_number)
            .map(|items| items.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn append_reading(
        &self,
        serial_number: &str,
        battery_level: u8,
    ) -> Result<BatteryReading> {
        let reading = BatteryReading {
            serial_number: serial_number.to_string(),
            battery_level,
            recorded_at: Utc::now(),
        };
        let mut tables = self.tables.write().await;
        tables
            .readings
            .entry(serial_number.to_string())
            .or_default()
            .push(reading.clone());
        Ok(reading)
    }

    async fn list_readings(&self, serial_number: &str) -> Result<Vec<BatteryReading>> {
        let tables = self.tables.read().await;
        Ok(tables
            .readings
            .get(serial_number)
            .map(|readings| readings.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.drones.clear();
        tables.items.clear();
        tables.readings.clear();
        tracing::warn!("Fleet store cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drone_domain::NewMedicationItem;
    use tokio_test::assert_ok;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn drone(serial_number: &str, battery_level: i64) -> Drone {
        Drone::register(serial_number, "Heavyweight", battery_level).unwrap()
    }

    fn item(serial_number: &str, code: &str, weight: i64) -> MedicationItem {
        NewMedicationItem {
            code: code.to_string(),
            name: "Insulin".to_string(),
            weight,
            image_base64: IMAGE.to_string(),
        }
        .validate(serial_number)
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_serial() {
        let store = MemoryStore::new();
        assert_ok!(store.create_drone_if_absent(&drone("SN-1", 60)).await);

        let mut second = drone("SN-1", 10);
        second.model = drone_domain::DroneModel::Lightweight;
        let err = store.create_drone_if_absent(&second).await.unwrap_err();
        assert!(err.is_conflict());

        let kept = store.get_drone("SN-1").await.unwrap().unwrap();
        assert_eq!(kept.battery_level, 60);
        assert_eq!(kept.weight_limit, 500);
    }

    #[tokio::test]
    async fn test_conditional_state_update() {
        let store = MemoryStore::new();
        store.create_drone_if_absent(&drone("LOW", 10)).await.unwrap();
        store.create_drone_if_absent(&drone("HIGH", 90)).await.unwrap();

        let low = store
            .update_state_if_battery("LOW", DroneState::Loading, 25)
            .await
            .unwrap();
        let high = store
            .update_state_if_battery("HIGH", DroneState::Loading, 25)
            .await
            .unwrap();
        let missing = store
            .update_state_if_battery("NOPE", DroneState::Loaded, 0)
            .await
            .unwrap();

        assert_eq!((low, high, missing), (0, 1, 0));
        assert_eq!(store.get_drone("LOW").await.unwrap().unwrap().state, DroneState::Idle);
        assert_eq!(store.get_drone("HIGH").await.unwrap().unwrap().state, DroneState::Loading);
    }

    #[tokio::test]
    async fn test_list_is_filtered_and_ordered() {
        let store = MemoryStore::new();
        for (sn, level) in [("C", 80), ("A", 30), ("B", 0), ("D", 24)] {
            store.create_drone_if_absent(&drone(sn, level)).await.unwrap();
        }

        let available: Vec<_> = store
            .list_drones(DroneFilter::AvailableForLoading { min_battery: 25 })
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.serial_number)
            .collect();
        assert_eq!(available, ["A", "C"]);

        let charged = store.list_drones(DroneFilter::Charged).await.unwrap();
        assert_eq!(charged.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        assert_eq!(store.sum_item_weight("SN").await.unwrap(), 0);

        let inserted = assert_ok!(
            store
                .insert_items("SN", &[item("SN", "A1", 100), item("SN", "A2", 150)])
                .await
        );
        assert_eq!(inserted, 2);
        assert_eq!(store.sum_item_weight("SN").await.unwrap(), 250);

        // A3 is new but A1 collides, so neither lands
        let err = store
            .insert_items("SN", &[item("SN", "A3", 10), item("SN", "A1", 10)])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.list_items("SN").await.unwrap().len(), 2);

        let err = store
            .insert_items("SN", &[item("SN", "B1", 10), item("SN", "B1", 20)])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.sum_item_weight("SN").await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_readings_most_recent_first() {
        let store = MemoryStore::new();
        for level in [50, 49, 48] {
            store.append_reading("SN", level).await.unwrap();
        }
        let levels: Vec<u8> = store
            .list_readings("SN")
            .await
            .unwrap()
            .iter()
            .map(|r| r.battery_level)
            .collect();
        assert_eq!(levels, [48, 49, 50]);
        assert!(store.list_readings("OTHER").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = MemoryStore::new();
        store.create_drone_if_absent(&drone("SN", 60)).await.unwrap();
        store.insert_items("SN", &[item("SN", "A1", 10)]).await.unwrap();
        store.append_reading("SN", 59).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.get_drone("SN").await.unwrap().is_none());
        assert!(store.list_items("SN").await.unwrap().is_empty());
        assert!(store.list_readings("SN").await.unwrap().is_empty());
    }
}
