//! # Load Coordinator
//!
//! Runs the loading transaction for a drone:
//!
//! ```text
//! lookup ──▶ LOADING guard ──▶ acquire (battery floor) ──▶ validate + weigh
//!                                   │                          │
//!                                   │                     insert batch
//!                                   ▼                          │
//!                               LOADED ◀──────── always ───────┘
//! ```
//!
//! Once the drone is in `LOADING` it always ends up in `LOADED`, whether the
//! batch committed or not. The transaction body runs on its own task so a
//! caller that stops waiting cannot leave the drone stranded.

use std::collections::HashSet;

use tracing::{error, info, instrument, warn};

use crate::error::{FleetError, FleetResult};
use crate::registry::DroneRegistry;
use drone_domain::{DomainError, Drone, DroneState, MedicationItem, NewMedicationItem};

#[derive(Clone)]
pub struct LoadCoordinator {
    registry: DroneRegistry,
}

impl LoadCoordinator {
    pub const fn new(registry: DroneRegistry) -> Self {
        Self { registry }
    }

    /// Load a batch of medication items onto a drone.
    ///
    /// Returns every item the drone now carries, ordered by code. The batch
    /// is all-or-nothing: any validation, duplicate or weight failure
    /// persists none of it.
    ///
    /// The `LOADING` check is advisory. Two calls racing on the same drone
    /// can both pass it, and the weight total is read without a lock, so
    /// concurrent loads may jointly exceed the limit.
    pub async fn load_drone(
        &self,
        serial_number: &str,
        items: Vec<NewMedicationItem>,
    ) -> FleetResult<Vec<MedicationItem>> {
        let this = self.clone();
        let serial_number = serial_number.to_string();
        tokio::spawn(async move { this.run_load(&serial_number, items).await })
            .await
            .map_err(|e| FleetError::Internal(format!("load transaction aborted: {e}")))?
    }

    /// Items loaded on a drone, ordered by code
    pub async fn items(&self, serial_number: &str) -> FleetResult<Vec<MedicationItem>> {
        self.registry.require(serial_number).await?;
        Ok(self.registry.store().list_items(serial_number).await?)
    }

    #[instrument(name = "load_drone", skip_all, fields(%serial_number, items = items.len()))]
    async fn run_load(
        &self,
        serial_number: &str,
        items: Vec<NewMedicationItem>,
    ) -> FleetResult<Vec<MedicationItem>> {
        if items.is_empty() {
            return Err(DomainError::EmptyManifest.into());
        }

        let drone = self.registry.require(serial_number).await?;
        if drone.state == DroneState::Loading {
            warn!("Drone already loading");
            return Err(FleetError::AlreadyLoading {
                serial_number: drone.serial_number,
            });
        }

        let lease = self.registry.acquire_loading(&drone).await?;
        let outcome = self.stage_and_commit(&drone, &items).await;
        let released = lease.release().await;

        match (outcome, released) {
            (Ok(()), Ok(())) => {
                let loaded = self.registry.store().list_items(serial_number).await?;
                info!(total_items = loaded.len(), "Drone loaded");
                Ok(loaded)
            }
            (Ok(()), Err(cleanup)) => {
                error!(error = %cleanup, "Items committed but drone could not leave LOADING");
                Err(FleetError::Internal(format!(
                    "items committed on drone '{serial_number}' but it could not leave LOADING: {cleanup}"
                )))
            }
            (Err(primary), Ok(())) => {
                warn!(error = %primary, "Load rejected");
                Err(primary)
            }
            (Err(primary), Err(cleanup)) => {
                error!(error = %primary, cleanup_error = %cleanup, "Load rejected and drone could not leave LOADING");
                Err(primary)
            }
        }
    }

    /// Validate and weigh every item in input order, then insert the batch.
    ///
    /// Each item is checked field by field, then for a repeated code within
    /// the batch, then against the running weight total. The first failure
    /// wins.
    async fn stage_and_commit(&self, drone: &Drone, items: &[NewMedicationItem]) -> FleetResult<()> {
        let serial_number = drone.serial_number.as_str();
        let store = self.registry.store();

        let mut total = store.sum_item_weight(serial_number).await?;
        let mut codes = HashSet::with_capacity(items.len());
        let mut staged = Vec::with_capacity(items.len());

        for item in items {
            let item = item.validate(serial_number)?;
            if !codes.insert(item.code.clone()) {
                return Err(FleetError::DuplicateMedication {
                    serial_number: serial_number.to_string(),
                    code: item.code,
                });
            }
            total = total.saturating_add(item.weight);
            if total > drone.weight_limit {
                return Err(FleetError::WeightLimitExceeded {
                    serial_number: serial_number.to_string(),
                    limit: drone.weight_limit,
                    attempted: total,
                });
            }
            staged.push(item);
        }

        match store.insert_items(serial_number, &staged).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_conflict() => {
                let loaded = store.list_items(serial_number).await?;
                let clash = staged
                    .into_iter()
                    .map(|item| item.code)
                    .find(|code| loaded.iter().any(|existing| existing.code == *code));
                // The clashing row may be gone again by now (a reset in between)
                match clash {
                    Some(code) => Err(FleetError::DuplicateMedication {
                        serial_number: serial_number.to_string(),
                        code,
                    }),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::FaultyStore;
    use crate::{ErrorKind, FleetPolicy};
    use drone_persistence::{MemoryStore, PersistenceError};
    use fake::Fake;
    use fake::faker::lorem::en::Word;
    use tokio_test::assert_ok;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn setup() -> (DroneRegistry, LoadCoordinator) {
        let registry = DroneRegistry::new(Arc::new(MemoryStore::new()), FleetPolicy::default());
        let coordinator = LoadCoordinator::new(registry.clone());
        (registry, coordinator)
    }

    fn faulty_setup() -> (Arc<FaultyStore>, DroneRegistry, LoadCoordinator) {
        let store = Arc::new(FaultyStore::default());
        let registry = DroneRegistry::new(store.clone(), FleetPolicy::default());
        let coordinator = LoadCoordinator::new(registry.clone());
        (store, registry, coordinator)
    }

    fn item(code: &str, weight: i64) -> NewMedicationItem {
        let name: String = Word().fake();
        NewMedicationItem {
            code: code.to_string(),
            name,
            weight,
            image_base64: IMAGE.to_string(),
        }
    }

    async fn state(registry: &DroneRegistry, serial_number: &str) -> DroneState {
        registry.require(serial_number).await.unwrap().state
    }

    #[tokio::test]
    async fn test_over_limit_then_fits_then_over_again() {
        let (registry, coordinator) = setup();
        registry.register("HW", "Heavyweight", 80).await.unwrap();

        let err = coordinator
            .load_drone("HW", vec![item("A", 300), item("B", 300)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FleetError::WeightLimitExceeded { limit: 500, attempted: 600, .. }
        ));
        assert!(coordinator.items("HW").await.unwrap().is_empty());
        assert_eq!(state(&registry, "HW").await, DroneState::Loaded);

        let loaded = assert_ok!(coordinator.load_drone("HW", vec![item("A", 300)]).await);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].weight, 300);
        assert_eq!(loaded[0].drone_serial_number, "HW");

        let err = coordinator
            .load_drone("HW", vec![item("C", 300)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::WeightLimitExceeded { attempted: 600, .. }));
        assert_eq!(coordinator.items("HW").await.unwrap().len(), 1);
        assert_eq!(state(&registry, "HW").await, DroneState::Loaded);
    }

    #[tokio::test]
    async fn test_low_battery_fails_before_item_checks() {
        let (registry, coordinator) = setup();
        registry.register("LOW", "Lightweight", 10).await.unwrap();

        // The item itself is invalid, but the battery floor is checked first
        let err = coordinator
            .load_drone("LOW", vec![item("bad code", 9999)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::BatteryTooLow { required: 25, .. }));
        assert_eq!(state(&registry, "LOW").await, DroneState::Idle);
        assert!(coordinator.items("LOW").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_drone() {
        let (_, coordinator) = setup();
        let err = coordinator
            .load_drone("NOPE", vec![item("A", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::DroneNotFound { .. }));
        assert!(matches!(
            coordinator.items("NOPE").await,
            Err(FleetError::DroneNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_drone_in_loading_is_rejected_untouched() {
        let (registry, coordinator) = setup();
        registry.register("BUSY", "Heavyweight", 90).await.unwrap();
        registry.transition("BUSY", DroneState::Loading).await.unwrap();

        let err = coordinator
            .load_drone("BUSY", vec![item("A", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::AlreadyLoading { .. }));
        assert_eq!(state(&registry, "BUSY").await, DroneState::Loading);
    }

    #[tokio::test]
    async fn test_empty_manifest() {
        let (registry, coordinator) = setup();
        registry.register("E", "Heavyweight", 90).await.unwrap();
        let err = coordinator.load_drone("E", Vec::new()).await.unwrap_err();
        assert!(matches!(err, FleetError::Validation(DomainError::EmptyManifest)));
        assert_eq!(state(&registry, "E").await, DroneState::Idle);
    }

    #[tokio::test]
    async fn test_first_invalid_item_wins() {
        let (registry, coordinator) = setup();
        registry.register("V", "Heavyweight", 90).await.unwrap();

        let mut bad_name = item("OK_1", 10);
        bad_name.name = "no spaces allowed".to_string();
        let err = coordinator
            .load_drone("V", vec![item("OK_0", 10), bad_name, item("lower", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Validation(DomainError::InvalidName(_))));
        assert!(coordinator.items("V").await.unwrap().is_empty());
        assert_eq!(state(&registry, "V").await, DroneState::Loaded);
    }

    #[tokio::test]
    async fn test_duplicate_codes() {
        let (registry, coordinator) = setup();
        registry.register("DUP", "Heavyweight", 90).await.unwrap();

        let err = coordinator
            .load_drone("DUP", vec![item("X1", 10), item("X1", 20)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::DuplicateMedication { ref code, .. } if code == "X1"));

        coordinator.load_drone("DUP", vec![item("X1", 10)]).await.unwrap();
        let err = coordinator
            .load_drone("DUP", vec![item("X2", 10), item("X1", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::DuplicateMedication { ref code, .. } if code == "X1"));

        let codes: Vec<_> = coordinator
            .items("DUP")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, ["X1"]);
    }

    #[tokio::test]
    async fn test_returns_full_set_ordered_by_code() {
        let (registry, coordinator) = setup();
        registry.register("ORD", "Cruiserweight", 90).await.unwrap();

        coordinator.load_drone("ORD", vec![item("M", 50)]).await.unwrap();
        let loaded = coordinator
            .load_drone("ORD", vec![item("Z", 50), item("B", 50)])
            .await
            .unwrap();

        let codes: Vec<_> = loaded.iter().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, ["B", "M", "Z"]);
        let total: u32 = loaded.iter().map(|i| i.weight).sum();
        assert_eq!(total, 150);
    }

    #[tokio::test]
    async fn test_weight_invariant_holds_across_sequential_loads() {
        let (registry, coordinator) = setup();
        registry.register("SEQ", "Middleweight", 100).await.unwrap();
        let limit = registry.require("SEQ").await.unwrap().weight_limit;

        for round in 0..20 {
            let weight: i64 = (1..120).fake();
            let _ = coordinator
                .load_drone("SEQ", vec![item(&format!("R{round}"), weight)])
                .await;
            let total: u32 = coordinator
                .items("SEQ")
                .await
                .unwrap()
                .iter()
                .map(|i| i.weight)
                .sum();
            assert!(total <= limit, "{total} > {limit}");
            assert_ne!(state(&registry, "SEQ").await, DroneState::Loading);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_loads_never_strand_a_drone() {
        let (registry, coordinator) = setup();
        registry.register("CC", "Heavyweight", 100).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .load_drone("CC", vec![item(&format!("C{n}"), 10)])
                        .await
                })
            })
            .collect();

        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) | Err(FleetError::AlreadyLoading { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(state(&registry, "CC").await, DroneState::Loaded);
    }

    #[tokio::test]
    async fn test_failed_cleanup_keeps_the_rejection() {
        let (store, registry, coordinator) = faulty_setup();
        registry.register("STUCK", "Lightweight", 90).await.unwrap();
        store.stuck_loading.store(true, Ordering::SeqCst);

        let err = coordinator
            .load_drone("STUCK", vec![item("A", 60), item("B", 60)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FleetError::WeightLimitExceeded { limit: 100, attempted: 120, .. }
        ));
        assert!(coordinator.items("STUCK").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_committed_batch_with_failed_cleanup_is_internal() {
        let (store, registry, coordinator) = faulty_setup();
        registry.register("STUCK", "Lightweight", 90).await.unwrap();
        store.stuck_loading.store(true, Ordering::SeqCst);

        let err = coordinator
            .load_drone("STUCK", vec![item("C", 10)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("items committed on drone 'STUCK'"));
        assert_eq!(coordinator.items("STUCK").await.unwrap().len(), 1);
        assert_eq!(state(&registry, "STUCK").await, DroneState::Loading);
    }

    #[tokio::test]
    async fn test_storage_failure_mid_batch_persists_nothing() {
        let (store, registry, coordinator) = faulty_setup();
        registry.register("DOWN", "Heavyweight", 90).await.unwrap();
        store.insert_down.store(true, Ordering::SeqCst);

        let err = coordinator
            .load_drone("DOWN", vec![item("A", 10), item("B", 10)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FleetError::Persistence(PersistenceError::Scylla(_))
        ));
        assert!(coordinator.items("DOWN").await.unwrap().is_empty());
        assert_eq!(state(&registry, "DOWN").await, DroneState::Loaded);
    }

    #[tokio::test]
    async fn test_conflict_without_visible_clash_is_not_a_blank_duplicate() {
        let (store, registry, coordinator) = faulty_setup();
        registry.register("GONE", "Heavyweight", 90).await.unwrap();
        store.phantom_conflict.store(true, Ordering::SeqCst);

        let err = coordinator
            .load_drone("GONE", vec![item("A", 10)])
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Persistence(ref e) if e.is_conflict()));
        assert_eq!(state(&registry, "GONE").await, DroneState::Loaded);
    }
}
