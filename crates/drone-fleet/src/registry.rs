//! # Drone Registry
//!
//! Registration, lookup and lifecycle transitions. Every transition is a
//! single conditional write in the store: the battery floor is checked by
//! the backend, never by a read on this side followed by a write.

use tracing::{debug, error, info, instrument, warn};

use crate::error::{FleetError, FleetResult};
use crate::FleetPolicy;
use drone_domain::{Drone, DroneState};
use drone_persistence::{DroneFilter, SharedFleetStore};

/// Handle to the registered fleet. Cheap to clone.
#[derive(Clone)]
pub struct DroneRegistry {
    store: SharedFleetStore,
    policy: FleetPolicy,
}

impl DroneRegistry {
    pub fn new(store: SharedFleetStore, policy: FleetPolicy) -> Self {
        Self { store, policy }
    }

    pub const fn policy(&self) -> FleetPolicy {
        self.policy
    }

    /// Validate and persist a new drone in state `IDLE`.
    ///
    /// Field checks run in a fixed order (serial number, model, battery) and
    /// the first failure is reported. The duplicate check is the store's
    /// insert-if-absent, so two concurrent registrations of the same serial
    /// number cannot both succeed.
    #[instrument(skip_all, fields(%serial_number))]
    pub async fn register(
        &self,
        serial_number: &str,
        model: &str,
        battery_level: i64,
    ) -> FleetResult<Drone> {
        let drone = Drone::register(serial_number, model, battery_level)?;

        match self.store.create_drone_if_absent(&drone).await {
            Ok(()) => {}
            Err(e) if e.is_conflict() => {
                warn!("Drone already registered");
                return Err(FleetError::DuplicateDrone {
                    serial_number: drone.serial_number,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            model = %drone.model,
            weight_limit = drone.weight_limit,
            battery_level = drone.battery_level,
            "Drone registered"
        );
        Ok(drone)
    }

    pub async fn get(&self, serial_number: &str) -> FleetResult<Option<Drone>> {
        Ok(self.store.get_drone(serial_number).await?)
    }

    /// Like [`get`](Self::get), but absence is an error
    pub async fn require(&self, serial_number: &str) -> FleetResult<Drone> {
        self.get(serial_number)
            .await?
            .ok_or_else(|| FleetError::not_found(serial_number))
    }

    /// `IDLE` drones charged to at least the loading floor, ordered by serial number
    pub async fn list_available_for_loading(&self) -> FleetResult<Vec<Drone>> {
        let filter = DroneFilter::AvailableForLoading {
            min_battery: self.policy.min_loading_battery,
        };
        Ok(self.store.list_drones(filter).await?)
    }

    /// Battery floor a drone must meet to enter `target`
    pub const fn required_battery(&self, target: DroneState) -> u8 {
        match target {
            DroneState::Loading => self.policy.min_loading_battery,
            _ => 0,
        }
    }

    /// Move a drone into `target` if its persisted battery meets the floor
    /// for that state.
    ///
    /// Succeeds only when exactly one row was updated. An absent drone and a
    /// drone under the floor both surface as `BatteryTooLow`.
    #[instrument(skip_all, fields(%serial_number, state = %target))]
    pub async fn transition(&self, serial_number: &str, target: DroneState) -> FleetResult<()> {
        let required = self.required_battery(target);
        let affected = self
            .store
            .update_state_if_battery(serial_number, target, required)
            .await?;

        if affected == 0 {
            warn!(required, "State transition rejected");
            return Err(FleetError::BatteryTooLow {
                serial_number: serial_number.to_string(),
                required,
            });
        }

        debug!("State transition applied");
        Ok(())
    }

    /// Move `drone` into `LOADING` and hand back the guard that takes it out again
    pub async fn acquire_loading(&self, drone: &Drone) -> FleetResult<LoadingLease> {
        self.transition(&drone.serial_number, DroneState::Loading)
            .await?;
        Ok(LoadingLease {
            registry: self.clone(),
            serial_number: drone.serial_number.clone(),
            released: false,
        })
    }

    /// Remove every drone, item and reading
    pub async fn reset(&self) -> FleetResult<()> {
        self.store.clear_all().await?;
        warn!("Fleet reset");
        Ok(())
    }

    pub(crate) async fn charged(&self) -> FleetResult<Vec<Drone>> {
        Ok(self.store.list_drones(DroneFilter::Charged).await?)
    }

    /// Overwrite a drone's battery level. The drone was just listed, so a
    /// miss means the store lost it underneath us.
    pub(crate) async fn record_battery_level(
        &self,
        serial_number: &str,
        battery_level: u8,
    ) -> FleetResult<()> {
        let affected = self
            .store
            .update_battery(serial_number, battery_level)
            .await?;
        if affected == 0 {
            error!(serial_number = %serial_number, "Battery update touched no rows");
            return Err(FleetError::Internal(format!(
                "battery level of drone '{serial_number}' could not be updated"
            )));
        }
        Ok(())
    }

    pub(crate) fn store(&self) -> &SharedFleetStore {
        &self.store
    }
}

// =============================================================================
// LOADING LEASE
// =============================================================================

/// Proof that a drone was moved into `LOADING`.
///
/// Consume it with [`release`](Self::release), which moves the drone to
/// `LOADED`. A lease dropped without being released (panic, cancelled
/// future) schedules the same transition on the current runtime.
#[must_use = "a drone stays in LOADING until its lease is released"]
pub struct LoadingLease {
    registry: DroneRegistry,
    serial_number: String,
    released: bool,
}

impl LoadingLease {
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub async fn release(mut self) -> FleetResult<()> {
        let result = self
            .registry
            .transition(&self.serial_number, DroneState::Loaded)
            .await;
        self.released = true;
        result
    }
}

impl Drop for LoadingLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let registry = self.registry.clone();
        let serial_number = std::mem::take(&mut self.serial_number);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(serial_number = %serial_number, "Loading lease dropped, releasing in background");
                handle.spawn(async move {
                    if let Err(e) = registry
                        .transition(&serial_number, DroneState::Loaded)
                        .await
                    {
                        error!(serial_number = %serial_number, error = %e, "Background lease release failed");
                    }
                });
            }
            Err(_) => {
                error!(serial_number = %serial_number, "Loading lease dropped outside a runtime, drone left in LOADING");
            }
        }
    }
}
