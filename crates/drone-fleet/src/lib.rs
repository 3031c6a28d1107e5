//! # Medical Drone Fleet - Consistency Engine
//!
//! Business rules for registering drones, loading medication onto them and
//! discharging their batteries over time.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐   ┌─────────────────┐   ┌────────────────┐
//! │ DroneRegistry │◀──│ LoadCoordinator │   │ BatteryMonitor │
//! └───────┬───────┘   └─────────────────┘   └───────┬────────┘
//!         │                                         │
//!         ▼                                         │
//! ┌───────────────────────────────────┐             │
//! │   FleetStore (memory / ScyllaDB)  │◀────────────┘
//! └───────────────────────────────────┘
//! ```
//!
//! All three components share one store handle. Lifecycle changes go through
//! the registry's conditional transition only.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod coordinator;
pub mod error;
pub mod monitor;
pub mod registry;

#[cfg(test)]
mod testing;

pub use coordinator::LoadCoordinator;
pub use error::{ErrorKind, FleetError, FleetResult};
pub use monitor::BatteryMonitor;
pub use registry::{DroneRegistry, LoadingLease};

use drone_domain::{DEFAULT_DISCHARGE_PER_TICK, DEFAULT_MIN_LOADING_BATTERY};
use drone_persistence::SharedFleetStore;

/// Tunable fleet thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FleetPolicy {
    /// Minimum battery, in percent, to enter `LOADING`
    pub min_loading_battery: u8,
    /// Battery percent removed from each charged drone per monitor tick
    pub discharge_per_tick: u8,
}

impl Default for FleetPolicy {
    fn default() -> Self {
        Self {
            min_loading_battery: DEFAULT_MIN_LOADING_BATTERY,
            discharge_per_tick: DEFAULT_DISCHARGE_PER_TICK,
        }
    }
}

/// The three engine components wired to one store
#[derive(Clone)]
pub struct Fleet {
    pub registry: DroneRegistry,
    pub coordinator: LoadCoordinator,
    pub monitor: BatteryMonitor,
}

impl Fleet {
    pub fn new(store: SharedFleetStore, policy: FleetPolicy) -> Self {
        let registry = DroneRegistry::new(store, policy);
        Self {
            coordinator: LoadCoordinator::new(registry.clone()),
            monitor: BatteryMonitor::new(registry.clone()),
            registry,
        }
    }
}
