//! # API Context
//!
//! Application state shared by REST handlers and GraphQL resolvers.

use std::sync::Arc;

use tokio::sync::broadcast;

use drone_domain::BatteryReading;
use drone_fleet::{Fleet, FleetPolicy};
use drone_persistence::{MemoryStore, SharedFleetStore};

/// Broadcast channel capacity
const CHANNEL_CAPACITY: usize = 1024;

/// Application context shared across all handlers
#[derive(Clone)]
pub struct ApiContext {
    /// Registry, load coordinator and battery monitor over one store
    pub fleet: Fleet,

    /// Battery readings recorded by each monitor tick
    pub readings_tx: broadcast::Sender<BatteryReading>,
}

impl ApiContext {
    /// Wire the fleet engine to `store`. The monitor publishes its readings
    /// on this context's broadcast channel.
    pub fn new(store: SharedFleetStore, policy: FleetPolicy) -> Self {
        let (readings_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let mut fleet = Fleet::new(store, policy);
        fleet.monitor = fleet.monitor.with_publisher(readings_tx.clone());

        Self { fleet, readings_tx }
    }

    /// Context over a fresh in-process store
    pub fn in_memory(policy: FleetPolicy) -> Self {
        Self::new(Arc::new(MemoryStore::new()), policy)
    }
}
