//! # Drone Persistence Library
//!
//! Persistence layer for the medical drone fleet.
//!
//! ## Architecture
//!
//! The fleet engine talks to a single [`FleetStore`] trait object. Two
//! backends implement it:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Fleet Engine                           │
//! │        (DroneRegistry, LoadCoordinator, BatteryMonitor)     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   FleetStore trait                          │
//! │   (conditional updates, atomic item batches, readings)      │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                   │
//!                    ▼                   ▼
//! ┌─────────────────────────┐   ┌──────────────────────────────┐
//! │      MemoryStore        │   │     ScyllaFleetStore         │
//! │  (single RwLock)        │   │  (lightweight transactions)  │
//! └─────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - `scylla`: Enable ScyllaDB backend (default)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drone_persistence::{ScyllaClient, ScyllaConfig, ScyllaFleetStore, SharedFleetStore};
//!
//! let client = ScyllaClient::new(ScyllaConfig::default()).await?;
//! let store = ScyllaFleetStore::new(Arc::new(client));
//! store.ensure_schema().await?;
//!
//! let store: SharedFleetStore = Arc::new(store);
//! let drone = store.get_drone("DRN-001").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod repository;

// Re-export commonly used types
pub use error::{PersistenceError, Result};
pub use repository::{DroneFilter, FleetStore, MemoryStore, SharedFleetStore};
#[cfg(feature = "scylla")]
pub use repository::{ScyllaClient, ScyllaConfig, ScyllaFleetStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Connect to ScyllaDB with the given configuration and prepare the schema
///
/// # Errors
///
/// Returns an error if the connection or schema creation fails.
#[cfg(feature = "scylla")]
pub async fn init_scylla(config: ScyllaConfig) -> Result<ScyllaFleetStore> {
    let client = ScyllaClient::new(config).await?;
    let store = ScyllaFleetStore::new(std::sync::Arc::new(client));
    store.ensure_schema().await?;
    Ok(store)
}
