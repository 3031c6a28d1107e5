//! # Repository Module
//!
//! Store interface and its backends.

pub mod memory;
#[cfg(feature = "scylla")]
pub mod scylla_impl;
pub mod traits;

pub use memory::MemoryStore;
#[cfg(feature = "scylla")]
pub use scylla_impl::{ScyllaClient, ScyllaConfig, ScyllaFleetStore};
pub use traits::{DroneFilter, FleetStore, SharedFleetStore};
