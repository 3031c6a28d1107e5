//! # Drone Fleet Simulator
//!
//! Load generator for the medical drone fleet API.
//!
//! ## Features
//!
//! - Random fleet registration (model, initial battery)
//! - Random medication manifests with normally distributed weights
//! - Concurrent load rounds, including contended loads on the same drone
//! - Outcome tally per round and overall

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod fleet;
pub mod report;

pub use client::{ClientError, FleetClient};
pub use fleet::{DroneRegistration, ManifestGenerator};
pub use report::{Outcome, Tally};
