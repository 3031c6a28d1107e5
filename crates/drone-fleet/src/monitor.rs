//! # Battery Monitor
//!
//! Periodic discharge of every charged drone, with a history snapshot per
//! drone per tick.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::FleetResult;
use crate::registry::DroneRegistry;
use drone_domain::BatteryReading;

#[derive(Clone)]
pub struct BatteryMonitor {
    registry: DroneRegistry,
    readings_tx: Option<broadcast::Sender<BatteryReading>>,
}

impl BatteryMonitor {
    pub const fn new(registry: DroneRegistry) -> Self {
        Self {
            registry,
            readings_tx: None,
        }
    }

    /// Publish every reading a tick records on `tx`
    #[must_use]
    pub fn with_publisher(mut self, tx: broadcast::Sender<BatteryReading>) -> Self {
        self.readings_tx = Some(tx);
        self
    }

    /// Discharge every drone with charge left and record a reading for each.
    ///
    /// Levels never go below zero; drones already at zero are skipped and get
    /// no reading. A drone that vanishes between listing and update aborts
    /// the tick with an internal error.
    pub async fn tick(&self) -> FleetResult<Vec<BatteryReading>> {
        let discharge = self.registry.policy().discharge_per_tick;
        let drones = self.registry.charged().await?;
        let store = self.registry.store();

        let mut readings = Vec::with_capacity(drones.len());
        for drone in drones {
            let level = drone.battery_level.saturating_sub(discharge);
            self.registry
                .record_battery_level(&drone.serial_number, level)
                .await?;
            let reading = store.append_reading(&drone.serial_number, level).await?;
            debug!(serial_number = %drone.serial_number, battery_level = level, "Battery reading recorded");

            if let Some(tx) = &self.readings_tx {
                // No subscribers is not an error
                let _ = tx.send(reading.clone());
            }
            readings.push(reading);
        }

        info!(drones = readings.len(), discharge, "Battery check complete");
        Ok(readings)
    }

    /// Battery history of a drone, most recent first
    pub async fn history(&self, serial_number: &str) -> FleetResult<Vec<BatteryReading>> {
        self.registry.require(serial_number).await?;
        Ok(self.registry.store().list_readings(serial_number).await?)
    }

    /// Tick every `period` until `cancel` fires. The first tick runs one
    /// period after start; a failed tick is logged and the next one still runs.
    pub async fn run(self, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs_f64(), "Battery monitor started");

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Battery check failed");
                    }
                }
            }
        }

        info!("Battery monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::FleetPolicy;
    use drone_domain::DroneState;
    use crate::ErrorKind;
    use crate::testing::FaultyStore;
    use drone_persistence::MemoryStore;

    fn setup(policy: FleetPolicy) -> (DroneRegistry, BatteryMonitor) {
        let registry = DroneRegistry::new(Arc::new(MemoryStore::new()), policy);
        let monitor = BatteryMonitor::new(registry.clone());
        (registry, monitor)
    }

    async fn level(registry: &DroneRegistry, serial_number: &str) -> u8 {
        registry.require(serial_number).await.unwrap().battery_level
    }

    #[tokio::test]
    async fn test_tick_discharges_charged_drones_only() {
        let (registry, monitor) = setup(FleetPolicy::default());
        registry.register("FULL", "Lightweight", 100).await.unwrap();
        registry.register("ONE", "Lightweight", 1).await.unwrap();
        registry.register("EMPTY", "Lightweight", 0).await.unwrap();

        let readings = monitor.tick().await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(level(&registry, "FULL").await, 99);
        assert_eq!(level(&registry, "ONE").await, 0);
        assert_eq!(level(&registry, "EMPTY").await, 0);
        assert!(monitor.history("EMPTY").await.unwrap().is_empty());

        // ONE hit zero last tick and is skipped from now on
        let readings = monitor.tick().await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(monitor.history("ONE").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tick_ignores_state() {
        let (registry, monitor) = setup(FleetPolicy::default());
        registry.register("D", "Lightweight", 50).await.unwrap();
        registry.transition("D", DroneState::Delivering).await.unwrap();

        monitor.tick().await.unwrap();
        let drone = registry.require("D").await.unwrap();
        assert_eq!(drone.battery_level, 49);
        assert_eq!(drone.state, DroneState::Delivering);
    }

    #[tokio::test]
    async fn test_discharge_saturates_at_zero() {
        let policy = FleetPolicy {
            discharge_per_tick: 30,
            ..FleetPolicy::default()
        };
        let (registry, monitor) = setup(policy);
        registry.register("D", "Lightweight", 40).await.unwrap();

        monitor.tick().await.unwrap();
        monitor.tick().await.unwrap();
        assert_eq!(level(&registry, "D").await, 0);

        let levels: Vec<u8> = monitor
            .history("D")
            .await
            .unwrap()
            .iter()
            .map(|r| r.battery_level)
            .collect();
        assert_eq!(levels, [0, 10]);
    }

    #[tokio::test]
    async fn test_history_matches_stored_levels() {
        let (registry, monitor) = setup(FleetPolicy::default());
        registry.register("H", "Lightweight", 60).await.unwrap();

        for _ in 0..5 {
            let readings = monitor.tick().await.unwrap();
            assert_eq!(readings[0].battery_level, level(&registry, "H").await);
        }

        let history = monitor.history("H").await.unwrap();
        let levels: Vec<u8> = history.iter().map(|r| r.battery_level).collect();
        assert_eq!(levels, [55, 56, 57, 58, 59]);
        assert!(history.windows(2).all(|w| w[0].recorded_at >= w[1].recorded_at));
        assert!(history.iter().all(|r| r.serial_number == "H"));
    }

    #[tokio::test]
    async fn test_history_of_unknown_drone() {
        let (_, monitor) = setup(FleetPolicy::default());
        assert!(monitor.history("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn test_readings_are_published() {
        let (registry, monitor) = setup(FleetPolicy::default());
        let (tx, mut rx) = broadcast::channel(16);
        let monitor = monitor.with_publisher(tx);
        registry.register("P", "Lightweight", 10).await.unwrap();

        monitor.tick().await.unwrap();
        let reading = rx.recv().await.unwrap();
        assert_eq!(reading.serial_number, "P");
        assert_eq!(reading.battery_level, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let (registry, monitor) = setup(FleetPolicy::default());
        registry.register("T", "Lightweight", 50).await.unwrap();

        let cancel = CancellationToken::new();
        let task = tokio::spawn(monitor.run(Duration::from_secs(60), cancel.clone()));

        // Nothing happens before the first period elapses
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(level(&registry, "T").await, 50);

        tokio::time::sleep(Duration::from_secs(170)).await;
        assert_eq!(level(&registry, "T").await, 47);

        cancel.cancel();
        task.await.unwrap();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(level(&registry, "T").await, 47);
    }

    #[tokio::test]
    async fn test_lost_drone_aborts_the_tick() {
        let store = Arc::new(FaultyStore::default());
        let registry = DroneRegistry::new(store.clone(), FleetPolicy::default());
        let monitor = BatteryMonitor::new(registry.clone());
        for serial_number in ["A", "B", "C"] {
            registry.register(serial_number, "Lightweight", 50).await.unwrap();
        }
        store.lose("B");

        let err = monitor.tick().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        // A ran before the failure; C was never reached
        assert_eq!(level(&registry, "A").await, 49);
        assert_eq!(monitor.history("A").await.unwrap().len(), 1);
        assert_eq!(level(&registry, "B").await, 50);
        assert!(monitor.history("B").await.unwrap().is_empty());
        assert_eq!(level(&registry, "C").await, 50);
        assert!(monitor.history("C").await.unwrap().is_empty());
    }
}
