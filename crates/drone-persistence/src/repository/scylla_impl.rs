//! ScyllaDB store implementation.
//!
//! Conditional writes are lightweight transactions: the `[applied]` column of
//! the LWT response becomes the affected-row count. Item batches share one
//! partition (`drone_serial_number`), so a conditional logged batch commits
//! all of them or none.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scylla::batch::Batch;
use scylla::frame::response::result::Row;
use scylla::transport::query_result::QueryResult;
use scylla::{Session, SessionBuilder};
use uuid::Uuid;

use crate::error::{PersistenceError, Result};
use crate::repository::traits::{DroneFilter, FleetStore};
use drone_domain::{BatteryReading, Drone, DroneModel, DroneState, MedicationItem};

// =============================================================================
// SCYLLA CONFIGURATION
// =============================================================================

/// ScyllaDB connection configuration.
#[derive(Debug, Clone)]
pub struct ScyllaConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for ScyllaConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["localhost:9042".to_string()],
            keyspace: "drone_fleet".to_string(),
            username: None,
            password: None,
        }
    }
}

// =============================================================================
// SCYLLA CLIENT
// =============================================================================

/// ScyllaDB client wrapper.
pub struct ScyllaClient {
    session: Arc<Session>,
    pub config: ScyllaConfig,
}

impl ScyllaClient {
    /// Connect, create the keyspace if needed and switch to it.
    pub async fn new(config: ScyllaConfig) -> Result<Self> {
        if config.keyspace.is_empty()
            || !config
                .keyspace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(PersistenceError::InvalidQuery(format!(
                "invalid keyspace name '{}'",
                config.keyspace
            )));
        }

        let mut builder = SessionBuilder::new().known_nodes(&config.hosts);

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.user(user, pass);
        }

        let session = builder.build().await?;

        session
            .query_unpaged(
                format!(
                    "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = \
                     {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                    config.keyspace
                ),
                (),
            )
            .await?;

        // Use keyspace
        session
            .query_unpaged(format!("USE {}", config.keyspace), ())
            .await?;

        Ok(Self {
            session: Arc::new(session),
            config,
        })
    }

    /// Get session reference.
    pub fn session(&self) -> &Session {
        &self.session
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

const SCHEMA: [&str; 3] = [
    r"
    CREATE TABLE IF NOT EXISTS drones (
        serial_number text PRIMARY KEY,
        model text,
        weight_limit int,
        battery_level int,
        state text
    )",
    r"
    CREATE TABLE IF NOT EXISTS medication_items (
        drone_serial_number text,
        code text,
        name text,
        weight int,
        image_base64 text,
        PRIMARY KEY (drone_serial_number, code)
    )",
    r"
    CREATE TABLE IF NOT EXISTS battery_readings (
        serial_number text,
        recorded_at_ms bigint,
        reading_id uuid,
        battery_level int,
        PRIMARY KEY (serial_number, recorded_at_ms, reading_id)
    ) WITH CLUSTERING ORDER BY (recorded_at_ms DESC, reading_id DESC)",
];

type DroneRow = (String, String, i32, i32, String);
type ItemRow = (String, String, String, i32, String);

// =============================================================================
// FLEET STORE
// =============================================================================

/// Fleet store backed by ScyllaDB.
pub struct ScyllaFleetStore {
    client: Arc<ScyllaClient>,
}

impl ScyllaFleetStore {
    /// Create a new store over an open client.
    pub fn new(client: Arc<ScyllaClient>) -> Self {
        Self { client }
    }

    /// Create the fleet tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            self.client.session.query_unpaged(statement, ()).await?;
        }
        tracing::info!(keyspace = %self.client.config.keyspace, "Fleet schema ready");
        Ok(())
    }
}

/// Read the `[applied]` flag of a lightweight transaction as a row count.
fn applied(result: QueryResult) -> Result<u64> {
    let rows = result.into_rows_result()?;
    let first = rows.maybe_first_row::<Row>()?;
    let applied = first
        .and_then(|row| row.columns.into_iter().next().flatten())
        .and_then(|value| value.as_boolean())
        .unwrap_or(false);
    Ok(u64::from(applied))
}

fn to_drone(row: DroneRow) -> Result<Drone> {
    let (serial_number, model, weight_limit, battery_level, state) = row;
    let model: DroneModel = model
        .parse()
        .map_err(|e| PersistenceError::corrupt("Drone", &serial_number, e))?;
    let state: DroneState = state
        .parse()
        .map_err(|e| PersistenceError::corrupt("Drone", &serial_number, e))?;
    let weight_limit = u32::try_from(weight_limit)
        .map_err(|e| PersistenceError::corrupt("Drone", &serial_number, e))?;
    let battery_level = u8::try_from(battery_level)
        .map_err(|e| PersistenceError::corrupt("Drone", &serial_number, e))?;

    Ok(Drone {
        serial_number,
        model,
        weight_limit,
        battery_level,
        state,
    })
}

fn to_item(row: ItemRow) -> Result<MedicationItem> {
    let (drone_serial_number, code, name, weight, image_base64) = row;
    let weight = u32::try_from(weight).map_err(|e| {
        PersistenceError::corrupt("MedicationItem", format!("{drone_serial_number}/{code}"), e)
    })?;

    Ok(MedicationItem {
        drone_serial_number,
        code,
        name,
        weight,
        image_base64,
    })
}

#[async_trait]
impl FleetStore for ScyllaFleetStore {
    async fn create_drone_if_absent(&self, drone: &Drone) -> Result<()> {
        let query = r"
            INSERT INTO drones (serial_number, model, weight_limit, battery_level, state)
            VALUES (?, ?, ?, ?, ?)
            IF NOT EXISTS
        ";

        let result = self
            .client
            .session
            .query_unpaged(
                query,
                (
                    &drone.serial_number,
                    drone.model.as_str(),
                    i32::try_from(drone.weight_limit).unwrap_or(i32::MAX),
                    i32::from(drone.battery_level),
                    drone.state.as_str(),
                ),
            )
            .await?;

        if applied(result)? == 0 {
            return Err(PersistenceError::conflict("Drone", &drone.serial_number));
        }
        Ok(())
    }

    async fn get_drone(&self, serial_number: &str) -> Result<Option<Drone>> {
        let query = r"
            SELECT serial_number, model, weight_limit, battery_level, state
            FROM drones
            WHERE serial_number = ?
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, (serial_number,))
            .await?
            .into_rows_result()?;

        result
            .maybe_first_row::<DroneRow>()?
            .map(to_drone)
            .transpose()
    }

    async fn list_drones(&self, filter: DroneFilter) -> Result<Vec<Drone>> {
        let query = r"
            SELECT serial_number, model, weight_limit, battery_level, state
            FROM drones
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, ())
            .await?
            .into_rows_result()?;

        let mut drones = Vec::new();
        for row in result.rows::<DroneRow>()? {
            let drone = to_drone(row?)?;
            if filter.matches(&drone) {
                drones.push(drone);
            }
        }
        drones.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        Ok(drones)
    }

    async fn update_state_if_battery(
        &self,
        serial_number: &str,
        state: DroneState,
        min_battery: u8,
    ) -> Result<u64> {
        let query = r"
            UPDATE drones SET state = ?
            WHERE serial_number = ?
            IF battery_level >= ?
        ";

        let result = self
            .client
            .session
            .query_unpaged(
                query,
                (state.as_str(), serial_number, i32::from(min_battery)),
            )
            .await?;

        applied(result)
    }

    async fn update_battery(&self, serial_number: &str, battery_level: u8) -> Result<u64> {
        let query = r"
            UPDATE drones SET battery_level = ?
            WHERE serial_number = ?
            IF EXISTS
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, (i32::from(battery_level), serial_number))
            .await?;

        applied(result)
    }

    async fn sum_item_weight(&self, drone_serial_number: &str) -> Result<u32> {
        let query = r"
            SELECT SUM(weight) FROM medication_items
            WHERE drone_serial_number = ?
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, (drone_serial_number,))
            .await?
            .into_rows_result()?;

        let total = result
            .maybe_first_row::<(Option<i32>,)>()?
            .and_then(|(sum,)| sum)
            .unwrap_or(0);

        u32::try_from(total)
            .map_err(|e| PersistenceError::corrupt("MedicationItem", drone_serial_number, e))
    }

    async fn insert_items(
        &self,
        drone_serial_number: &str,
        items: &[MedicationItem],
    ) -> Result<u64> {
        if items.is_empty() {
            return Ok(0);
        }

        let statement = r"
            INSERT INTO medication_items (drone_serial_number, code, name, weight, image_base64)
            VALUES (?, ?, ?, ?, ?)
            IF NOT EXISTS
        ";

        let mut batch = Batch::default();
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            batch.append_statement(statement);
            values.push((
                drone_serial_number,
                item.code.as_str(),
                item.name.as_str(),
                i32::try_from(item.weight).unwrap_or(i32::MAX),
                item.image_base64.as_str(),
            ));
        }

        let result = self.client.session.batch(&batch, values).await?;

        if applied(result)? == 0 {
            let codes: Vec<&str> = items.iter().map(|i| i.code.as_str()).collect();
            return Err(PersistenceError::conflict(
                "MedicationItem",
                format!("{drone_serial_number}/[{}]", codes.join(",")),
            ));
        }
        Ok(items.len() as u64)
    }

    async fn list_items(&self, drone_serial_number: &str) -> Result<Vec<MedicationItem>> {
        let query = r"
            SELECT drone_serial_number, code, name, weight, image_base64
            FROM medication_items
            WHERE drone_serial_number = ?
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, (drone_serial_number,))
            .await?
            .into_rows_result()?;

        let mut items = Vec::new();
        for row in result.rows::<ItemRow>()? {
            items.push(to_item(row?)?);
        }
        Ok(items)
    }

    async fn append_reading(
        &self,
        serial_number: &str,
        battery_level: u8,
    ) -> Result<BatteryReading> {
        let query = r"
            INSERT INTO battery_readings (serial_number, recorded_at_ms, reading_id, battery_level)
            VALUES (?, ?, ?, ?)
        ";

        let recorded_at = Utc::now();
        self.client
            .session
            .query_unpaged(
                query,
                (
                    serial_number,
                    recorded_at.timestamp_millis(),
                    Uuid::now_v7(),
                    i32::from(battery_level),
                ),
            )
            .await?;

        Ok(BatteryReading {
            serial_number: serial_number.to_string(),
            battery_level,
            recorded_at,
        })
    }

    async fn list_readings(&self, serial_number: &str) -> Result<Vec<BatteryReading>> {
        let query = r"
            SELECT recorded_at_ms, battery_level
            FROM battery_readings
            WHERE serial_number = ?
        ";

        let result = self
            .client
            .session
            .query_unpaged(query, (serial_number,))
            .await?
            .into_rows_result()?;

        let mut readings = Vec::new();
        for row in result.rows::<(i64, i32)>()? {
            let (recorded_at_ms, battery_level) = row?;
            let recorded_at = DateTime::<Utc>::from_timestamp_millis(recorded_at_ms)
                .ok_or_else(|| {
                    PersistenceError::corrupt("BatteryReading", serial_number, "timestamp out of range")
                })?;
            let battery_level = u8::try_from(battery_level)
                .map_err(|e| PersistenceError::corrupt("BatteryReading", serial_number, e))?;
            readings.push(BatteryReading {
                serial_number: serial_number.to_string(),
                battery_level,
                recorded_at,
            });
        }
        Ok(readings)
    }

    async fn clear_all(&self) -> Result<()> {
        for table in ["drones", "medication_items", "battery_readings"] {
            self.client
                .session
                .query_unpaged(format!("TRUNCATE {table}"), ())
                .await?;
        }
        tracing::warn!(keyspace = %self.client.config.keyspace, "Fleet tables truncated");
        Ok(())
    }
}
