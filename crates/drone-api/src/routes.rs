//! # REST Routes
//!
//! JSON endpoints over the fleet engine. Lists answer
//! `{"size": n, "results": [...]}` and errors answer
//! `{"message": ..., "code": ...}`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ApiContext;
use crate::error::{ApiError, ApiResult};
use drone_domain::{Drone, MedicationItem, NewMedicationItem};

pub const DRONES_PATH: &str = "/drones";
pub const AVAILABILITY_PATH: &str = "/drones/availability/loading";
pub const MEDICATION_ITEMS_PATH: &str = "/drones/{serial_number}/medication-items";
pub const BATTERY_LEVEL_PATH: &str = "/drones/{serial_number}/battery-level";
pub const BATTERY_HISTORY_PATH: &str = "/drones/{serial_number}/battery-history";

/// List envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct Results<T> {
    pub size: usize,
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for Results<T> {
    fn from(results: Vec<T>) -> Self {
        Self {
            size: results.len(),
            results,
        }
    }
}

/// Registration body. Missing strings are treated as empty so they fail
/// field validation with the usual message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDroneRequest {
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub model: String,
    pub battery_level: i64,
}

/// One entry of a drone's battery history
#[derive(Debug, Serialize, Deserialize)]
pub struct BatteryLevelEntry {
    pub level: u8,
    pub timestamp: DateTime<Utc>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

/// `POST /drones`
pub async fn register_drone(
    State(ctx): State<ApiContext>,
    payload: Result<Json<RegisterDroneRequest>, JsonRejection>,
) -> ApiResult<Json<Drone>> {
    let request = body(payload)?;
    let drone = ctx
        .fleet
        .registry
        .register(&request.serial_number, &request.model, request.battery_level)
        .await?;
    Ok(Json(drone))
}

/// `POST /drones/{serial_number}/medication-items`
pub async fn load_drone(
    State(ctx): State<ApiContext>,
    Path(serial_number): Path<String>,
    payload: Result<Json<Vec<NewMedicationItem>>, JsonRejection>,
) -> ApiResult<Json<Results<MedicationItem>>> {
    let items = body(payload)?;
    let loaded = ctx
        .fleet
        .coordinator
        .load_drone(&serial_number, items)
        .await?;
    Ok(Json(loaded.into()))
}

/// `GET /drones/{serial_number}/medication-items`
pub async fn medication_items(
    State(ctx): State<ApiContext>,
    Path(serial_number): Path<String>,
) -> ApiResult<Json<Results<MedicationItem>>> {
    let items = ctx.fleet.coordinator.items(&serial_number).await?;
    Ok(Json(items.into()))
}

/// `GET /drones/availability/loading`
pub async fn available_for_loading(
    State(ctx): State<ApiContext>,
) -> ApiResult<Json<Results<Drone>>> {
    let drones = ctx.fleet.registry.list_available_for_loading().await?;
    Ok(Json(drones.into()))
}

/// `GET /drones/{serial_number}/battery-level`
pub async fn battery_level(
    State(ctx): State<ApiContext>,
    Path(serial_number): Path<String>,
) -> ApiResult<Json<u8>> {
    let drone = ctx.fleet.registry.require(&serial_number).await?;
    Ok(Json(drone.battery_level))
}

/// `GET /drones/{serial_number}/battery-history`
pub async fn battery_history(
    State(ctx): State<ApiContext>,
    Path(serial_number): Path<String>,
) -> ApiResult<Json<Vec<BatteryLevelEntry>>> {
    let history = ctx
        .fleet
        .monitor
        .history(&serial_number)
        .await?
        .into_iter()
        .map(|reading| BatteryLevelEntry {
            level: reading.battery_level,
            timestamp: reading.recorded_at,
        })
        .collect();
    Ok(Json(history))
}

/// `DELETE /drones`, only routed when admin reset is enabled
pub async fn reset_fleet(State(ctx): State<ApiContext>) -> ApiResult<StatusCode> {
    ctx.fleet.registry.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /health`
pub async fn health_check() -> &'static str {
    "OK"
}
