//! # GraphQL Output Types

use async_graphql::{ComplexObject, Context, Result, SimpleObject};
use chrono::{DateTime, Utc};

use super::enums::{DroneModel, DroneState};
use crate::context::ApiContext;
use crate::error::graphql_error;
use drone_domain as domain;

// =============================================================================
// DRONE
// =============================================================================

/// Registered drone
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct Drone {
    pub serial_number: String,
    pub model: DroneModel,
    /// Maximum total payload, in grams
    pub weight_limit: u32,
    /// Battery charge, in percent
    pub battery_level: u8,
    pub state: DroneState,
}

#[ComplexObject]
impl Drone {
    /// Items currently on board, ordered by code
    async fn medication_items(&self, ctx: &Context<'_>) -> Result<Vec<MedicationItem>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let items = api_ctx
            .fleet
            .coordinator
            .items(&self.serial_number)
            .await
            .map_err(graphql_error)?;
        Ok(items.into_iter().map(MedicationItem::from).collect())
    }

    /// Total weight currently on board, in grams
    async fn loaded_weight(&self, ctx: &Context<'_>) -> Result<u32> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let items = api_ctx
            .fleet
            .coordinator
            .items(&self.serial_number)
            .await
            .map_err(graphql_error)?;
        Ok(items.iter().map(|item| item.weight).sum())
    }
}

impl From<domain::Drone> for Drone {
    fn from(d: domain::Drone) -> Self {
        Self {
            serial_number: d.serial_number,
            model: d.model.into(),
            weight_limit: d.weight_limit,
            battery_level: d.battery_level,
            state: d.state.into(),
        }
    }
}

// =============================================================================
// MEDICATION
// =============================================================================

/// Medication item loaded on a drone
#[derive(Debug, Clone, SimpleObject)]
pub struct MedicationItem {
    pub drone_serial_number: String,
    pub code: String,
    pub name: String,
    /// Weight in grams
    pub weight: u32,
    /// Image as a `data:` URI
    pub image_base64: String,
}

impl From<domain::MedicationItem> for MedicationItem {
    fn from(i: domain::MedicationItem) -> Self {
        Self {
            drone_serial_number: i.drone_serial_number,
            code: i.code,
            name: i.name,
            weight: i.weight,
            image_base64: i.image_base64,
        }
    }
}

// =============================================================================
// BATTERY
// =============================================================================

/// Battery level snapshot taken by the discharge task
#[derive(Debug, Clone, SimpleObject)]
pub struct BatteryReading {
    pub serial_number: String,
    pub battery_level: u8,
    pub recorded_at: DateTime<Utc>,
}

impl From<domain::BatteryReading> for BatteryReading {
    fn from(r: domain::BatteryReading) -> Self {
        Self {
            serial_number: r.serial_number,
            battery_level: r.battery_level,
            recorded_at: r.recorded_at,
        }
    }
}
