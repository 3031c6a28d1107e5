//! # GraphQL Query Resolver
//!
//! Read operations for the drone fleet API.

use async_graphql::{Context, Object, Result};

use crate::context::ApiContext;
use crate::error::graphql_error;
use crate::schema::{BatteryReading, Drone, MedicationItem};

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Get a drone by serial number
    async fn drone(&self, ctx: &Context<'_>, serial_number: String) -> Result<Option<Drone>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let drone = api_ctx
            .fleet
            .registry
            .get(&serial_number)
            .await
            .map_err(graphql_error)?;
        Ok(drone.map(Drone::from))
    }

    /// Idle drones charged enough to start loading
    #[graphql(name = "availableDrones")]
    async fn available_drones(&self, ctx: &Context<'_>) -> Result<Vec<Drone>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let drones = api_ctx
            .fleet
            .registry
            .list_available_for_loading()
            .await
            .map_err(graphql_error)?;
        Ok(drones.into_iter().map(Drone::from).collect())
    }

    /// Items on board a drone, ordered by code
    #[graphql(name = "medicationItems")]
    async fn medication_items(
        &self,
        ctx: &Context<'_>,
        serial_number: String,
    ) -> Result<Vec<MedicationItem>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let items = api_ctx
            .fleet
            .coordinator
            .items(&serial_number)
            .await
            .map_err(graphql_error)?;
        Ok(items.into_iter().map(MedicationItem::from).collect())
    }

    /// Battery readings of a drone, most recent first
    #[graphql(name = "batteryHistory")]
    async fn battery_history(
        &self,
        ctx: &Context<'_>,
        serial_number: String,
        #[graphql(desc = "Return at most this many readings")] limit: Option<usize>,
    ) -> Result<Vec<BatteryReading>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let readings = api_ctx
            .fleet
            .monitor
            .history(&serial_number)
            .await
            .map_err(graphql_error)?;
        Ok(readings
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(BatteryReading::from)
            .collect())
    }
}
