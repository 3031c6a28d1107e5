//! # GraphQL Mutation Resolver
//!
//! Write operations for the drone fleet API.

use async_graphql::{Context, Object, Result};

use crate::context::ApiContext;
use crate::error::graphql_error;
use crate::schema::{Drone, LoadDroneInput, MedicationItem, RegisterDroneInput};
use drone_domain as domain;

/// GraphQL Mutation root
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Register a drone in state `IDLE`
    #[graphql(name = "registerDrone")]
    async fn register_drone(&self, ctx: &Context<'_>, input: RegisterDroneInput) -> Result<Drone> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let model = domain::DroneModel::from(input.model);

        let drone = api_ctx
            .fleet
            .registry
            .register(
                &input.serial_number,
                model.as_str(),
                i64::from(input.battery_level),
            )
            .await
            .map_err(graphql_error)?;
        Ok(drone.into())
    }

    /// Load a batch of medication items onto a drone.
    ///
    /// Returns every item the drone carries afterwards.
    #[graphql(name = "loadDrone")]
    async fn load_drone(
        &self,
        ctx: &Context<'_>,
        input: LoadDroneInput,
    ) -> Result<Vec<MedicationItem>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let items = input.items.into_iter().map(Into::into).collect();

        let loaded = api_ctx
            .fleet
            .coordinator
            .load_drone(&input.serial_number, items)
            .await
            .map_err(graphql_error)?;
        Ok(loaded.into_iter().map(MedicationItem::from).collect())
    }
}
