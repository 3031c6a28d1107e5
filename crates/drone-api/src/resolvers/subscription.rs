//! # GraphQL Subscription Resolver
//!
//! Battery readings pushed as the discharge task records them.

use async_graphql::{Context, Result, Subscription};
use futures_util::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::context::ApiContext;
use crate::schema::BatteryReading;

/// GraphQL Subscription root
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Subscribe to battery readings, optionally for a single drone
    #[graphql(name = "batteryReadings")]
    async fn battery_readings(
        &self,
        ctx: &Context<'_>,
        #[graphql(desc = "Only emit readings of this drone")] serial_number: Option<String>,
    ) -> Result<impl Stream<Item = BatteryReading>> {
        let api_ctx = ctx.data::<ApiContext>()?;
        let mut rx = api_ctx.readings_tx.subscribe();

        Ok(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(reading) => {
                        if serial_number.as_ref().is_none_or(|sn| *sn == reading.serial_number) {
                            yield BatteryReading::from(reading);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Battery subscriber lagging, readings dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
