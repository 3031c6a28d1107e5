//! # Medical Drone Fleet API
//!
//! REST and GraphQL service over the fleet consistency engine.
//!
//! ## Features
//!
//! - **REST**: drone registration, medication loading, availability and
//!   battery queries
//! - **GraphQL**: the same operations as queries and mutations
//! - **Subscriptions**: battery readings over WebSocket as the discharge task
//!   records them
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Axum HTTP Server                         │
//! │          (REST routes + GraphQL endpoint + Playground)      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ApiContext                               │
//! │         (Fleet engine, battery reading broadcaster)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │            FleetStore (memory or ScyllaDB)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod error;
pub mod resolvers;
pub mod routes;
pub mod schema;

use async_graphql::Schema;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, ConfigError, StoreBackend};
pub use context::ApiContext;
pub use error::{ApiError, ApiResult};
pub use resolvers::{MutationRoot, QueryRoot, SubscriptionRoot};

/// GraphQL schema type
pub type ApiSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

/// Build the GraphQL schema with context
pub fn build_schema(ctx: ApiContext) -> ApiSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(ctx)
        .limit_depth(10)
        .limit_complexity(1000)
        .finish()
}

/// GraphQL endpoint handler
pub async fn graphql_handler(
    State(schema): State<ApiSchema>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

/// GraphQL Playground HTML
pub async fn graphql_playground() -> impl IntoResponse {
    Html(async_graphql::http::playground_source(
        async_graphql::http::GraphQLPlaygroundConfig::new("/graphql")
            .subscription_endpoint("/graphql/ws"),
    ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

/// Build the Axum router
pub fn build_router(ctx: ApiContext, config: &Config) -> Router {
    let schema = build_schema(ctx.clone());

    let mut drones = post(routes::register_drone);
    if config.enable_admin_reset {
        drones = drones.delete(routes::reset_fleet);
    }

    let rest = Router::new()
        .route(routes::DRONES_PATH, drones)
        .route(routes::AVAILABILITY_PATH, get(routes::available_for_loading))
        .route(
            routes::MEDICATION_ITEMS_PATH,
            get(routes::medication_items).post(routes::load_drone),
        )
        .route(routes::BATTERY_LEVEL_PATH, get(routes::battery_level))
        .route(routes::BATTERY_HISTORY_PATH, get(routes::battery_history));

    let graphql_route = if config.enable_playground {
        get(graphql_playground).post(graphql_handler)
    } else {
        post(graphql_handler)
    };
    let graphql = Router::new()
        .route("/graphql", graphql_route)
        .route_service("/graphql/ws", GraphQLSubscription::new(schema.clone()))
        .with_state(schema);

    Router::new()
        .merge(rest.with_state(ctx))
        .merge(graphql)
        .route("/health", get(routes::health_check))
        .route("/", get(|| async { "Medical Drone Fleet API" }))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
