//! # GraphQL Enum Types

use async_graphql::Enum;
use drone_domain as domain;

/// Drone airframe model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "PascalCase")]
pub enum DroneModel {
    /// Carries up to 100g
    Lightweight,
    /// Carries up to 200g
    Middleweight,
    /// Carries up to 300g
    Cruiserweight,
    /// Carries up to 500g
    Heavyweight,
}

impl From<domain::DroneModel> for DroneModel {
    fn from(m: domain::DroneModel) -> Self {
        match m {
            domain::DroneModel::Lightweight => Self::Lightweight,
            domain::DroneModel::Middleweight => Self::Middleweight,
            domain::DroneModel::Cruiserweight => Self::Cruiserweight,
            domain::DroneModel::Heavyweight => Self::Heavyweight,
        }
    }
}

impl From<DroneModel> for domain::DroneModel {
    fn from(m: DroneModel) -> Self {
        match m {
            DroneModel::Lightweight => Self::Lightweight,
            DroneModel::Middleweight => Self::Middleweight,
            DroneModel::Cruiserweight => Self::Cruiserweight,
            DroneModel::Heavyweight => Self::Heavyweight,
        }
    }
}

/// Drone lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum DroneState {
    Idle,
    /// Items are being put on board
    Loading,
    Loaded,
    Delivering,
    Delivered,
    Returning,
}

impl From<domain::DroneState> for DroneState {
    fn from(s: domain::DroneState) -> Self {
        match s {
            domain::DroneState::Idle => Self::Idle,
            domain::DroneState::Loading => Self::Loading,
            domain::DroneState::Loaded => Self::Loaded,
            domain::DroneState::Delivering => Self::Delivering,
            domain::DroneState::Delivered => Self::Delivered,
            domain::DroneState::Returning => Self::Returning,
        }
    }
}
