//! Thin REST client for the fleet API.

use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::fleet::DroneRegistration;
use drone_domain::{Drone, MedicationItem, NewMedicationItem};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct Results<T> {
    results: Vec<T>,
}

pub struct FleetClient {
    http: Client,
    base_url: String,
}

impl FleetClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn register(&self, registration: &DroneRegistration) -> Result<Drone, ClientError> {
        let response = self
            .http
            .post(format!("{}/drones", self.base_url))
            .json(registration)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn available_for_loading(&self) -> Result<Vec<Drone>, ClientError> {
        let response = self
            .http
            .get(format!("{}/drones/availability/loading", self.base_url))
            .send()
            .await?;
        Ok(decode::<Results<Drone>>(response).await?.results)
    }

    /// Returns every item the drone carries after the load
    pub async fn load(
        &self,
        serial_number: &str,
        items: &[NewMedicationItem],
    ) -> Result<Vec<MedicationItem>, ClientError> {
        let response = self
            .http
            .post(format!("{}/drones/{serial_number}/medication-items", self.base_url))
            .json(items)
            .send()
            .await?;
        Ok(decode::<Results<MedicationItem>>(response).await?.results)
    }

    pub async fn battery_level(&self, serial_number: &str) -> Result<u8, ClientError> {
        let response = self
            .http
            .get(format!("{}/drones/{serial_number}/battery-level", self.base_url))
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.json::<ErrorBody>().await.unwrap_or_else(|_| ErrorBody {
        message: status.to_string(),
        code: String::new(),
    });
    Err(ClientError::Api {
        status: status.as_u16(),
        code: body.code,
        message: body.message,
    })
}
