use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, trace};

use crate::distance::matrix::{DistanceError, DistanceProvider};
use crate::domain::types::Location;

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

pub struct GoogleDistanceMatrix {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleDistanceMatrix {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl DistanceProvider for GoogleDistanceMatrix {
    async fn distance_km(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<f64, DistanceError> {
        let api_key = self.api_key.as_deref().ok_or(DistanceError::MissingApiKey)?;

        let url = format!(
            "{}?origins={},{}&destinations={},{}&key={}&units=metric",
            self.base_url, origin.lat, origin.lng, destination.lat, destination.lng, api_key
        );
        trace!(
            "Requesting Google distance matrix {:?} -> {:?}",
            origin,
            destination
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("Google distance matrix returned HTTP {}", status);
            return Err(DistanceError::Http(status.as_u16()));
        }

        let body = response.json::<DistanceMatrixResponse>().await?;
        let km = first_distance_km(body)?;
        debug!("Google distance matrix resolved {:.3} km", km);
        Ok(km)
    }
}

/// Extract the single origin/destination element, converting meters to km.
pub(crate) fn first_distance_km(response: DistanceMatrixResponse) -> Result<f64, DistanceError> {
    if response.status != "OK" {
        return Err(DistanceError::Status(response.status));
    }

    let element = response
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| DistanceError::Malformed("empty rows".to_string()))?;

    if let Some(status) = element.status.as_deref() {
        if status != "OK" {
            return Err(DistanceError::NoRoute);
        }
    }

    element
        .distance
        .map(|distance| distance.value as f64 / 1000.0)
        .ok_or(DistanceError::NoRoute)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: Option<String>,
    distance: Option<Distance>,
}

#[derive(Debug, Deserialize)]
struct Distance {
    value: i64, // Distance in meters
}
