use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::info;

use super::providers::{GoogleDistanceMatrix, OsrmTable};
use crate::config::{Config, DistanceSource};
use crate::domain::types::Location;

#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("Google Maps API key not configured")]
    MissingApiKey,

    #[error("distance request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("distance service returned HTTP {0}")]
    Http(u16),

    #[error("distance service answered with status {0}")]
    Status(String),

    #[error("no route between origin and destination")]
    NoRoute,

    #[error("malformed distance response: {0}")]
    Malformed(String),
}

/// Road distance between two points. Implementations never fall back on
/// their own; callers decide what a failure means.
#[async_trait]
pub trait DistanceProvider: Send + Sync {
    async fn distance_km(
        &self,
        origin: Location,
        destination: Location,
    ) -> Result<f64, DistanceError>;
}

/// Build the provider selected by `DISTANCE_PROVIDER` (google or osrm)
pub fn create_provider(config: &Config, client: Client) -> Arc<dyn DistanceProvider> {
    info!(
        "Using distance source '{:?}' for delivery quotes",
        config.distance_source
    );

    match config.distance_source {
        DistanceSource::Google => Arc::new(GoogleDistanceMatrix::new(
            client,
            config.google_api_key.clone(),
        )),
        DistanceSource::Osrm => Arc::new(OsrmTable::new(client, config.osrm_base_url.clone())),
    }
}
