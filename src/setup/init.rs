use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::Config;
use crate::database::settings::get_pricing;
use crate::database::sqlx::db_connection;
use crate::distance::{create_provider, DistanceProvider};
use crate::payment::StripeClient;

/// Everything a request handler needs, shared behind an `Arc`.
pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
    pub distance: Arc<dyn DistanceProvider>,
    pub stripe: StripeClient,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: SqlitePool,
        distance: Arc<dyn DistanceProvider>,
        client: Client,
    ) -> Arc<Self> {
        let stripe = StripeClient::new(client, &config);
        Arc::new(Self {
            config,
            pool,
            distance,
            stripe,
        })
    }
}

pub async fn setup(config: Config) -> Result<Arc<AppState>, sqlx::Error> {
    info!("Connecting to {}", config.database_url);
    let pool = db_connection(&config.database_url).await?;

    let pricing = get_pricing(&pool).await?;
    info!(
        "Pricing loaded: {} per km, minimum freight {}",
        pricing.tarifa_por_km, pricing.flete_minimo
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default();
    let distance = create_provider(&config, client.clone());

    info!("Setup completed successfully");
    Ok(AppState::new(config, pool, distance, client))
}
