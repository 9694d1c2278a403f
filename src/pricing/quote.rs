use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::freight::build_quote;
use crate::database::settings::get_pricing;
use crate::distance::DistanceProvider;
use crate::domain::types::{Location, Quote};

/// Price `bolsas` bags at `precio_unitario`, delivered to `location` if given.
///
/// Settings are read fresh on every call so a preview and the order that
/// follows it are priced independently. A failing distance lookup never
/// surfaces: the quote degrades to the minimum freight with zero distance.
/// Only a settings read failure is returned as an error.
pub async fn assemble_quote(
    pool: &SqlitePool,
    distance: &dyn DistanceProvider,
    bolsas: u32,
    precio_unitario: f64,
    location: Option<Location>,
) -> Result<Quote, sqlx::Error> {
    let pricing = get_pricing(pool).await?;

    let distance_km = match location {
        Some(destination) => match distance.distance_km(pricing.origen, destination).await {
            Ok(km) if km.is_finite() && km >= 0.0 => Some(km),
            Ok(km) => {
                warn!("Distance service returned unusable distance {km}, charging minimum freight");
                None
            }
            Err(e) => {
                warn!("Distance lookup failed, charging minimum freight: {e}");
                None
            }
        },
        None => {
            debug!("No delivery location, charging minimum freight");
            None
        }
    };

    let quote = build_quote(bolsas, precio_unitario, distance_km, &pricing);
    info!(
        "Quote for {} bags: subtotal {:.2}, flete {:.2}, total {:.2} ({:.1} km)",
        bolsas, quote.subtotal, quote.flete, quote.total_final, quote.distance_km
    );
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::settings::save_pricing;
    use crate::database::sqlx::db_connection;
    use crate::distance::DistanceError;
    use crate::domain::types::PricingSettings;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedDistance {
        km: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DistanceProvider for FixedDistance {
        async fn distance_km(&self, _: Location, _: Location) -> Result<f64, DistanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.km)
        }
    }

    struct Unreachable;

    #[async_trait]
    impl DistanceProvider for Unreachable {
        async fn distance_km(&self, _: Location, _: Location) -> Result<f64, DistanceError> {
            Err(DistanceError::Status("OVER_QUERY_LIMIT".to_string()))
        }
    }

    fn fixed(km: f64) -> FixedDistance {
        FixedDistance {
            km,
            calls: AtomicUsize::new(0),
        }
    }

    async fn pool_with_defaults() -> SqlitePool {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        save_pricing(&pool, &PricingSettings::default()).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn located_quote_uses_resolved_distance() {
        let pool = pool_with_defaults().await;
        let provider = fixed(20.0);

        let quote = assemble_quote(&pool, &provider, 10, 150.0, Some(Location::new(25.7, -100.2)))
            .await
            .unwrap();

        assert_eq!(quote.subtotal, 1500.0);
        assert_eq!(quote.flete, 300.0);
        assert_eq!(quote.total_final, 1800.0);
        assert_eq!(quote.distance_km, 20.0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_location_skips_distance_service() {
        let pool = pool_with_defaults().await;
        let provider = fixed(20.0);

        let quote = assemble_quote(&pool, &provider, 10, 150.0, None).await.unwrap();

        assert_eq!(quote.flete, 100.0);
        assert_eq!(quote.distance_km, 0.0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_lookup_matches_no_location() {
        let pool = pool_with_defaults().await;

        let degraded = assemble_quote(&pool, &Unreachable, 4, 150.0, Some(Location::new(26.0, -100.0)))
            .await
            .unwrap();
        let without = assemble_quote(&pool, &Unreachable, 4, 150.0, None).await.unwrap();

        assert_eq!(degraded, without);
    }

    #[rstest]
    #[case(-5.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[tokio::test]
    async fn unusable_distance_matches_no_location(#[case] km: f64) {
        let pool = pool_with_defaults().await;
        let provider = fixed(km);

        let degraded = assemble_quote(&pool, &provider, 4, 150.0, Some(Location::new(26.0, -100.0)))
            .await
            .unwrap();
        let without = assemble_quote(&pool, &provider, 4, 150.0, None).await.unwrap();

        assert_eq!(degraded, without);
        assert_eq!(degraded.flete, 100.0);
        assert_eq!(degraded.distance_km, 0.0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn repeated_calls_are_identical() {
        let pool = pool_with_defaults().await;
        let provider = fixed(7.25);
        let location = Some(Location::new(25.8, -100.4));

        let first = assemble_quote(&pool, &provider, 12, 149.5, location).await.unwrap();
        let second = assemble_quote(&pool, &provider, 12, 149.5, location).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn settings_changes_apply_to_the_next_quote() {
        let pool = pool_with_defaults().await;
        let provider = fixed(20.0);
        let location = Some(Location::new(25.8, -100.4));

        let before = assemble_quote(&pool, &provider, 1, 150.0, location).await.unwrap();
        save_pricing(
            &pool,
            &PricingSettings {
                tarifa_por_km: 30.0,
                ..PricingSettings::default()
            },
        )
        .await
        .unwrap();
        let after = assemble_quote(&pool, &provider, 1, 150.0, location).await.unwrap();

        assert_eq!(before.flete, 300.0);
        assert_eq!(after.flete, 600.0);
    }
}
