use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use crate::config::constant::SETTINGS_KEY;
use crate::domain::types::{Location, PricingSettings};

#[derive(sqlx::FromRow)]
struct SettingsRow {
    tarifa_por_km: f64,
    flete_minimo: f64,
    origen_lat: f64,
    origen_lng: f64,
}

impl From<SettingsRow> for PricingSettings {
    fn from(row: SettingsRow) -> Self {
        Self {
            tarifa_por_km: row.tarifa_por_km,
            flete_minimo: row.flete_minimo,
            origen: Location::new(row.origen_lat, row.origen_lng),
        }
    }
}

/// Current pricing settings, created with the defaults on first read.
pub async fn get_pricing(pool: &SqlitePool) -> Result<PricingSettings, sqlx::Error> {
    let row: Option<SettingsRow> = sqlx::query_as(
        "SELECT tarifa_por_km, flete_minimo, origen_lat, origen_lng FROM settings WHERE key = ?",
    )
    .bind(SETTINGS_KEY)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = row {
        return Ok(row.into());
    }

    info!("No pricing settings stored yet, creating defaults");
    let defaults = PricingSettings::default();
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO settings (key, tarifa_por_km, flete_minimo, origen_lat, origen_lng, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(SETTINGS_KEY)
    .bind(defaults.tarifa_por_km)
    .bind(defaults.flete_minimo)
    .bind(defaults.origen.lat)
    .bind(defaults.origen.lng)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        // Someone else created the record between the two statements.
        let row: SettingsRow = sqlx::query_as(
            "SELECT tarifa_por_km, flete_minimo, origen_lat, origen_lng FROM settings WHERE key = ?",
        )
        .bind(SETTINGS_KEY)
        .fetch_one(pool)
        .await?;
        return Ok(row.into());
    }

    Ok(defaults)
}

/// Upsert the singleton record. Last writer wins.
pub async fn save_pricing(
    pool: &SqlitePool,
    pricing: &PricingSettings,
) -> Result<PricingSettings, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, tarifa_por_km, flete_minimo, origen_lat, origen_lng, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET
            tarifa_por_km = excluded.tarifa_por_km,
            flete_minimo = excluded.flete_minimo,
            origen_lat = excluded.origen_lat,
            origen_lng = excluded.origen_lng,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(SETTINGS_KEY)
    .bind(pricing.tarifa_por_km)
    .bind(pricing.flete_minimo)
    .bind(pricing.origen.lat)
    .bind(pricing.origen.lng)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    info!(
        "Stored pricing settings: {} per km, minimum {}",
        pricing.tarifa_por_km, pricing.flete_minimo
    );
    Ok(*pricing)
}
