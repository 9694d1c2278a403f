use std::env;
use std::fmt::Display;
use std::str::FromStr;

use dotenv::dotenv;
use tracing::{info, warn};

pub mod constant {
    pub(crate) const SETTINGS_KEY: &str = "pricing";
    pub(crate) const DEFAULT_TARIFA_POR_KM: f64 = 15.0;
    pub(crate) const DEFAULT_FLETE_MINIMO: f64 = 100.0;
    // Monterrey, México
    pub(crate) const DEFAULT_ORIGEN: (f64, f64) = (25.6866, -100.3161);
    pub(crate) const SESSION_COOKIE: &str = "admin-session";
    pub(crate) const SESSION_MAX_AGE_SECS: i64 = 24 * 60 * 60;
    pub(crate) const WEBHOOK_TOLERANCE_SECS: i64 = 300;
    pub(crate) const PRODUCT_NAME: &str = "Cemento Portland Gris CPC30";
    pub(crate) const PRODUCT_SLUG: &str = "cemento-cpc30";
    pub(crate) const CURRENCY: &str = "MXN";
    pub(crate) const DEFAULT_PAGE_LIMIT: u32 = 10;
    pub(crate) const MAX_PAGE_LIMIT: u32 = 100;
    pub(crate) const MAX_TAG_LENGTH: usize = 50;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceSource {
    Google,
    Osrm,
}

impl FromStr for DistanceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "osrm" => Ok(Self::Osrm),
            other => Err(format!("unknown distance provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub distance_source: DistanceSource,
    pub google_api_key: Option<String>,
    pub osrm_base_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub session_secret: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_price_id: String,
    pub stripe_api_base: String,
    pub public_base_url: String,
    pub production: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "sqlite:cemento.sqlite".to_string(),
            distance_source: DistanceSource::Google,
            google_api_key: None,
            osrm_base_url: "https://router.project-osrm.org/table/v1/driving".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "password123".to_string(),
            session_secret: "change-me".to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_price_id: "price_1ABC123DEF456GHI789JKL".to_string(),
            stripe_api_base: "https://api.stripe.com".to_string(),
            public_base_url: "http://localhost:3000".to_string(),
            production: false,
        }
    }
}

impl Config {
    /// Reads `.env` and the process environment, falling back to the defaults above.
    pub fn load() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        let distance_source = try_load("DISTANCE_PROVIDER", "google");
        let google_api_key = optional("GOOGLE_MAPS_API_KEY");
        if distance_source == DistanceSource::Google && google_api_key.is_none() {
            warn!("DISTANCE_PROVIDER is 'google' but GOOGLE_MAPS_API_KEY is not set, quotes will use the minimum freight");
        }

        let session_secret = optional("SESSION_SECRET").unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, admin sessions are signed with the development secret");
            defaults.session_secret.clone()
        });

        Self {
            port: try_load("PORT", "3000"),
            database_url: var_or("DATABASE_URL", &defaults.database_url),
            distance_source,
            google_api_key,
            osrm_base_url: var_or("OSRM_BASE_URL", &defaults.osrm_base_url),
            admin_username: var_or("ADMIN_USERNAME", &defaults.admin_username),
            admin_password: var_or("ADMIN_PASSWORD", &defaults.admin_password),
            session_secret,
            stripe_secret_key: optional("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            stripe_price_id: var_or("STRIPE_PRICE_ID", &defaults.stripe_price_id),
            stripe_api_base: var_or("STRIPE_API_BASE", &defaults.stripe_api_base),
            public_base_url: var_or("PUBLIC_BASE_URL", &defaults.public_base_url)
                .trim_end_matches('/')
                .to_string(),
            production: optional("APP_ENV").is_some_and(|v| v == "production"),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn var_or(key: &str, default: &str) -> String {
    optional(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var_or(key, default)
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_source_parses_case_insensitively() {
        assert_eq!("Google".parse::<DistanceSource>(), Ok(DistanceSource::Google));
        assert_eq!(" osrm ".parse::<DistanceSource>(), Ok(DistanceSource::Osrm));
        assert!("mapbox".parse::<DistanceSource>().is_err());
    }
}
