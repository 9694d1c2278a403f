use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use tracing::debug;

use super::error::AppError;
use crate::config::constant::{SESSION_COOKIE, SESSION_MAX_AGE_SECS};
use crate::config::Config;
use crate::setup::init::AppState;
use crate::utils::{constant_time_eq, hmac_sha256};

pub fn verify_credentials(config: &Config, username: &str, password: &str) -> bool {
    let user_ok = constant_time_eq(username.as_bytes(), config.admin_username.as_bytes());
    let pass_ok = constant_time_eq(password.as_bytes(), config.admin_password.as_bytes());
    user_ok & pass_ok
}

fn sign(secret: &str, payload: &str) -> Option<Vec<u8>> {
    hmac_sha256(secret.as_bytes(), &[payload.as_bytes()]).ok()
}

/// `base64url("<user>:<issued_ms>").<hex hmac>`
pub fn issue_token(username: &str, secret: &str, issued_ms: i64) -> Option<String> {
    let payload = URL_SAFE_NO_PAD.encode(format!("{username}:{issued_ms}"));
    let signature = sign(secret, &payload)?;
    Some(format!("{payload}.{}", hex::encode(signature)))
}

pub fn verify_token(token: &str, username: &str, secret: &str, now_ms: i64) -> bool {
    let Some((payload, signature)) = token.split_once('.') else {
        return false;
    };
    let (Ok(given), Some(expected)) = (hex::decode(signature), sign(secret, payload)) else {
        return false;
    };
    if !constant_time_eq(&given, &expected) {
        return false;
    }

    let Some(decoded) = URL_SAFE_NO_PAD
        .decode(payload)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return false;
    };
    let Some((user, issued)) = decoded.rsplit_once(':') else {
        return false;
    };
    let Ok(issued_ms) = issued.parse::<i64>() else {
        return false;
    };

    let age_ms = now_ms - issued_ms;
    user == username && (0..SESSION_MAX_AGE_SECS * 1000).contains(&age_ms)
}

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn session_cookie(token: &str, production: bool) -> String {
    let secure = if production { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={SESSION_MAX_AGE_SECS}{secure}"
    )
}

pub fn clear_session_cookie(production: bool) -> String {
    let secure = if production { "; Secure" } else { "" };
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0{secure}")
}

pub fn is_authenticated(headers: &HeaderMap, config: &Config) -> bool {
    cookie_value(headers, SESSION_COOKIE).is_some_and(|token| {
        verify_token(
            token,
            &config.admin_username,
            &config.session_secret,
            Utc::now().timestamp_millis(),
        )
    })
}

/// Extractor guarding admin-only routes.
pub struct AdminSession;

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if is_authenticated(&parts.headers, &state.config) {
            Ok(AdminSession)
        } else {
            debug!("Rejected admin request to {}", parts.uri.path());
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";
    const NOW: i64 = 1_714_000_000_000;

    #[test]
    fn fresh_token_verifies() {
        let token = issue_token("admin", SECRET, NOW).unwrap();
        assert!(verify_token(&token, "admin", SECRET, NOW + 1_000));
    }

    #[test]
    fn token_expires_after_a_day() {
        let token = issue_token("admin", SECRET, NOW).unwrap();
        let day_ms = SESSION_MAX_AGE_SECS * 1000;

        assert!(verify_token(&token, "admin", SECRET, NOW + day_ms - 1));
        assert!(!verify_token(&token, "admin", SECRET, NOW + day_ms));
    }

    #[test]
    fn token_for_other_user_or_secret_fails() {
        let token = issue_token("admin", SECRET, NOW).unwrap();

        assert!(!verify_token(&token, "root", SECRET, NOW));
        assert!(!verify_token(&token, "admin", "other-secret", NOW));
    }

    #[test]
    fn forged_payload_fails() {
        let token = issue_token("admin", SECRET, NOW).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("{}.{signature}", URL_SAFE_NO_PAD.encode(format!("admin:{}", NOW + 5)));

        assert!(!verify_token(&forged, "admin", SECRET, NOW + 10));
        assert!(!verify_token("not-a-token", "admin", SECRET, NOW));
    }

    #[test]
    fn cookie_lookup_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; admin-session=abc.def; lang=es"),
        );

        assert_eq!(cookie_value(&headers, "admin-session"), Some("abc.def"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn cookie_attributes_follow_environment() {
        let dev = session_cookie("tok", false);
        assert!(dev.starts_with("admin-session=tok;"));
        assert!(dev.contains("HttpOnly"));
        assert!(dev.contains("SameSite=Strict"));
        assert!(dev.contains("Max-Age=86400"));
        assert!(!dev.contains("Secure"));

        assert!(session_cookie("tok", true).ends_with("; Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }

    #[test]
    fn credentials_are_compared_exactly() {
        let config = Config::default();
        assert!(verify_credentials(&config, "admin", "password123"));
        assert!(!verify_credentials(&config, "admin", "password12"));
        assert!(!verify_credentials(&config, "Admin", "password123"));
    }
}
