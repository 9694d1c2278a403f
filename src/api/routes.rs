//! HTTP surface of the storefront.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | GET | /health | `health` |
//! | GET | /sitemap.xml | `sitemap` |
//! | POST | /api/contact | `contact` |
//! | POST | /api/pedidos/quote | `quote` |
//! | POST | /api/pedidos | `create_pedido` |
//! | GET | /api/pedidos/{id}/pdf | `pedido_pdf` |
//! | GET, PATCH | /api/settings/pricing | `get_pricing_settings`, `update_pricing_settings` |
//! | POST | /api/checkout/session | `create_checkout` |
//! | POST | /api/stripe/webhook, /api/stripe/purchase-webhook | `stripe_webhook` |
//! | GET, POST | /api/purchases | `purchases`, `create_purchase` |
//! | GET, PATCH, DELETE | /api/purchases/{id} | `get_purchase`, `update_purchase`, `delete_purchase` |
//! | POST, DELETE | /api/admin/auth | `login`, `logout` |
//! | GET | /api/admin/verify | `verify` |
//! | GET | /api/admin/messages | `messages` |
//! | GET | /api/admin/orders | `orders` |
//! | GET | /api/admin/pedidos | `pedidos` |
//! | POST | /api/admin/qr | `qr` |

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{admin, payments, pedidos, public, purchases, settings};
use crate::setup::init::AppState;

fn cors(public_base_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match HeaderValue::from_str(public_base_url) {
        Ok(origin) => layer.allow_origin(origin).allow_credentials(true),
        Err(_) => layer,
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/contact", post(public::contact))
        .route("/pedidos/quote", post(pedidos::quote))
        .route("/pedidos", post(pedidos::create_pedido))
        .route("/pedidos/{id}/pdf", get(pedidos::pedido_pdf))
        .route(
            "/settings/pricing",
            get(settings::get_pricing_settings).patch(settings::update_pricing_settings),
        )
        .route("/checkout/session", post(payments::create_checkout))
        .route("/stripe/webhook", post(payments::stripe_webhook))
        .route("/stripe/purchase-webhook", post(payments::stripe_webhook))
        .route(
            "/purchases",
            get(purchases::purchases).post(purchases::create_purchase),
        )
        .route(
            "/purchases/{id}",
            get(purchases::get_purchase)
                .patch(purchases::update_purchase)
                .delete(purchases::delete_purchase),
        )
        .route("/admin/auth", post(admin::login).delete(admin::logout))
        .route("/admin/verify", get(admin::verify))
        .route("/admin/messages", get(admin::messages))
        .route("/admin/orders", get(admin::orders))
        .route("/admin/pedidos", get(admin::pedidos))
        .route("/admin/qr", post(admin::qr));

    Router::new()
        .route("/health", get(public::health))
        .route("/sitemap.xml", get(public::sitemap))
        .nest("/api", api)
        .layer(cors(&state.config.public_base_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
