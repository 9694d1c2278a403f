use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::api::dto::{CheckoutRequest, CheckoutResponse};
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::payment::{apply_event, verify_signature, PaymentError, WebhookEvent};
use crate::setup::init::AppState;

pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CheckoutRequest>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .stripe
        .create_checkout_session(request.quantity)
        .await
        .or_internal("Error al crear sesión de pago")?;

    let data = CheckoutResponse {
        session_id: session.id,
        url: session.url,
        amount: session.amount_total,
        currency: session.currency,
    };
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::BadRequest("Firma de webhook faltante"))?;

    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or(PaymentError::NotConfigured("STRIPE_WEBHOOK_SECRET"))
        .or_internal("Error en webhook")?;

    if let Err(e) = verify_signature(&body, signature, secret, Utc::now().timestamp()) {
        warn!("Rejected webhook: {e}");
        return Err(AppError::BadRequest("Error en webhook"));
    }

    let event = WebhookEvent::parse(&body)
        .and_then(WebhookEvent::into_payment_event)
        .map_err(|e| {
            warn!("Unreadable webhook payload: {e}");
            AppError::BadRequest("Error en webhook")
        })?;

    debug!("Processing payment event {event:?}");
    apply_event(&state.pool, event)
        .await
        .or_internal("Error en webhook")?;

    Ok(Json(json!({ "success": true })))
}
