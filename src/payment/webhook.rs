use serde::Deserialize;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::stripe::CheckoutSession;
use super::PaymentError;
use crate::config::constant::WEBHOOK_TOLERANCE_SECS;
use crate::database::orders::{insert_order_if_absent, update_order_status, NewOrder};
use crate::database::purchases::{mark_session_paid, set_status_by_payment_intent};
use crate::domain::types::{OrderStatus, PaymentStatus};
use crate::utils::{constant_time_eq, hmac_sha256};

/// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>...]`)
/// against the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = vec![];

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(PaymentError::InvalidSignature("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature"));
    }

    let expected = hmac_sha256(
        secret.as_bytes(),
        &[timestamp.to_string().as_bytes(), b".", payload],
    )
    .map_err(|_| PaymentError::InvalidSignature("unusable secret"))?;

    if !signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
        return Err(PaymentError::InvalidSignature("signature mismatch"));
    }
    if timestamp < now - WEBHOOK_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

#[derive(Debug)]
pub enum PaymentEvent {
    CheckoutCompleted(CheckoutSession),
    PaymentSucceeded {
        session_id: Option<String>,
        intent_id: Option<String>,
    },
    PaymentFailed {
        session_id: Option<String>,
        intent_id: Option<String>,
    },
    Unhandled(String),
}

fn metadata_session_id(object: &Value) -> Option<String> {
    object
        .pointer("/metadata/session_id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn object_id(object: &Value) -> Option<String> {
    object["id"].as_str().map(str::to_string)
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        Ok(serde_json::from_slice(payload)?)
    }

    pub fn into_payment_event(self) -> Result<PaymentEvent, PaymentError> {
        let event = match self.event_type.as_str() {
            "checkout.session.completed" => {
                PaymentEvent::CheckoutCompleted(serde_json::from_value(self.data.object)?)
            }
            "payment_intent.succeeded" => PaymentEvent::PaymentSucceeded {
                session_id: metadata_session_id(&self.data.object),
                intent_id: object_id(&self.data.object),
            },
            "payment_intent.payment_failed" => PaymentEvent::PaymentFailed {
                session_id: metadata_session_id(&self.data.object),
                intent_id: object_id(&self.data.object),
            },
            _ => PaymentEvent::Unhandled(self.event_type),
        };
        Ok(event)
    }
}

async fn set_status(
    pool: &SqlitePool,
    session_id: Option<String>,
    intent_id: Option<String>,
    status: OrderStatus,
    payment_status: PaymentStatus,
) -> Result<(), sqlx::Error> {
    match session_id {
        Some(session_id) => {
            if update_order_status(pool, &session_id, status).await? {
                info!("Order for session {session_id} marked {status:?}");
            } else {
                warn!("No order for session {session_id}, status {status:?} not recorded");
            }
        }
        None => warn!("Payment intent without session_id metadata, no order to update"),
    }

    if let Some(intent_id) = intent_id {
        if set_status_by_payment_intent(pool, &intent_id, payment_status).await? {
            info!("Purchase for payment intent {intent_id} marked {payment_status:?}");
        } else {
            debug!("No purchase references payment intent {intent_id}");
        }
    }
    Ok(())
}

/// Record a verified payment event against orders and staff-entered purchases.
pub async fn apply_event(pool: &SqlitePool, event: PaymentEvent) -> Result<(), sqlx::Error> {
    match event {
        PaymentEvent::CheckoutCompleted(session) => {
            let method = session
                .payment_method_types
                .as_ref()
                .and_then(|types| types.first().cloned())
                .unwrap_or_else(|| "card".to_string());
            let order = NewOrder {
                stripe_session_id: session.id.clone(),
                status: OrderStatus::Paid,
                amount_total: session.amount_total.unwrap_or(0),
                currency: session.currency.unwrap_or_else(|| "mxn".to_string()),
                customer_email: session.customer_details.and_then(|d| d.email),
            };
            match insert_order_if_absent(pool, order).await? {
                Some(order) => info!("Order {} created for session {}", order.id, session.id),
                None => info!("Order for session {} already exists", session.id),
            }

            if mark_session_paid(pool, &session.id, session.payment_intent.as_deref(), &method)
                .await?
            {
                info!("Purchase for session {} marked paid", session.id);
            } else {
                debug!("No purchase recorded for session {}", session.id);
            }
        }
        PaymentEvent::PaymentSucceeded {
            session_id,
            intent_id,
        } => {
            set_status(pool, session_id, intent_id, OrderStatus::Paid, PaymentStatus::Paid).await?
        }
        PaymentEvent::PaymentFailed {
            session_id,
            intent_id,
        } => {
            set_status(
                pool,
                session_id,
                intent_id,
                OrderStatus::Failed,
                PaymentStatus::Failed,
            )
            .await?
        }
        PaymentEvent::Unhandled(event_type) => info!("Unhandled payment event: {event_type}"),
    }
    Ok(())
}
