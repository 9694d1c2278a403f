use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use super::admin::resolve_page;
use crate::api::dto::{PageQuery, PurchaseQuery, PurchaseRequest, PurchaseUpdate};
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::api::session::AdminSession;
use crate::database::purchases::{
    find_purchase, insert_purchase_if_absent, list_purchases, purchase_stats, remove_purchase,
    save_purchase_changes, NewPurchase, PurchaseChanges, PurchaseFilter,
};
use crate::domain::types::{PageInfo, PaymentStatus};
use crate::setup::init::AppState;
use crate::utils::{parse_date_param, parse_number_param};

const NOT_FOUND: &str = "Compra no encontrada";

fn purchase_filter(query: PurchaseQuery) -> Result<PurchaseFilter, AppError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<PaymentStatus>()
                .map_err(|_| AppError::BadRequest("Parámetros inválidos"))?,
        ),
        None => None,
    };

    Ok(PurchaseFilter {
        status,
        customer_email: query
            .customer_email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
        date_from: parse_date_param(query.date_from.as_deref()),
        date_to: parse_date_param(query.date_to.as_deref()),
        min_amount: parse_number_param(query.min_amount.as_deref()),
        max_amount: parse_number_param(query.max_amount.as_deref()),
    })
}

pub async fn purchases(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
    Query(query): Query<PurchaseQuery>,
) -> Result<Json<Value>, AppError> {
    let (page, limit, offset) = resolve_page(&page);
    let filter = purchase_filter(query)?;

    let (purchases, stats) = futures::try_join!(
        list_purchases(&state.pool, &filter, limit, offset),
        purchase_stats(&state.pool, &filter),
    )
    .or_internal("Error al obtener compras")?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "purchases": purchases,
            "pagination": PageInfo::new(page, limit, stats.total_purchases),
            "stats": stats,
        }
    })))
}

pub async fn create_purchase(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let purchase = insert_purchase_if_absent(
        &state.pool,
        NewPurchase {
            customer_name: request.customer_name,
            customer_email: request.customer_email,
            customer_phone: request.customer_phone,
            customer_company: request.customer_company,
            product_name: request.product_name,
            product_description: request.product_description,
            quantity: request.quantity,
            unit_price: request.unit_price,
            subtotal: request.subtotal,
            stripe_session_id: request.stripe_session_id,
            total_amount: request.total_amount,
            currency: request.currency,
            shipping_address: request.shipping_address,
            notes: request.notes,
            tags: request.tags,
        },
    )
    .await
    .or_internal("Error interno del servidor")?
    .ok_or(AppError::Conflict(
        "Ya existe una compra con este Stripe Session ID",
    ))?;

    info!(
        "Purchase {} recorded for session {}",
        purchase.id, purchase.stripe_session_id
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": purchase })),
    ))
}

pub async fn get_purchase(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let purchase = find_purchase(&state.pool, &id)
        .await
        .or_internal("Error interno del servidor")?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    Ok(Json(json!({ "success": true, "data": purchase })))
}

pub async fn update_purchase(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(update): ValidatedJson<PurchaseUpdate>,
) -> Result<Json<Value>, AppError> {
    let changes = PurchaseChanges {
        payment_status: update.payment_status,
        stripe_payment_intent_id: update.stripe_payment_intent_id,
        payment_method: update.payment_method,
        stripe_fee: update.stripe_fee,
        notes: update.notes,
        tags: update.tags,
    };

    let purchase = save_purchase_changes(&state.pool, &id, changes)
        .await
        .or_internal("Error interno del servidor")?
        .ok_or(AppError::NotFound(NOT_FOUND))?;

    info!("Purchase {} updated ({:?})", purchase.id, purchase.payment_status);
    Ok(Json(json!({ "success": true, "data": purchase })))
}

pub async fn delete_purchase(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !remove_purchase(&state.pool, &id)
        .await
        .or_internal("Error interno del servidor")?
    {
        return Err(AppError::NotFound(NOT_FOUND));
    }

    info!("Purchase {id} deleted");
    Ok(Json(json!({
        "success": true,
        "message": "Compra eliminada correctamente"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_filter_is_rejected() {
        let query = PurchaseQuery {
            status: Some("completed".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            purchase_filter(query),
            Err(AppError::BadRequest("Parámetros inválidos"))
        ));
    }

    #[test]
    fn filter_values_are_parsed() {
        let query = PurchaseQuery {
            status: Some(" paid ".to_string()),
            customer_email: Some(" Compras@Obras.MX ".to_string()),
            min_amount: Some("1000".to_string()),
            max_amount: Some("mucho".to_string()),
            date_from: Some("2024-05-01".to_string()),
            ..Default::default()
        };
        let filter = purchase_filter(query).unwrap();

        assert_eq!(filter.status, Some(PaymentStatus::Paid));
        assert_eq!(filter.customer_email.as_deref(), Some("compras@obras.mx"));
        assert_eq!(filter.min_amount, Some(1000.0));
        assert_eq!(filter.max_amount, None);
        assert!(filter.date_from.is_some());
        assert!(filter.date_to.is_none());
    }
}
