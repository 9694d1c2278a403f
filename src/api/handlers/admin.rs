use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::dto::{LoginRequest, MessageQuery, PageQuery, PedidoQuery, QrRequest};
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::api::session::{
    clear_session_cookie, is_authenticated, issue_token, session_cookie, verify_credentials,
    AdminSession,
};
use crate::config::constant::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::database::messages::{count_messages, list_messages, MessageFilter};
use crate::database::orders::{count_orders, list_orders};
use crate::database::pedidos::{count_pedidos, list_pedidos, PedidoFilter};
use crate::domain::types::PageInfo;
use crate::receipt::svg_data_url;
use crate::setup::init::AppState;
use crate::utils::{parse_date_param, parse_number_param};

const QR_SIZE: u32 = 300;

/// Resolved `(page, limit, offset)`.
pub fn resolve_page(query: &PageQuery) -> (u32, u32, u32) {
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<u32>().ok())
        .filter(|l| (1..=MAX_PAGE_LIMIT).contains(l))
        .unwrap_or(DEFAULT_PAGE_LIMIT);
    (page, limit, (page - 1).saturating_mul(limit))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !verify_credentials(&state.config, &request.username, &request.password) {
        warn!("Failed admin login for '{}'", request.username);
        return Err(AppError::InvalidCredentials);
    }

    let token = issue_token(
        &state.config.admin_username,
        &state.config.session_secret,
        Utc::now().timestamp_millis(),
    )
    .ok_or("session secret rejected by signer")
    .or_internal("Error interno del servidor")?;

    info!("Admin session opened");
    Ok((
        [(SET_COOKIE, session_cookie(&token, state.config.production))],
        Json(json!({ "success": true, "message": "Autenticación exitosa" })),
    ))
}

pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_session_cookie(state.config.production))],
        Json(json!({ "success": true, "message": "Sesión cerrada" })),
    )
}

pub async fn verify(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Json<Value> {
    let authenticated = is_authenticated(&headers, &state.config);
    Json(json!({ "success": true, "authenticated": authenticated }))
}

pub async fn messages(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Value>, AppError> {
    let (page, limit, offset) = resolve_page(&page);
    let filter = MessageFilter {
        query: query.query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
        date_from: parse_date_param(query.date_from.as_deref()),
        date_to: parse_date_param(query.date_to.as_deref()),
    };

    let (messages, total) = futures::try_join!(
        list_messages(&state.pool, &filter, limit, offset),
        count_messages(&state.pool, &filter),
    )
    .or_internal("Error al obtener mensajes")?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "messages": messages,
            "pagination": PageInfo::new(page, limit, total),
        }
    })))
}

pub async fn orders(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Value>, AppError> {
    let (page, limit, offset) = resolve_page(&page);

    let (orders, total) = futures::try_join!(
        list_orders(&state.pool, limit, offset),
        count_orders(&state.pool),
    )
    .or_internal("Error al obtener órdenes")?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "orders": orders,
            "pagination": PageInfo::new(page, limit, total),
        }
    })))
}

pub async fn pedidos(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
    Query(query): Query<PedidoQuery>,
) -> Result<Json<Value>, AppError> {
    let (page, limit, offset) = resolve_page(&page);
    let filter = PedidoFilter {
        id: query.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
        date_from: parse_date_param(query.date_from.as_deref()),
        date_to: parse_date_param(query.date_to.as_deref()),
        min_total: parse_number_param(query.min_total.as_deref()),
        max_total: parse_number_param(query.max_total.as_deref()),
    };

    let (pedidos, total) = futures::try_join!(
        list_pedidos(&state.pool, &filter, limit, offset),
        count_pedidos(&state.pool, &filter),
    )
    .or_internal("Error al obtener pedidos")?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "pedidos": pedidos,
            "pagination": PageInfo::new(page, limit, total),
        }
    })))
}

pub async fn qr(
    _admin: AdminSession,
    ValidatedJson(request): ValidatedJson<QrRequest>,
) -> Result<Json<Value>, AppError> {
    if request.data.is_null() {
        return Err(AppError::BadRequest("Datos requeridos"));
    }

    let qr_code = svg_data_url(&request.data.to_string(), QR_SIZE)
        .or_internal("Error al generar QR code")?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "qrCode": qr_code,
            "data": request.data,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn page_query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[rstest]
    #[case(None, None, (1, 10, 0))]
    #[case(Some("3"), Some("20"), (3, 20, 40))]
    #[case(Some("0"), Some("0"), (1, 10, 0))]
    #[case(Some("-2"), Some("101"), (1, 10, 0))]
    #[case(Some("abc"), Some("xyz"), (1, 10, 0))]
    #[case(Some("2"), Some("100"), (2, 100, 100))]
    fn pagination_falls_back_to_defaults(
        #[case] page: Option<&str>,
        #[case] limit: Option<&str>,
        #[case] expected: (u32, u32, u32),
    ) {
        assert_eq!(resolve_page(&page_query(page, limit)), expected);
    }
}
