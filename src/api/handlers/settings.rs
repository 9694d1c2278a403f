use std::sync::Arc;

use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::info;

use crate::api::dto::PricingUpdate;
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::api::session::AdminSession;
use crate::database::settings::{get_pricing, save_pricing};
use crate::setup::init::AppState;

pub async fn get_pricing_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let pricing = get_pricing(&state.pool)
        .await
        .or_internal("Error al obtener la configuración de precios")?;
    Ok(Json(json!({ "success": true, "data": pricing })))
}

/// Last writer wins.
pub async fn update_pricing_settings(
    _admin: AdminSession,
    State(state): State<Arc<AppState>>,
    ValidatedJson(update): ValidatedJson<PricingUpdate>,
) -> Result<Json<Value>, AppError> {
    let current = get_pricing(&state.pool)
        .await
        .or_internal("Error al actualizar la configuración de precios")?;
    let saved = save_pricing(&state.pool, &update.merge_into(current))
        .await
        .or_internal("Error al actualizar la configuración de precios")?;

    info!(
        "Pricing updated: {} per km, minimum {}, origin ({}, {})",
        saved.tarifa_por_km, saved.flete_minimo, saved.origen.lat, saved.origen.lng
    );
    Ok(Json(json!({
        "success": true,
        "message": "Configuración de precios actualizada correctamente",
        "data": saved,
    })))
}
