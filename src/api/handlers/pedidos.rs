use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::dto::{PedidoRequest, QuoteRequest, QuoteResponse};
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::database::pedidos::{find_pedido, insert_pedido, NewPedido};
use crate::pricing::assemble_quote;
use crate::receipt::render_pedido_pdf;
use crate::setup::init::AppState;

/// Dry-run pricing; nothing is stored.
pub async fn quote(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<QuoteRequest>,
) -> Result<Json<Value>, AppError> {
    let quote = assemble_quote(
        &state.pool,
        state.distance.as_ref(),
        request.bolsas,
        request.precio_unitario,
        request.location,
    )
    .await
    .or_internal("Error al calcular la cotización")?;

    let data = QuoteResponse {
        subtotal: quote.subtotal,
        flete: quote.flete,
        total_final: quote.total_final,
        distance_km: quote.distance_km,
        bolsas: request.bolsas,
        precio_unitario: request.precio_unitario,
        location: request.location,
    };
    Ok(Json(json!({ "success": true, "data": data })))
}

/// Prices the order server-side and persists it. Client-sent totals are never read.
pub async fn create_pedido(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<PedidoRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let quote = assemble_quote(
        &state.pool,
        state.distance.as_ref(),
        request.bolsas,
        request.precio_unitario,
        request.location,
    )
    .await
    .or_internal("Error al guardar el pedido")?;

    let pedido = insert_pedido(
        &state.pool,
        NewPedido {
            nombre: request.nombre,
            correo: request.correo,
            telefono: request.telefono,
            compania: request.compania,
            bolsas: request.bolsas,
            precio_unitario: request.precio_unitario,
            address: request.address,
            location: request.location,
            notas: request.notas,
        },
        &quote,
    )
    .await
    .or_internal("Error al guardar el pedido")?;

    info!("Pedido {} stored, total {:.2}", pedido.id, pedido.total_final);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Pedido guardado correctamente",
            "data": {
                "id": pedido.id,
                "nombre": pedido.nombre,
                "correo": pedido.correo,
                "totalFinal": pedido.total_final,
                "createdAt": pedido.created_at,
            }
        })),
    ))
}

pub async fn pedido_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let pedido = find_pedido(&state.pool, &id)
        .await
        .or_internal("Error al generar PDF")?
        .ok_or(AppError::NotFound("Pedido no encontrado"))?;

    let base_url = state.config.public_base_url.clone();
    let filename = format!("attachment; filename=\"pedido-{}.pdf\"", pedido.id);
    let bytes = tokio::task::spawn_blocking(move || render_pedido_pdf(&pedido, &base_url))
        .await
        .or_internal("Error al generar PDF")?
        .or_internal("Error al generar PDF")?;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, filename),
        ],
        bytes,
    ))
}
