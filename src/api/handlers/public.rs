use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::api::dto::ContactRequest;
use crate::api::error::{AppError, OrInternal};
use crate::api::extract::ValidatedJson;
use crate::database::messages::{insert_message, NewMessage};
use crate::setup::init::AppState;

/// Public pages listed in the sitemap as `(path, change frequency, priority)`.
const SITEMAP_PAGES: [(&str, &str, f32); 7] = [
    ("", "weekly", 1.0),
    ("/sobre", "monthly", 0.8),
    ("/calidad", "monthly", 0.8),
    ("/galeria", "weekly", 0.7),
    ("/contacto", "monthly", 0.6),
    ("/comprar", "weekly", 0.9),
    ("/pedidos", "weekly", 0.9),
];

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn render_sitemap(base_url: &str, last_modified: &str) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for (path, changefreq, priority) in SITEMAP_PAGES {
        xml.push_str(&format!(
            "  <url>\n    <loc>{base_url}{path}</loc>\n    <lastmod>{last_modified}</lastmod>\n    <changefreq>{changefreq}</changefreq>\n    <priority>{priority:.1}</priority>\n  </url>\n"
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub async fn sitemap(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = render_sitemap(
        &state.config.public_base_url,
        &Utc::now().format("%Y-%m-%d").to_string(),
    );
    ([(CONTENT_TYPE, "application/xml")], body)
}

pub async fn contact(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ContactRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let message = insert_message(
        &state.pool,
        NewMessage {
            nombre: request.nombre,
            correo: request.correo,
            telefono: request.telefono,
            compania: request.compania,
            mensaje: request.mensaje,
        },
    )
    .await
    .or_internal("Error al enviar el mensaje")?;

    info!("Contact message {} stored", message.id);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Mensaje enviado correctamente",
            "data": {
                "id": message.id,
                "nombre": message.nombre,
                "correo": message.correo,
                "createdAt": message.created_at,
            }
        })),
    ))
}
