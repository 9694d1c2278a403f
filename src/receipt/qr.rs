use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::{Color, QrCode};
use serde::Serialize;

use super::ReceiptError;
use crate::domain::types::Pedido;
use crate::utils::maps_url;

/// What a scanned receipt QR code reveals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    pub pedido_id: String,
    pub nombre: String,
    pub total: f64,
    pub fecha: String,
    pub admin_url: String,
    pub maps_url: Option<String>,
}

impl ReceiptPayload {
    pub fn for_pedido(pedido: &Pedido, public_base_url: &str) -> Self {
        Self {
            pedido_id: pedido.id.clone(),
            nombre: pedido.nombre.clone(),
            total: pedido.total_final,
            fecha: pedido.created_at.to_rfc3339(),
            admin_url: format!("{public_base_url}/admin"),
            maps_url: pedido.location.as_ref().map(maps_url),
        }
    }
}

/// Module grid of an encoded payload, row-major, `true` for dark modules.
pub struct QrMatrix {
    pub width: usize,
    pub modules: Vec<bool>,
}

impl QrMatrix {
    pub fn encode(data: &str) -> Result<Self, ReceiptError> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| ReceiptError::Qr(e.to_string()))?;
        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == Color::Dark)
            .collect();
        Ok(Self { width, modules })
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.modules[y * self.width + x]
    }

    /// Horizontal runs of dark modules per row as `(row, start, len)`.
    pub fn dark_runs(&self) -> Vec<(usize, usize, usize)> {
        let mut runs = vec![];
        for y in 0..self.width {
            let mut x = 0;
            while x < self.width {
                if self.is_dark(x, y) {
                    let start = x;
                    while x < self.width && self.is_dark(x, y) {
                        x += 1;
                    }
                    runs.push((y, start, x - start));
                } else {
                    x += 1;
                }
            }
        }
        runs
    }
}

/// Encode arbitrary text as an SVG QR code wrapped in a data URL.
pub fn svg_data_url(data: &str, size: u32) -> Result<String, ReceiptError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| ReceiptError::Qr(e.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(size, size)
        .quiet_zone(true)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(image.as_bytes())
    ))
}
