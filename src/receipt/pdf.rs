use chrono::{DateTime, Datelike, Timelike, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use tracing::debug;

use super::qr::{QrMatrix, ReceiptPayload};
use super::ReceiptError;
use crate::config::constant::CURRENCY;
use crate::domain::types::Pedido;
use crate::utils::{format_money, wrap_words};

// Layout is expressed in PDF points on an A4 page.
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const VALUE_COLUMN: f32 = 200.0;
const QR_SIZE: f32 = 80.0;
const FOOTER: f32 = 100.0;
// Body text never goes below this line; the footer band sits under it.
const CONTENT_BOTTOM: f32 = FOOTER + 20.0;
const SECTION_GAP: f32 = 25.0;
const FIELD_GAP: f32 = 20.0;
const NOTE_GAP: f32 = 15.0;
const NOTES_WIDTH: usize = 40;

const MONTHS: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio", "julio", "agosto", "septiembre",
    "octubre", "noviembre", "diciembre",
];

fn pt(value: f32) -> Mm {
    Mm(value * 25.4 / 72.0)
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn red() -> Color {
    Color::Rgb(Rgb::new(0.8, 0.1, 0.1, None))
}

fn gray() -> Color {
    Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None))
}

/// `1 de mayo de 2024, 15:30 UTC`
pub fn format_fecha(created_at: &DateTime<Utc>) -> String {
    format!(
        "{} de {} de {}, {:02}:{:02} UTC",
        created_at.day(),
        MONTHS[created_at.month0() as usize],
        created_at.year(),
        created_at.hour(),
        created_at.minute()
    )
}

struct Page<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    count: usize,
}

impl Page<'_> {
    /// Continue on a fresh page when `height` would run into the footer.
    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= CONTENT_BOTTOM {
            return;
        }
        let (page, layer) = self.doc.add_page(pt(PAGE_WIDTH), pt(PAGE_HEIGHT), "Pedido");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN - 20.0;
        self.count += 1;
    }

    fn text(&self, text: &str, size: f32, x: f32, y: f32, bold: bool, color: Color) {
        self.layer.set_fill_color(color);
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, pt(x), pt(y), font);
    }

    fn rule(&self, y: f32, thickness: f32, color: Color) {
        self.layer.set_outline_color(color);
        self.layer.set_outline_thickness(thickness);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(pt(MARGIN), pt(y)), false),
                (Point::new(pt(PAGE_WIDTH - MARGIN), pt(y)), false),
            ],
            is_closed: false,
        });
    }

    fn section(&mut self, title: &str) {
        // Keep a heading together with its first line.
        self.ensure_room(SECTION_GAP + FIELD_GAP);
        self.text(title, 14.0, MARGIN, self.y, true, red());
        self.y -= SECTION_GAP;
    }

    fn field(&mut self, label: &str, value: &str, emphasize: bool) {
        self.ensure_room(FIELD_GAP);
        self.text(&format!("{label}:"), 12.0, MARGIN, self.y, true, black());
        self.text(value, 12.0, VALUE_COLUMN, self.y, emphasize, black());
        self.y -= FIELD_GAP;
    }

    fn note_line(&mut self, line: &str) {
        self.ensure_room(NOTE_GAP);
        self.text(line, 12.0, MARGIN, self.y, false, black());
        self.y -= NOTE_GAP;
    }

    /// Each dark run becomes one stroke as thick as a module.
    fn qr(&self, matrix: &QrMatrix, x: f32, top: f32, size: f32) {
        let module = size / matrix.width as f32;
        self.layer.set_outline_color(black());
        self.layer.set_outline_thickness(module);

        for (row, start, len) in matrix.dark_runs() {
            let y = top - (row as f32 + 0.5) * module;
            let x0 = x + start as f32 * module;
            let x1 = x0 + len as f32 * module;
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(pt(x0), pt(y)), false),
                    (Point::new(pt(x1), pt(y)), false),
                ],
                is_closed: false,
            });
        }
    }
}

/// Render the printable receipt for a stored pedido.
pub fn render_pedido_pdf(pedido: &Pedido, public_base_url: &str) -> Result<Vec<u8>, ReceiptError> {
    render(pedido, public_base_url).map(|(bytes, _)| bytes)
}

/// The document bytes and how many pages the body needed.
fn render(pedido: &Pedido, public_base_url: &str) -> Result<(Vec<u8>, usize), ReceiptError> {
    let payload = ReceiptPayload::for_pedido(pedido, public_base_url);
    let qr_content =
        serde_json::to_string(&payload).map_err(|e| ReceiptError::Pdf(e.to_string()))?;
    let matrix = QrMatrix::encode(&qr_content)?;

    let (doc, page_index, layer_index) = PdfDocument::new(
        format!("Pedido {}", pedido.id),
        pt(PAGE_WIDTH),
        pt(PAGE_HEIGHT),
        "Pedido",
    );
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| ReceiptError::Pdf(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| ReceiptError::Pdf(e.to_string()))?;

    let mut page = Page {
        doc: &doc,
        layer: doc.get_page(page_index).get_layer(layer_index),
        regular,
        bold,
        y: PAGE_HEIGHT - 190.0,
        count: 1,
    };

    page.text("CEMENTO NACIONAL", 24.0, MARGIN, PAGE_HEIGHT - 80.0, true, black());
    page.text("La Fuerza del Presente", 14.0, MARGIN, PAGE_HEIGHT - 105.0, false, red());
    page.text("PEDIDO DE CEMENTO", 18.0, MARGIN, PAGE_HEIGHT - 140.0, true, black());
    page.rule(PAGE_HEIGHT - 160.0, 2.0, black());

    page.section("INFORMACION DEL CLIENTE");
    page.field("Nombre", &pedido.nombre, false);
    page.field("Correo", &pedido.correo, false);
    page.field(
        "Telefono",
        pedido.telefono.as_deref().unwrap_or("No especificado"),
        false,
    );
    page.field(
        "Compania",
        pedido.compania.as_deref().unwrap_or("No especificada"),
        false,
    );
    page.y -= NOTE_GAP;

    page.section("DETALLES DEL PEDIDO");
    page.field("Bolsas", &pedido.bolsas.to_string(), false);
    page.field(
        "Precio Unitario",
        &format_money(pedido.precio_unitario, CURRENCY),
        false,
    );
    page.field("Subtotal", &format_money(pedido.subtotal, CURRENCY), false);
    page.field("Flete", &format_money(pedido.flete, CURRENCY), false);
    page.field("Total Final", &format_money(pedido.total_final, CURRENCY), true);
    page.y -= NOTE_GAP;

    if let Some(location) = pedido.location {
        page.section("UBICACION DE ENTREGA");
        page.field(
            "Direccion",
            pedido.address.as_deref().unwrap_or("No especificada"),
            false,
        );
        page.field("Latitud", &location.lat.to_string(), false);
        page.field("Longitud", &location.lng.to_string(), false);
        page.field("Distancia", &format!("{:.1} km", pedido.distance_km), false);
        page.y -= NOTE_GAP;
    }

    if let Some(notas) = pedido.notas.as_deref() {
        page.section("NOTAS ADICIONALES");
        for line in wrap_words(notas, NOTES_WIDTH) {
            page.note_line(&line);
        }
        page.y -= NOTE_GAP;
    }

    page.section("FECHA DE PEDIDO");
    page.field("Fecha", &format_fecha(&pedido.created_at), false);

    let footer = FOOTER;
    page.rule(footer, 1.0, gray());
    let qr_top = footer - 10.0;
    page.qr(&matrix, PAGE_WIDTH - MARGIN - QR_SIZE, qr_top, QR_SIZE);
    page.text(
        "Cemento Nacional - La Fuerza del Presente",
        10.0,
        MARGIN,
        footer - 20.0,
        false,
        gray(),
    );
    page.text(
        &format!("ID: {}", pedido.id),
        10.0,
        MARGIN,
        footer - 35.0,
        false,
        gray(),
    );
    let mut hint_y = qr_top - QR_SIZE - 10.0;
    page.text("Escanea para ver en admin", 7.0, PAGE_WIDTH - MARGIN - QR_SIZE, hint_y, false, gray());
    if pedido.location.is_some() {
        hint_y -= 10.0;
        page.text("Ver ubicacion en Maps", 7.0, PAGE_WIDTH - MARGIN - QR_SIZE, hint_y, false, gray());
    }

    let pages = page.count;
    drop(page);
    let bytes = doc
        .save_to_bytes()
        .map_err(|e| ReceiptError::Pdf(e.to_string()))?;
    debug!(
        "Rendered receipt for pedido {} ({} pages, {} bytes)",
        pedido.id,
        pages,
        bytes.len()
    );
    Ok((bytes, pages))
}
