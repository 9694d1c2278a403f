pub mod pdf;
pub mod qr;

use thiserror::Error;

pub use pdf::render_pedido_pdf;
pub use qr::{svg_data_url, ReceiptPayload};

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("qr encoding failed: {0}")]
    Qr(String),

    #[error("pdf rendering failed: {0}")]
    Pdf(String),
}
