use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::{Validate, ValidationError};

use super::extract::Normalize;
use crate::config::constant::{CURRENCY, MAX_TAG_LENGTH};
use crate::domain::types::{Location, PaymentStatus, PricingSettings, ShippingAddress};
use crate::utils::{trim_in_place, trim_optional};

fn normalize_email(correo: &mut String) {
    *correo = correo.trim().to_lowercase();
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 2, max = 100, message = "El nombre debe tener entre 2 y 100 caracteres"))]
    pub nombre: String,
    #[validate(
        email(message = "Por favor ingresa un correo válido"),
        length(min = 5, max = 100, message = "El correo debe tener entre 5 y 100 caracteres")
    )]
    pub correo: String,
    #[validate(length(max = 20, message = "El teléfono no puede tener más de 20 caracteres"))]
    pub telefono: Option<String>,
    #[validate(length(max = 100, message = "El nombre de la compañía no puede tener más de 100 caracteres"))]
    pub compania: Option<String>,
    #[validate(length(min = 10, max = 1000, message = "El mensaje debe tener entre 10 y 1000 caracteres"))]
    pub mensaje: String,
}

impl Normalize for ContactRequest {
    fn normalize(&mut self) {
        trim_in_place(&mut self.nombre);
        normalize_email(&mut self.correo);
        trim_optional(&mut self.telefono);
        trim_optional(&mut self.compania);
        trim_in_place(&mut self.mensaje);
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PedidoRequest {
    #[validate(length(min = 2, max = 100, message = "El nombre debe tener entre 2 y 100 caracteres"))]
    pub nombre: String,
    #[validate(
        email(message = "Por favor ingresa un correo válido"),
        length(min = 5, max = 100, message = "El correo debe tener entre 5 y 100 caracteres")
    )]
    pub correo: String,
    #[validate(length(max = 20, message = "El teléfono no puede tener más de 20 caracteres"))]
    pub telefono: Option<String>,
    #[validate(length(max = 100, message = "El nombre de la compañía no puede tener más de 100 caracteres"))]
    pub compania: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "Debe pedir entre 1 y 1000 bolsas"))]
    pub bolsas: u32,
    #[validate(range(min = 0.0, message = "El precio unitario no puede ser negativo"))]
    pub precio_unitario: f64,
    #[validate(length(max = 500, message = "La dirección no puede tener más de 500 caracteres"))]
    pub address: Option<String>,
    #[validate(nested)]
    pub location: Option<Location>,
    #[validate(length(max = 1000, message = "Las notas no pueden tener más de 1000 caracteres"))]
    pub notas: Option<String>,
}

impl Normalize for PedidoRequest {
    fn normalize(&mut self) {
        trim_in_place(&mut self.nombre);
        normalize_email(&mut self.correo);
        trim_optional(&mut self.telefono);
        trim_optional(&mut self.compania);
        trim_optional(&mut self.address);
        trim_optional(&mut self.notas);
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[validate(range(min = 1, max = 1000, message = "Debe pedir entre 1 y 1000 bolsas"))]
    pub bolsas: u32,
    #[validate(range(min = 0.0, message = "El precio unitario no puede ser negativo"))]
    pub precio_unitario: f64,
    #[validate(nested)]
    pub location: Option<Location>,
}

impl Normalize for QuoteRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub subtotal: f64,
    pub flete: f64,
    pub total_final: f64,
    pub distance_km: f64,
    pub bolsas: u32,
    pub precio_unitario: f64,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PricingUpdate {
    #[validate(range(min = 0.0, max = 1000.0, message = "La tarifa por kilómetro debe estar entre 0 y 1000"))]
    pub tarifa_por_km: Option<f64>,
    #[validate(range(min = 0.0, max = 10000.0, message = "El flete mínimo debe estar entre 0 y 10000"))]
    pub flete_minimo: Option<f64>,
    #[validate(nested)]
    pub origen: Option<Location>,
}

impl Normalize for PricingUpdate {}

impl PricingUpdate {
    /// Fields left out keep their current value.
    pub fn merge_into(self, current: PricingSettings) -> PricingSettings {
        PricingSettings {
            tarifa_por_km: self.tarifa_por_km.unwrap_or(current.tarifa_por_km),
            flete_minimo: self.flete_minimo.unwrap_or(current.flete_minimo),
            origen: self.origen.unwrap_or(current.origen),
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 100, message = "La cantidad debe estar entre 1 y 100"))]
    pub quantity: u32,
}

impl Normalize for CheckoutRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Usuario requerido"))]
    pub username: String,
    #[validate(length(min = 1, message = "Contraseña requerida"))]
    pub password: String,
}

impl Normalize for LoginRequest {}

#[derive(Debug, Deserialize, Validate)]
pub struct QrRequest {
    #[serde(default)]
    pub data: Value,
}

impl Normalize for QrRequest {}

fn default_currency() -> String {
    CURRENCY.to_string()
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.iter().any(|tag| tag.chars().count() > MAX_TAG_LENGTH) {
        let mut error = ValidationError::new("length");
        error.message = Some("Cada etiqueta puede tener máximo 50 caracteres".into());
        return Err(error);
    }
    Ok(())
}

fn normalize_tags(tags: &mut Vec<String>) {
    for tag in tags.iter_mut() {
        trim_in_place(tag);
    }
    tags.retain(|tag| !tag.is_empty());
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[validate(length(min = 1, max = 100, message = "Nombre es requerido"))]
    pub customer_name: String,
    #[validate(
        email(message = "Email inválido"),
        length(max = 100, message = "Email inválido")
    )]
    pub customer_email: String,
    #[validate(length(max = 20, message = "El teléfono no puede tener más de 20 caracteres"))]
    pub customer_phone: Option<String>,
    #[validate(length(max = 100, message = "El nombre de la compañía no puede tener más de 100 caracteres"))]
    pub customer_company: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Nombre del producto es requerido"))]
    pub product_name: String,
    #[validate(length(min = 1, max = 500, message = "Descripción del producto es requerida"))]
    pub product_description: String,
    #[validate(range(min = 1, max = 1000, message = "Cantidad debe ser al menos 1"))]
    pub quantity: u32,
    #[validate(range(min = 0.0, message = "Precio unitario debe ser positivo"))]
    pub unit_price: f64,
    #[validate(range(min = 0.0, message = "Subtotal debe ser positivo"))]
    pub subtotal: f64,
    #[validate(length(min = 1, message = "Stripe Session ID es requerido"))]
    pub stripe_session_id: String,
    #[validate(range(min = 0.0, message = "Total debe ser positivo"))]
    pub total_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[validate(nested)]
    pub shipping_address: Option<ShippingAddress>,
    #[validate(length(max = 1000, message = "Las notas no pueden tener más de 1000 caracteres"))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_tags"))]
    pub tags: Vec<String>,
}

impl Normalize for PurchaseRequest {
    fn normalize(&mut self) {
        trim_in_place(&mut self.customer_name);
        normalize_email(&mut self.customer_email);
        trim_optional(&mut self.customer_phone);
        trim_optional(&mut self.customer_company);
        trim_in_place(&mut self.product_name);
        trim_in_place(&mut self.product_description);
        trim_in_place(&mut self.stripe_session_id);
        self.currency = self.currency.trim().to_uppercase();
        if self.currency.is_empty() {
            self.currency = default_currency();
        }
        if let Some(address) = self.shipping_address.as_mut() {
            trim_optional(&mut address.street);
            trim_optional(&mut address.city);
            trim_optional(&mut address.state);
            trim_optional(&mut address.postal_code);
            trim_optional(&mut address.country);
        }
        if self.shipping_address.as_ref().is_some_and(ShippingAddress::is_empty) {
            self.shipping_address = None;
        }
        trim_optional(&mut self.notes);
        normalize_tags(&mut self.tags);
    }
}

/// Staff edits to a purchase; absent fields are left alone.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseUpdate {
    pub payment_status: Option<PaymentStatus>,
    pub stripe_payment_intent_id: Option<String>,
    pub payment_method: Option<String>,
    #[validate(range(min = 0.0, message = "La comisión no puede ser negativa"))]
    pub stripe_fee: Option<f64>,
    #[validate(length(max = 1000, message = "Las notas no pueden tener más de 1000 caracteres"))]
    pub notes: Option<String>,
    #[validate(custom(function = "validate_tags"))]
    pub tags: Option<Vec<String>>,
}

impl Normalize for PurchaseUpdate {
    fn normalize(&mut self) {
        trim_optional(&mut self.stripe_payment_intent_id);
        trim_optional(&mut self.payment_method);
        trim_optional(&mut self.notes);
        if let Some(tags) = self.tags.as_mut() {
            normalize_tags(tags);
        }
    }
}

/// Raw `page`/`limit` query values; anything unusable falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    pub query: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PedidoQuery {
    pub id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_total: Option<String>,
    pub max_total: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseQuery {
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
}
