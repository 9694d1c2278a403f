use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::constant::{
    DEFAULT_FLETE_MINIMO, DEFAULT_ORIGEN, DEFAULT_TARIFA_POR_KM,
};

/// A point on the map in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0, message = "La latitud debe estar entre -90 y 90"))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "La longitud debe estar entre -180 y 180"))]
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingSettings {
    pub tarifa_por_km: f64,
    pub flete_minimo: f64,
    pub origen: Location,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tarifa_por_km: DEFAULT_TARIFA_POR_KM,
            flete_minimo: DEFAULT_FLETE_MINIMO,
            origen: Location::new(DEFAULT_ORIGEN.0, DEFAULT_ORIGEN.1),
        }
    }
}

/// Price breakdown for a number of bags delivered to an optional location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub subtotal: f64,
    pub flete: f64,
    pub total_final: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pedido {
    pub id: String,
    pub nombre: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub compania: Option<String>,
    pub bolsas: i64,
    pub precio_unitario: f64,
    pub subtotal: f64,
    pub flete: f64,
    pub total_final: f64,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub distance_km: f64,
    pub notas: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub nombre: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub compania: Option<String>,
    pub mensaje: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
}

/// A card payment tracked through the hosted checkout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub stripe_session_id: String,
    pub status: OrderStatus,
    /// Minor currency units, as reported by the payment provider.
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown payment status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(max = 200, message = "La calle no puede tener más de 200 caracteres"))]
    pub street: Option<String>,
    #[validate(length(max = 100, message = "La ciudad no puede tener más de 100 caracteres"))]
    pub city: Option<String>,
    #[validate(length(max = 100, message = "El estado no puede tener más de 100 caracteres"))]
    pub state: Option<String>,
    #[validate(length(max = 20, message = "El código postal no puede tener más de 20 caracteres"))]
    pub postal_code: Option<String>,
    #[validate(length(max = 100, message = "El país no puede tener más de 100 caracteres"))]
    pub country: Option<String>,
}

impl ShippingAddress {
    pub fn is_empty(&self) -> bool {
        self.street.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

/// A sale recorded by staff against a hosted checkout session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_company: Option<String>,
    pub product_name: String,
    pub product_description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
    pub stripe_session_id: String,
    pub stripe_payment_intent_id: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    /// Major currency units, as entered.
    pub total_amount: f64,
    pub currency: String,
    pub stripe_fee: Option<f64>,
    pub net_amount: Option<f64>,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    /// `totalAmount - stripeFee` once a fee is known.
    pub fn refresh_net_amount(&mut self) {
        self.net_amount = self.stripe_fee.map(|fee| self.total_amount - fee);
    }
}

/// Aggregates over the purchases matching a listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseStats {
    pub total_revenue: f64,
    pub total_purchases: i64,
    pub average_order_value: f64,
    pub paid_purchases: i64,
    pub pending_purchases: i64,
    pub failed_purchases: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

impl PageInfo {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: crate::utils::total_pages(total, limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_parses_its_wire_names() {
        assert_eq!("paid".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert_eq!(" refunded ".parse::<PaymentStatus>(), Ok(PaymentStatus::Refunded));
        assert!("completed".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn net_amount_follows_the_fee() {
        let mut purchase = Purchase {
            id: "p1".to_string(),
            customer_name: "Obras del Norte".to_string(),
            customer_email: "compras@obras.mx".to_string(),
            customer_phone: None,
            customer_company: None,
            product_name: "Cemento Portland Gris CPC30".to_string(),
            product_description: "Bulto de 50 kg".to_string(),
            quantity: 10,
            unit_price: 150.0,
            subtotal: 1500.0,
            stripe_session_id: "cs_test_1".to_string(),
            stripe_payment_intent_id: None,
            payment_status: PaymentStatus::Pending,
            payment_method: None,
            total_amount: 1500.0,
            currency: "MXN".to_string(),
            stripe_fee: None,
            net_amount: None,
            shipping_address: None,
            notes: None,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        purchase.refresh_net_amount();
        assert_eq!(purchase.net_amount, None);

        purchase.stripe_fee = Some(52.5);
        purchase.refresh_net_amount();
        assert_eq!(purchase.net_amount, Some(1447.5));
    }
}
