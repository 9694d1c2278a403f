use crate::domain::types::{PricingSettings, Quote};

/// Freight for a delivery `distance_km` away: the per-km rate, never below the minimum.
pub fn calculate_flete(distance_km: f64, pricing: &PricingSettings) -> f64 {
    (distance_km * pricing.tarifa_por_km).max(pricing.flete_minimo)
}

pub fn subtotal(bolsas: u32, precio_unitario: f64) -> f64 {
    f64::from(bolsas) * precio_unitario
}

/// Price breakdown given an already resolved distance.
/// `None` means there is no usable distance and the minimum freight applies.
pub fn build_quote(
    bolsas: u32,
    precio_unitario: f64,
    distance_km: Option<f64>,
    pricing: &PricingSettings,
) -> Quote {
    let subtotal = subtotal(bolsas, precio_unitario);
    let (flete, distance_km) = match distance_km {
        Some(km) => (calculate_flete(km, pricing), km),
        None => (pricing.flete_minimo, 0.0),
    };

    Quote {
        subtotal,
        flete,
        total_final: subtotal + flete,
        distance_km,
    }
}
