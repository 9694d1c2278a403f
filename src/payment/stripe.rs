use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::PaymentError;
use crate::config::constant::{PRODUCT_NAME, PRODUCT_SLUG};
use crate::config::Config;

/// The subset of a hosted checkout session the storefront reads.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub payment_method_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: Option<String>,
    api_base: String,
    price_id: String,
    public_base_url: String,
}

impl StripeClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            secret_key: config.stripe_secret_key.clone(),
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            price_id: config.stripe_price_id.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    fn checkout_form(&self, quantity: u32) -> Vec<(&'static str, String)> {
        vec![
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][price]", self.price_id.clone()),
            ("line_items[0][quantity]", quantity.to_string()),
            ("mode", "payment".to_string()),
            (
                "success_url",
                format!(
                    "{}/comprar?success=true&session_id={{CHECKOUT_SESSION_ID}}",
                    self.public_base_url
                ),
            ),
            (
                "cancel_url",
                format!("{}/comprar?canceled=true", self.public_base_url),
            ),
            ("metadata[product]", PRODUCT_SLUG.to_string()),
            ("metadata[product_name]", PRODUCT_NAME.to_string()),
            ("metadata[quantity]", quantity.to_string()),
        ]
    }

    /// Open a hosted checkout session for `quantity` bags at the fixed price.
    pub async fn create_checkout_session(
        &self,
        quantity: u32,
    ) -> Result<CheckoutSession, PaymentError> {
        let secret_key = self
            .secret_key
            .as_deref()
            .ok_or(PaymentError::NotConfigured("STRIPE_SECRET_KEY"))?;

        let url = format!("{}/v1/checkout/sessions", self.api_base);
        debug!("Creating checkout session for {quantity} bags");

        let response = self
            .client
            .post(&url)
            .bearer_auth(secret_key)
            .form(&self.checkout_form(quantity))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| status.to_string());
            error!("Checkout session rejected with {status}: {message}");
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let session: CheckoutSession = response.json().await?;
        info!("Checkout session {} created", session.id);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(secret_key: Option<&str>) -> StripeClient {
        let config = Config {
            stripe_secret_key: secret_key.map(str::to_string),
            stripe_price_id: "price_test".to_string(),
            public_base_url: "https://cemento.example".to_string(),
            ..Config::default()
        };
        StripeClient::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn missing_secret_key_is_reported_without_a_request() {
        let err = client(None).create_checkout_session(2).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotConfigured("STRIPE_SECRET_KEY")));
    }

    #[test]
    fn checkout_form_carries_price_quantity_and_metadata() {
        let form = client(Some("sk_test")).checkout_form(3);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("line_items[0][price]"), Some("price_test"));
        assert_eq!(get("line_items[0][quantity]"), Some("3"));
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("metadata[product]"), Some("cemento-cpc30"));
        assert_eq!(get("metadata[product_name]"), Some("Cemento Portland Gris CPC30"));
        assert_eq!(get("metadata[quantity]"), Some("3"));
        assert_eq!(
            get("success_url"),
            Some("https://cemento.example/comprar?success=true&session_id={CHECKOUT_SESSION_ID}")
        );
        assert_eq!(
            get("cancel_url"),
            Some("https://cemento.example/comprar?canceled=true")
        );
    }

    #[test]
    fn session_deserializes_from_provider_json() {
        let session: CheckoutSession = serde_json::from_str(
            r#"{
                "id": "cs_test_123",
                "object": "checkout.session",
                "url": "https://checkout.example/pay/cs_test_123",
                "amount_total": 45000,
                "currency": "mxn",
                "customer_details": null
            }"#,
        )
        .unwrap();

        assert_eq!(session.id, "cs_test_123");
        assert_eq!(session.amount_total, Some(45000));
        assert_eq!(session.currency.as_deref(), Some("mxn"));
        assert!(session.customer_details.is_none());
    }
}
