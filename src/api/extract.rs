use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

use super::error::AppError;

/// Cleanup applied to a request body before it is validated.
pub trait Normalize {
    fn normalize(&mut self) {}
}

/// JSON body that has been normalized and validated.
/// Malformed JSON and rule violations are both answered with a 400.
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Normalize,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(mut value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(json!([rejection.body_text()])))?;

        value.normalize();
        value
            .validate()
            .map_err(|errors| AppError::Validation(serde_json::to_value(errors).unwrap_or_default()))?;

        Ok(Self(value))
    }
}
