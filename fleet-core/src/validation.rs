use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body extractor that runs `validator` rules before the handler sees the value.
///
/// Malformed JSON (including enum strings outside the allowed set) is a
/// `BadRequest`; rule violations are a `ValidationError` listing each field.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Invalid JSON body: {}", e.body_text()))
            })?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

/// Query-string extractor whose rejection is a `BadRequest` rendered like every other error.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Invalid query: {}", e.body_text()))
            })?;
        Ok(QueryParams(value))
    }
}
