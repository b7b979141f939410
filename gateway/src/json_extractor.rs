//! A `Json<T>` extractor that normalizes deserialize/content-type rejections
//! through [`ApiError`] instead of axum's default `422 Unprocessable Entity`
//! plain-text response.
//!
//! Spec §7: "Validation failure (missing fields, bad JSON): `400` JSON
//! `{error:\"...\"}`." Axum's bare `Json<T>` extractor already short-circuits
//! the handler on a malformed body, but with its own `JsonRejection`
//! response — wrong status code, wrong body shape. `ApiJson<T>` is a
//! drop-in replacement for `Json<T>` as a handler argument that routes that
//! rejection through the same `GatewayError::BadRequest` → `ApiError` path
//! every other validation failure in this crate uses.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;

use gateway_core::GatewayError;

use crate::error_response::ApiError;

pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError(GatewayError::BadRequest(rejection.body_text()))),
        }
    }
}
