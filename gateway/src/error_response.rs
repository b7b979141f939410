//! Converts [`GatewayError`] into an axum [`Response`], the same
//! "one error enum, one `IntoResponse` impl" shape `server_sql.rs`'s
//! `AppError` uses, generalized from Postgres-specific variants to spec §7's
//! taxonomy.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use gateway_core::GatewayError;

pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(error = %self.0, "authentication failure");
        }
        (status, Json(self.0.body())).into_response()
    }
}
