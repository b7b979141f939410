//! Error taxonomy shared by the admin API, the reverse proxy and the
//! control-plane WebSocket endpoint.
//!
//! Mirrors spec §7: every failure mode the gateway can hit maps to exactly
//! one variant here, and callers convert it to an HTTP status / JSON body
//! or a WS error frame at the edge rather than inventing ad-hoc shapes
//! per-handler.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid authentication key")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("Failed to fetch resource")]
    OriginFailure,
}

/// Wire shape for `{error: "..."}` JSON bodies (spec §7).
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl GatewayError {
    /// The status code a caller should surface this as, per spec §7's
    /// taxonomy table. Kept independent of any particular web framework so
    /// `gateway-core` stays free of HTTP dependencies.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Unauthenticated => 401,
            GatewayError::BadRequest(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::Unavailable(_) => 503,
            GatewayError::OriginFailure => 502,
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }
}
