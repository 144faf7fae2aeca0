//! Unified error handling with Sentry integration.
//!
//! All API route handlers return `Result<T, ApiError>`. The response body
//! is always a JSON `{"error": ...}` envelope with an appropriate non-2xx
//! status; the CORS layer wrapping the API router adds the headers browser
//! clients need to read it. Server-side failures are captured to Sentry
//! before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::nfs::NfsError;
use crate::shopify::AdminShopifyError;

/// Application-level error type for the API surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Webhook or request signature verification failed.
    #[error("Unauthorized")]
    Unauthorized,

    /// The request is missing or has malformed required fields.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Shopify Admin API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// NFS backend operation failed.
    #[error("NFS error: {0}")]
    Nfs(#[from] NfsError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Nfs(NfsError::InvalidEnrollment(_)) => {
                StatusCode::BAD_REQUEST
            }
            // Upstream rejections relay the upstream status where one exists.
            Self::Nfs(NfsError::Api { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Shopify(_) | Self::Nfs(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The JSON error envelope for this failure.
    ///
    /// The staged-upload rejection keeps its historical shape, including
    /// the storage server's own status code, which courier clients key on.
    fn body(&self) -> serde_json::Value {
        match self {
            Self::Shopify(AdminShopifyError::StagedUploadRejected(status)) => {
                json!({ "error": "Upload to Shopify failed", "status": status })
            }
            Self::Nfs(NfsError::Api { detail, .. }) => {
                json!({ "error": format!("NFS enrollment failed: {detail}") })
            }
            // Client-facing validation messages are relayed verbatim.
            Self::BadRequest(msg) => json!({ "error": msg }),
            other => json!({ "error": other.to_string() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture upstream and internal failures to Sentry; auth and
        // validation rejections are routine.
        if matches!(self, Self::Shopify(_) | Self::Nfs(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;
