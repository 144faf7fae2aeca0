//! Shopify Admin API client.
//!
//! GraphQL is issued as hand-written query documents with typed `serde`
//! response structs; the handful of operations this service needs does not
//! justify vendoring the full Admin schema for codegen.

mod admin;

pub use admin::{AdminClient, OrderProtection, RecentOrder, StagedUploadTarget};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed (transport-level).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned top-level errors.
    #[error("GraphQL errors: {}", .0.join("; "))]
    GraphQL(Vec<String>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Mutation returned user errors (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The staged-upload target rejected the direct upload.
    #[error("Staged upload rejected with status {0}")]
    StagedUploadRejected(u16),

    /// File registration did not yield a durable URL.
    #[error("File registration failed: {0}")]
    FileRegistration(String),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(String),
}
