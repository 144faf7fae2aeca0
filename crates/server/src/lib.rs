//! INK Proof Server - Shopify <-> NFS integration service.
//!
//! A thin integration layer between Shopify (order/fulfillment webhooks,
//! Admin GraphQL API, staged file uploads) and the external NFS
//! proof-of-delivery backend.
//!
//! # Architecture
//!
//! - Axum web service; every request is an independent, stateless unit of
//!   work with strictly sequential remote calls
//! - [`shopify`] - Admin API client (order annotation, file staging,
//!   webhook subscriptions)
//! - [`nfs`] - verification backend client (enroll, retrieve)
//! - Pure logic (classification, hashing, signatures) lives in
//!   `ink-proof-core`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod nfs;
pub mod routes;
pub mod shopify;
pub mod state;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router for the given state.
#[must_use]
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
