//! HTTP route assembly.
//!
//! Webhook routes sit outside the CORS layer (Shopify is not a browser);
//! the `/api` routes are CORS-open so the courier web client can call them
//! and read error bodies cross-origin.

mod admin;
mod enroll;
mod photos;
mod retrieve;
mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Build the application router.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/api/photos/upload", post(photos::upload))
        .route("/api/retrieve/{proof_id}", get(retrieve::retrieve))
        .route("/api/enroll", post(enroll::enroll))
        .layer(cors_layer());

    Router::new()
        .route("/webhooks/orders/create", post(webhooks::orders_create))
        .route(
            "/webhooks/fulfillments/create",
            post(webhooks::fulfillments_create),
        )
        .route(
            "/webhooks/fulfillments/update",
            post(webhooks::fulfillments_update),
        )
        .route("/admin/webhooks/register", post(admin::register_webhooks))
        .route("/admin/orders/fix", post(admin::fix_orders))
        .merge(api)
}

/// Permissive CORS for the client-facing API routes.
///
/// Applies to error responses as well, so browsers can read the
/// `{"error": ...}` envelope.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
