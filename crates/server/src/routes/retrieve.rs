//! Proof retrieval proxy.
//!
//! A pure read-through: no caching, no retry, no reinterpretation of the
//! proof record. The upstream status and JSON body are relayed verbatim.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// GET /api/retrieve/{proof_id}
#[instrument(skip(state))]
pub async fn retrieve(
    State(state): State<AppState>,
    Path(proof_id): Path<String>,
) -> Result<Response> {
    if proof_id.trim().is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing proof_id" })),
        )
            .into_response());
    }

    // Transport failure (no upstream response) surfaces as a local 500 via
    // ApiError; an upstream response of any status is relayed.
    let upstream = state.nfs().retrieve_raw(&proof_id).await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);

    if upstream.is_success() {
        tracing::info!(%proof_id, "Proof retrieved");
        Ok((
            status,
            [(header::CONTENT_TYPE, "application/json")],
            upstream.body,
        )
            .into_response())
    } else {
        tracing::warn!(%proof_id, status = upstream.status, "NFS retrieve error");
        Ok((
            status,
            Json(json!({
                "error": format!("Retrieve service error: {}", upstream.body)
            })),
        )
            .into_response())
    }
}
