//! Package enrollment: the "final tracking record is ready" trigger.
//!
//! The courier client signs the raw body with the NFS shared secret (hex
//! HMAC-SHA256 in `X-Nfs-Signature`); a missing or invalid signature is a
//! 401 before anything is parsed. After a successful enrollment the proof
//! reference, NFC UID, and photo hashes are written back onto the order so
//! the admin dashboard can show verification state without calling NFS.

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use tracing::instrument;

use ink_proof_core::signature;
use ink_proof_core::verification;

use crate::config::secret_bytes;
use crate::error::{ApiError, Result};
use crate::nfs::{EnrollRequest, EnrollResponse};
use crate::state::AppState;

/// Signature header for NFS-facing requests (hex HMAC-SHA256).
const NFS_SIGNATURE_HEADER: &str = "x-nfs-signature";

/// Normalize an order reference to an Admin API GID.
fn order_gid_from(order_id: &str) -> String {
    if order_id.starts_with("gid://") {
        order_id.to_string()
    } else {
        format!("gid://shopify/Order/{order_id}")
    }
}

/// POST /api/enroll
#[instrument(skip(state, headers, body))]
pub async fn enroll(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EnrollResponse>> {
    let provided = headers
        .get(NFS_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let secret = secret_bytes(&state.config().nfs.hmac_secret);
    if !signature::verify_hex(secret, &body, provided) {
        tracing::warn!("Enrollment signature mismatch");
        return Err(ApiError::Unauthorized);
    }

    let request: EnrollRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid enrollment payload: {e}")))?;

    // Submits only after the payload invariants hold; enroll() validates
    // before any network call.
    let enrolled = state.nfs().enroll(&request).await?;

    // Annotate the order with the proof reference. At-least-once semantics:
    // the enrollment stands even if this write fails and is retried.
    let order_gid = order_gid_from(&request.order_id);
    let entries = verification::enrollment_metafields(
        &enrolled.proof_id,
        &request.nfc_uid,
        &request.photo_hashes,
    )
    .map_err(|e| ApiError::Internal(format!("Failed to encode photo hashes: {e}")))?;

    state
        .shopify()
        .set_order_metafields(&order_gid, &entries)
        .await?;

    tracing::info!(
        order_id = %request.order_id,
        proof_id = %enrolled.proof_id,
        "Package enrolled and order annotated"
    );

    Ok(Json(enrolled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_gid_passthrough() {
        assert_eq!(
            order_gid_from("gid://shopify/Order/42"),
            "gid://shopify/Order/42"
        );
    }

    #[test]
    fn test_order_gid_from_numeric_id() {
        assert_eq!(order_gid_from("450789469"), "gid://shopify/Order/450789469");
    }
}
