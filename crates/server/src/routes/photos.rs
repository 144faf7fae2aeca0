//! Photo upload relay: stage, upload, register, hash.
//!
//! Four steps, strictly sequential, no internal retries - any remote
//! round-trip failing aborts the whole operation with a stage-specific
//! error. The hash covers the original payload bytes, not the re-fetched
//! Shopify resource.

use axum::{Json, extract::Multipart, extract::State};
use serde_json::{Value, json};
use tracing::instrument;

use ink_proof_core::hash::sha256_hex;

use crate::error::{ApiError, Result};
use crate::state::AppState;

/// A parsed upload form.
struct UploadForm {
    order_id: String,
    photo_bytes: Vec<u8>,
    filename: Option<String>,
    mime_type: Option<String>,
    photo_index: i64,
}

async fn parse_form(mut multipart: Multipart) -> Result<UploadForm> {
    let mut order_id: Option<String> = None;
    let mut photo: Option<(Vec<u8>, Option<String>, Option<String>)> = None;
    let mut photo_index: i64 = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("orderId") => {
                order_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            Some("photoIndex") => {
                photo_index = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?
                    .trim()
                    .parse()
                    .unwrap_or(0);
            }
            Some("photo") => {
                let filename = field.file_name().map(ToString::to_string);
                let mime_type = field.content_type().map(ToString::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                photo = Some((bytes.to_vec(), filename, mime_type));
            }
            _ => {}
        }
    }

    let (order_id, (photo_bytes, filename, mime_type)) = match (order_id, photo) {
        (Some(order_id), Some(photo)) if !order_id.is_empty() && !photo.0.is_empty() => {
            (order_id, photo)
        }
        _ => return Err(ApiError::BadRequest("Missing photo or orderId".to_string())),
    };

    Ok(UploadForm {
        order_id,
        photo_bytes,
        filename,
        mime_type,
        photo_index,
    })
}

/// POST /api/photos/upload
///
/// Multipart fields: `orderId`, `photo` (binary), `photoIndex`. Responds
/// `{success, photoUrl, photoHash, photoIndex}`; the index is echoed so the
/// client can reassemble its ordered photo set - no ordering or
/// deduplication happens here.
#[instrument(skip(state, multipart))]
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>> {
    let form = parse_form(multipart).await?;

    let filename = form
        .filename
        .unwrap_or_else(|| format!("photo_{}.jpg", form.photo_index));
    let mime_type = form.mime_type.unwrap_or_else(|| "image/jpeg".to_string());

    tracing::info!(
        order_id = %form.order_id,
        %filename,
        size = form.photo_bytes.len(),
        "Staging photo upload"
    );

    // 1. Staged upload target from Shopify.
    let target = state
        .shopify()
        .create_staged_upload(&filename, &mime_type, form.photo_bytes.len())
        .await?;

    // 2. Direct upload to the staged URL. A rejection here aborts before
    //    registration or hashing.
    state
        .shopify()
        .upload_to_staged_target(&target, &filename, &mime_type, form.photo_bytes.clone())
        .await?;

    // 3. Register the uploaded resource for a durable URL.
    let photo_url = state.shopify().register_file(&target.resource_url).await?;

    // 4. Hash the original payload bytes.
    let photo_hash = sha256_hex(&form.photo_bytes);

    tracing::info!(order_id = %form.order_id, %photo_url, "Photo uploaded and hashed");

    Ok(Json(json!({
        "success": true,
        "photoUrl": photo_url,
        "photoHash": photo_hash,
        "photoIndex": form.photo_index,
    })))
}
