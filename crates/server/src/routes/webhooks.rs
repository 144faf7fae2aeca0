//! Shopify webhook handlers: orders/create, fulfillments/create,
//! fulfillments/update.
//!
//! Every handler authenticates the raw body against the manual webhook
//! secret before doing anything else - a bad signature means 401 and zero
//! remote calls. Handlers are stateless: each topic writes the state it
//! implies, and out-of-order redelivery simply overwrites (last-write-wins
//! per metafield key).

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Deserialize;
use tracing::instrument;

use ink_proof_core::classify::{self, OrderPayload};
use ink_proof_core::signature;
use ink_proof_core::verification::{self, VerificationStatus, WebhookTopic};

use crate::config::secret_bytes;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Shopify's webhook signature header (base64 HMAC-SHA256 of the raw body).
const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

/// Shop-domain header, logged for traceability.
const SHOP_HEADER: &str = "x-shopify-shop-domain";

/// Verify the webhook signature over the exact raw body.
///
/// Accepts the base64 form Shopify sends; falls back to hex for
/// integrations that sign that way. Missing header rejects.
fn authenticate(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let provided = headers
        .get(HMAC_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    let secret = secret_bytes(&state.config().webhook_secret);
    if signature::verify_base64(secret, body, provided)
        || signature::verify_hex(secret, body, provided)
    {
        Ok(())
    } else {
        tracing::warn!("Webhook signature mismatch");
        Err(ApiError::Unauthorized)
    }
}

fn shop_domain(headers: &HeaderMap) -> &str {
    headers
        .get(SHOP_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// POST /webhooks/orders/create
///
/// Classifies the new order; premium-protected orders get the protection
/// tag (if absent) and the initial `ink` metafield set. Standard orders are
/// acknowledged without any write.
#[instrument(skip(state, headers, body))]
pub async fn orders_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    authenticate(&state, &headers, &body)?;
    let shop = shop_domain(&headers);

    let payload: OrderPayload = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid webhook payload".to_string()))?;

    let order_gid = payload
        .admin_graphql_api_id
        .clone()
        .ok_or_else(|| ApiError::BadRequest("Missing order".to_string()))?;
    let order_name = payload.display_name().to_string();

    if !classify::is_premium_protected(&payload) {
        tracing::info!(%shop, %order_name, "Standard delivery order, skipping INK protection");
        return Ok("ok - standard delivery");
    }

    tracing::info!(%shop, %order_name, %order_gid, "Premium delivery order detected");

    // Check the current tag set to avoid duplicate-tag noise; tagsAdd is
    // set-semantics anyway, so a failed read does not block the write.
    let already_tagged = match state.shopify().get_order_protection(&order_gid).await {
        Ok(order) => order.has_tag(verification::PROTECTION_TAG),
        Err(e) => {
            tracing::warn!(error = %e, "Tag lookup failed, adding tag unconditionally");
            false
        }
    };

    if !already_tagged {
        state
            .shopify()
            .add_order_tag(&order_gid, verification::PROTECTION_TAG)
            .await?;
        tracing::info!(%order_name, tag = verification::PROTECTION_TAG, "Order tagged");
    }

    state
        .shopify()
        .set_order_metafields(&order_gid, &verification::initial_metafields())
        .await?;
    tracing::info!(%order_name, "Initial verification metafields set");

    Ok("ok")
}

/// POST /webhooks/fulfillments/create
#[instrument(skip(state, headers, body))]
pub async fn fulfillments_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    handle_fulfillment(&state, &headers, &body, WebhookTopic::FulfillmentsCreate).await
}

/// POST /webhooks/fulfillments/update
#[instrument(skip(state, headers, body))]
pub async fn fulfillments_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str> {
    handle_fulfillment(&state, &headers, &body, WebhookTopic::FulfillmentsUpdate).await
}

/// A fulfillment webhook payload. The order reference arrives either as a
/// numeric `order_id` or embedded under `order`.
#[derive(Debug, Deserialize)]
struct FulfillmentPayload {
    #[serde(default)]
    order_id: Option<serde_json::Value>,
    #[serde(default)]
    order: Option<EmbeddedOrder>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedOrder {
    #[serde(default)]
    admin_graphql_api_id: Option<String>,
}

impl FulfillmentPayload {
    fn order_gid(&self) -> Option<String> {
        if let Some(gid) = self
            .order
            .as_ref()
            .and_then(|o| o.admin_graphql_api_id.clone())
        {
            return Some(gid);
        }
        match &self.order_id {
            Some(serde_json::Value::Number(n)) => Some(format!("gid://shopify/Order/{n}")),
            Some(serde_json::Value::String(s)) if !s.is_empty() => {
                Some(format!("gid://shopify/Order/{s}"))
            }
            _ => None,
        }
    }
}

/// Shared fulfillment handling: write the topic's verification status
/// unconditionally. Each delivery is independent; ordering guards would
/// fight Shopify's at-least-once redelivery for no benefit.
async fn handle_fulfillment(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
    topic: WebhookTopic,
) -> Result<&'static str> {
    authenticate(state, headers, body)?;
    let shop = shop_domain(headers);

    let payload: FulfillmentPayload = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Invalid webhook payload".to_string()))?;

    let order_gid = payload
        .order_gid()
        .ok_or_else(|| ApiError::BadRequest("Missing order".to_string()))?;

    let status: VerificationStatus = topic.verification_status();
    state
        .shopify()
        .set_order_metafields(
            &order_gid,
            &[(
                verification::keys::VERIFICATION_STATUS,
                status.as_str().to_string(),
            )],
        )
        .await?;

    tracing::info!(%shop, %order_gid, topic = topic.as_str(), status = status.as_str(),
        "Verification status updated");
    Ok("ok")
}
