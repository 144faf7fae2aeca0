//! Operator-facing maintenance routes.
//!
//! `register_webhooks` registers the three webhook subscriptions this
//! service handles, with callback URLs under the configured public base
//! URL. Run once per store after deployment; re-running is harmless
//! (Shopify rejects exact duplicates with a user error, which is
//! surfaced). `fix_orders` backfills protection onto recent orders the
//! webhook missed, for example after downtime.

use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::instrument;

use ink_proof_core::verification::{self, WebhookTopic};

use crate::error::Result;
use crate::state::AppState;

/// How many recent orders the backfill scans, newest first.
const BACKFILL_SCAN_SIZE: u32 = 10;

/// POST /admin/webhooks/register
#[instrument(skip(state))]
pub async fn register_webhooks(State(state): State<AppState>) -> Result<Json<Value>> {
    let base_url = state.config().base_url.trim_end_matches('/');
    let mut subscriptions = Vec::new();

    for topic in WebhookTopic::all() {
        let callback_url = format!("{base_url}/webhooks/{}", topic.as_str());
        let id = state
            .shopify()
            .create_webhook_subscription(topic.subscription_topic(), &callback_url)
            .await?;

        tracing::info!(topic = topic.as_str(), %callback_url, %id, "Webhook registered");
        subscriptions.push(json!({
            "topic": topic.subscription_topic(),
            "callbackUrl": callback_url,
            "id": id,
        }));
    }

    Ok(Json(json!({ "subscriptions": subscriptions })))
}

/// POST /admin/orders/fix
///
/// Scan the most recent orders and retroactively protect any premium order
/// missing the tag: add the tag and seed the delivery-type and status
/// metafields. Orders already tagged are reported but left untouched, so
/// enrollment data written in the meantime survives.
#[instrument(skip(state))]
pub async fn fix_orders(State(state): State<AppState>) -> Result<Json<Value>> {
    let orders = state.shopify().list_recent_orders(BACKFILL_SCAN_SIZE).await?;
    let mut results = Vec::new();

    for order in orders {
        let premium = order.protection.is_premium();
        let already_tagged = order.protection.has_tag(verification::PROTECTION_TAG);
        let needs_fix = premium && !already_tagged;

        if needs_fix {
            state
                .shopify()
                .add_order_tag(&order.id, verification::PROTECTION_TAG)
                .await?;
            state
                .shopify()
                .set_order_metafields(&order.id, &verification::backfill_metafields())
                .await?;
            tracing::info!(order = %order.name, "Order backfilled with INK protection");
        }

        results.push(json!({
            "order": order.name,
            "shipping": order.protection.shipping_line_title,
            "premium": premium,
            "alreadyTagged": already_tagged,
            "fixed": needs_fix,
        }));
    }

    Ok(Json(json!({ "results": results })))
}
