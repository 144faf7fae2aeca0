//! Verification state values and the `ink` metafield set.
//!
//! Metafields in the `ink` namespace carry the proof-of-delivery state on
//! the order itself; the NFS backend owns the proof record, the order only
//! references it. Each webhook topic writes its status unconditionally -
//! delivery is at-least-once and possibly out of order, and last-write-wins
//! per key is the accepted semantics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metafield namespace for all verification keys.
pub const METAFIELD_NAMESPACE: &str = "ink";

/// Metafield keys within [`METAFIELD_NAMESPACE`].
pub mod keys {
    pub const VERIFICATION_STATUS: &str = "verification_status";
    pub const DELIVERY_TYPE: &str = "delivery_type";
    pub const PROOF_REFERENCE: &str = "proof_reference";
    pub const NFC_UID: &str = "nfc_uid";
    pub const PHOTOS_HASHES: &str = "photos_hashes";
}

/// Tag added to premium-protected orders.
pub const PROTECTION_TAG: &str = "INK-Premium-Delivery";

/// Verification lifecycle status stored in `ink.verification_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    FulfillmentCreated,
    InFulfillment,
}

impl VerificationStatus {
    /// The wire value written to the metafield.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::FulfillmentCreated => "fulfillment_created",
            Self::InFulfillment => "in_fulfillment",
        }
    }
}

/// Webhook topics this service subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookTopic {
    OrdersCreate,
    FulfillmentsCreate,
    FulfillmentsUpdate,
}

/// Error parsing a webhook topic header.
#[derive(Debug, Error)]
#[error("unhandled webhook topic: {0}")]
pub struct UnknownTopic(pub String);

impl WebhookTopic {
    /// The `X-Shopify-Topic` header value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrdersCreate => "orders/create",
            Self::FulfillmentsCreate => "fulfillments/create",
            Self::FulfillmentsUpdate => "fulfillments/update",
        }
    }

    /// The GraphQL `WebhookSubscriptionTopic` enum value.
    #[must_use]
    pub const fn subscription_topic(self) -> &'static str {
        match self {
            Self::OrdersCreate => "ORDERS_CREATE",
            Self::FulfillmentsCreate => "FULFILLMENTS_CREATE",
            Self::FulfillmentsUpdate => "FULFILLMENTS_UPDATE",
        }
    }

    /// All topics the service registers subscriptions for.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [
            Self::OrdersCreate,
            Self::FulfillmentsCreate,
            Self::FulfillmentsUpdate,
        ]
    }

    /// The status this topic writes, for the fulfillment topics.
    ///
    /// `orders/create` seeds the full metafield set instead (see
    /// [`initial_metafields`]) and returns `Pending` here.
    #[must_use]
    pub const fn verification_status(self) -> VerificationStatus {
        match self {
            Self::OrdersCreate => VerificationStatus::Pending,
            Self::FulfillmentsCreate => VerificationStatus::FulfillmentCreated,
            Self::FulfillmentsUpdate => VerificationStatus::InFulfillment,
        }
    }
}

impl std::str::FromStr for WebhookTopic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "orders/create" => Ok(Self::OrdersCreate),
            "fulfillments/create" => Ok(Self::FulfillmentsCreate),
            "fulfillments/update" => Ok(Self::FulfillmentsUpdate),
            other => Err(UnknownTopic(other.to_string())),
        }
    }
}

/// A metafield key/value pair in the `ink` namespace.
pub type MetafieldEntry = (&'static str, String);

/// The fixed metafield set seeded when a premium order is created.
///
/// Fixed keys, fixed values: re-applying the same webhook writes the same
/// set, so at-least-once delivery cannot corrupt or duplicate state.
#[must_use]
pub fn initial_metafields() -> Vec<MetafieldEntry> {
    vec![
        (
            keys::VERIFICATION_STATUS,
            VerificationStatus::Pending.as_str().to_string(),
        ),
        (keys::DELIVERY_TYPE, "premium".to_string()),
        (keys::PROOF_REFERENCE, String::new()),
        (keys::NFC_UID, String::new()),
        (keys::PHOTOS_HASHES, "[]".to_string()),
    ]
}

/// The metafields restored by the order backfill.
///
/// Only the delivery type and a pending status: a backfilled order may
/// already carry enrollment keys from a later webhook, and those must not
/// be clobbered.
#[must_use]
pub fn backfill_metafields() -> Vec<MetafieldEntry> {
    vec![
        (keys::DELIVERY_TYPE, "premium".to_string()),
        (
            keys::VERIFICATION_STATUS,
            VerificationStatus::Pending.as_str().to_string(),
        ),
    ]
}

/// The metafields written after a successful enrollment.
///
/// # Errors
///
/// Returns an error if the hashes cannot be JSON-encoded (practically
/// unreachable for a list of strings).
pub fn enrollment_metafields(
    proof_id: &str,
    nfc_uid: &str,
    photo_hashes: &[String],
) -> Result<Vec<MetafieldEntry>, serde_json::Error> {
    Ok(vec![
        (keys::PROOF_REFERENCE, proof_id.to_string()),
        (keys::NFC_UID, nfc_uid.to_string()),
        (keys::PHOTOS_HASHES, serde_json::to_string(photo_hashes)?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(VerificationStatus::Pending.as_str(), "pending");
        assert_eq!(
            VerificationStatus::FulfillmentCreated.as_str(),
            "fulfillment_created"
        );
        assert_eq!(VerificationStatus::InFulfillment.as_str(), "in_fulfillment");
    }

    #[test]
    fn test_topic_parsing() {
        assert_eq!(
            "orders/create".parse::<WebhookTopic>().ok(),
            Some(WebhookTopic::OrdersCreate)
        );
        assert_eq!(
            "fulfillments/update".parse::<WebhookTopic>().ok(),
            Some(WebhookTopic::FulfillmentsUpdate)
        );
        assert!("orders/paid".parse::<WebhookTopic>().is_err());
    }

    #[test]
    fn test_topic_status_mapping() {
        assert_eq!(
            WebhookTopic::FulfillmentsCreate.verification_status(),
            VerificationStatus::FulfillmentCreated
        );
        assert_eq!(
            WebhookTopic::FulfillmentsUpdate.verification_status(),
            VerificationStatus::InFulfillment
        );
    }

    #[test]
    fn test_initial_metafields_are_fixed() {
        let first = initial_metafields();
        let second = initial_metafields();
        assert_eq!(first, second);

        assert_eq!(first.len(), 5);
        assert!(first.iter().any(|(k, v)| *k == "verification_status" && v == "pending"));
        assert!(first.iter().any(|(k, v)| *k == "delivery_type" && v == "premium"));
        assert!(first.iter().any(|(k, v)| *k == "photos_hashes" && v == "[]"));
    }

    #[test]
    fn test_backfill_leaves_enrollment_keys_alone() {
        let entries = backfill_metafields();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|(k, v)| *k == "delivery_type" && v == "premium"));
        assert!(entries.iter().any(|(k, v)| *k == "verification_status" && v == "pending"));
        assert!(!entries.iter().any(|(k, _)| *k == "proof_reference"));
        assert!(!entries.iter().any(|(k, _)| *k == "photos_hashes"));
    }

    #[test]
    fn test_enrollment_metafields_encode_hashes_as_json() {
        let hashes = vec!["aa11".to_string(), "bb22".to_string()];
        let entries = enrollment_metafields("proof_9", "04:A1:B2", &hashes)
            .expect("string list encodes");

        assert!(entries.iter().any(|(k, v)| *k == "proof_reference" && v == "proof_9"));
        assert!(entries.iter().any(|(k, v)| *k == "nfc_uid" && v == "04:A1:B2"));
        assert!(
            entries
                .iter()
                .any(|(k, v)| *k == "photos_hashes" && v == r#"["aa11","bb22"]"#)
        );
    }

    #[test]
    fn test_subscription_topics() {
        assert_eq!(WebhookTopic::OrdersCreate.subscription_topic(), "ORDERS_CREATE");
        assert_eq!(
            WebhookTopic::FulfillmentsUpdate.subscription_topic(),
            "FULFILLMENTS_UPDATE"
        );
    }
}
