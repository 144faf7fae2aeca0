//! Order classification: does this order carry INK Premium Delivery?
//!
//! The webhook payloads arrive in a few shapes depending on the topic and
//! integration path: some carry shipping lines, some only line items, and
//! checkout-extension orders carry an explicit cart attribute. The attribute
//! flag is authoritative; title matching is the fallback for orders placed
//! before the extension was installed.

use serde::Deserialize;

/// Cart attribute key set by the checkout extension.
const DELIVERY_TYPE_ATTRIBUTE: &str = "_ink_delivery_type";

/// Attribute value marking premium protection.
const DELIVERY_TYPE_PREMIUM: &str = "premium";

/// A shipping line from an order webhook payload.
///
/// Shopify uses `title` in webhook payloads and `name` in some Admin API
/// responses; either may be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShippingLine {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A line item from an order webhook payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub title: Option<String>,
}

/// A custom attribute attached to an order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAttribute {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
}

/// The subset of an order webhook payload that classification looks at.
///
/// All fields default to empty so any payload variant deserializes; REST
/// webhook payloads call custom attributes `note_attributes`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    #[serde(default)]
    pub admin_graphql_api_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shipping_lines: Vec<ShippingLine>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default, alias = "note_attributes")]
    pub custom_attributes: Vec<OrderAttribute>,
}

impl OrderPayload {
    /// Human-readable order name for logging, falling back to "Unknown".
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }
}

/// Returns true if the order purchased INK Premium Delivery protection.
///
/// Rule precedence:
/// 1. the `_ink_delivery_type == "premium"` cart attribute (authoritative),
/// 2. shipping-line title match,
/// 3. line-item title match (payload variants without shipping lines).
#[must_use]
pub fn is_premium_protected(payload: &OrderPayload) -> bool {
    if has_premium_attribute(&payload.custom_attributes) {
        return true;
    }

    if payload
        .shipping_lines
        .iter()
        .any(|line| title_matches(line.title.as_deref().or(line.name.as_deref())))
    {
        return true;
    }

    payload
        .line_items
        .iter()
        .any(|item| title_matches(item.title.as_deref()))
}

fn has_premium_attribute(attributes: &[OrderAttribute]) -> bool {
    attributes.iter().any(|attr| {
        attr.key == DELIVERY_TYPE_ATTRIBUTE
            && attr.value.eq_ignore_ascii_case(DELIVERY_TYPE_PREMIUM)
    })
}

/// Case-insensitive title match for the INK premium shipping method.
fn title_matches(title: Option<&str>) -> bool {
    let Some(title) = title else {
        return false;
    };
    let title = title.to_lowercase();

    title.contains("ink premium")
        || title.contains("ink delivery")
        || (title.contains("premium delivery") && title.contains("ink"))
}
