//! Admin API GraphQL operations.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;

use ink_proof_core::classify::{self, LineItem, OrderAttribute, OrderPayload, ShippingLine};

use crate::config::ShopifyConfig;

use super::AdminShopifyError;

// =============================================================================
// GraphQL documents
// =============================================================================

const ORDER_PROTECTION_QUERY: &str = r"
query OrderProtection($id: ID!) {
  order(id: $id) {
    tags
    shippingLine { title }
    lineItems(first: 50) { edges { node { title } } }
    customAttributes { key value }
  }
}
";

const RECENT_ORDERS_QUERY: &str = r"
query RecentOrders($first: Int!) {
  orders(first: $first, reverse: true) {
    edges {
      node {
        id
        name
        tags
        shippingLine { title }
        lineItems(first: 50) { edges { node { title } } }
        customAttributes { key value }
      }
    }
  }
}
";

const TAGS_ADD_MUTATION: &str = r"
mutation AddOrderTag($id: ID!, $tags: [String!]!) {
  tagsAdd(id: $id, tags: $tags) {
    userErrors { field message }
  }
}
";

const METAFIELDS_SET_MUTATION: &str = r"
mutation SetInkMetafields($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    userErrors { field message }
  }
}
";

const STAGED_UPLOADS_CREATE_MUTATION: &str = r"
mutation StagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
";

const FILE_CREATE_MUTATION: &str = r"
mutation RegisterUploadedFile($files: [FileCreateInput!]!) {
  fileCreate(files: $files) {
    files {
      id
      ... on MediaImage { image { url } }
      ... on GenericFile { url }
    }
    userErrors { field message }
  }
}
";

const WEBHOOK_SUBSCRIPTION_CREATE_MUTATION: &str = r"
mutation WebhookSubscriptionCreate($topic: WebhookSubscriptionTopic!, $webhookSubscription: WebhookSubscriptionInput!) {
  webhookSubscriptionCreate(topic: $topic, webhookSubscription: $webhookSubscription) {
    webhookSubscription { id topic }
    userErrors { field message }
  }
}
";

// =============================================================================
// Client
// =============================================================================

/// Shopify Admin API GraphQL client.
///
/// Holds the access token; cheaply cloneable via `Arc`. No internal
/// retries - Shopify's webhook redelivery is the only retry mechanism
/// in this system.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    store: String,
    api_version: String,
    access_token: String,
}

/// A staged upload target returned by `stagedUploadsCreate`.
///
/// `parameters` must be sent with the direct upload unmodified and in the
/// order Shopify returned them.
#[derive(Debug, Clone)]
pub struct StagedUploadTarget {
    pub url: String,
    pub resource_url: String,
    pub parameters: Vec<(String, String)>,
}

/// The protection-relevant view of an order from the Admin API.
#[derive(Debug, Clone, Default)]
pub struct OrderProtection {
    pub tags: Vec<String>,
    pub shipping_line_title: Option<String>,
    pub line_item_titles: Vec<String>,
    pub custom_attributes: Vec<(String, String)>,
}

impl OrderProtection {
    /// Whether the order already carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Rebuild the webhook-shaped payload from the Admin API view, so the
    /// backfill classifies orders with exactly the same rules the webhook
    /// handler applies.
    #[must_use]
    pub fn classification_payload(&self) -> OrderPayload {
        OrderPayload {
            shipping_lines: self
                .shipping_line_title
                .iter()
                .map(|title| ShippingLine {
                    title: Some(title.clone()),
                    name: None,
                })
                .collect(),
            line_items: self
                .line_item_titles
                .iter()
                .map(|title| LineItem {
                    title: Some(title.clone()),
                })
                .collect(),
            custom_attributes: self
                .custom_attributes
                .iter()
                .map(|(key, value)| OrderAttribute {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
            ..OrderPayload::default()
        }
    }

    /// Whether the order carries INK Premium Delivery.
    #[must_use]
    pub fn is_premium(&self) -> bool {
        classify::is_premium_protected(&self.classification_payload())
    }
}

/// An order returned by the recent-orders scan.
#[derive(Debug, Clone)]
pub struct RecentOrder {
    pub id: String,
    pub name: String,
    pub protection: OrderProtection,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UserError {
    field: Option<Vec<String>>,
    message: String,
}

/// The shared order-node shape of the protection queries.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    #[serde(default)]
    tags: Vec<String>,
    shipping_line: Option<TitleNode>,
    #[serde(default)]
    line_items: TitleConnection,
    #[serde(default)]
    custom_attributes: Vec<AttributeNode>,
}

#[derive(Debug, Deserialize)]
struct TitleNode {
    title: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TitleConnection {
    #[serde(default)]
    edges: Vec<TitleEdge>,
}

#[derive(Debug, Deserialize)]
struct TitleEdge {
    node: TitleNode,
}

#[derive(Debug, Deserialize)]
struct AttributeNode {
    key: String,
    #[serde(default)]
    value: Option<String>,
}

impl OrderNode {
    fn into_protection(self) -> OrderProtection {
        OrderProtection {
            tags: self.tags,
            shipping_line_title: self.shipping_line.and_then(|l| l.title),
            line_item_titles: self
                .line_items
                .edges
                .into_iter()
                .filter_map(|e| e.node.title)
                .collect(),
            custom_attributes: self
                .custom_attributes
                .into_iter()
                .map(|a| (a.key, a.value.unwrap_or_default()))
                .collect(),
        }
    }
}

fn format_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(|e| {
            let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
            format!("{}: {}", field, e.message)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

impl AdminClient {
    /// Create a new Admin API client.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client: reqwest::Client::new(),
                store: config.store.clone(),
                api_version: config.api_version.clone(),
                access_token: config.access_token.expose_secret().to_string(),
            }),
        }
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    /// Execute a GraphQL document against the Admin API.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AdminShopifyError> {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.store, self.inner.api_version
        );

        let response = self
            .inner
            .client
            .post(&endpoint)
            .header("X-Shopify-Access-Token", &self.inner.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        let raw = response.text().await?;
        let graphql_response: GraphQLResponse<T> = serde_json::from_str(&raw)?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(AdminShopifyError::GraphQL(
                errors.into_iter().map(|e| e.message).collect(),
            ));
        }

        graphql_response
            .data
            .ok_or_else(|| AdminShopifyError::GraphQL(vec!["No data in response".to_string()]))
    }

    // =========================================================================
    // Order annotation
    // =========================================================================

    /// Fetch the protection-relevant fields of an order, including its
    /// current tag set.
    ///
    /// # Errors
    ///
    /// Returns `OrderNotFound` if the order does not exist, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(order_id = %order_gid))]
    pub async fn get_order_protection(
        &self,
        order_gid: &str,
    ) -> Result<OrderProtection, AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            order: Option<OrderNode>,
        }

        let data: Data = self
            .execute(ORDER_PROTECTION_QUERY, json!({ "id": order_gid }))
            .await?;

        let order = data
            .order
            .ok_or_else(|| AdminShopifyError::OrderNotFound(order_gid.to_string()))?;

        Ok(order.into_protection())
    }

    /// Scan the most recent orders, newest first, with the same
    /// protection-relevant fields as [`Self::get_order_protection`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_recent_orders(
        &self,
        first: u32,
    ) -> Result<Vec<RecentOrder>, AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        struct Data {
            orders: OrdersConnection,
        }
        #[derive(Debug, Deserialize)]
        struct OrdersConnection {
            #[serde(default)]
            edges: Vec<OrderEdge>,
        }
        #[derive(Debug, Deserialize)]
        struct OrderEdge {
            node: RecentOrderNode,
        }
        #[derive(Debug, Deserialize)]
        struct RecentOrderNode {
            id: String,
            #[serde(default)]
            name: Option<String>,
            #[serde(flatten)]
            protection: OrderNode,
        }

        let data: Data = self
            .execute(RECENT_ORDERS_QUERY, json!({ "first": first }))
            .await?;

        Ok(data
            .orders
            .edges
            .into_iter()
            .map(|edge| RecentOrder {
                id: edge.node.id,
                name: edge.node.name.unwrap_or_else(|| "Unknown".to_string()),
                protection: edge.node.protection.into_protection(),
            })
            .collect())
    }

    /// Add a tag to an order via `tagsAdd`.
    ///
    /// Shopify treats tag sets as sets, so re-adding an existing tag is
    /// harmless; callers still check first to keep the timeline quiet.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(order_id = %order_gid))]
    pub async fn add_order_tag(
        &self,
        order_gid: &str,
        tag: &str,
    ) -> Result<(), AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            tags_add: Option<Payload>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let data: Data = self
            .execute(
                TAGS_ADD_MUTATION,
                json!({ "id": order_gid, "tags": [tag] }),
            )
            .await?;

        let payload = data
            .tags_add
            .ok_or_else(|| AdminShopifyError::GraphQL(vec!["tagsAdd returned null".to_string()]))?;

        if payload.user_errors.is_empty() {
            Ok(())
        } else {
            Err(AdminShopifyError::UserError(format_user_errors(
                &payload.user_errors,
            )))
        }
    }

    /// Upsert metafields in the `ink` namespace on an order.
    ///
    /// `metafieldsSet` is last-write-wins per key, which is exactly the
    /// idempotence the webhook handlers rely on.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, entries), fields(order_id = %order_gid))]
    pub async fn set_order_metafields(
        &self,
        order_gid: &str,
        entries: &[(&'static str, String)],
    ) -> Result<(), AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            metafields_set: Option<Payload>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            user_errors: Vec<UserError>,
        }

        let metafields: Vec<serde_json::Value> = entries
            .iter()
            .map(|(key, value)| {
                json!({
                    "ownerId": order_gid,
                    "namespace": ink_proof_core::verification::METAFIELD_NAMESPACE,
                    "key": key,
                    "type": "single_line_text_field",
                    "value": value,
                })
            })
            .collect();

        let data: Data = self
            .execute(METAFIELDS_SET_MUTATION, json!({ "metafields": metafields }))
            .await?;

        let payload = data.metafields_set.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec!["metafieldsSet returned null".to_string()])
        })?;

        if payload.user_errors.is_empty() {
            Ok(())
        } else {
            Err(AdminShopifyError::UserError(format_user_errors(
                &payload.user_errors,
            )))
        }
    }

    // =========================================================================
    // File staging
    // =========================================================================

    /// Create a staged upload target for a photo.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, returns user errors, or
    /// yields no target.
    #[instrument(skip(self))]
    pub async fn create_staged_upload(
        &self,
        filename: &str,
        mime_type: &str,
        file_size: usize,
    ) -> Result<StagedUploadTarget, AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            staged_uploads_create: Option<Payload>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            staged_targets: Vec<Target>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Target {
            url: Option<String>,
            resource_url: Option<String>,
            #[serde(default)]
            parameters: Vec<Parameter>,
        }
        #[derive(Debug, Deserialize)]
        struct Parameter {
            name: String,
            value: String,
        }

        let input = json!([{
            "filename": filename,
            "mimeType": mime_type,
            "resource": "IMAGE",
            "fileSize": file_size.to_string(),
            "httpMethod": "POST",
        }]);

        let data: Data = self
            .execute(STAGED_UPLOADS_CREATE_MUTATION, json!({ "input": input }))
            .await?;

        let payload = data.staged_uploads_create.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec!["stagedUploadsCreate returned null".to_string()])
        })?;

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::UserError(format_user_errors(
                &payload.user_errors,
            )));
        }

        let target = payload.staged_targets.into_iter().next().ok_or_else(|| {
            AdminShopifyError::GraphQL(vec!["No staged target in response".to_string()])
        })?;

        Ok(StagedUploadTarget {
            url: target.url.unwrap_or_default(),
            resource_url: target.resource_url.unwrap_or_default(),
            parameters: target
                .parameters
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect(),
        })
    }

    /// Perform the direct multipart upload to a staged target.
    ///
    /// Server-specified parameters are attached unmodified, in the order
    /// given, before the file part.
    ///
    /// # Errors
    ///
    /// Returns `StagedUploadRejected` with the upstream status on a non-2xx
    /// response, or `Http` on a transport failure.
    #[instrument(skip(self, target, bytes), fields(upload_url = %target.url, size = bytes.len()))]
    pub async fn upload_to_staged_target(
        &self,
        target: &StagedUploadTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), AdminShopifyError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &target.parameters {
            form = form.text(name.clone(), value.clone());
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        form = form.part("file", part);

        let response = self
            .inner
            .client
            .post(&target.url)
            .multipart(form)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AdminShopifyError::StagedUploadRejected(
                response.status().as_u16(),
            ))
        }
    }

    /// Register an uploaded resource via `fileCreate`, returning the
    /// durable URL.
    ///
    /// # Errors
    ///
    /// Returns `FileRegistration` if no durable URL comes back, or another
    /// error if the API request fails.
    #[instrument(skip(self))]
    pub async fn register_file(&self, resource_url: &str) -> Result<String, AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            file_create: Option<Payload>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            #[serde(default)]
            files: Vec<FileNode>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Debug, Deserialize)]
        struct FileNode {
            url: Option<String>,
            image: Option<ImageNode>,
        }
        #[derive(Debug, Deserialize)]
        struct ImageNode {
            url: Option<String>,
        }

        let files = json!([{
            "originalSource": resource_url,
            "contentType": "IMAGE",
        }]);

        let data: Data = self
            .execute(FILE_CREATE_MUTATION, json!({ "files": files }))
            .await?;

        let payload = data.file_create.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec!["fileCreate returned null".to_string()])
        })?;

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::FileRegistration(format_user_errors(
                &payload.user_errors,
            )));
        }

        payload
            .files
            .into_iter()
            .find_map(|f| f.image.and_then(|i| i.url).or(f.url))
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AdminShopifyError::FileRegistration("no durable URL in response".to_string())
            })
    }

    // =========================================================================
    // Webhook subscriptions
    // =========================================================================

    /// Register a webhook subscription, returning its GID.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self))]
    pub async fn create_webhook_subscription(
        &self,
        topic: &str,
        callback_url: &str,
    ) -> Result<String, AdminShopifyError> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Data {
            webhook_subscription_create: Option<Payload>,
        }
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            webhook_subscription: Option<Subscription>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Debug, Deserialize)]
        struct Subscription {
            id: String,
        }

        let data: Data = self
            .execute(
                WEBHOOK_SUBSCRIPTION_CREATE_MUTATION,
                json!({
                    "topic": topic,
                    "webhookSubscription": {
                        "callbackUrl": callback_url,
                        "format": "JSON",
                    },
                }),
            )
            .await?;

        let payload = data.webhook_subscription_create.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![
                "webhookSubscriptionCreate returned null".to_string(),
            ])
        })?;

        if !payload.user_errors.is_empty() {
            return Err(AdminShopifyError::UserError(format_user_errors(
                &payload.user_errors,
            )));
        }

        payload
            .webhook_subscription
            .map(|s| s.id)
            .ok_or_else(|| AdminShopifyError::GraphQL(vec!["No subscription in response".to_string()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_protection_has_tag() {
        let order = OrderProtection {
            tags: vec!["VIP".to_string(), "INK-Premium-Delivery".to_string()],
            ..OrderProtection::default()
        };
        assert!(order.has_tag("INK-Premium-Delivery"));
        assert!(!order.has_tag("ink-premium-delivery"));
        assert!(!order.has_tag("Wholesale"));
    }

    #[test]
    fn test_format_user_errors() {
        let errors = vec![
            UserError {
                field: Some(vec!["metafields".to_string(), "0".to_string()]),
                message: "Value is invalid".to_string(),
            },
            UserError {
                field: None,
                message: "Owner not found".to_string(),
            },
        ];
        assert_eq!(
            format_user_errors(&errors),
            "metafields.0: Value is invalid; : Owner not found"
        );
    }

    #[test]
    fn test_premium_shipping_line_classifies_from_admin_view() {
        let order = OrderProtection {
            shipping_line_title: Some("INK Premium Delivery".to_string()),
            ..OrderProtection::default()
        };
        assert!(order.is_premium());

        let standard = OrderProtection {
            shipping_line_title: Some("Standard Delivery".to_string()),
            ..OrderProtection::default()
        };
        assert!(!standard.is_premium());
    }

    #[test]
    fn test_premium_attribute_classifies_from_admin_view() {
        let order = OrderProtection {
            shipping_line_title: Some("Standard Delivery".to_string()),
            custom_attributes: vec![("_ink_delivery_type".to_string(), "premium".to_string())],
            ..OrderProtection::default()
        };
        assert!(order.is_premium());
    }

    #[test]
    fn test_order_node_maps_to_protection() {
        let node: OrderNode = serde_json::from_str(
            r#"{
                "tags": ["VIP"],
                "shippingLine": {"title": "INK Delivery"},
                "lineItems": {"edges": [{"node": {"title": "Ceramic Mug"}}]},
                "customAttributes": [{"key": "gift_note", "value": null}]
            }"#,
        )
        .expect("node deserializes");

        let protection = node.into_protection();
        assert_eq!(protection.tags, vec!["VIP".to_string()]);
        assert_eq!(protection.shipping_line_title.as_deref(), Some("INK Delivery"));
        assert_eq!(protection.line_item_titles, vec!["Ceramic Mug".to_string()]);
        assert_eq!(
            protection.custom_attributes,
            vec![("gift_note".to_string(), String::new())]
        );
        assert!(protection.is_premium());
    }

    #[test]
    fn test_graphql_response_deserializes_errors() {
        let raw = r#"{"data": null, "errors": [{"message": "Throttled"}]}"#;
        let parsed: GraphQLResponse<serde_json::Value> =
            serde_json::from_str(raw).expect("response should deserialize");
        let errors = parsed.errors.expect("errors present");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().map(|e| e.message.as_str()), Some("Throttled"));
    }
}
