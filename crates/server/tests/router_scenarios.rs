//! Router-level scenarios that terminate before any remote call.
//!
//! These drive the real router in-process with `tower::ServiceExt::oneshot`.
//! Every scenario here must resolve locally (authentication rejection,
//! classification skip, validation failure), so no Shopify store or NFS
//! backend is needed.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tower::ServiceExt;

use ink_proof_server::config::{NfsConfig, ServerConfig, ShopifyConfig};
use ink_proof_server::state::AppState;

const WEBHOOK_SECRET: &str = "054f24e3c411a8aa92b94aa244127309";
const NFS_SECRET: &str = "9b1f04c2a6de483159f7e2cc01aa77dd";

fn test_app() -> Router {
    let config = ServerConfig {
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        shopify: ShopifyConfig {
            store: "test-store.myshopify.com".to_string(),
            api_version: "2024-10".to_string(),
            access_token: SecretString::from("shpat_0123456789abcdef"),
        },
        webhook_secret: SecretString::from(WEBHOOK_SECRET),
        nfs: NfsConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            hmac_secret: SecretString::from(NFS_SECRET),
        },
        sentry_dsn: None,
        sentry_environment: None,
    };
    ink_proof_server::app(AppState::new(config))
}

fn sign_base64(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

fn sign_hex(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn webhook_request(path: &str, body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("X-Shopify-Hmac-SHA256", signature)
        .header("X-Shopify-Shop-Domain", "test-store.myshopify.com")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    String::from_utf8(bytes.to_vec()).expect("body is utf-8")
}

#[tokio::test]
async fn health_returns_ok() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn webhook_with_invalid_signature_is_rejected() {
    let body = r#"{"admin_graphql_api_id":"gid://shopify/Order/1","shipping_lines":[{"title":"INK Premium Delivery"}]}"#;

    let response = test_app()
        .oneshot(webhook_request(
            "/webhooks/orders/create",
            body,
            "definitely-not-a-signature",
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_with_tampered_body_is_rejected() {
    let body = r#"{"admin_graphql_api_id":"gid://shopify/Order/1"}"#;
    let signature = sign_base64(WEBHOOK_SECRET, body.as_bytes());
    let tampered = r#"{"admin_graphql_api_id":"gid://shopify/Order/2"}"#;

    let response = test_app()
        .oneshot(webhook_request(
            "/webhooks/orders/create",
            tampered,
            &signature,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signature_header_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/fulfillments/update")
        .body(Body::from("{}"))
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn standard_delivery_order_is_acknowledged_without_writes() {
    let body = r##"{
        "admin_graphql_api_id": "gid://shopify/Order/1001",
        "name": "#1001",
        "shipping_lines": [{"title": "Standard Delivery"}]
    }"##;
    let signature = sign_base64(WEBHOOK_SECRET, body.as_bytes());

    let response = test_app()
        .oneshot(webhook_request("/webhooks/orders/create", body, &signature))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok - standard delivery");
}

#[tokio::test]
async fn hex_encoded_webhook_signature_is_accepted() {
    // Standard-delivery payload so the handler stops before any remote call.
    let body = r#"{"admin_graphql_api_id":"gid://shopify/Order/7","shipping_lines":[]}"#;
    let signature = sign_hex(WEBHOOK_SECRET, body.as_bytes());

    let response = test_app()
        .oneshot(webhook_request("/webhooks/orders/create", body, &signature))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok - standard delivery");
}

#[tokio::test]
async fn order_webhook_without_order_id_is_a_bad_request() {
    let body = r#"{"shipping_lines": [{"title": "INK Premium Delivery"}]}"#;
    let signature = sign_base64(WEBHOOK_SECRET, body.as_bytes());

    let response = test_app()
        .oneshot(webhook_request("/webhooks/orders/create", body, &signature))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("Missing order"));
}

#[tokio::test]
async fn fulfillment_webhook_without_order_reference_is_a_bad_request() {
    let body = r#"{"status": "success"}"#;
    let signature = sign_base64(WEBHOOK_SECRET, body.as_bytes());

    let response = test_app()
        .oneshot(webhook_request(
            "/webhooks/fulfillments/create",
            body,
            &signature,
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_without_photo_is_a_bad_request() {
    let boundary = "test-boundary";
    let form_body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"orderId\"\r\n\r\n1001\r\n--{boundary}--\r\n"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/photos/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(form_body))
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("Missing photo or orderId"), "body: {body}");
}

#[tokio::test]
async fn enroll_without_signature_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/enroll")
        .header("Content-Type", "application/json")
        .body(Body::from("{}"))
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enroll_with_mismatched_photo_arrays_is_a_bad_request() {
    let body = r#"{
        "order_id": "450789469",
        "nfc_uid": "04:A1:B2:C3",
        "nfc_token": "tok_123",
        "photo_urls": ["https://cdn.example.net/p0.jpg", "https://cdn.example.net/p1.jpg"],
        "photo_hashes": ["aa11"],
        "shipping_address_gps": {"lat": 51.5, "lng": -0.1}
    }"#;
    let signature = sign_hex(NFS_SECRET, body.as_bytes());

    let request = Request::builder()
        .method("POST")
        .uri("/api/enroll")
        .header("Content-Type", "application/json")
        .header("X-Nfs-Signature", signature)
        .body(Body::from(body.to_string()))
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert!(body.contains("equal length"), "body: {body}");
}

#[tokio::test]
async fn api_error_responses_carry_cors_headers() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/enroll")
        .header("Origin", "https://courier.example.net")
        .body(Body::from("{}"))
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn api_preflight_is_answered() {
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/photos/upload")
        .header("Origin", "https://courier.example.net")
        .header("Access-Control-Request-Method", "POST")
        .body(Body::empty())
        .expect("request builds");

    let response = test_app().oneshot(request).await.expect("router responds");

    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
