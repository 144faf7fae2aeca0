//! Webhook HMAC-SHA256 signature verification.
//!
//! Two digest encodings are in play: Shopify sends webhook signatures as
//! base64 in `X-Shopify-Hmac-SHA256`, while the NFS backend signs with a
//! lowercase hex digest. Both verify the MAC over the exact raw request
//! body bytes - never a re-serialized payload.
//!
//! Comparison goes through [`Mac::verify_slice`], which is constant-time,
//! so a mismatching signature leaks nothing about the shared secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

type HmacSha256 = Hmac<Sha256>;

/// Verify a base64-encoded HMAC-SHA256 signature (Shopify webhooks).
///
/// Returns false for an empty secret, an undecodable signature, or a
/// digest mismatch. Never panics.
#[must_use]
pub fn verify_base64(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(provided) = BASE64.decode(signature) else {
        return false;
    };
    verify_raw(secret, body, &provided)
}

/// Verify a hex-encoded HMAC-SHA256 signature (NFS backend webhooks).
///
/// Returns false for an empty secret, an undecodable signature, or a
/// digest mismatch. Never panics.
#[must_use]
pub fn verify_hex(secret: &[u8], body: &[u8], signature: &str) -> bool {
    let Ok(provided) = hex::decode(signature) else {
        return false;
    };
    verify_raw(secret, body, &provided)
}

/// Constant-time comparison of the computed MAC against the provided bytes.
fn verify_raw(secret: &[u8], body: &[u8], provided: &[u8]) -> bool {
    if secret.is_empty() {
        // Fail closed: an unset secret must never pass verification.
        return false;
    }
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(provided).is_ok()
}
