//! NFS proof-of-delivery backend client.
//!
//! The NFS backend owns enrollment records and proof records; this service
//! only constructs and submits enrollments and relays proof reads. No retry
//! or backoff here - the caller owns retry policy.
//!
//! The backend's error format is not guaranteed, so non-2xx bodies are
//! captured verbatim and JSON-parsed opportunistically for structured
//! detail. That detail ends up in operator-facing error messages, which is
//! the main debugging aid when enrollments are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::NfsConfig;

/// Errors from the NFS backend client.
#[derive(Debug, Error)]
pub enum NfsError {
    /// Transport-level failure (no response).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend returned a non-2xx response.
    #[error("NFS error: {status} - {detail}")]
    Api { status: u16, detail: String },

    /// Failed to parse a successful response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The enrollment payload is internally inconsistent.
    #[error("Invalid enrollment: {0}")]
    InvalidEnrollment(String),
}

/// GPS coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub lat: f64,
    pub lng: f64,
}

/// Package enrollment document submitted to `POST /enroll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollRequest {
    pub order_id: String,
    pub nfc_uid: String,
    pub nfc_token: String,
    pub photo_urls: Vec<String>,
    pub photo_hashes: Vec<String>,
    pub shipping_address_gps: Gps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone_last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_gps: Option<Gps>,
}

impl EnrollRequest {
    /// Check the payload invariants before submission.
    ///
    /// Photo URLs and hashes must be non-empty, equal-length, and ordered
    /// correspondingly; the identity fields must be present.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnrollment` describing the first violated invariant.
    pub fn validate(&self) -> Result<(), NfsError> {
        if self.order_id.is_empty() {
            return Err(NfsError::InvalidEnrollment("order_id is empty".to_string()));
        }
        if self.nfc_uid.is_empty() || self.nfc_token.is_empty() {
            return Err(NfsError::InvalidEnrollment(
                "nfc_uid and nfc_token are required".to_string(),
            ));
        }
        if self.photo_urls.is_empty() {
            return Err(NfsError::InvalidEnrollment(
                "at least one photo is required".to_string(),
            ));
        }
        if self.photo_urls.len() != self.photo_hashes.len() {
            return Err(NfsError::InvalidEnrollment(format!(
                "photo_urls ({}) and photo_hashes ({}) must have equal length",
                self.photo_urls.len(),
                self.photo_hashes.len()
            )));
        }
        Ok(())
    }
}

/// Successful enrollment response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollResponse {
    pub proof_id: String,
    pub enrollment_status: String,
    pub key_id: String,
}

/// An upstream response relayed verbatim by the retrieve proxy.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    /// Whether the upstream call succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// NFS backend HTTP client.
#[derive(Clone)]
pub struct NfsClient {
    client: reqwest::Client,
    api_url: String,
}

impl NfsClient {
    /// Create a new NFS backend client.
    #[must_use]
    pub fn new(config: &NfsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Enroll a package with the NFS backend.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEnrollment` before any network call if the payload
    /// is inconsistent; `Api` with the upstream's own error detail on a
    /// non-2xx response; `Http` on transport failure.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn enroll(&self, request: &EnrollRequest) -> Result<EnrollResponse, NfsError> {
        request.validate()?;

        let url = format!("{}/enroll", self.api_url);
        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            // Prefer the backend's structured detail when the body is JSON.
            let detail = serde_json::from_str::<serde_json::Value>(&raw)
                .map_or(raw.clone(), |v| v.to_string());
            tracing::error!(status = status.as_u16(), %detail, "NFS enrollment rejected");
            return Err(NfsError::Api {
                status: status.as_u16(),
                detail,
            });
        }

        let enrolled: EnrollResponse = response
            .json()
            .await
            .map_err(|e| NfsError::Parse(e.to_string()))?;
        tracing::info!(proof_id = %enrolled.proof_id, "NFS enrollment succeeded");
        Ok(enrolled)
    }

    /// Read-through proof retrieval: GET `/retrieve/{proof_id}`, returning
    /// the upstream status and body verbatim for the proxy to relay.
    ///
    /// # Errors
    ///
    /// Returns `Http` only on transport failure; upstream non-2xx responses
    /// are returned as data, not errors, because the proxy relays them.
    #[instrument(skip(self))]
    pub async fn retrieve_raw(&self, proof_id: &str) -> Result<UpstreamResponse, NfsError> {
        let url = format!("{}/retrieve/{proof_id}", self.api_url);
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(UpstreamResponse { status, body })
    }
}
