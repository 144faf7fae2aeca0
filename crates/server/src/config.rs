//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SHOPIFY_STORE` - Shop domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ACCESS_TOKEN` - Admin API access token
//! - `WEBHOOK_SHARED_SECRET` - Manual webhook HMAC secret from Shopify admin
//! - `NFS_HMAC_SECRET` - Shared secret for the NFS backend's signatures
//! - `INK_BASE_URL` - Public base URL of this service (webhook callbacks)
//!
//! ## Optional
//! - `INK_HOST` - Bind address (default: 127.0.0.1)
//! - `INK_PORT` - Listen port (default: 3000)
//! - `SHOPIFY_API_VERSION` - Admin API version (default: 2024-10)
//! - `NFS_API_URL` - NFS backend base URL (default: hosted backend)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! Every verification path fails closed: a missing secret refuses startup
//! rather than silently skipping signature checks.

use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Default NFS backend endpoint.
const DEFAULT_NFS_API_URL: &str = "https://us-central1-inink-c76d3.cloudfunctions.net/api";

/// Blocklist of common placeholder patterns (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
];

/// Minimum length for shared secrets.
const MIN_SECRET_LENGTH: usize = 16;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this service (used for webhook callback URLs)
    pub base_url: String,
    /// Shopify Admin API configuration
    pub shopify: ShopifyConfig,
    /// Secret for verifying manually registered Shopify webhooks
    pub webhook_secret: SecretString,
    /// NFS verification backend configuration
    pub nfs: NfsConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shop domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Admin API version (e.g., 2024-10)
    pub api_version: String,
    /// Admin API access token
    pub access_token: SecretString,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// NFS verification backend configuration.
#[derive(Clone)]
pub struct NfsConfig {
    /// Base URL of the NFS backend API
    pub api_url: String,
    /// Shared secret for HMAC signatures on NFS-facing requests
    pub hmac_secret: SecretString,
}

impl std::fmt::Debug for NfsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfsConfig")
            .field("api_url", &self.api_url)
            .field("hmac_secret", &"[REDACTED]")
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, minimum length).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("INK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("INK_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("INK_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("INK_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("INK_BASE_URL")?;

        let shopify = ShopifyConfig::from_env()?;
        let webhook_secret = get_validated_secret("WEBHOOK_SHARED_SECRET")?;
        let nfs = NfsConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            shopify,
            webhook_secret,
            nfs,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", "2024-10"),
            access_token: get_validated_secret("SHOPIFY_ACCESS_TOKEN")?,
        })
    }
}

impl NfsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: get_env_or_default("NFS_API_URL", DEFAULT_NFS_API_URL),
            hmac_secret: get_validated_secret("NFS_HMAC_SECRET")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret is not an obvious placeholder and is long enough.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    if secret.len() < MIN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SECRET_LENGTH} characters (got {})",
                secret.len()
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Expose a secret as bytes for HMAC use.
#[must_use]
pub fn secret_bytes(secret: &SecretString) -> &[u8] {
    secret.expose_secret().as_bytes()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-webhook-secret-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_too_short() {
        let result = validate_secret_strength("abc123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result =
            validate_secret_strength("054f24e3c411a8aa92b94aa244127309afe56a89", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            shopify: ShopifyConfig {
                store: "test.myshopify.com".to_string(),
                api_version: "2024-10".to_string(),
                access_token: SecretString::from("shpat_0123456789abcdef"),
            },
            webhook_secret: SecretString::from("054f24e3c411a8aa92b94aa244127309"),
            nfs: NfsConfig {
                api_url: DEFAULT_NFS_API_URL.to_string(),
                hmac_secret: SecretString::from("9b1f04c2a6de483159f7e2cc01aa77dd"),
            },
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let shopify = ShopifyConfig {
            store: "test.myshopify.com".to_string(),
            api_version: "2024-10".to_string(),
            access_token: SecretString::from("shpat_super_secret_token"),
        };
        let nfs = NfsConfig {
            api_url: "https://nfs.example.net/api".to_string(),
            hmac_secret: SecretString::from("nfs_super_secret_value"),
        };

        let debug_output = format!("{shopify:?} {nfs:?}");
        assert!(debug_output.contains("test.myshopify.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("shpat_super_secret_token"));
        assert!(!debug_output.contains("nfs_super_secret_value"));
    }
}
