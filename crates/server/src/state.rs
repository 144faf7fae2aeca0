//! Application state shared across handlers.
//!
//! There is deliberately no mutable state here: every request is an
//! independent unit of work, and the only shared resources are the two
//! outbound HTTP clients and the configuration.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::nfs::NfsClient;
use crate::shopify::AdminClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    shopify: AdminClient,
    nfs: NfsClient,
}

impl AppState {
    /// Create a new application state from configuration.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let shopify = AdminClient::new(&config.shopify);
        let nfs = NfsClient::new(&config.nfs);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                shopify,
                nfs,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the Shopify Admin API client.
    #[must_use]
    pub fn shopify(&self) -> &AdminClient {
        &self.inner.shopify
    }

    /// Get a reference to the NFS backend client.
    #[must_use]
    pub fn nfs(&self) -> &NfsClient {
        &self.inner.nfs
    }
}
