//! Tile transport.
//!
//! The [`TileFetcher`] trait is the network seam of the pipeline: it turns a
//! tile URL into raw encoded bytes. The production implementation is a thin
//! reqwest wrapper. No retries happen here; a failed fetch is surfaced to
//! the caller, and timeout policy belongs to the fetcher configuration.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Default per-request timeout for tile downloads.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent to tile servers; OSM's usage policy requires an
/// identifying agent.
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Trait for fetching tile bytes from a remote provider.
///
/// Implementations must be thread-safe; a single fetcher is shared across
/// the concurrent tile downloads of one render.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the resource at `url` and return its body.
    ///
    /// Returns an error for transport failures and non-success statuses.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP tile fetcher backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpTileFetcher {
    client: reqwest::Client,
}

impl HttpTileFetcher {
    /// Create a fetcher with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a fetcher with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for HttpTileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TileFetcher for HttpTileFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}
