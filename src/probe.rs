//! Best-effort HTTP byte-size probe.
//!
//! Driver implementations that lack a network tap can delegate their
//! `fetch_resource_size` to this helper: a `HEAD` request first, falling
//! back to a one-byte ranged `GET` for servers that omit Content-Length
//! on `HEAD`. Every failure mode answers `None`.

use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use tracing::debug;

/// HTTP resource-size lookup helper.
pub struct HttpSizeProbe {
    client: reqwest::Client,
}

impl HttpSizeProbe {
    /// Build a probe with a per-request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Reuse an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve the byte size of one resource, best-effort.
    pub async fn content_length(&self, url: &str) -> Option<u64> {
        match self.head_length(url).await {
            Some(size) => Some(size),
            None => self.range_length(url).await,
        }
    }

    async fn head_length(&self, url: &str) -> Option<u64> {
        let response = self.client.head(url).send().await.ok()?;
        if !response.status().is_success() {
            debug!(%url, status = %response.status(), "HEAD probe refused");
            return None;
        }
        response
            .headers()
            .get(CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }

    async fn range_length(&self, url: &str) -> Option<u64> {
        let response = self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .ok()?;
        // Content-Range: bytes 0-0/12345
        response
            .headers()
            .get(CONTENT_RANGE)?
            .to_str()
            .ok()?
            .rsplit('/')
            .next()?
            .parse()
            .ok()
    }
}
