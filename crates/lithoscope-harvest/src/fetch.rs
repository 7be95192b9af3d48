//! File content retrieval with bounded retries.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};

use lithoscope_common::config::HarvestConfig;
use lithoscope_common::{HarvestError, Result};

/// Fetches one file's content by URL. Trait so the write path can run
/// against canned content in tests.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// HEAD to resolve redirects, then GET, retried a bounded number of times
/// with a fixed sleep in between. Exhaustion abandons the whole record's
/// file step; nothing is left half-populated.
pub struct HttpFileFetcher {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpFileFetcher {
    pub fn new(max_retries: u32, backoff: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;
        Ok(Self { client, max_retries, backoff })
    }

    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        Self::new(
            config.file_fetch_max_retries,
            Duration::from_secs(config.file_fetch_backoff_secs),
        )
    }

    async fn attempt(&self, url: &str) -> Result<Bytes> {
        let head = self.client.head(url).send().await?;
        let resolved = head.url().clone();
        debug!(url = %resolved, "fetching file content");

        let response = self.client.get(resolved).send().await?;
        if !response.status().is_success() {
            return Err(HarvestError::File(format!(
                "file request failed with status {} for {url}",
                response.status()
            )));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl FileFetcher for HttpFileFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        for attempt in 1..=self.max_retries {
            match self.attempt(url).await {
                Ok(content) => return Ok(content),
                Err(err) => {
                    warn!(attempt, max = self.max_retries, %err, url, "file fetch failed");
                    if attempt < self.max_retries {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }
        Err(HarvestError::File(format!(
            "file fetch exhausted {} retries for {url}",
            self.max_retries
        )))
    }
}
