//! Bounded concurrent fetching.
//!
//! All URLs of a run share one semaphore, so the bound holds across files.
//! Results are gathered into an immutable map before any planning happens.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::client::{CheckpointClient, Digest};
use crate::config::Settings;
use crate::error::FetchError;

/// Fetch outcome per URL.
pub type FetchResults = BTreeMap<String, Result<Digest, FetchError>>;

#[derive(Clone)]
pub struct FetchPool {
    client: Arc<dyn CheckpointClient>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl FetchPool {
    pub fn new(client: Arc<dyn CheckpointClient>, settings: &Settings) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(settings.concurrency.max(1))),
            timeout: settings.timeout,
        }
    }

    /// Fetches every distinct URL once. A slow or failing URL never blocks
    /// its siblings beyond the shared concurrency bound.
    pub async fn fetch_all<I, S>(&self, urls: I) -> FetchResults
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unique: BTreeSet<String> = urls.into_iter().map(Into::into).collect();
        let fetches = unique.into_iter().map(|url| async move {
            let result = self.fetch_one(&url).await;
            (url, result)
        });
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_one(&self, url: &str) -> Result<Digest, FetchError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| FetchError::Transport {
                url: url.to_string(),
                message: "fetch pool closed".to_string(),
            })?;

        let result = match tokio::time::timeout(self.timeout, self.client.fetch_and_hash(url)).await
        {
            Ok(Ok(hex)) => Digest::from_hex(url, &hex),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                millis: self.timeout.as_millis() as u64,
            }),
        };
        match &result {
            Ok(digest) => debug!(url, digest = %digest, "fetched appcast"),
            Err(err) => debug!(url, kind = err.kind(), error = %err, "appcast fetch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryCheckpointClient;

    fn pool(client: MemoryCheckpointClient, timeout: Duration) -> FetchPool {
        FetchPool::new(
            Arc::new(client),
            &Settings::default().with_timeout(timeout).with_concurrency(2),
        )
    }

    #[tokio::test]
    async fn duplicates_are_fetched_once() {
        let client = MemoryCheckpointClient::new().with_body("https://e.com/a", "a");
        let pool = pool(client.clone(), Duration::from_secs(5));
        let results = pool
            .fetch_all(["https://e.com/a", "https://e.com/a"])
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(client.calls().len(), 1);
        assert_eq!(results["https://e.com/a"], Ok(Digest::of(b"a")));
    }

    #[tokio::test]
    async fn timeout_does_not_block_siblings() {
        let client = MemoryCheckpointClient::new()
            .with_body("https://e.com/slow", "s")
            .with_delay("https://e.com/slow", Duration::from_secs(5))
            .with_body("https://e.com/fast", "f");
        let results = pool(client, Duration::from_millis(50))
            .fetch_all(["https://e.com/slow", "https://e.com/fast"])
            .await;
        assert_eq!(
            results["https://e.com/slow"],
            Err(FetchError::Timeout {
                url: "https://e.com/slow".to_string(),
                millis: 50,
            })
        );
        assert!(results["https://e.com/fast"].is_ok());
    }

    #[tokio::test]
    async fn malformed_digest_is_an_error() {
        let client = MemoryCheckpointClient::new().with_digest("https://e.com/a", "abc123");
        let results = pool(client, Duration::from_secs(5))
            .fetch_all(["https://e.com/a"])
            .await;
        assert!(matches!(
            &results["https://e.com/a"],
            Err(FetchError::DigestLength { len: 6, .. })
        ));
    }
}
