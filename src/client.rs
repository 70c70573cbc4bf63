//! Fetching appcasts and hashing their content.
//!
//! [`CheckpointClient`] is the seam between the pipeline and the network.
//! [`HttpCheckpointClient`] is the production implementation;
//! [`MemoryCheckpointClient`] serves canned responses for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client};
use sha2::{Digest as _, Sha256};

use crate::config::Settings;
use crate::error::FetchError;

/// Length of a lowercase hex SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// A validated lowercase hex SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(String);

impl Digest {
    /// Hash of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Validates a digest returned by a client. Wrong length or non-hex
    /// characters are a [`FetchError::DigestLength`]; nothing is padded or cut.
    pub fn from_hex(url: &str, hex: &str) -> Result<Self, FetchError> {
        let valid = hex.len() == DIGEST_HEX_LEN
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(FetchError::DigestLength {
                url: url.to_string(),
                len: hex.len(),
                expected: DIGEST_HEX_LEN,
            });
        }
        Ok(Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait CheckpointClient: Send + Sync {
    /// Retrieves `url` and returns the lowercase hex digest of its body.
    /// Never retries; the caller decides.
    async fn fetch_and_hash(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTPS client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpCheckpointClient {
    client: Client,
    timeout: Duration,
    allow_insecure: bool,
}

impl HttpCheckpointClient {
    /// Create with explicit configuration.
    pub fn new(settings: &Settings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(redirect::Policy::limited(settings.max_redirects))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            timeout: settings.timeout,
            allow_insecure: settings.allow_insecure,
        })
    }

    fn check_scheme(&self, url: &str) -> Result<(), FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|err| FetchError::Transport {
            url: url.to_string(),
            message: format!("invalid url: {}", err),
        })?;
        match parsed.scheme() {
            "https" => Ok(()),
            "http" if self.allow_insecure => Ok(()),
            scheme => Err(FetchError::Transport {
                url: url.to_string(),
                message: format!("refusing insecure scheme `{}`", scheme),
            }),
        }
    }

    /// Convert a `reqwest` failure into a [`FetchError`].
    fn map_error(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                millis: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl CheckpointClient for HttpCheckpointClient {
    async fn fetch_and_hash(&self, url: &str) -> Result<String, FetchError> {
        self.check_scheme(url)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.map_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.map_error(url, err))?;
        Ok(Digest::of(&body).0)
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Digest(String),
    Error(FetchError),
}

/// In-memory client. Unknown URLs answer with HTTP 404.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointClient {
    responses: HashMap<String, Canned>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MemoryCheckpointClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body`, hashed like a real response.
    pub fn with_body(self, url: impl Into<String>, body: impl AsRef<[u8]>) -> Self {
        let digest = Digest::of(body.as_ref()).0;
        self.with_digest(url, digest)
    }

    /// Return `digest` verbatim, without validation.
    pub fn with_digest(mut self, url: impl Into<String>, digest: impl Into<String>) -> Self {
        self.responses
            .insert(url.into(), Canned::Digest(digest.into()));
        self
    }

    pub fn with_error(mut self, url: impl Into<String>, error: FetchError) -> Self {
        self.responses.insert(url.into(), Canned::Error(error));
        self
    }

    /// Sleep before answering `url`.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CheckpointClient for MemoryCheckpointClient {
    async fn fetch_and_hash(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        match self.responses.get(url) {
            Some(Canned::Digest(digest)) => Ok(digest.clone()),
            Some(Canned::Error(err)) => Err(err.clone()),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
