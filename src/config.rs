//! Runtime settings.
//!
//! Configuration is via environment variables, each overridable from the CLI:
//! - `CASK_CHECKPOINT_TIMEOUT_SECS` - per-fetch timeout (default: 30)
//! - `CASK_CHECKPOINT_CONCURRENCY` - concurrent fetches for the whole run (default: 8)
//! - `CASK_CHECKPOINT_MAX_REDIRECTS` - redirects followed per fetch (default: 10)
//! - `CASK_CHECKPOINT_USER_AGENT` - `User-Agent` header (default: `cask-checkpoint/<version>`)
//! - `CASK_CHECKPOINT_ALLOW_INSECURE` - accept plain `http://` feeds (default: false)

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub timeout: Duration,
    pub concurrency: usize,
    pub max_redirects: usize,
    pub user_agent: String,
    pub allow_insecure: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            user_agent: default_user_agent(),
            allow_insecure: false,
        }
    }
}

pub fn default_user_agent() -> String {
    format!("cask-checkpoint/{}", env!("CARGO_PKG_VERSION"))
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let timeout_secs = read_number(&lookup, "CASK_CHECKPOINT_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let concurrency = read_number(&lookup, "CASK_CHECKPOINT_CONCURRENCY", DEFAULT_CONCURRENCY);
        let max_redirects =
            read_number(&lookup, "CASK_CHECKPOINT_MAX_REDIRECTS", DEFAULT_MAX_REDIRECTS);
        let user_agent = lookup("CASK_CHECKPOINT_USER_AGENT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.user_agent);
        let allow_insecure = read_bool(&lookup, "CASK_CHECKPOINT_ALLOW_INSECURE", false);

        Self {
            timeout: Duration::from_secs(timeout_secs),
            concurrency: concurrency.max(1),
            max_redirects,
            user_agent,
            allow_insecure,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Zero is clamped to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }
}

fn read_number<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, default = %default, "invalid number, using default");
            default
        }
    }
}

fn read_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => {
            warn!(key, value = %raw, default, "invalid boolean, using default");
            default
        }
    }
}
