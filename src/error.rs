//! Error taxonomy for the checkpoint pipeline.
//!
//! Fatal, per-file errors ([`SyntaxError`], [`PatchConflict`], I/O) abort the
//! file and are folded into [`ManifestError`]. Per-statement failures
//! ([`FetchError`], [`ConflictingDigestError`]) are reported next to the
//! successful edits of the same file and never block them.

use std::ops::Range;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// The manifest could not be parsed. No partial tree is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error at line {line}, column {column}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Fetching or hashing an appcast failed.
///
/// Cloneable so that a single failed URL can be reported against every
/// statement that resolves to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("fetching {url} timed out after {millis}ms")]
    Timeout { url: String, millis: u64 },

    #[error("digest for {url} has {len} characters, expected {expected} lowercase hex")]
    DigestLength {
        url: String,
        len: usize,
        expected: usize,
    },

    #[error("cannot resolve appcast url {url}: {reason}")]
    Unresolved { url: String, reason: String },
}

impl FetchError {
    /// Short machine-friendly name used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::DigestLength { .. } => "digest_length",
            Self::Unresolved { .. } => "unresolved",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Timeout { url, .. }
            | Self::DigestLength { url, .. }
            | Self::Unresolved { url, .. } => url,
        }
    }
}

/// One URL together with the digest its content hashed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlDigest {
    pub url: String,
    pub digest: String,
}

/// A shared appcast statement resolves to several URLs whose content differs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("appcast at line {line}, column {column} resolves to {} urls with different content", .digests.len())]
pub struct ConflictingDigestError {
    pub line: usize,
    pub column: usize,
    pub digests: Vec<UrlDigest>,
}

/// Two planned edits touch the same bytes. Always a bug in the planner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("planned edits overlap: {first:?} and {second:?}")]
pub struct PatchConflict {
    pub first: Range<usize>,
    pub second: Range<usize>,
}

/// Errors that stop a whole file from being processed or written.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Patch(#[from] PatchConflict),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_names_position() {
        let err = SyntaxError::new(3, 7, "unterminated string");
        assert_eq!(
            err.to_string(),
            "syntax error at line 3, column 7: unterminated string"
        );
    }

    #[test]
    fn fetch_error_kinds() {
        let err = FetchError::Status {
            url: "https://example.com/appcast.xml".to_string(),
            status: 404,
        };
        assert_eq!(err.kind(), "status");
        assert_eq!(err.url(), "https://example.com/appcast.xml");
        assert_eq!(
            err.to_string(),
            "https://example.com/appcast.xml responded with HTTP 404"
        );
    }

    #[test]
    fn conflict_counts_urls() {
        let err = ConflictingDigestError {
            line: 12,
            column: 3,
            digests: vec![
                UrlDigest {
                    url: "a".to_string(),
                    digest: "1".to_string(),
                },
                UrlDigest {
                    url: "b".to_string(),
                    digest: "2".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "appcast at line 12, column 3 resolves to 2 urls with different content"
        );
    }
}
