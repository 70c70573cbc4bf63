//! Decides, per located appcast, whether to insert, update or leave the
//! checkpoint alone, and produces the matching text edits.
//!
//! Planning is a pure function of the source, the located feeds and the
//! already collected fetch results.

use serde::Serialize;
use tracing::debug;

use crate::client::Digest;
use crate::error::{ConflictingDigestError, FetchError, UrlDigest};
use crate::fetch::FetchResults;
use crate::locator::{LocatedFeed, UrlResolution};
use crate::manifest::{LineIndex, Position, Span, StatementId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Insert,
    Update,
}

/// A replacement of `span` in the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub span: Span,
    pub replacement: String,
    pub statement: StatementId,
    /// Where the affected statement starts.
    pub position: Position,
    pub old: Option<String>,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Insert,
    Update,
    Unchanged,
    Failed(FetchError),
    Conflict(ConflictingDigestError),
}

impl Action {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::Conflict(_))
    }
}

/// Outcome for one located appcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFeed {
    pub statement: StatementId,
    pub position: Position,
    pub urls: Vec<String>,
    pub contexts: Vec<String>,
    pub previous: Option<String>,
    pub current: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub feeds: Vec<PlannedFeed>,
    pub edits: Vec<Edit>,
}

impl Plan {
    pub fn has_failures(&self) -> bool {
        self.feeds.iter().any(|f| f.action.is_failure())
    }
}

pub fn plan(source: &str, feeds: &[LocatedFeed<'_>], results: &FetchResults) -> Plan {
    let index = LineIndex::new(source);
    let mut out = Plan::default();
    for feed in feeds {
        let statement = feed.statement;
        let previous = feed.existing_digest().map(str::to_string);
        let urls: Vec<String> = feed.urls().into_iter().map(str::to_string).collect();
        let (action, current) = decide(feed, results);

        let edit = match (&action, &current) {
            (Action::Insert, Some(digest)) => insert_edit(source, &index, feed, digest),
            (Action::Update, Some(digest)) => update_edit(feed, digest),
            _ => None,
        };
        if let Some(edit) = edit {
            debug!(
                line = statement.start.line,
                kind = ?edit.kind,
                digest = %edit.new,
                "planned checkpoint edit"
            );
            out.edits.push(edit);
        }

        out.feeds.push(PlannedFeed {
            statement: statement.id,
            position: statement.start,
            urls,
            contexts: feed.resolutions.iter().map(|r| r.label.clone()).collect(),
            previous,
            current: current.map(|d| d.as_str().to_string()),
            action,
        });
    }
    out
}

fn decide(feed: &LocatedFeed<'_>, results: &FetchResults) -> (Action, Option<Digest>) {
    for resolution in &feed.resolutions {
        if let UrlResolution::Unresolved { template, reason } = &resolution.url {
            let err = FetchError::Unresolved {
                url: template.clone(),
                reason: reason.clone(),
            };
            return (Action::Failed(err), None);
        }
    }

    let mut fetched: Vec<(&str, &Digest)> = Vec::new();
    for url in feed.urls() {
        match results.get(url) {
            Some(Ok(digest)) => fetched.push((url, digest)),
            Some(Err(err)) => return (Action::Failed(err.clone()), None),
            None => {
                let err = FetchError::Unresolved {
                    url: url.to_string(),
                    reason: "no fetch result".to_string(),
                };
                return (Action::Failed(err), None);
            }
        }
    }

    let Some((_, first)) = fetched.first() else {
        let err = FetchError::Unresolved {
            url: feed.statement.raw.clone(),
            reason: "appcast resolves to no url".to_string(),
        };
        return (Action::Failed(err), None);
    };
    let first = (*first).clone();
    if fetched.iter().any(|(_, digest)| **digest != first) {
        let conflict = ConflictingDigestError {
            line: feed.statement.start.line,
            column: feed.statement.start.column,
            digests: fetched
                .iter()
                .map(|(url, digest)| UrlDigest {
                    url: url.to_string(),
                    digest: digest.as_str().to_string(),
                })
                .collect(),
        };
        return (Action::Conflict(conflict), None);
    }

    let action = match (&feed.checkpoint, feed.existing_digest()) {
        (None, _) => Action::Insert,
        (Some(_), Some(existing)) if existing == first.as_str() => Action::Unchanged,
        (Some(_), _) => Action::Update,
    };
    (action, Some(first))
}

/// `,\n<indent>checkpoint: '<digest>'` right after the last argument, with
/// `<indent>` aligning under the first argument. The line break follows the
/// one ending the last argument's line.
fn insert_edit(
    source: &str,
    index: &LineIndex<'_>,
    feed: &LocatedFeed<'_>,
    digest: &Digest,
) -> Option<Edit> {
    let statement = feed.statement;
    let first = statement.first_argument()?;
    let last = statement.last_argument()?;
    let line_start = index.line_start(first.start);
    let indent: String = source
        .get(line_start..first.start)?
        .chars()
        .filter(|c| *c != '\u{feff}')
        .map(|c| if c == '\t' { '\t' } else { ' ' })
        .collect();
    Some(Edit {
        kind: EditKind::Insert,
        span: Span::empty_at(last.end),
        replacement: format!(
            ",{}{}checkpoint: '{}'",
            line_ending(source, last.end),
            indent,
            digest
        ),
        statement: statement.id,
        position: statement.start,
        old: None,
        new: digest.as_str().to_string(),
    })
}

fn line_ending(source: &str, offset: usize) -> &'static str {
    let crlf = match source.get(offset..).and_then(|rest| rest.find('\n')) {
        Some(at) => source[..offset + at].ends_with('\r'),
        None => source.contains("\r\n"),
    };
    if crlf {
        "\r\n"
    } else {
        "\n"
    }
}

/// Replaces the text between the quotes. A non-literal value is replaced
/// whole by a single-quoted literal.
fn update_edit(feed: &LocatedFeed<'_>, digest: &Digest) -> Option<Edit> {
    let checkpoint = feed.checkpoint.as_ref()?;
    let (span, replacement) = match checkpoint.content_span {
        Some(content) => (content, digest.as_str().to_string()),
        None => (checkpoint.span, format!("'{}'", digest)),
    };
    Some(Edit {
        kind: EditKind::Update,
        span,
        replacement,
        statement: feed.statement.id,
        position: feed.statement.start,
        old: checkpoint.value.clone(),
        new: digest.as_str().to_string(),
    })
}
