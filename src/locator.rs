//! Finds the appcast statements reachable from each context.
//!
//! A statement shared by several contexts (a global appcast) is emitted once,
//! with one [`Resolution`] per reaching context.

use std::collections::BTreeMap;

use crate::manifest::{Quote, Span, Statement, StatementId, ValueKind};
use crate::resolver::Context;
use crate::version::interpolate;

/// The `checkpoint:` argument already present on a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingCheckpoint {
    /// Whole value, quotes included.
    pub span: Span,
    /// Text between the quotes. `None` when the value is not a string literal.
    pub content_span: Option<Span>,
    /// Stored digest, when written as a string literal.
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResolution {
    Resolved(String),
    Unresolved { template: String, reason: String },
}

impl UrlResolution {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Resolved(url) => Some(url),
            Self::Unresolved { .. } => None,
        }
    }
}

/// The URL one context resolves for a located statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub context: usize,
    pub label: String,
    pub url: UrlResolution,
}

#[derive(Debug, Clone)]
pub struct LocatedFeed<'a> {
    pub statement: &'a Statement,
    /// From the first to the last named argument, if there are any.
    pub named_span: Option<Span>,
    pub checkpoint: Option<ExistingCheckpoint>,
    pub resolutions: Vec<Resolution>,
}

impl LocatedFeed<'_> {
    /// Distinct resolved URLs, in order of first appearance.
    pub fn urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for url in self.resolutions.iter().filter_map(|r| r.url.url()) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    pub fn existing_digest(&self) -> Option<&str> {
        self.checkpoint.as_ref().and_then(|c| c.value.as_deref())
    }
}

/// Locates every unique appcast statement, in document order.
/// Contexts without an appcast are skipped.
pub fn locate<'a>(contexts: &[Context<'a>]) -> Vec<LocatedFeed<'a>> {
    let mut located: BTreeMap<StatementId, LocatedFeed<'a>> = BTreeMap::new();
    for context in contexts {
        let Some(statement) = context.feed else {
            continue;
        };
        let entry = located
            .entry(statement.id)
            .or_insert_with(|| LocatedFeed {
                statement,
                named_span: statement.named_span(),
                checkpoint: existing_checkpoint(statement),
                resolutions: Vec::new(),
            });
        entry.resolutions.push(Resolution {
            context: context.index,
            label: context.label(),
            url: resolve_url(statement, context),
        });
    }
    located.into_values().collect()
}

fn existing_checkpoint(statement: &Statement) -> Option<ExistingCheckpoint> {
    let arg = statement.named("checkpoint")?;
    let (content_span, value) = match &arg.value.kind {
        ValueKind::Str {
            content,
            content_span,
            ..
        } => (Some(*content_span), Some(content.clone())),
        _ => (None, None),
    };
    Some(ExistingCheckpoint {
        span: arg.value.span,
        content_span,
        value,
    })
}

/// Rebuilds the feed URL from the statement's first argument, interpolating
/// with the context's version.
pub fn resolve_url(statement: &Statement, context: &Context<'_>) -> UrlResolution {
    let Some(first) = statement.positional.first() else {
        return UrlResolution::Unresolved {
            template: statement.raw.clone(),
            reason: "appcast has no url argument".to_string(),
        };
    };
    match &first.kind {
        ValueKind::Str {
            quote: Quote::Single,
            content,
            ..
        } => UrlResolution::Resolved(content.clone()),
        ValueKind::Str {
            quote: Quote::Double,
            content,
            ..
        } => match interpolate(content, context.version_value().as_ref()) {
            Ok(url) => UrlResolution::Resolved(url),
            Err(err) => UrlResolution::Unresolved {
                template: content.clone(),
                reason: err.to_string(),
            },
        },
        _ => UrlResolution::Unresolved {
            template: first.display(),
            reason: "appcast url is not a string literal".to_string(),
        },
    }
}
