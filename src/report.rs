//! Run reports, as JSON or aligned text.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::UrlDigest;
use crate::patcher::Change;
use crate::locator::resolve_url;
use crate::planner::{Action, PlannedFeed};
use crate::resolver::{Artifact, Context};

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
}

impl RunReport {
    /// True when any file failed fatally or any appcast ended in error or conflict.
    pub fn has_failures(&self) -> bool {
        self.files.iter().any(FileReport::has_failures)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for file in &self.files {
            file.render_into(&mut out);
        }
        out
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub token: Option<String>,
    /// Whether the file was rewritten.
    pub written: bool,
    /// Fatal error that stopped this file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub feeds: Vec<FeedReport>,
    pub changes: Vec<Change>,
}

impl FileReport {
    pub fn failed(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self {
            path: path.into(),
            token: None,
            written: false,
            error: Some(error.to_string()),
            feeds: Vec::new(),
            changes: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.error.is_some() || self.feeds.iter().any(|f| f.action.is_failure())
    }

    fn render_into(&self, out: &mut String) {
        let _ = write!(out, "{}", self.path.display());
        if let Some(token) = &self.token {
            let _ = write!(out, " ({})", token);
        }
        out.push('\n');
        if let Some(error) = &self.error {
            let _ = writeln!(out, "  error: {}", error);
            return;
        }
        if self.feeds.is_empty() {
            out.push_str("  no appcast\n");
        }
        let width = self
            .feeds
            .iter()
            .map(|f| location(f).len())
            .max()
            .unwrap_or(0);
        for feed in &self.feeds {
            let _ = write!(
                out,
                "  {:<width$}  {:<9}  ",
                location(feed),
                feed.action.as_str(),
                width = width
            );
            match feed.action {
                ReportAction::Insert => {
                    let _ = write!(out, "none -> {}", digest_or_dash(&feed.current));
                }
                ReportAction::Update => {
                    let _ = write!(
                        out,
                        "{} -> {}",
                        digest_or_dash(&feed.previous),
                        digest_or_dash(&feed.current)
                    );
                }
                ReportAction::Unchanged => {
                    let _ = write!(out, "{}", digest_or_dash(&feed.current));
                }
                ReportAction::Error | ReportAction::Conflict => {
                    let _ = write!(out, "{}", feed.reason.as_deref().unwrap_or("failed"));
                }
            }
            out.push('\n');
        }
        if self.written {
            let _ = writeln!(out, "  wrote {} change(s)", self.changes.len());
        }
    }
}

fn location(feed: &FeedReport) -> String {
    format!("{}:{}", feed.line, feed.column)
}

fn digest_or_dash(digest: &Option<String>) -> &str {
    digest.as_deref().unwrap_or("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportAction {
    Insert,
    Update,
    Unchanged,
    Error,
    Conflict,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Unchanged => "unchanged",
            Self::Error => "error",
            Self::Conflict => "conflict",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Error | Self::Conflict)
    }
}

impl From<&Action> for ReportAction {
    fn from(action: &Action) -> Self {
        match action {
            Action::Insert => Self::Insert,
            Action::Update => Self::Update,
            Action::Unchanged => Self::Unchanged,
            Action::Failed(_) => Self::Error,
            Action::Conflict(_) => Self::Conflict,
        }
    }
}

/// One appcast statement and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct FeedReport {
    pub line: usize,
    pub column: usize,
    pub urls: Vec<String>,
    pub contexts: Vec<String>,
    pub previous: Option<String>,
    pub current: Option<String>,
    pub action: ReportAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub digests: Vec<UrlDigest>,
}

impl From<&PlannedFeed> for FeedReport {
    fn from(planned: &PlannedFeed) -> Self {
        let (reason, digests) = match &planned.action {
            Action::Failed(err) => (Some(err.to_string()), Vec::new()),
            Action::Conflict(conflict) => (Some(conflict.to_string()), conflict.digests.clone()),
            _ => (None, Vec::new()),
        };
        Self {
            line: planned.position.line,
            column: planned.position.column,
            urls: planned.urls.clone(),
            contexts: planned.contexts.clone(),
            previous: planned.previous.clone(),
            current: planned.current.clone(),
            action: ReportAction::from(&planned.action),
            reason,
            digests,
        }
    }
}

/// Resolved view of one context, printed by `inspect`.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub index: usize,
    pub label: String,
    pub constraints: Vec<String>,
    pub version: Option<String>,
    pub sha256: Option<String>,
    pub names: Vec<String>,
    pub url: Option<String>,
    pub homepage: Option<String>,
    pub artifacts: Vec<Artifact>,
    /// Feed url as rebuilt for this context.
    pub appcast: Option<String>,
    /// Line of the appcast statement this context reaches.
    pub appcast_line: Option<usize>,
    pub checkpoint: Option<String>,
}

impl From<&Context<'_>> for ContextSummary {
    fn from(context: &Context<'_>) -> Self {
        Self {
            index: context.index,
            label: context.label(),
            constraints: context.constraints().iter().map(|c| c.to_string()).collect(),
            version: context.version_value().map(|v| v.to_string()),
            sha256: context.sha256_value().map(str::to_string),
            names: context.name_values().into_iter().map(str::to_string).collect(),
            url: context.url_value(),
            homepage: context.homepage_value(),
            artifacts: context.artifact_values(),
            appcast: context
                .feed
                .and_then(|s| resolve_url(s, context).url().map(str::to_string)),
            appcast_line: context.feed.map(|s| s.start.line),
            checkpoint: context.checkpoint().map(str::to_string),
        }
    }
}

impl ContextSummary {
    pub fn render_text(&self) -> String {
        let mut out = format!("[{}] {}\n", self.index, self.label);
        for constraint in &self.constraints {
            let _ = writeln!(out, "    when     {}", constraint);
        }
        let field = |out: &mut String, name: &str, value: Option<&str>| {
            let _ = writeln!(out, "    {:<8} {}", name, value.unwrap_or("-"));
        };
        field(&mut out, "version", self.version.as_deref());
        field(&mut out, "sha256", self.sha256.as_deref());
        if !self.names.is_empty() {
            field(&mut out, "name", Some(self.names.join(", ").as_str()));
        }
        field(&mut out, "url", self.url.as_deref());
        field(&mut out, "homepage", self.homepage.as_deref());
        let appcast = match (&self.appcast, self.appcast_line) {
            (Some(url), Some(line)) => Some(format!("{} (line {})", url, line)),
            (None, Some(line)) => Some(format!("unresolved (line {})", line)),
            _ => None,
        };
        field(&mut out, "appcast", appcast.as_deref());
        field(&mut out, "checkpt", self.checkpoint.as_deref());
        for artifact in &self.artifacts {
            let text = match &artifact.target {
                Some(target) => format!("{} -> {}", artifact.value, target),
                None => artifact.value.clone(),
            };
            field(&mut out, &artifact.stanza, Some(text.as_str()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::manifest::{Position, StatementId};

    fn planned(action: Action) -> PlannedFeed {
        PlannedFeed {
            statement: StatementId(3),
            position: Position { line: 4, column: 3 },
            urls: vec!["https://e.com/a.xml".to_string()],
            contexts: vec!["(global)".to_string()],
            previous: None,
            current: Some("f".repeat(64)),
            action,
        }
    }

    #[test]
    fn failures_are_detected() {
        let ok = FileReport {
            path: "a.rb".into(),
            token: Some("a".to_string()),
            written: true,
            error: None,
            feeds: vec![FeedReport::from(&planned(Action::Insert))],
            changes: Vec::new(),
        };
        let mut failed = ok.clone();
        failed.feeds.push(FeedReport::from(&planned(Action::Failed(
            FetchError::Status {
                url: "https://e.com/a.xml".to_string(),
                status: 503,
            },
        ))));
        assert!(!RunReport { files: vec![ok.clone()] }.has_failures());
        assert!(RunReport { files: vec![ok, failed] }.has_failures());
        assert!(FileReport::failed("b.rb", "boom").has_failures());
    }

    #[test]
    fn json_uses_lowercase_actions() {
        let report = RunReport {
            files: vec![FileReport {
                path: "a.rb".into(),
                token: None,
                written: false,
                error: None,
                feeds: vec![FeedReport::from(&planned(Action::Unchanged))],
                changes: Vec::new(),
            }],
        };
        let json = report.to_json().expect("json");
        assert!(json.contains("\"action\": \"unchanged\""));
        assert!(!json.contains("\"reason\""));
    }

    #[test]
    fn context_summary_lists_artifacts_with_targets() {
        let manifest = crate::manifest::Manifest::parse(
            "version '1.0'\nurl \"https://e.com/#{version}.dmg\"\nappcast 'https://e.com/a.xml'\napp 'A.app', target: 'B.app'\n",
        )
        .expect("parse");
        let contexts = crate::resolver::resolve(&manifest);
        let text = ContextSummary::from(&contexts[0]).render_text();
        assert!(text.contains("    url      https://e.com/1.0.dmg\n"));
        assert!(text.contains("    appcast  https://e.com/a.xml (line 3)\n"));
        assert!(text.contains("    app      A.app -> B.app\n"));
    }

    #[test]
    fn text_lists_each_feed() {
        let report = RunReport {
            files: vec![FileReport {
                path: "a.rb".into(),
                token: Some("a".to_string()),
                written: false,
                error: None,
                feeds: vec![FeedReport::from(&planned(Action::Insert))],
                changes: Vec::new(),
            }],
        };
        let text = report.render_text();
        assert!(text.starts_with("a.rb (a)\n"));
        assert!(text.contains(&format!("  4:3  insert     none -> {}", "f".repeat(64))));
    }
}
