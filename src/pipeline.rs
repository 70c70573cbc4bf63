//! End-to-end processing of manifest files.
//!
//! parse → resolve → locate → fetch → plan → patch → (write)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::client::CheckpointClient;
use crate::config::Settings;
use crate::error::ManifestError;
use crate::fetch::FetchPool;
use crate::locator::locate;
use crate::manifest::Manifest;
use crate::patcher::{apply, write_atomic, Patched};
use crate::planner::{plan, PlannedFeed};
use crate::report::{FeedReport, FileReport, ReportAction, RunReport};
use crate::resolver::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report only. Files are never written.
    Check,
    /// Write files that have at least one edit.
    Update,
}

/// Result of processing one source text in memory.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub token: Option<String>,
    pub feeds: Vec<PlannedFeed>,
    pub patched: Patched,
}

impl Outcome {
    pub fn has_failures(&self) -> bool {
        self.feeds.iter().any(|f| f.action.is_failure())
    }
}

/// Drives the pipeline. Cheap to clone; clones share one fetch bound.
#[derive(Clone)]
pub struct Checkpointer {
    pool: FetchPool,
}

impl Checkpointer {
    pub fn new(client: Arc<dyn CheckpointClient>, settings: &Settings) -> Self {
        Self {
            pool: FetchPool::new(client, settings),
        }
    }

    /// Runs the whole pipeline on `source`. Per-appcast failures are part of
    /// the outcome; only syntax errors and overlapping edits are fatal.
    pub async fn process_source(&self, source: &str) -> Result<Outcome, ManifestError> {
        let manifest = Manifest::parse(source)?;
        let contexts = resolve(&manifest);
        let feeds = locate(&contexts);

        let urls: Vec<&str> = feeds.iter().flat_map(|feed| feed.urls()).collect();
        let results = self.pool.fetch_all(urls).await;

        let plan = plan(source, &feeds, &results);
        let patched = apply(source, &plan.edits)?;
        Ok(Outcome {
            token: manifest.token.clone(),
            feeds: plan.feeds,
            patched,
        })
    }

    /// Processes one file and, in [`Mode::Update`], rewrites it atomically
    /// when there is something to change.
    pub async fn process_file(&self, path: &Path, mode: Mode) -> FileReport {
        match self.try_process_file(path, mode).await {
            Ok(report) => report,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "manifest skipped");
                FileReport::failed(path, err)
            }
        }
    }

    async fn try_process_file(&self, path: &Path, mode: Mode) -> Result<FileReport, ManifestError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|err| ManifestError::io(path, err))?;
        let outcome = self.process_source(&source).await?;

        for feed in outcome.feeds.iter().filter(|f| f.action.is_failure()) {
            warn!(
                path = %path.display(),
                line = feed.position.line,
                action = ReportAction::from(&feed.action).as_str(),
                "appcast not checkpointed"
            );
        }

        let written = mode == Mode::Update && !outcome.patched.is_unchanged();
        if written {
            write_atomic(path, &outcome.patched.source)?;
        }
        info!(
            path = %path.display(),
            feeds = outcome.feeds.len(),
            changes = outcome.patched.changes.len(),
            written,
            "manifest processed"
        );

        Ok(FileReport {
            path: path.to_path_buf(),
            token: outcome.token,
            written,
            error: None,
            feeds: outcome.feeds.iter().map(FeedReport::from).collect(),
            changes: outcome.patched.changes,
        })
    }

    /// Processes every file concurrently; the report keeps the input order.
    pub async fn process_files(&self, paths: &[PathBuf], mode: Mode) -> RunReport {
        let files = join_all(paths.iter().map(|path| self.process_file(path, mode))).await;
        RunReport { files }
    }
}
