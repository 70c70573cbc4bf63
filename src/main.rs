use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cask_checkpoint::manifest::tree_render::render_tree;
use cask_checkpoint::report::{ContextSummary, RunReport};
use cask_checkpoint::resolver::resolve;
use cask_checkpoint::{Checkpointer, HttpCheckpointClient, Manifest, Mode, Settings};

#[derive(Parser)]
#[command(name = "cask-checkpoint", version)]
#[command(about = "Keep appcast checkpoint digests in cask manifests up to date")]
struct Cli {
    /// Print reports as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Per-fetch timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Maximum concurrent fetches for the whole run
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report what would change without writing
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rewrite manifests whose checkpoints are missing or stale
    Update {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the block tree and resolved contexts of a manifest (no network)
    Inspect { file: PathBuf },
}

/// Initialize tracing on stderr so stdout carries only the report.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "cask_checkpoint=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = Settings::from_env();
    if let Some(secs) = cli.timeout {
        settings = settings.with_timeout(Duration::from_secs(secs));
    }
    if let Some(concurrency) = cli.concurrency {
        settings = settings.with_concurrency(concurrency);
    }

    let (files, mode) = match cli.command {
        Commands::Inspect { file } => return inspect(&file, cli.json),
        Commands::Check { files } => (files, Mode::Check),
        Commands::Update { files } => (files, Mode::Update),
    };

    let client = HttpCheckpointClient::new(&settings).context("building http client")?;
    let checkpointer = Checkpointer::new(Arc::new(client), &settings);

    let report = tokio::select! {
        report = checkpointer.process_files(&files, mode) => report,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, in-flight fetches cancelled");
            return Ok(ExitCode::from(130));
        }
    };

    print_report(&report, cli.json)?;
    Ok(if report.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn inspect(path: &Path, json: bool) -> anyhow::Result<ExitCode> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let manifest = match Manifest::parse(&source) {
        Ok(manifest) => manifest,
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            return Ok(ExitCode::FAILURE);
        }
    };
    let contexts: Vec<ContextSummary> = resolve(&manifest).iter().map(ContextSummary::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&contexts)?);
    } else {
        print!("{}", render_tree(&manifest));
        for context in &contexts {
            print!("{}", context.render_text());
        }
    }
    Ok(ExitCode::SUCCESS)
}
