//! Keeps appcast checkpoint digests in cask manifests up to date.
//!
//! A manifest is parsed into a block tree ([`manifest`]), flattened into one
//! context per leaf branch ([`resolver`]), and every reachable `appcast`
//! statement is located once ([`locator`]). Feeds are fetched and hashed
//! concurrently ([`fetch`], [`client`]), edits are planned ([`planner`]) and
//! applied byte-exactly to the original text ([`patcher`]). [`pipeline`] wires
//! the steps together for whole files.

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod locator;
pub mod macos;
pub mod manifest;
pub mod patcher;
pub mod pipeline;
pub mod planner;
pub mod report;
pub mod resolver;
pub mod version;

pub use client::{CheckpointClient, Digest, HttpCheckpointClient, MemoryCheckpointClient};
pub use config::Settings;
pub use error::{ConflictingDigestError, FetchError, ManifestError, PatchConflict, SyntaxError};
pub use manifest::Manifest;
pub use pipeline::{Checkpointer, Mode};
