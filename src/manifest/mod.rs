//! Structural model of a cask manifest.
//!
//! # Core Concepts
//!
//! - [`Manifest`]: the parsed file. Owns exactly one root [`Block`] (the body
//!   of the `cask '<token>' do … end` wrapper, or the whole file when there is
//!   no wrapper).
//! - [`Block`]: an ordered list of [`Node`]s, each either a [`Statement`] or a
//!   [`Conditional`].
//! - [`Conditional`]: `if`/`elsif`/`else` (or `unless`/`else`) branches. The
//!   predicate is kept as opaque source text and never evaluated.
//! - [`Statement`]: a stanza such as `version '1.0'` or
//!   `appcast 'https://…', checkpoint: '…'`, with exact byte spans for itself
//!   and every argument so that later edits can touch only sub-ranges.

mod block;
mod lexer;
mod parser;
mod span;
mod statement;
pub mod tree_render;
mod value;

pub use block::*;
pub use span::*;
pub use statement::*;
pub use value::*;

use crate::error::SyntaxError;

/// A parsed manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Token from the `cask '<token>' do` wrapper, if present.
    pub token: Option<String>,
    pub root: Block,
}

impl Manifest {
    /// Parse manifest source. Pure function of the input text.
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        parser::parse(source)
    }

    /// Every statement in document order, at any nesting depth.
    pub fn statements(&self) -> Vec<&Statement> {
        let mut out = Vec::new();
        self.root.collect_statements(&mut out);
        out
    }
}
