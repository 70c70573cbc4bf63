//! Scope resolution: one [`Context`] per leaf branch of the conditional tree.
//!
//! Applicability is lexical. A statement placed directly in the root block is
//! global no matter whether it sits before or after a conditional; a statement
//! inside a branch applies to every leaf below that branch. For a leaf, layers
//! are applied root first, then each enclosing branch down to the leaf, so the
//! nearest branch wins. Inside one layer the last statement in document order
//! wins, except for kinds whose policy is [`Policy::Accumulate`].

use serde::Serialize;

use crate::macos::MacOsConstraint;
use crate::manifest::{Block, Branch, Manifest, Quote, Statement, Value, ValueKind};
use crate::version::{interpolate_known, Version};

/// Stanza names treated as installable artifacts.
const ARTIFACT_STANZAS: &[&str] = &[
    "app",
    "pkg",
    "binary",
    "suite",
    "installer",
    "prefpane",
    "qlplugin",
    "font",
    "colorpicker",
    "service",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Version,
    Sha256,
    Url,
    Feed,
    Homepage,
    Name,
    Artifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Nearest / last declaration wins.
    Override,
    /// Every declaration contributes; duplicates are dropped.
    Accumulate,
}

impl DeclarationKind {
    /// Tracked kind of a stanza name, if any.
    pub fn of(name: &str) -> Option<Self> {
        let kind = match name {
            "version" => Self::Version,
            "sha256" => Self::Sha256,
            "url" => Self::Url,
            "appcast" => Self::Feed,
            "homepage" => Self::Homepage,
            "name" => Self::Name,
            _ if ARTIFACT_STANZAS.contains(&name) => Self::Artifact,
            _ => return None,
        };
        Some(kind)
    }

    pub fn policy(&self) -> Policy {
        match self {
            Self::Name | Self::Artifact => Policy::Accumulate,
            _ => Policy::Override,
        }
    }
}

/// An artifact stanza with its source and optional `target:`, both expanded
/// against the context's version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub stanza: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Resolved declarations for one leaf branch. Borrowed from the manifest and
/// never mutated; rebuild with [`resolve`] after the tree changes.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    /// Document-order index of the leaf.
    pub index: usize,
    /// Branches from the root down to the leaf. Empty for the implicit root leaf.
    pub path: Vec<&'a Branch>,
    pub version: Option<&'a Statement>,
    pub sha256: Option<&'a Statement>,
    pub url: Option<&'a Statement>,
    pub feed: Option<&'a Statement>,
    pub homepage: Option<&'a Statement>,
    pub names: Vec<&'a Statement>,
    pub artifacts: Vec<&'a Statement>,
}

impl<'a> Context<'a> {
    fn declare(&mut self, statement: &'a Statement) {
        let Some(kind) = DeclarationKind::of(&statement.name) else {
            return;
        };
        match kind.policy() {
            Policy::Override => {
                let slot = match kind {
                    DeclarationKind::Version => &mut self.version,
                    DeclarationKind::Sha256 => &mut self.sha256,
                    DeclarationKind::Url => &mut self.url,
                    DeclarationKind::Feed => &mut self.feed,
                    DeclarationKind::Homepage => &mut self.homepage,
                    DeclarationKind::Name | DeclarationKind::Artifact => return,
                };
                *slot = Some(statement);
            }
            Policy::Accumulate => {
                let list = match kind {
                    DeclarationKind::Name => &mut self.names,
                    _ => &mut self.artifacts,
                };
                let key = first_argument(statement);
                if !list.iter().any(|s| first_argument(s) == key) {
                    list.push(statement);
                }
            }
        }
    }

    /// Resolved statement for an override kind.
    pub fn get(&self, kind: DeclarationKind) -> Option<&'a Statement> {
        match kind {
            DeclarationKind::Version => self.version,
            DeclarationKind::Sha256 => self.sha256,
            DeclarationKind::Url => self.url,
            DeclarationKind::Feed => self.feed,
            DeclarationKind::Homepage => self.homepage,
            DeclarationKind::Name => self.names.last().copied(),
            DeclarationKind::Artifact => self.artifacts.last().copied(),
        }
    }

    /// `if A / elsif B` style label, or `(global)` for the implicit root leaf.
    pub fn label(&self) -> String {
        if self.path.is_empty() {
            return "(global)".to_string();
        }
        self.path
            .iter()
            .map(|b| b.label())
            .collect::<Vec<_>>()
            .join(" / ")
    }

    pub fn version_value(&self) -> Option<Version> {
        self.version
            .and_then(|s| s.positional.first())
            .and_then(|v| v.as_str())
            .map(Version::new)
    }

    pub fn sha256_value(&self) -> Option<&'a str> {
        self.sha256
            .and_then(|s| s.positional.first())
            .and_then(|v| v.as_str())
    }

    /// The stored checkpoint digest of the resolved appcast, if written as a literal.
    pub fn checkpoint(&self) -> Option<&'a str> {
        self.feed
            .and_then(|s| s.named("checkpoint"))
            .and_then(|arg| arg.value.as_str())
    }

    /// Download url with `#{version}` placeholders expanded.
    pub fn url_value(&self) -> Option<String> {
        self.get(DeclarationKind::Url)
            .and_then(|s| s.positional.first())
            .and_then(|v| self.expand(v))
    }

    pub fn homepage_value(&self) -> Option<String> {
        self.get(DeclarationKind::Homepage)
            .and_then(|s| s.positional.first())
            .and_then(|v| self.expand(v))
    }

    pub fn artifact_values(&self) -> Vec<Artifact> {
        self.artifacts
            .iter()
            .filter_map(|s| {
                let value = s.positional.first().and_then(|v| self.expand(v))?;
                Some(Artifact {
                    stanza: s.name.clone(),
                    value,
                    target: s.named("target").and_then(|arg| self.expand(&arg.value)),
                })
            })
            .collect()
    }

    /// Text of a string or symbol argument. Double-quoted strings are
    /// interpolated; other placeholders such as `#{appdir}` stay as written.
    fn expand(&self, value: &Value) -> Option<String> {
        match &value.kind {
            ValueKind::Str {
                quote: Quote::Double,
                content,
                ..
            } => Some(interpolate_known(content, self.version_value().as_ref())),
            ValueKind::Str { content, .. } => Some(content.clone()),
            ValueKind::Symbol(name) => Some(name.clone()),
            _ => None,
        }
    }

    pub fn name_values(&self) -> Vec<&'a str> {
        self.names
            .iter()
            .filter_map(|s| s.positional.first().and_then(|v| v.as_str()))
            .collect()
    }

    /// Recognized macOS constraints along the path.
    pub fn constraints(&self) -> Vec<MacOsConstraint> {
        self.path
            .iter()
            .filter_map(|b| b.predicate.as_ref())
            .filter_map(|p| MacOsConstraint::parse(&p.raw))
            .collect()
    }
}

fn first_argument(statement: &Statement) -> Option<String> {
    statement.positional.first().map(|v| v.display())
}

/// Computes one context per leaf branch, in document order.
pub fn resolve(manifest: &Manifest) -> Vec<Context<'_>> {
    let mut contexts = Vec::new();
    let mut layers = vec![&manifest.root];
    let mut path = Vec::new();
    collect(&manifest.root, &mut layers, &mut path, &mut contexts);
    contexts
}

fn collect<'a>(
    block: &'a Block,
    layers: &mut Vec<&'a Block>,
    path: &mut Vec<&'a Branch>,
    out: &mut Vec<Context<'a>>,
) {
    if !block.has_conditionals() {
        out.push(build(layers, path, out.len()));
        return;
    }
    for conditional in block.conditionals() {
        for branch in &conditional.branches {
            layers.push(&branch.block);
            path.push(branch);
            collect(&branch.block, layers, path, out);
            path.pop();
            layers.pop();
        }
    }
}

fn build<'a>(layers: &[&'a Block], path: &[&'a Branch], index: usize) -> Context<'a> {
    let mut context = Context {
        index,
        path: path.to_vec(),
        ..Context::default()
    };
    for layer in layers {
        for statement in layer.direct_statements() {
            context.declare(statement);
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(source: &str) -> Vec<Option<String>> {
        let manifest = Manifest::parse(source).expect("parse");
        resolve(&manifest)
            .iter()
            .map(|c| c.version_value().map(|v| v.to_string()))
            .collect()
    }

    #[test]
    fn policy_table() {
        assert_eq!(DeclarationKind::of("appcast"), Some(DeclarationKind::Feed));
        assert_eq!(DeclarationKind::of("binary"), Some(DeclarationKind::Artifact));
        assert_eq!(DeclarationKind::of("zap"), None);
        assert_eq!(DeclarationKind::Name.policy(), Policy::Accumulate);
        assert_eq!(DeclarationKind::Version.policy(), Policy::Override);
    }

    #[test]
    fn flat_manifest_has_one_context() {
        assert_eq!(versions("version '1'\n"), vec![Some("1".to_string())]);
        let manifest = Manifest::parse("url 'a'\napp 'A.app'\n").expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(contexts[0].get(DeclarationKind::Url).map(|s| s.name.as_str()), Some("url"));
        assert_eq!(contexts[0].get(DeclarationKind::Artifact).map(|s| s.name.as_str()), Some("app"));
        assert!(contexts[0].get(DeclarationKind::Homepage).is_none());
    }

    #[test]
    fn empty_manifest_has_one_empty_context() {
        let manifest = Manifest::parse("").expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].version.is_none());
        assert_eq!(contexts[0].label(), "(global)");
    }

    #[test]
    fn last_declaration_in_a_scope_wins() {
        assert_eq!(
            versions("version '1'\nversion '2'\n"),
            vec![Some("2".to_string())]
        );
    }

    #[test]
    fn global_after_conditional_still_applies() {
        assert_eq!(
            versions("if a\n  url 'x'\nelse\n  url 'y'\nend\nversion '3'\n"),
            vec![Some("3".to_string()), Some("3".to_string())]
        );
    }

    #[test]
    fn nearest_branch_wins() {
        let source = "version '0'\nif a\n  version '1'\n  if b\n    version '2'\n  else\n    name 'x'\n  end\nelse\n  name 'y'\nend\n";
        assert_eq!(
            versions(source),
            vec![
                Some("2".to_string()),
                Some("1".to_string()),
                Some("0".to_string())
            ]
        );
    }

    #[test]
    fn names_accumulate_across_layers() {
        let manifest = Manifest::parse(
            "name 'A'\nif x\n  name 'B'\n  name 'A'\nelse\n  name 'C'\nend\nname 'D'\n",
        )
        .expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(contexts[0].name_values(), vec!["A", "D", "B"]);
        assert_eq!(contexts[1].name_values(), vec!["A", "D", "C"]);
    }

    #[test]
    fn sibling_branches_do_not_leak() {
        let manifest =
            Manifest::parse("if a\n  sha256 'one'\nelsif b\n  version '2'\nend\n").expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].sha256_value(), Some("one"));
        assert!(contexts[0].version.is_none());
        assert!(contexts[1].sha256.is_none());
        assert_eq!(contexts[1].label(), "elsif b");
    }

    #[test]
    fn artifacts_expand_against_the_branch_version() {
        let manifest = Manifest::parse(
            "if a\n  version '1.2'\nelse\n  version '2.0'\nend\napp \"A #{version.major}.app\", target: 'A.app'\nbinary \"#{appdir}/#{version}/a\"\n",
        )
        .expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(
            contexts[1].artifact_values(),
            vec![
                Artifact {
                    stanza: "app".to_string(),
                    value: "A 2.app".to_string(),
                    target: Some("A.app".to_string()),
                },
                Artifact {
                    stanza: "binary".to_string(),
                    value: "#{appdir}/2.0/a".to_string(),
                    target: None,
                },
            ]
        );
    }

    #[test]
    fn constraints_along_the_path() {
        let manifest = Manifest::parse(
            "if MacOS.release <= :el_capitan\n  version '1'\nelse\n  version '2'\nend\n",
        )
        .expect("parse");
        let contexts = resolve(&manifest);
        assert_eq!(contexts[0].constraints().len(), 1);
        assert!(contexts[1].constraints().is_empty());
    }
}
