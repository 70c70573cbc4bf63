use serde::Serialize;

use super::{Position, Span, Statement};

/// Ordered sequence of statements and conditionals. Owns its children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Statement(Statement),
    Conditional(Conditional),
}

impl Block {
    /// Statements directly in this block, not inside any conditional.
    pub fn direct_statements(&self) -> impl Iterator<Item = &Statement> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Statement(s) => Some(s),
            Node::Conditional(_) => None,
        })
    }

    pub fn conditionals(&self) -> impl Iterator<Item = &Conditional> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Conditional(c) => Some(c),
            Node::Statement(_) => None,
        })
    }

    pub fn has_conditionals(&self) -> bool {
        self.conditionals().next().is_some()
    }

    pub(crate) fn collect_statements<'a>(&'a self, out: &mut Vec<&'a Statement>) {
        for node in &self.nodes {
            match node {
                Node::Statement(s) => out.push(s),
                Node::Conditional(c) => {
                    for branch in &c.branches {
                        branch.block.collect_statements(out);
                    }
                }
            }
        }
    }
}

/// `if`/`elsif`/`else` chain (or `unless`/`else`).
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub branches: Vec<Branch>,
    pub span: Span,
    pub start: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// `None` for the terminal `else`.
    pub predicate: Option<Predicate>,
    pub block: Block,
    pub start: Position,
}

impl Branch {
    /// Label such as `if MacOS.release <= :el_capitan` or `else`.
    pub fn label(&self) -> String {
        match &self.predicate {
            Some(p) => format!("{} {}", p.keyword.as_str(), p.raw),
            None => "else".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKeyword {
    If,
    Elsif,
    Unless,
}

impl BranchKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Elsif => "elsif",
            Self::Unless => "unless",
        }
    }
}

/// Opaque branch predicate. Never evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub keyword: BranchKeyword,
    /// Verbatim predicate source, trimmed.
    pub raw: String,
    pub span: Span,
}
