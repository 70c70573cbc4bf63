use serde::Serialize;

use super::{Position, Span, Value};

/// Document-order index of a statement, stable for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StatementId(pub usize);

/// `key: value` argument.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub key: String,
    /// Covers the key and its trailing colon (or `=>`).
    pub key_span: Span,
    pub value: Value,
}

impl NamedArg {
    pub fn span(&self) -> Span {
        self.key_span.join(self.value.span)
    }
}

/// A single stanza.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub id: StatementId,
    pub name: String,
    pub positional: Vec<Value>,
    pub named: Vec<NamedArg>,
    /// Trailing `if …`/`unless …` modifier, verbatim.
    pub modifier: Option<String>,
    /// Set for `name … do … end` statements whose body is kept opaque.
    pub has_block: bool,
    pub span: Span,
    pub start: Position,
    pub end: Position,
    /// Verbatim source of the statement.
    pub raw: String,
}

impl Statement {
    pub fn named(&self, key: &str) -> Option<&NamedArg> {
        self.named.iter().find(|arg| arg.key == key)
    }

    /// Spans of every argument in source order.
    fn argument_spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.positional
            .iter()
            .map(|v| v.span)
            .chain(self.named.iter().map(NamedArg::span))
    }

    /// Span of the first argument, positional or named.
    pub fn first_argument(&self) -> Option<Span> {
        self.argument_spans().min_by_key(|s| s.start)
    }

    /// Span of the last argument, positional or named.
    pub fn last_argument(&self) -> Option<Span> {
        self.argument_spans().max_by_key(|s| s.end)
    }

    /// From the first to the last named argument.
    pub fn named_span(&self) -> Option<Span> {
        self.named
            .iter()
            .map(NamedArg::span)
            .reduce(|acc, span| acc.join(span))
    }
}
