use super::Span;

/// Quote style of a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// String literal. `content` is the verbatim text between the quotes,
    /// interpolation placeholders included.
    Str {
        quote: Quote,
        content: String,
        content_span: Span,
    },
    /// `:name` or `:"name"`, without the colon.
    Symbol(String),
    Number(String),
    Bool(bool),
    Nil,
    Array(Vec<Value>),
    /// Entries of a `{ … }` literal, keys as written.
    Hash(Vec<(Value, Value)>),
    /// Anything else (method chains, comparisons, calls), kept verbatim.
    Expr(String),
}

/// An argument value and the bytes it occupies.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub kind: ValueKind,
    pub span: Span,
}

impl Value {
    /// String content or symbol name.
    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Str { content, .. } => Some(content),
            ValueKind::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// `true` for a double-quoted string carrying `#{…}`.
    pub fn is_interpolated(&self) -> bool {
        matches!(
            &self.kind,
            ValueKind::Str { quote: Quote::Double, content, .. } if content.contains("#{")
        )
    }

    /// Human readable rendering, used in reports and the tree outline.
    pub fn display(&self) -> String {
        match &self.kind {
            ValueKind::Str { content, .. } => content.clone(),
            ValueKind::Symbol(name) => format!(":{}", name),
            ValueKind::Number(n) => n.clone(),
            ValueKind::Bool(b) => b.to_string(),
            ValueKind::Nil => "nil".to_string(),
            ValueKind::Array(items) => format!(
                "[{}]",
                items
                    .iter()
                    .map(Value::display)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ValueKind::Hash(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{} => {}", k.display(), v.display()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            ValueKind::Expr(raw) => raw.clone(),
        }
    }
}
