//! Tokenizer for the manifest language.
//!
//! Produces a flat token list with byte spans. String literals are scanned as
//! a whole, including any `#{…}` interpolation (nested braces and quotes are
//! balanced), so interpolated segments survive verbatim.

use super::{LineIndex, Quote, Span};
use crate::error::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Elsif,
    Else,
    Unless,
    End,
    Do,
    Then,
    True,
    False,
    Nil,
    Begin,
    Case,
    Def,
    While,
    Until,
    Class,
    Module,
}

impl Keyword {
    fn lookup(ident: &str) -> Option<Self> {
        let keyword = match ident {
            "if" => Self::If,
            "elsif" => Self::Elsif,
            "else" => Self::Else,
            "unless" => Self::Unless,
            "end" => Self::End,
            "do" => Self::Do,
            "then" => Self::Then,
            "true" => Self::True,
            "false" => Self::False,
            "nil" => Self::Nil,
            "begin" => Self::Begin,
            "case" => Self::Case,
            "def" => Self::Def,
            "while" => Self::While,
            "until" => Self::Until,
            "class" => Self::Class,
            "module" => Self::Module,
            _ => return None,
        };
        Some(keyword)
    }

    /// Keywords that need a matching `end` when they start a statement.
    pub(crate) fn opens_body(&self) -> bool {
        matches!(
            self,
            Self::If
                | Self::Unless
                | Self::While
                | Self::Until
                | Self::Case
                | Self::Begin
                | Self::Def
                | Self::Class
                | Self::Module
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Const,
    Keyword(Keyword),
    /// `key:`, span includes the colon.
    Label,
    Symbol,
    Str(Quote),
    Number,
    Op,
    Comma,
    Semicolon,
    Newline,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.range()]
    }
}

const THREE_CHAR_OPS: [&str; 4] = ["<=>", "**=", "...", "||="];
const TWO_CHAR_OPS: [&str; 15] = [
    "=>", "==", "!=", "<=", ">=", "&&", "||", "=~", "!~", "**", "<<", ">>", "+=", "-=", "..",
];
const ONE_CHAR_OPS: &[u8] = b"=<>!+-*/%&|?.~^";
/// Skipped when it opens the file; spans stay relative to the raw source.
const BOM: char = '\u{feff}';

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(source).run()
}

struct Lexer<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
    tokens: Vec<Token>,
    lines: LineIndex<'s>,
}

impl<'s> Lexer<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: if source.starts_with(BOM) { BOM.len_utf8() } else { 0 },
            tokens: Vec::new(),
            lines: LineIndex::new(source),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\\' if self.peek_at(1) == Some(b'\n') => self.pos += 2,
                b'\\' if self.peek_at(1) == Some(b'\r') && self.peek_at(2) == Some(b'\n') => {
                    self.pos += 3
                }
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }
                b'\n' => self.push(TokenKind::Newline, 1),
                b'\'' | b'"' => self.string()?,
                b':' => self.colon()?,
                b'0'..=b'9' => self.number(),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.word(),
                b'@' | b'$' => self.sigil_word()?,
                b'(' => self.push(TokenKind::LParen, 1),
                b')' => self.push(TokenKind::RParen, 1),
                b'[' => self.push(TokenKind::LBracket, 1),
                b']' => self.push(TokenKind::RBracket, 1),
                b'{' => self.push(TokenKind::LBrace, 1),
                b'}' => self.push(TokenKind::RBrace, 1),
                b',' => self.push(TokenKind::Comma, 1),
                b';' => self.push(TokenKind::Semicolon, 1),
                _ => self.operator()?,
            }
        }
        let end = self.bytes.len();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::empty_at(end),
        });
        Ok(self.tokens)
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        self.push_span(kind, self.pos, self.pos + len);
    }

    fn push_span(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(start, end),
        });
        self.pos = end;
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        let at = self.lines.position(offset);
        SyntaxError::new(at.line, at.column, message)
    }

    fn string(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let quote = if self.bytes[start] == b'"' {
            Quote::Double
        } else {
            Quote::Single
        };
        let end = self.scan_string(start)?;
        self.push_span(TokenKind::Str(quote), start, end);
        Ok(())
    }

    /// Returns the offset just past the closing quote.
    fn scan_string(&self, start: usize) -> Result<usize, SyntaxError> {
        let quote = self.bytes[start];
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b if b == quote => return Ok(i + 1),
                b'#' if quote == b'"' && self.bytes.get(i + 1) == Some(&b'{') => {
                    i = self.scan_interpolation(i)?;
                }
                _ => i += 1,
            }
        }
        Err(self.error_at(start, "unterminated string literal"))
    }

    /// `open` points at the `#` of `#{`. Returns the offset past the closing `}`.
    fn scan_interpolation(&self, open: usize) -> Result<usize, SyntaxError> {
        let mut depth = 1;
        let mut i = open + 2;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'{' => {
                    depth += 1;
                    i += 1;
                }
                b'}' => {
                    depth -= 1;
                    i += 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                b'"' | b'\'' => i = self.scan_string(i)?,
                _ => i += 1,
            }
        }
        Err(self.error_at(open, "unterminated string interpolation"))
    }

    fn colon(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        match self.peek_at(1) {
            Some(b':') => self.push(TokenKind::Op, 2),
            Some(b'"') | Some(b'\'') => {
                let end = self.scan_string(start + 1)?;
                self.push_span(TokenKind::Symbol, start, end);
            }
            Some(c) if is_ident_start(c) => {
                let mut end = start + 1;
                while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
                    end += 1;
                }
                if matches!(self.bytes.get(end), Some(b'?') | Some(b'!')) {
                    end += 1;
                }
                self.push_span(TokenKind::Symbol, start, end);
            }
            _ => self.push(TokenKind::Op, 1),
        }
        Ok(())
    }

    fn number(&mut self) {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() {
            let b = self.bytes[end];
            let fraction = b == b'.'
                && self
                    .bytes
                    .get(end + 1)
                    .is_some_and(|next| next.is_ascii_digit());
            if b.is_ascii_digit() || b == b'_' || fraction {
                end += 1;
            } else {
                break;
            }
        }
        self.push_span(TokenKind::Number, start, end);
    }

    fn follows_member_access(&self) -> bool {
        self.tokens.last().is_some_and(|t| {
            t.kind == TokenKind::Op && matches!(t.text(self.source), "." | "::" | "&.")
        })
    }

    fn word(&mut self) {
        let start = self.pos;
        let mut end = start;
        while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
            end += 1;
        }
        if matches!(self.bytes.get(end), Some(b'?') | Some(b'!'))
            && self.bytes.get(end + 1) != Some(&b'=')
        {
            end += 1;
        }

        let member = self.follows_member_access();
        if !member
            && self.bytes.get(end) == Some(&b':')
            && self.bytes.get(end + 1) != Some(&b':')
        {
            self.push_span(TokenKind::Label, start, end + 1);
            return;
        }

        let text = &self.source[start..end];
        let kind = match Keyword::lookup(text) {
            Some(keyword) if !member => TokenKind::Keyword(keyword),
            _ if self.bytes[start].is_ascii_uppercase() => TokenKind::Const,
            _ => TokenKind::Ident,
        };
        self.push_span(kind, start, end);
    }

    fn sigil_word(&mut self) -> Result<(), SyntaxError> {
        let start = self.pos;
        let mut end = start;
        while matches!(self.bytes.get(end), Some(b'@') | Some(b'$')) {
            end += 1;
        }
        let name_start = end;
        while end < self.bytes.len() && is_ident_char(self.bytes[end]) {
            end += 1;
        }
        if end == name_start {
            return Err(self.error_at(start, "expected a variable name"));
        }
        self.push_span(TokenKind::Ident, start, end);
        Ok(())
    }

    fn operator(&mut self) -> Result<(), SyntaxError> {
        let rest = &self.source[self.pos..];
        if let Some(op) = THREE_CHAR_OPS.iter().find(|op| rest.starts_with(**op)) {
            self.push(TokenKind::Op, op.len());
            return Ok(());
        }
        if let Some(op) = TWO_CHAR_OPS.iter().find(|op| rest.starts_with(**op)) {
            self.push(TokenKind::Op, op.len());
            return Ok(());
        }
        if rest.starts_with("&.") {
            self.push(TokenKind::Op, 2);
            return Ok(());
        }
        if ONE_CHAR_OPS.contains(&self.bytes[self.pos]) {
            self.push(TokenKind::Op, 1);
            return Ok(());
        }
        let found = rest.chars().next().unwrap_or('?');
        Err(self.error_at(self.pos, format!("unexpected character '{}'", found)))
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
