//! Recursive-descent parser building the [`Manifest`] block tree.

use super::lexer::{tokenize, Keyword, Token, TokenKind};
use super::{
    Block, Branch, BranchKeyword, Conditional, LineIndex, Manifest, NamedArg, Node, Predicate,
    Span, Statement, StatementId, Value, ValueKind,
};
use crate::error::SyntaxError;

pub(crate) fn parse(source: &str) -> Result<Manifest, SyntaxError> {
    let tokens = tokenize(source)?;
    Parser::new(source, tokens).parse_manifest()
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    lines: LineIndex<'s>,
    next_id: usize,
}

impl<'s> Parser<'s> {
    fn new(source: &'s str, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            lines: LineIndex::new(source),
            next_id: 0,
        }
    }

    // ============================================================
    // Token helpers
    // ============================================================

    fn peek(&self) -> Token {
        self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos];
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn text(&self, token: Token) -> &'s str {
        token.text(self.source)
    }

    fn peek_is_op(&self, op: &str) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Op && self.text(token) == op
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// End offset of the last consumed token that is not a line break.
    fn prev_end(&self) -> usize {
        self.tokens[..self.pos]
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Newline)
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn error(&self, token: Token, message: impl Into<String>) -> SyntaxError {
        let at = self.lines.position(token.span.start);
        SyntaxError::new(at.line, at.column, message)
    }

    fn describe(&self, token: Token) -> String {
        match token.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            _ => format!("`{}`", self.text(token)),
        }
    }

    fn expect_closing(&mut self, kind: TokenKind, open: Token) -> Result<Token, SyntaxError> {
        let token = self.peek();
        if token.kind == kind {
            return Ok(self.advance());
        }
        if token.kind == TokenKind::Eof {
            return Err(self.error(open, format!("unbalanced `{}`", self.text(open))));
        }
        Err(self.error(
            token,
            format!("expected closing bracket, found {}", self.describe(token)),
        ))
    }

    fn expect_statement_end(&self) -> Result<(), SyntaxError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof => Ok(()),
            TokenKind::Keyword(Keyword::End | Keyword::Else | Keyword::Elsif) => Ok(()),
            _ => Err(self.error(
                token,
                format!("expected end of statement, found {}", self.describe(token)),
            )),
        }
    }

    // ============================================================
    // Structure
    // ============================================================

    fn parse_manifest(mut self) -> Result<Manifest, SyntaxError> {
        self.skip_separators();
        let first = self.peek();
        if first.kind != TokenKind::Ident || self.text(first) != "cask" {
            let root = self.parse_block(&[], None)?;
            return Ok(Manifest { token: None, root });
        }

        let opener = self.advance();
        let mut token = None;
        if self.peek().kind != TokenKind::Keyword(Keyword::Do) {
            let value = self.parse_value()?;
            token = value.as_str().map(str::to_string);
        }
        let after = self.peek();
        if after.kind != TokenKind::Keyword(Keyword::Do) {
            return Err(self.error(
                after,
                format!("expected `do` after cask token, found {}", self.describe(after)),
            ));
        }
        self.advance();

        let root = self.parse_block(&[Keyword::End], Some(opener))?;
        self.advance();
        self.skip_separators();
        let trailing = self.peek();
        if trailing.kind != TokenKind::Eof {
            return Err(self.error(
                trailing,
                format!(
                    "unrecognized top-level construct {} after the cask block",
                    self.describe(trailing)
                ),
            ));
        }
        Ok(Manifest { token, root })
    }

    /// Parses nodes until one of `terminators` (left unconsumed) or end of file.
    fn parse_block(
        &mut self,
        terminators: &[Keyword],
        opener: Option<Token>,
    ) -> Result<Block, SyntaxError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_separators();
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => {
                    if let Some(open) = opener {
                        return Err(self.error(
                            open,
                            format!("unbalanced `{}`: missing `end`", self.text(open)),
                        ));
                    }
                    return Ok(Block { nodes });
                }
                TokenKind::Keyword(kw) if terminators.contains(&kw) => {
                    return Ok(Block { nodes });
                }
                TokenKind::Keyword(Keyword::If | Keyword::Unless) => {
                    nodes.push(Node::Conditional(self.parse_conditional()?));
                }
                TokenKind::Keyword(Keyword::Elsif | Keyword::Else | Keyword::End) => {
                    return Err(self.error(
                        token,
                        format!("unexpected `{}` without matching `if`", self.text(token)),
                    ));
                }
                TokenKind::Ident | TokenKind::Const => {
                    nodes.push(Node::Statement(self.parse_statement()?));
                }
                _ => {
                    return Err(self.error(
                        token,
                        format!("unrecognized construct {}", self.describe(token)),
                    ));
                }
            }
        }
    }

    fn parse_conditional(&mut self) -> Result<Conditional, SyntaxError> {
        let open = self.advance();
        let start = self.lines.position(open.span.start);
        let (first_keyword, terminators): (BranchKeyword, &[Keyword]) =
            if open.kind == TokenKind::Keyword(Keyword::Unless) {
                (BranchKeyword::Unless, &[Keyword::Else, Keyword::End])
            } else {
                (
                    BranchKeyword::If,
                    &[Keyword::Elsif, Keyword::Else, Keyword::End],
                )
            };

        let mut branches = Vec::new();
        let mut keyword = first_keyword;
        let mut branch_token = open;
        loop {
            let predicate = self.parse_predicate(keyword, branch_token)?;
            let block = self.parse_block(terminators, Some(open))?;
            branches.push(Branch {
                predicate: Some(predicate),
                block,
                start: self.lines.position(branch_token.span.start),
            });

            let next = self.peek();
            match next.kind {
                TokenKind::Keyword(Keyword::Elsif) => {
                    branch_token = self.advance();
                    keyword = BranchKeyword::Elsif;
                }
                TokenKind::Keyword(Keyword::Else) => {
                    let else_token = self.advance();
                    let block = self.parse_block(&[Keyword::End], Some(open))?;
                    branches.push(Branch {
                        predicate: None,
                        block,
                        start: self.lines.position(else_token.span.start),
                    });
                    break;
                }
                _ => break,
            }
        }

        let end = self.advance();
        self.expect_statement_end()?;
        Ok(Conditional {
            branches,
            span: open.span.join(end.span),
            start,
        })
    }

    /// Reads predicate tokens up to a line break, `;` or `then`.
    fn parse_predicate(
        &mut self,
        keyword: BranchKeyword,
        introducer: Token,
    ) -> Result<Predicate, SyntaxError> {
        let span = self.scan_to_line_end(introducer, true)?.ok_or_else(|| {
            self.error(
                introducer,
                format!("missing predicate after `{}`", keyword.as_str()),
            )
        })?;
        if self.peek().kind == TokenKind::Keyword(Keyword::Then) {
            self.advance();
        }
        Ok(Predicate {
            keyword,
            raw: self.source[span.range()].trim().to_string(),
            span,
        })
    }

    /// Consumes tokens until the logical line ends. Brackets keep the line open,
    /// as does a trailing operator or comma. Returns the covered span, if any.
    fn scan_to_line_end(
        &mut self,
        introducer: Token,
        stop_at_then: bool,
    ) -> Result<Option<Span>, SyntaxError> {
        let mut depth = 0usize;
        let mut first: Option<Token> = None;
        let mut last: Option<Token> = None;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Eof => {
                    if depth > 0 {
                        return Err(self.error(introducer, "unbalanced brackets"));
                    }
                    break;
                }
                TokenKind::Newline | TokenKind::Semicolon if depth == 0 => {
                    let continues = last
                        .is_some_and(|t| matches!(t.kind, TokenKind::Op | TokenKind::Comma));
                    if !continues {
                        break;
                    }
                }
                TokenKind::Keyword(Keyword::Then) if depth == 0 && stop_at_then => break,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    if depth == 0 {
                        return Err(self.error(
                            token,
                            format!("unbalanced `{}`", self.text(token)),
                        ));
                    }
                    depth -= 1;
                }
                _ => {}
            }
            let token = self.advance();
            if token.kind != TokenKind::Newline {
                first.get_or_insert(token);
                last = Some(token);
            }
        }
        Ok(match (first, last) {
            (Some(first), Some(last)) => Some(first.span.join(last.span)),
            _ => None,
        })
    }

    // ============================================================
    // Statements
    // ============================================================

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        let id = StatementId(self.next_id);
        self.next_id += 1;

        let name_token = self.advance();
        let mut positional = Vec::new();
        let mut named = Vec::new();

        let next = self.peek();
        if next.kind == TokenKind::LParen && next.span.start == name_token.span.end {
            let open = self.advance();
            self.skip_newlines();
            if self.peek().kind != TokenKind::RParen {
                self.parse_arguments(&mut positional, &mut named, true)?;
            }
            self.skip_newlines();
            self.expect_closing(TokenKind::RParen, open)?;
        } else if self.peek_is_op("=") || self.peek_is_op("||=") {
            self.advance();
            self.skip_newlines();
            positional.push(self.parse_value()?);
        } else if self.starts_value(next) {
            self.parse_arguments(&mut positional, &mut named, false)?;
        }

        let mut modifier = None;
        if let TokenKind::Keyword(kw @ (Keyword::If | Keyword::Unless)) = self.peek().kind {
            let introducer = self.advance();
            let span = self.scan_to_line_end(introducer, false)?.ok_or_else(|| {
                self.error(introducer, "missing condition after statement modifier")
            })?;
            let word = if kw == Keyword::If { "if" } else { "unless" };
            modifier = Some(format!("{} {}", word, self.source[span.range()].trim()));
        }

        let mut has_block = false;
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Do) => {
                self.advance();
                self.skip_opaque_body(name_token)?;
                has_block = true;
            }
            TokenKind::LBrace => {
                self.skip_balanced()?;
                has_block = true;
            }
            _ => {}
        }

        let span = Span::new(name_token.span.start, self.prev_end());
        self.expect_statement_end()?;

        Ok(Statement {
            id,
            name: self.text(name_token).to_string(),
            positional,
            named,
            modifier,
            has_block,
            span,
            start: self.lines.position(span.start),
            end: self.lines.position(span.end),
            raw: self.source[span.range()].to_string(),
        })
    }

    fn starts_value(&self, token: Token) -> bool {
        match token.kind {
            TokenKind::Str(_)
            | TokenKind::Symbol
            | TokenKind::Number
            | TokenKind::Ident
            | TokenKind::Const
            | TokenKind::Label
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::LParen
            | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Nil) => true,
            TokenKind::Op => matches!(self.text(token), "-" | "!" | "::" | "~"),
            _ => false,
        }
    }

    fn parse_arguments(
        &mut self,
        positional: &mut Vec<Value>,
        named: &mut Vec<NamedArg>,
        in_parens: bool,
    ) -> Result<(), SyntaxError> {
        loop {
            if in_parens {
                self.skip_newlines();
                if self.peek().kind == TokenKind::RParen {
                    break;
                }
            }

            let token = self.peek();
            if token.kind == TokenKind::Label {
                let label = self.advance();
                let key = self.text(label).trim_end_matches(':').to_string();
                let value = self.parse_value()?;
                self.push_named(named, key, label, value)?;
            } else {
                let value = self.parse_value()?;
                if self.peek_is_op("=>") {
                    let arrow = self.advance();
                    self.skip_newlines();
                    let target = self.parse_value()?;
                    let key = value.as_str().map(str::to_string).unwrap_or_else(|| value.display());
                    let key_token = Token {
                        kind: TokenKind::Op,
                        span: value.span.join(arrow.span),
                    };
                    self.push_named(named, key, key_token, target)?;
                } else {
                    positional.push(value);
                }
            }

            if self.peek().kind == TokenKind::Comma {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }
        Ok(())
    }

    fn push_named(
        &self,
        named: &mut Vec<NamedArg>,
        key: String,
        key_token: Token,
        value: Value,
    ) -> Result<(), SyntaxError> {
        if named.iter().any(|arg| arg.key == key) {
            return Err(self.error(key_token, format!("duplicate named argument `{}`", key)));
        }
        named.push(NamedArg {
            key,
            key_span: key_token.span,
            value,
        });
        Ok(())
    }

    /// Skips a `do … end` body by keyword balancing. Returns the closing `end`.
    /// The optional `do` of a `while`/`until` header shares the loop's `end`.
    fn skip_opaque_body(&mut self, owner: Token) -> Result<Token, SyntaxError> {
        let mut depth = 1usize;
        let mut at_line_start = false;
        let mut loop_header = false;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => {
                    return Err(self.error(
                        owner,
                        format!("unbalanced `{} do`: missing `end`", self.text(owner)),
                    ));
                }
                TokenKind::Keyword(Keyword::Do) if loop_header => loop_header = false,
                TokenKind::Keyword(Keyword::Do) => depth += 1,
                TokenKind::Keyword(kw) if kw.opens_body() && at_line_start => {
                    depth += 1;
                    loop_header = matches!(kw, Keyword::While | Keyword::Until);
                }
                TokenKind::Newline | TokenKind::Semicolon => loop_header = false,
                TokenKind::Keyword(Keyword::End) => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(token);
                    }
                }
                _ => {}
            }
            at_line_start = match token.kind {
                TokenKind::Newline | TokenKind::Semicolon => true,
                TokenKind::Keyword(Keyword::Then | Keyword::Else | Keyword::Do) => true,
                TokenKind::Op => matches!(self.text(token), "=" | "||=" | "+="),
                _ => false,
            };
        }
    }

    /// Consumes a bracketed group starting at the current opener.
    fn skip_balanced(&mut self) -> Result<Span, SyntaxError> {
        let open = self.advance();
        let mut depth = 1usize;
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Eof => {
                    return Err(self.error(open, format!("unbalanced `{}`", self.text(open))));
                }
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open.span.join(token.span));
                    }
                }
                _ => {}
            }
        }
    }

    // ============================================================
    // Values
    // ============================================================

    fn expr(&self, span: Span) -> Value {
        Value {
            kind: ValueKind::Expr(self.source[span.range()].to_string()),
            span,
        }
    }

    fn binary_operator(&self) -> bool {
        let token = self.peek();
        token.kind == TokenKind::Op
            && !matches!(
                self.text(token),
                "=>" | "=" | "||=" | "+=" | "-=" | "**=" | "!" | "~" | "." | "&." | "::"
            )
    }

    fn parse_value(&mut self) -> Result<Value, SyntaxError> {
        let mut value = self.parse_postfix()?;
        while self.binary_operator() {
            self.advance();
            self.skip_newlines();
            let rhs = self.parse_postfix()?;
            value = self.expr(value.span.join(rhs.span));
        }
        Ok(value)
    }

    fn parse_postfix(&mut self) -> Result<Value, SyntaxError> {
        let mut value = self.parse_primary()?;
        loop {
            let token = self.peek();
            match token.kind {
                TokenKind::Op if matches!(self.text(token), "." | "&." | "::") => {
                    self.advance();
                    self.skip_newlines();
                    let member = self.advance();
                    if !matches!(member.kind, TokenKind::Ident | TokenKind::Const) {
                        return Err(self.error(
                            member,
                            format!("expected a method name, found {}", self.describe(member)),
                        ));
                    }
                    value = self.expr(value.span.join(member.span));
                }
                TokenKind::LParen | TokenKind::LBracket if token.span.start == value.span.end => {
                    let group = self.skip_balanced()?;
                    value = self.expr(value.span.join(group));
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Value, SyntaxError> {
        let token = self.peek();
        let span = token.span;
        let kind = match token.kind {
            TokenKind::Str(quote) => {
                self.advance();
                let content_span = Span::new(span.start + 1, span.end - 1);
                ValueKind::Str {
                    quote,
                    content: self.source[content_span.range()].to_string(),
                    content_span,
                }
            }
            TokenKind::Symbol => {
                self.advance();
                let name = self.text(token)[1..].trim_matches(|c| c == '"' || c == '\'');
                ValueKind::Symbol(name.to_string())
            }
            TokenKind::Number => {
                self.advance();
                ValueKind::Number(self.text(token).to_string())
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ValueKind::Bool(true)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ValueKind::Bool(false)
            }
            TokenKind::Keyword(Keyword::Nil) => {
                self.advance();
                ValueKind::Nil
            }
            TokenKind::Ident | TokenKind::Const => {
                self.advance();
                ValueKind::Expr(self.text(token).to_string())
            }
            TokenKind::LBracket => return self.parse_array(),
            TokenKind::LBrace => return self.parse_hash(),
            TokenKind::LParen => {
                let group = self.skip_balanced()?;
                return Ok(self.expr(group));
            }
            TokenKind::Op if matches!(self.text(token), "-" | "!" | "::" | "~") => {
                self.advance();
                let inner = self.parse_postfix()?;
                let joined = span.join(inner.span);
                let text = self.source[joined.range()].to_string();
                let kind = match inner.kind {
                    ValueKind::Number(_) if self.text(token) == "-" => ValueKind::Number(text),
                    _ => ValueKind::Expr(text),
                };
                return Ok(Value { kind, span: joined });
            }
            TokenKind::Eof
            | TokenKind::Newline
            | TokenKind::Semicolon
            | TokenKind::Keyword(Keyword::End) => {
                return Err(self.error(token, "unterminated statement: expected a value"));
            }
            _ => {
                return Err(self.error(
                    token,
                    format!("expected a value, found {}", self.describe(token)),
                ));
            }
        };
        Ok(Value { kind, span })
    }

    fn parse_array(&mut self) -> Result<Value, SyntaxError> {
        let open = self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::RBracket => break,
                TokenKind::Eof => return Err(self.error(open, "unbalanced `[`")),
                _ => {}
            }
            items.push(self.parse_value()?);
            self.skip_newlines();
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.skip_newlines();
        let close = self.expect_closing(TokenKind::RBracket, open)?;
        Ok(Value {
            kind: ValueKind::Array(items),
            span: open.span.join(close.span),
        })
    }

    fn parse_hash(&mut self) -> Result<Value, SyntaxError> {
        let open = self.advance();
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            let token = self.peek();
            match token.kind {
                TokenKind::RBrace => break,
                TokenKind::Eof => return Err(self.error(open, "unbalanced `{`")),
                TokenKind::Label => {
                    self.advance();
                    let key = Value {
                        kind: ValueKind::Symbol(
                            self.text(token).trim_end_matches(':').to_string(),
                        ),
                        span: Span::new(token.span.start, token.span.end - 1),
                    };
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
                _ => {
                    let key = self.parse_value()?;
                    if !self.peek_is_op("=>") {
                        let found = self.peek();
                        return Err(self.error(
                            found,
                            format!("expected `=>` in hash, found {}", self.describe(found)),
                        ));
                    }
                    self.advance();
                    self.skip_newlines();
                    let value = self.parse_value()?;
                    entries.push((key, value));
                }
            }
            self.skip_newlines();
            if self.peek().kind == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.skip_newlines();
        let close = self.expect_closing(TokenKind::RBrace, open)?;
        Ok(Value {
            kind: ValueKind::Hash(entries),
            span: open.span.join(close.span),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{Position, Quote};

    fn root_statements(source: &str) -> Vec<Statement> {
        let manifest = parse(source).expect("parse");
        manifest.root.direct_statements().cloned().collect()
    }

    #[test]
    fn parses_cask_wrapper_token() {
        let manifest = parse("cask 'example' do\n  version '1.0'\nend\n").expect("parse");
        assert_eq!(manifest.token.as_deref(), Some("example"));
        assert_eq!(manifest.root.nodes.len(), 1);
    }

    #[test]
    fn bare_file_is_the_root_block() {
        let statements = root_statements("version '1.0'\nsha256 :no_check\n");
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].positional[0].kind, ValueKind::Symbol("no_check".into()));
    }

    #[test]
    fn named_argument_on_continuation_line() {
        let source = "appcast 'https://example.com/a.xml',\n        checkpoint: 'abc'\n";
        let statements = root_statements(source);
        let appcast = &statements[0];
        assert_eq!(appcast.positional.len(), 1);
        let checkpoint = appcast.named("checkpoint").expect("checkpoint");
        assert_eq!(checkpoint.value.as_str(), Some("abc"));
        assert_eq!(appcast.end, Position { line: 2, column: 26 });
        assert_eq!(appcast.raw, source.trim_end());
    }

    #[test]
    fn string_spans_exclude_quotes() {
        let source = "url \"https://example.com/#{version}.dmg\"";
        let statements = root_statements(source);
        match &statements[0].positional[0].kind {
            ValueKind::Str {
                quote,
                content,
                content_span,
            } => {
                assert_eq!(*quote, Quote::Double);
                assert_eq!(content, "https://example.com/#{version}.dmg");
                assert_eq!(&source[content_span.range()], content);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn parenthesized_arguments_span_lines() {
        let statements = root_statements("depends_on(\n  macos: '>= :sierra',\n  arch: :x86_64,\n)\n");
        assert_eq!(statements[0].named.len(), 2);
    }

    #[test]
    fn arrays_hashes_and_expressions() {
        let statements = root_statements(
            "zap trash: ['~/a', '~/b'], rmdir: { 'x' => :y }\napp \"A #{version.major}.app\", target: version.major\n",
        );
        assert!(matches!(
            statements[0].named("trash").map(|a| &a.value.kind),
            Some(ValueKind::Array(items)) if items.len() == 2
        ));
        assert!(matches!(
            statements[0].named("rmdir").map(|a| &a.value.kind),
            Some(ValueKind::Hash(entries)) if entries.len() == 1
        ));
        assert_eq!(
            statements[1].named("target").map(|a| a.value.display()),
            Some("version.major".to_string())
        );
    }

    #[test]
    fn nested_conditionals_and_elsif_chains() {
        let source = "if a\n  version '1'\nelsif b\n  if c\n    version '2'\n  else\n    version '3'\n  end\nelsif d\nelse\n  version '4'\nend\n";
        let manifest = parse(source).expect("parse");
        let conditional = manifest.root.conditionals().next().expect("conditional");
        assert_eq!(conditional.branches.len(), 4);
        assert_eq!(conditional.branches[0].label(), "if a");
        assert_eq!(conditional.branches[2].label(), "elsif d");
        assert_eq!(conditional.branches[3].label(), "else");
        assert!(conditional.branches[1].block.has_conditionals());
        assert_eq!(manifest.statements().len(), 4);
    }

    #[test]
    fn one_line_conditional() {
        let manifest = parse("if MacOS.release == :tiger then version '1'; end\n").expect("parse");
        let conditional = manifest.root.conditionals().next().expect("conditional");
        assert_eq!(
            conditional.branches[0].predicate.as_ref().map(|p| p.raw.as_str()),
            Some("MacOS.release == :tiger")
        );
    }

    #[test]
    fn unless_with_else() {
        let manifest = parse("unless x\n  url 'a'\nelse\n  url 'b'\nend\n").expect("parse");
        let conditional = manifest.root.conditionals().next().expect("conditional");
        assert_eq!(conditional.branches[0].label(), "unless x");
        assert_eq!(conditional.branches.len(), 2);
    }

    #[test]
    fn opaque_do_block_is_one_statement() {
        let source = "postflight do\n  if File.exist?(x)\n    system 'a'\n  end\n  foo if bar\nend\nname 'A'\n";
        let statements = root_statements(source);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].has_block);
        assert_eq!(statements[1].name, "name");
    }

    #[test]
    fn loop_do_inside_opaque_block_shares_the_loop_end() {
        let source = "postflight do\n  while x do\n    y\n  end\n  until z do y end\nend\nname 'A'\n";
        let statements = root_statements(source);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].name, "name");

        let source = "postflight do\n  while x\n    items.each do |i|\n      y\n    end\n  end\nend\n";
        assert_eq!(root_statements(source).len(), 1);
    }

    #[test]
    fn statement_modifier_is_recorded() {
        let statements = root_statements("app 'A.app' if MacOS.version >= :sierra\n");
        assert_eq!(
            statements[0].modifier.as_deref(),
            Some("if MacOS.version >= :sierra")
        );
    }

    #[test]
    fn statement_ids_follow_document_order() {
        let manifest = parse("version '1'\nif a\n  url 'x'\nend\nname 'n'\n").expect("parse");
        let ids: Vec<usize> = manifest.statements().iter().map(|s| s.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn missing_end_is_reported_at_the_opener() {
        let err = parse("cask 'x' do\n  if a\n    version '1'\nend\n").expect_err("should fail");
        assert_eq!((err.line, err.column), (1, 1));
        assert!(err.message.contains("missing `end`"));
    }

    #[test]
    fn stray_else_is_rejected() {
        let err = parse("version '1'\nelse\n").expect_err("should fail");
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn trailing_comma_without_argument_is_unterminated() {
        let err = parse("appcast 'a',\n").expect_err("should fail");
        assert!(err.message.starts_with("unterminated statement"));
    }

    #[test]
    fn duplicate_named_argument() {
        let err = parse("appcast 'a', checkpoint: 'b', checkpoint: 'c'\n").expect_err("should fail");
        assert_eq!(err.message, "duplicate named argument `checkpoint`");
    }

    #[test]
    fn content_after_cask_block_is_rejected() {
        let err = parse("cask 'x' do\nend\nversion '1'\n").expect_err("should fail");
        assert_eq!(err.line, 3);
    }

    #[test]
    fn missing_predicate() {
        let err = parse("if\nversion '1'\nend\n").expect_err("should fail");
        assert_eq!(err.message, "missing predicate after `if`");
    }
}
