//! Recursive-descent parser.
//!
//! Precedence, lowest first: arrow, assignment, ternary, `||`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix.
//!
//! Newlines separate statements inside block bodies and are skipped in
//! every other context. The parser tracks this with a stack of contexts:
//! blocks push `true`, brackets, parentheses and object literals push
//! `false`. Operand positions always skip newlines, so a binary expression
//! may continue on the next line after its operator.

use crate::ast::{BinaryOp, Entry, Node, Program, UnaryOp};
use crate::lexer::LexError;
use crate::token::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default nesting ceiling for expressions and blocks.
pub const DEFAULT_MAX_DEPTH: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    Lex,
    UnexpectedToken,
    InvalidAssignmentTarget,
    MaxDepth,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            kind: ParseErrorKind::Lex,
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

const BINARY_LEVELS: &[&[(TokenKind, BinaryOp)]] = &[
    &[(TokenKind::Or, BinaryOp::Or)],
    &[(TokenKind::And, BinaryOp::And)],
    &[
        (TokenKind::Eq, BinaryOp::Eq),
        (TokenKind::NotEq, BinaryOp::NotEq),
        (TokenKind::StrictEq, BinaryOp::StrictEq),
        (TokenKind::StrictNotEq, BinaryOp::StrictNotEq),
    ],
    &[
        (TokenKind::Lt, BinaryOp::Lt),
        (TokenKind::LtEq, BinaryOp::LtEq),
        (TokenKind::Gt, BinaryOp::Gt),
        (TokenKind::GtEq, BinaryOp::GtEq),
    ],
    &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Minus, BinaryOp::Sub)],
    &[
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::Percent, BinaryOp::Rem),
    ],
];

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    /// Innermost context last; `true` where newlines separate statements.
    lines: Vec<bool>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_options(tokens, &ParseOptions::default())
    }

    pub fn with_options(mut tokens: Vec<Token>, options: &ParseOptions) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: options.max_depth,
            lines: Vec::new(),
        }
    }

    /// `{ member (separator member)* }` where a member is `name: expr` or
    /// `name(params) { body }`. Members are separated by commas, semicolons
    /// or newlines.
    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let definitions = self.nested(true, |p| {
            let mut definitions = Vec::new();
            loop {
                p.skip_separators(true);
                if p.check(TokenKind::RBrace) {
                    break;
                }
                definitions.push(p.entry()?);
                if !matches!(
                    p.peek(),
                    TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comma | TokenKind::RBrace
                ) {
                    return Err(p.unexpected("',' or newline"));
                }
            }
            p.expect(TokenKind::RBrace, "'}'")?;
            Ok(definitions)
        })?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(Program { definitions })
    }

    /// A single expression spanning the whole input.
    pub fn parse_expression(mut self) -> Result<Node, ParseError> {
        let node = self.expression()?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(node)
    }

    /// A newline or semicolon separated statement list, returned as a block.
    pub fn parse_script(mut self) -> Result<Node, ParseError> {
        let body = self.nested(true, |p| p.statements(TokenKind::Eof))?;
        self.expect(TokenKind::Eof, "end of input")?;
        Ok(Node::Block { body })
    }

    // Token cursor

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn significant(&self) -> bool {
        self.lines.last().copied().unwrap_or(false)
    }

    fn skip_newlines(&mut self) {
        while self.current().kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn skip_separators(&mut self, commas: bool) {
        while self.current().kind.is_separator()
            || (commas && self.current().kind == TokenKind::Comma)
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> TokenKind {
        if !self.significant() {
            self.skip_newlines();
        }
        self.current().kind
    }

    fn check(&mut self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        let token = self.current();
        ParseError {
            kind: ParseErrorKind::UnexpectedToken,
            message: format!("expected {what}, found {token}"),
            line: token.line,
            column: token.column,
        }
    }

    fn nested<T>(
        &mut self,
        significant: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.lines.push(significant);
        let result = f(self);
        self.lines.pop();
        result
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            let token = self.current();
            return Err(ParseError {
                kind: ParseErrorKind::MaxDepth,
                message: format!("maximum nesting depth of {} exceeded", self.max_depth),
                line: token.line,
                column: token.column,
            });
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    // Definitions and statements

    fn entry(&mut self) -> Result<Entry, ParseError> {
        let key = match self.peek() {
            TokenKind::Identifier | TokenKind::String | TokenKind::Number => self.advance().text,
            _ => return Err(self.unexpected("property name")),
        };
        if self.eat(TokenKind::Colon) {
            let value = self.expression()?;
            Ok(Entry::Property { key, value })
        } else if self.check(TokenKind::LParen) {
            let params = self.params()?;
            let body = self.block()?;
            Ok(Entry::Method { key, params, body })
        } else {
            Err(self.unexpected("':' or '('"))
        }
    }

    fn params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        self.nested(false, |p| {
            let mut params = Vec::new();
            while !p.check(TokenKind::RParen) {
                params.push(p.expect(TokenKind::Identifier, "parameter name")?.text);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.expect(TokenKind::RParen, "')'")?;
            Ok(params)
        })
    }

    fn block(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        self.skip_newlines();
        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.nested(true, |p| {
            let body = p.statements(TokenKind::RBrace)?;
            p.expect(TokenKind::RBrace, "'}'")?;
            Ok(body)
        })?;
        self.exit();
        Ok(Node::Block { body })
    }

    fn statements(&mut self, end: TokenKind) -> Result<Vec<Node>, ParseError> {
        let mut body = Vec::new();
        loop {
            self.skip_separators(false);
            if self.check(end) {
                return Ok(body);
            }
            body.push(self.statement()?);
            let next = self.peek();
            if !next.is_separator() && next != end {
                return Err(self.unexpected("newline or ';'"));
            }
        }
    }

    fn statement(&mut self) -> Result<Node, ParseError> {
        match self.peek() {
            TokenKind::If => self.if_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::LBrace => self.block(),
            _ => self.expression(),
        }
    }

    /// Parses `if`/`elif` chains. `else` and `elif` may start the line after
    /// the closing brace.
    fn if_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        let test = self.expression()?;
        let consequent = self.block()?;
        let save = self.pos;
        self.skip_newlines();
        let alternate = match self.current().kind {
            TokenKind::Elif => Some(self.if_statement()?),
            TokenKind::Else => {
                self.advance();
                if self.check(TokenKind::If) {
                    Some(self.if_statement()?)
                } else {
                    Some(self.block()?)
                }
            }
            _ => {
                self.pos = save;
                None
            }
        };
        Ok(Node::If {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: alternate.map(Box::new),
        })
    }

    /// `for init; test; update { }`, `for test { }` or `for { }`.
    fn for_statement(&mut self) -> Result<Node, ParseError> {
        self.advance();
        let (mut init, mut test, mut update) = (None, None, None);
        if !self.check(TokenKind::LBrace) {
            let first = if self.check(TokenKind::Semicolon) {
                None
            } else {
                Some(self.expression()?)
            };
            if self.eat(TokenKind::Semicolon) {
                init = first;
                if !self.check(TokenKind::Semicolon) {
                    test = Some(self.expression()?);
                }
                self.expect(TokenKind::Semicolon, "';'")?;
                if !self.check(TokenKind::LBrace) {
                    update = Some(self.expression()?);
                }
            } else {
                test = first;
            }
        }
        let body = self.block()?;
        Ok(Node::For {
            init: init.map(Box::new),
            test: test.map(Box::new),
            update: update.map(Box::new),
            body: Box::new(body),
        })
    }

    // Expressions

    fn expression(&mut self) -> Result<Node, ParseError> {
        self.enter()?;
        let node = self.arrow_or_assignment();
        self.exit();
        node
    }

    fn arrow_or_assignment(&mut self) -> Result<Node, ParseError> {
        let Some(params) = self.arrow_params() else {
            return self.assignment();
        };
        let body = if self.check(TokenKind::LBrace) {
            self.block()?
        } else {
            self.expression()?
        };
        Ok(Node::Arrow {
            params,
            body: Box::new(body),
        })
    }

    /// Speculatively reads `name =>` or `(a, b) =>`. On any mismatch the
    /// cursor is restored and `None` returned; once `=>` is consumed the
    /// parser is committed to an arrow function.
    fn arrow_params(&mut self) -> Option<Vec<String>> {
        let save = self.pos;
        let params = match self.peek() {
            TokenKind::Identifier => Some(vec![self.advance().text]),
            TokenKind::LParen => {
                self.advance();
                self.lines.push(false);
                let params = self.arrow_param_list();
                self.lines.pop();
                params
            }
            _ => None,
        };
        match params {
            Some(params) if self.check(TokenKind::Arrow) => {
                self.advance();
                Some(params)
            }
            _ => {
                self.pos = save;
                None
            }
        }
    }

    fn arrow_param_list(&mut self) -> Option<Vec<String>> {
        let mut names = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Some(names);
        }
        loop {
            if self.peek() != TokenKind::Identifier {
                return None;
            }
            names.push(self.advance().text);
            if !self.eat(TokenKind::Comma) {
                return self.eat(TokenKind::RParen).then_some(names);
            }
        }
    }

    fn assignment(&mut self) -> Result<Node, ParseError> {
        let target = self.ternary()?;
        if !self.check(TokenKind::Assign) {
            return Ok(target);
        }
        let eq = self.advance();
        if !target.is_assignable() {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidAssignmentTarget,
                message: format!("cannot assign to {}", target.kind_name()),
                line: eq.line,
                column: eq.column,
            });
        }
        let value = self.expression()?;
        Ok(Node::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn ternary(&mut self) -> Result<Node, ParseError> {
        let test = self.binary(0)?;
        if !self.eat(TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.nested(false, |p| {
            let node = p.expression()?;
            p.expect(TokenKind::Colon, "':'")?;
            Ok(node)
        })?;
        let alternate = self.expression()?;
        Ok(Node::Ternary {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn binary(&mut self, level: usize) -> Result<Node, ParseError> {
        let Some(ops) = BINARY_LEVELS.get(level) else {
            return self.unary();
        };
        let mut left = self.binary(level + 1)?;
        loop {
            let kind = self.peek();
            let Some(&(_, op)) = ops.iter().find(|(k, _)| *k == kind) else {
                return Ok(left);
            };
            self.advance();
            let right = self.binary(level + 1)?;
            left = Node::binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        self.skip_newlines();
        let op = match self.current().kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.exit();
        Ok(Node::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn postfix(&mut self) -> Result<Node, ParseError> {
        let mut node = self.primary()?;
        loop {
            node = match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect(TokenKind::Identifier, "property name")?;
                    Node::Member {
                        object: Box::new(node),
                        property: Box::new(Node::identifier(name.text)),
                        computed: false,
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.nested(false, |p| {
                        let index = p.expression()?;
                        p.expect(TokenKind::RBracket, "']'")?;
                        Ok(index)
                    })?;
                    Node::Member {
                        object: Box::new(node),
                        property: Box::new(index),
                        computed: true,
                    }
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.nested(false, |p| p.list(TokenKind::RParen, "')'"))?;
                    Node::Call {
                        callee: Box::new(node),
                        args,
                    }
                }
                _ => return Ok(node),
            };
        }
    }

    /// Comma separated expressions up to `end`; a trailing comma is allowed.
    fn list(&mut self, end: TokenKind, what: &str) -> Result<Vec<Node>, ParseError> {
        let mut items = Vec::new();
        while !self.check(end) {
            items.push(self.expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(end, what)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Node, ParseError> {
        self.skip_newlines();
        let token = self.current().clone();
        let node = match token.kind {
            TokenKind::Number => Node::number(token.text.parse().map_err(|_| ParseError {
                kind: ParseErrorKind::UnexpectedToken,
                message: format!("invalid number '{}'", token.text),
                line: token.line,
                column: token.column,
            })?),
            TokenKind::String => Node::string(token.text),
            TokenKind::True => Node::Bool { value: true },
            TokenKind::False => Node::Bool { value: false },
            TokenKind::Null => Node::Null,
            TokenKind::This => Node::This,
            TokenKind::Identifier => Node::identifier(token.text),
            TokenKind::LParen => {
                self.advance();
                return self.nested(false, |p| {
                    let node = p.expression()?;
                    p.expect(TokenKind::RParen, "')'")?;
                    Ok(node)
                });
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.nested(false, |p| p.list(TokenKind::RBracket, "']'"))?;
                return Ok(Node::Array { elements });
            }
            TokenKind::LBrace => {
                self.advance();
                let entries = self.nested(false, |p| {
                    let mut entries = Vec::new();
                    while !p.check(TokenKind::RBrace) {
                        entries.push(p.entry()?);
                        if !p.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    p.expect(TokenKind::RBrace, "'}'")?;
                    Ok(entries)
                })?;
                return Ok(Node::Object { entries });
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(node)
    }
}
