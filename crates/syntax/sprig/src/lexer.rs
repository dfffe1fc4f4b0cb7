//! Source text to token stream.

use crate::token::{Token, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {line}:{column}")]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Tokenize source text. The result always ends with an `Eof` token.
///
/// Newlines are emitted as separator tokens; the parser decides where they
/// matter. `//` comments run to the end of the line and are dropped, but the
/// newline that ends them is still emitted.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        while let Some(c) = self.peek_at(0) {
            let (line, column) = (self.line, self.column);
            match c {
                '\n' => {
                    self.bump();
                    self.push(TokenKind::Newline, "\n", line, column);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek_at(0).is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '"' | '\'' => self.string(c, line, column)?,
                c if c.is_ascii_digit() => self.number(line, column),
                c if is_ident_start(c) => self.identifier(line, column),
                _ => self.operator(c, line, column)?,
            }
        }
        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Eof, "", line, column);
        Ok(self.tokens)
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, line: usize, column: usize) {
        self.tokens.push(Token::new(kind, text, line, column));
    }

    fn string(&mut self, quote: char, line: usize, column: usize) -> Result<(), LexError> {
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(LexError {
                        message: "unterminated string".into(),
                        line,
                        column,
                    });
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    None => {
                        return Err(LexError {
                            message: "unterminated string".into(),
                            line,
                            column,
                        });
                    }
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    // `\\`, `\"`, `\'` and unknown escapes keep the character
                    Some(other) => text.push(other),
                },
                Some(c) => text.push(c),
            }
        }
        self.push(TokenKind::String, text, line, column);
        Ok(())
    }

    fn number(&mut self, line: usize, column: usize) {
        let start = self.pos;
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Number, text, line, column);
    }

    fn identifier(&mut self, line: usize, column: usize) {
        let start = self.pos;
        while self.peek_at(0).is_some_and(is_ident_part) {
            self.bump();
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
        self.push(kind, text, line, column);
    }

    fn operator(&mut self, c: char, line: usize, column: usize) -> Result<(), LexError> {
        let next = self.peek_at(1);
        let third = self.peek_at(2);
        let (kind, len) = match (c, next, third) {
            ('=', Some('='), Some('=')) => (TokenKind::StrictEq, 3),
            ('!', Some('='), Some('=')) => (TokenKind::StrictNotEq, 3),
            ('=', Some('='), _) => (TokenKind::Eq, 2),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('=', Some('>'), _) => (TokenKind::Arrow, 2),
            ('<', Some('='), _) => (TokenKind::LtEq, 2),
            ('>', Some('='), _) => (TokenKind::GtEq, 2),
            ('&', Some('&'), _) => (TokenKind::And, 2),
            ('|', Some('|'), _) => (TokenKind::Or, 2),
            ('=', ..) => (TokenKind::Assign, 1),
            ('!', ..) => (TokenKind::Bang, 1),
            ('<', ..) => (TokenKind::Lt, 1),
            ('>', ..) => (TokenKind::Gt, 1),
            ('+', ..) => (TokenKind::Plus, 1),
            ('-', ..) => (TokenKind::Minus, 1),
            ('*', ..) => (TokenKind::Star, 1),
            ('/', ..) => (TokenKind::Slash, 1),
            ('%', ..) => (TokenKind::Percent, 1),
            ('{', ..) => (TokenKind::LBrace, 1),
            ('}', ..) => (TokenKind::RBrace, 1),
            ('(', ..) => (TokenKind::LParen, 1),
            (')', ..) => (TokenKind::RParen, 1),
            ('[', ..) => (TokenKind::LBracket, 1),
            (']', ..) => (TokenKind::RBracket, 1),
            (',', ..) => (TokenKind::Comma, 1),
            (':', ..) => (TokenKind::Colon, 1),
            (';', ..) => (TokenKind::Semicolon, 1),
            ('.', ..) => (TokenKind::Dot, 1),
            ('?', ..) => (TokenKind::Question, 1),
            _ => {
                return Err(LexError {
                    message: format!("unexpected character '{c}'"),
                    line,
                    column,
                });
            }
        };
        let text: String = self.chars[self.pos..self.pos + len].iter().collect();
        for _ in 0..len {
            self.bump();
        }
        self.push(kind, text, line, column);
        Ok(())
    }
}
