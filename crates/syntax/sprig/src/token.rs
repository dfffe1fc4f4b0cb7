//! Tokens produced by the lexer.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Literals
    Number,
    String,
    True,
    False,
    Null,
    Identifier,

    // Keywords
    If,
    Elif,
    Else,
    For,
    This,

    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Question,

    // Operators
    Assign,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,

    // Statement separators
    Newline,
    Semicolon,

    Eof,
}

impl TokenKind {
    /// Maps reserved words to their keyword kinds.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "this" => TokenKind::This,
            _ => return None,
        })
    }

    pub fn is_separator(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }
}

/// A lexed token. `text` holds the decoded contents for string literals and
/// the source lexeme otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::String => write!(f, "string {:?}", self.text),
            _ => write!(f, "'{}'", self.text),
        }
    }
}
