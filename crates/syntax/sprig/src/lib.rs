//! Sprig surface language frontend.
//!
//! Source text goes through [`tokenize`], one of the parser entry points
//! ([`parse_program`], [`parse_expression`], [`parse_script`]) and finally
//! [`transform`] / [`transform_program`], which lower the AST into
//! list-expressions for the evaluator.

pub mod ast;
mod lexer;
mod parser;
mod token;
mod transform;

pub use ast::{BinaryOp, Entry, Node, Program, UnaryOp};
pub use lexer::{LexError, tokenize};
pub use parser::{DEFAULT_MAX_DEPTH, ParseError, ParseErrorKind, ParseOptions, Parser};
pub use token::{Token, TokenKind};
pub use transform::{LOOP_PREFIX, TransformError, Transformer, transform, transform_program};

use rhizome_sprig_ir::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
}

impl SyntaxError {
    /// Source position, when the error has one.
    pub fn position(&self) -> Option<(usize, usize)> {
        match self {
            SyntaxError::Lex(err) => Some((err.line, err.column)),
            SyntaxError::Parse(err) => Some((err.line, err.column)),
            SyntaxError::Transform(_) => None,
        }
    }
}

pub fn parse_program(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}

pub fn parse_expression(tokens: Vec<Token>) -> Result<Node, ParseError> {
    Parser::new(tokens).parse_expression()
}

pub fn parse_script(tokens: Vec<Token>) -> Result<Node, ParseError> {
    Parser::new(tokens).parse_script()
}

/// Whether `source` is a program (`{ ... }` definitions) rather than a
/// statement list. Decided by the first significant token.
pub fn is_program(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .find(|t| t.kind != TokenKind::Newline)
        .is_some_and(|t| t.kind == TokenKind::LBrace)
}

/// Lex, parse and lower a program.
pub fn compile_program(source: &str, options: &ParseOptions) -> Result<Value, SyntaxError> {
    let tokens = tokenize(source)?;
    let program = Parser::with_options(tokens, options).parse_program()?;
    tracing::debug!(definitions = program.definitions.len(), "parsed program");
    Ok(transform_program(&program)?)
}

/// Lex, parse and lower a statement list.
pub fn compile_script(source: &str, options: &ParseOptions) -> Result<Value, SyntaxError> {
    let tokens = tokenize(source)?;
    let script = Parser::with_options(tokens, options).parse_script()?;
    Ok(transform(&script)?)
}

/// Lex, parse and lower either form: sources whose first token is `{` are
/// programs, anything else is a statement list.
pub fn compile(source: &str) -> Result<Value, SyntaxError> {
    let tokens = tokenize(source)?;
    let options = ParseOptions::default();
    if is_program(&tokens) {
        let program = Parser::with_options(tokens, &options).parse_program()?;
        Ok(transform_program(&program)?)
    } else {
        let script = Parser::with_options(tokens, &options).parse_script()?;
        Ok(transform(&script)?)
    }
}
