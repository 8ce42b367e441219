//! Rill source code parser
//!
//! This module transforms Rill source text into an Abstract Syntax Tree
//! (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parser`]: Parsing (tokens → AST)
//! - [`ast`]: AST node definitions and the tree printer
//! - [`diag`]: Lexical/syntax error reporting with source position
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser with one precedence level per
//! binary operator tier.  The parser holds no state beyond the embedded
//! lexer: one token of lookahead, no backtracking.  No external parser
//! generator dependencies.
//!
//! # Error policy
//!
//! Every entry point returns `Result`; the first lexical or syntax error
//! aborts the parse with no partial AST.  [`parse_source_or_exit`] is the
//! fail-fast wrapper used by the command-line driver: it prints the
//! diagnostic to stderr and terminates the process.

pub mod ast;
pub mod diag;
pub mod lexer;
pub mod parser;

pub use ast::{Node, NodeKind};
pub use diag::{Error, ErrorKind, SourceLocation};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

/// Parse a whole module.  Returns the root [`NodeKind::Module`] node, or
/// the first lexical/syntax error.
pub fn parse_source<'src>(file: &'src str, source: &'src str) -> Result<Node<'src>, Error> {
    Parser::new(file, source)?.parse_module()
}

/// Parse a whole module, treating any diagnostic as fatal: the error is
/// reported to stderr and the process exits with a non-zero status.
pub fn parse_source_or_exit<'src>(file: &'src str, source: &'src str) -> Node<'src> {
    match parse_source(file, source) {
        Ok(ast) => ast,
        Err(err) => err.report_and_exit(),
    }
}
