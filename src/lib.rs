//! # Introduction
//!
//! The front end of the Rill programming language: a hand-written lexer, a
//! recursive descent parser, and the abstract syntax tree (AST) the parser
//! builds.  Code generation, the compiler driver, and the runtime library
//! live outside this crate and consume the AST through [`parser::Node`].
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → (external code generator)
//! ```
//!
//! 1. [`parser::lexer`] — tokenises the source buffer one token at a time.
//! 2. [`parser::parser`] — pulls tokens and builds the AST bottom-up.
//! 3. [`parser::ast`] — the heterogeneous leaf/non-leaf node model and the
//!    indented tree printer.
//! 4. [`parser::diag`] — lexical and syntax diagnostics with file, line,
//!    and column.
//!
//! ## Supported Rill subset
//!
//! Declarations: `import`, `typealias`, `fn`, `struct`, `interface`,
//! `let`, `var`.
//! Statements: blocks, `if/else`, `loop`, `while`, `do-while`, `for-in`,
//! `switch/case/default`, `break`, `continue`, `return`, expression
//! statements.
//! Expressions: the full precedence ladder from assignment down to postfix
//! call/index/field chains, plus array literals, `new`, `&` references,
//! `try`, `if` expressions, and anonymous functions.
//!
//! Parsing is all-or-nothing: the first lexical or syntax error stops the
//! run with no partial AST (see [`parser::diag::Error`]).

pub mod parser;
