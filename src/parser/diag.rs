//! Diagnostics shared by the lexer and parser.
//!
//! There are exactly two error kinds: lexical (bad character, unterminated
//! literal or comment, malformed numeral) and syntax (unexpected token or
//! end of file).  Neither is recoverable: the first error aborts the parse
//! and no partial AST is produced.  Callers that want fail-fast behaviour
//! use [`Error::report_and_exit`].

use std::fmt;
use std::process;

use thiserror::Error as ThisError;

/// Source location information for tokens and diagnostics, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The two diagnostic categories the front end can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
}

/// A fatal front-end diagnostic.
///
/// The rendered form is the two-line report the driver prints:
///
/// ```text
/// ERROR: unexpected token '{'
/// --> main.rill:3:12
/// ```
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("ERROR: {message}\n--> {file}:{line}:{column}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Error {
    pub fn lexical(file: &str, loc: SourceLocation, message: String) -> Self {
        Self {
            kind: ErrorKind::Lexical,
            message,
            file: file.to_string(),
            line: loc.line,
            column: loc.column,
        }
    }

    pub fn syntax(file: &str, loc: SourceLocation, message: String) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message,
            file: file.to_string(),
            line: loc.line,
            column: loc.column,
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    /// Fail-fast policy boundary: print the report and terminate.
    pub fn report_and_exit(&self) -> ! {
        eprintln!("{}", self);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_format() {
        let err = Error::syntax(
            "main.rill",
            SourceLocation::new(3, 12),
            "unexpected token '{'".to_string(),
        );
        assert_eq!(err.to_string(), "ERROR: unexpected token '{'\n--> main.rill:3:12");
    }

    #[test]
    fn test_location_roundtrip() {
        let err = Error::lexical("x.rill", SourceLocation::new(7, 2), "bad".to_string());
        assert_eq!(err.kind, ErrorKind::Lexical);
        assert_eq!(err.location(), SourceLocation::new(7, 2));
    }
}
