//! Lexer (tokenizer) for Rill source code
//!
//! Converts raw source text into [`Token`]s one at a time: the lexer keeps
//! exactly one current token and [`Lexer::advance`] scans the next one in
//! place.  Tokens borrow their text from the source buffer, so the buffer
//! must outlive the parse.
//!
//! Matching policy per scan: skip whitespace and comments, then try the
//! operator table in priority order (longest operators first within each
//! family), then numeric, rune, and string literals, then keywords and
//! identifiers.  The first match wins.  Anything else is a fatal lexical
//! error.

use std::fmt;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;

use super::diag::{Error, SourceLocation};

/// All token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,

    // Punctuation
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // Operators
    PipeEq,    // |=
    PipePipe,  // ||
    Pipe,      // |
    AmpEq,     // &=
    AmpAmp,    // &&
    Amp,       // &
    CaretEq,   // ^=
    Caret,     // ^
    EqEq,      // ==
    Eq,        // =
    BangEq,    // !=
    Bang,      // !
    Tilde,     // ~
    Le,        // <=
    ShlEq,     // <<=
    Shl,       // <<
    Lt,        // <
    Ge,        // >=
    ShrEq,     // >>=
    Shr,       // >>
    Gt,        // >
    DotDot,    // ..
    Dot,       // .
    PlusEq,    // +=
    Plus,      // +
    MinusEq,   // -=
    Minus,     // -
    StarEq,    // *=
    Star,      // *
    SlashEq,   // /=
    Slash,     // /
    PercentEq, // %=
    Percent,   // %

    // Literal classes
    Int,
    Float,
    Rune,
    Str,

    // Keywords
    As,
    Break,
    Case,
    Continue,
    Default,
    Do,
    Else,
    False,
    Fn,
    For,
    If,
    Import,
    In,
    Inout,
    Interface,
    Let,
    Loop,
    New,
    Null,
    Return,
    Struct,
    Switch,
    True,
    Try,
    Typealias,
    Var,
    While,

    Ident,
}

/// Punctuation and operator table, tried strictly in order on every scan.
///
/// Within each operator family the longest spelling comes first so that
/// e.g. `<<=` is matched before `<<` before `<`.
const SYMBOLS: &[(&str, TokenKind)] = &[
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("|=", TokenKind::PipeEq),
    ("||", TokenKind::PipePipe),
    ("|", TokenKind::Pipe),
    ("&=", TokenKind::AmpEq),
    ("&&", TokenKind::AmpAmp),
    ("&", TokenKind::Amp),
    ("^=", TokenKind::CaretEq),
    ("^", TokenKind::Caret),
    ("==", TokenKind::EqEq),
    ("=", TokenKind::Eq),
    ("!=", TokenKind::BangEq),
    ("!", TokenKind::Bang),
    ("~", TokenKind::Tilde),
    ("<=", TokenKind::Le),
    ("<<=", TokenKind::ShlEq),
    ("<<", TokenKind::Shl),
    ("<", TokenKind::Lt),
    (">=", TokenKind::Ge),
    (">>=", TokenKind::ShrEq),
    (">>", TokenKind::Shr),
    (">", TokenKind::Gt),
    ("..", TokenKind::DotDot),
    (".", TokenKind::Dot),
    ("+=", TokenKind::PlusEq),
    ("+", TokenKind::Plus),
    ("-=", TokenKind::MinusEq),
    ("-", TokenKind::Minus),
    ("*=", TokenKind::StarEq),
    ("*", TokenKind::Star),
    ("/=", TokenKind::SlashEq),
    ("/", TokenKind::Slash),
    ("%=", TokenKind::PercentEq),
    ("%", TokenKind::Percent),
];

/// Reserved words.  An identifier run is looked up here after scanning, so
/// a keyword never captures a proper prefix of a longer identifier
/// (`letter` is an identifier, not `let` + `ter`).
static KEYWORDS: LazyLock<FxHashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    FxHashMap::from_iter([
        ("as", TokenKind::As),
        ("break", TokenKind::Break),
        ("case", TokenKind::Case),
        ("continue", TokenKind::Continue),
        ("default", TokenKind::Default),
        ("do", TokenKind::Do),
        ("else", TokenKind::Else),
        ("false", TokenKind::False),
        ("fn", TokenKind::Fn),
        ("for", TokenKind::For),
        ("if", TokenKind::If),
        ("import", TokenKind::Import),
        ("in", TokenKind::In),
        ("inout", TokenKind::Inout),
        ("interface", TokenKind::Interface),
        ("let", TokenKind::Let),
        ("loop", TokenKind::Loop),
        ("new", TokenKind::New),
        ("null", TokenKind::Null),
        ("return", TokenKind::Return),
        ("struct", TokenKind::Struct),
        ("switch", TokenKind::Switch),
        ("true", TokenKind::True),
        ("try", TokenKind::Try),
        ("typealias", TokenKind::Typealias),
        ("var", TokenKind::Var),
        ("while", TokenKind::While),
    ])
});

/// A single token: kind, 1-based source position, and the borrowed text
/// span.  String and rune tokens span the text between the delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub loc: SourceLocation,
    pub text: &'src str,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of file"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// Lexer over an in-memory source buffer.
///
/// Lives for exactly one parse run; the cursor only moves forward.
pub struct Lexer<'src> {
    file: &'src str,
    source: &'src str,
    pos: usize,
    line: usize,
    column: usize,
    token: Token<'src>,
}

impl<'src> Lexer<'src> {
    /// Create a lexer positioned at the first token of `source`.  `file`
    /// is only a label for diagnostics.
    pub fn new(file: &'src str, source: &'src str) -> Result<Self, Error> {
        let mut lexer = Self {
            file,
            source,
            pos: 0,
            line: 1,
            column: 1,
            token: Token {
                kind: TokenKind::Eof,
                loc: SourceLocation::new(1, 1),
                text: "",
            },
        };
        lexer.advance()?;
        Ok(lexer)
    }

    /// The current token.
    pub fn token(&self) -> Token<'src> {
        self.token
    }

    /// The file label used in diagnostics.
    pub fn file(&self) -> &'src str {
        self.file
    }

    /// Discard the current token and scan the next one into place.
    pub fn advance(&mut self) -> Result<(), Error> {
        self.skip_spaces_and_comments()?;
        let loc = self.location();

        if self.is_at_end() {
            self.token = Token {
                kind: TokenKind::Eof,
                loc,
                text: "",
            };
            return Ok(());
        }

        let rest = &self.source[self.pos..];
        for &(text, kind) in SYMBOLS {
            if rest.starts_with(text) {
                self.token = Token {
                    kind,
                    loc,
                    text: &rest[..text.len()],
                };
                self.next_bytes(text.len());
                return Ok(());
            }
        }

        let byte = self.peek();
        if byte.is_ascii_digit() {
            self.token = self.scan_number()?;
            return Ok(());
        }
        if byte == b'\'' {
            self.token = self.scan_rune()?;
            return Ok(());
        }
        if byte == b'"' {
            self.token = self.scan_string()?;
            return Ok(());
        }
        if byte == b'_' || byte.is_ascii_alphabetic() {
            self.token = self.scan_ident_or_keyword();
            return Ok(());
        }

        let shown = if byte.is_ascii_graphic() { byte as char } else { '?' };
        Err(self.lexical(loc, format!("unexpected character '{}' found", shown)))
    }

    fn skip_spaces_and_comments(&mut self) -> Result<(), Error> {
        loop {
            let byte = self.peek();
            if !self.is_at_end() && byte.is_ascii_whitespace() {
                self.next_byte();
                continue;
            }
            if byte == b'/' && self.peek_at(1) == b'/' {
                while !self.is_at_end() && self.peek() != b'\n' {
                    self.next_byte();
                }
                continue;
            }
            if byte == b'/' && self.peek_at(1) == b'*' {
                let loc = self.location();
                self.next_bytes(2);
                loop {
                    if self.is_at_end() {
                        return Err(self.lexical(loc, "unterminated block comment".to_string()));
                    }
                    if self.peek() == b'*' && self.peek_at(1) == b'/' {
                        self.next_bytes(2);
                        break;
                    }
                    self.next_byte();
                }
                continue;
            }
            return Ok(());
        }
    }

    fn scan_number(&mut self) -> Result<Token<'src>, Error> {
        let loc = self.location();
        let start = self.pos;
        let mut kind = TokenKind::Int;

        if self.peek() == b'0' {
            self.next_byte();
            if self.peek().is_ascii_digit() {
                return Err(self.lexical(loc, "leading zero in numeric literal".to_string()));
            }
        } else {
            self.next_byte();
            while self.peek().is_ascii_digit() {
                self.next_byte();
            }
        }

        // A dot not followed by a digit ends the number before the dot.
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            kind = TokenKind::Float;
            self.next_bytes(2);
            while self.peek().is_ascii_digit() {
                self.next_byte();
            }
        }

        if self.peek() == b'e' || self.peek() == b'E' {
            kind = TokenKind::Float;
            self.next_byte();
            if self.peek() == b'+' || self.peek() == b'-' {
                self.next_byte();
            }
            if !self.peek().is_ascii_digit() {
                return Err(self.lexical(loc, "malformed exponent in numeric literal".to_string()));
            }
            while self.peek().is_ascii_digit() {
                self.next_byte();
            }
        }

        if self.peek() == b'_' || self.peek().is_ascii_alphanumeric() {
            return Err(self.lexical(loc, "malformed numeric literal".to_string()));
        }

        Ok(Token {
            kind,
            loc,
            text: &self.source[start..self.pos],
        })
    }

    fn scan_rune(&mut self) -> Result<Token<'src>, Error> {
        let loc = self.location();
        self.next_byte(); // opening quote
        let start = self.pos;

        if self.is_at_end() {
            return Err(self.lexical(loc, "unterminated rune literal".to_string()));
        }
        match self.peek() {
            b'\'' => {
                return Err(self.lexical(loc, "empty rune literal".to_string()));
            }
            b'\\' => {
                self.next_byte();
                if self.is_at_end() {
                    return Err(self.lexical(loc, "unterminated rune literal".to_string()));
                }
                self.next_char();
            }
            _ => self.next_char(),
        }

        if self.is_at_end() || self.peek() != b'\'' {
            return Err(self.lexical(loc, "unterminated rune literal".to_string()));
        }
        let text = &self.source[start..self.pos];
        self.next_byte(); // closing quote

        Ok(Token {
            kind: TokenKind::Rune,
            loc,
            text,
        })
    }

    fn scan_string(&mut self) -> Result<Token<'src>, Error> {
        let loc = self.location();
        self.next_byte(); // opening quote
        let start = self.pos;

        loop {
            if self.is_at_end() {
                return Err(self.lexical(loc, "unterminated string literal".to_string()));
            }
            match self.peek() {
                b'"' => break,
                b'\\' => {
                    self.next_byte();
                    if self.is_at_end() {
                        return Err(self.lexical(loc, "unterminated string literal".to_string()));
                    }
                    self.next_byte();
                }
                _ => self.next_byte(),
            }
        }

        let text = &self.source[start..self.pos];
        self.next_byte(); // closing quote

        Ok(Token {
            kind: TokenKind::Str,
            loc,
            text,
        })
    }

    fn scan_ident_or_keyword(&mut self) -> Token<'src> {
        let loc = self.location();
        let start = self.pos;
        while self.peek() == b'_' || self.peek().is_ascii_alphanumeric() {
            self.next_byte();
        }
        let text = &self.source[start..self.pos];
        let kind = KEYWORDS.get(text).copied().unwrap_or(TokenKind::Ident);
        Token { kind, loc, text }
    }

    /// Current byte, or 0 past the end of the buffer.
    fn peek(&self) -> u8 {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.source.as_bytes().get(self.pos + offset).copied().unwrap_or(0)
    }

    fn next_byte(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.peek() == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn next_bytes(&mut self, count: usize) {
        for _ in 0..count {
            self.next_byte();
        }
    }

    /// Advance over one whole character, so the cursor always stays on a
    /// UTF-8 boundary (rune bodies may hold non-ASCII text).
    fn next_char(&mut self) {
        let width = match self.source[self.pos..].chars().next() {
            Some(ch) => ch.len_utf8(),
            None => return,
        };
        self.next_bytes(width);
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn lexical(&self, loc: SourceLocation, message: String) -> Error {
        Error::lexical(self.file, loc, message)
    }
}
