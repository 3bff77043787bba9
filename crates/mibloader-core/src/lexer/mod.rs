//! MIB lexer module.
//!
//! Tokenizes SMIv1/SMIv2 MIB source text into a token stream. Comments are
//! not discarded: they are collected on the side so the analyzer can attach
//! them to the symbols and module they document.

// Allow truncation casts - source size is limited to u32::MAX bytes
#![allow(clippy::cast_possible_truncation)]

mod keyword;
mod token;

pub use keyword::lookup_keyword;
pub use token::{Span, Token, TokenKind};

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Byte offset into source text.
pub type ByteOffset = u32;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// The input is malformed.
    Error,
    /// Informational; scanning continues.
    Warning,
}

/// A diagnostic message from the lexer or parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Location in source text.
    pub span: Span,
    /// Human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Create an error diagnostic.
    #[must_use]
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            span,
            message: message.into(),
        }
    }

    /// Create a warning diagnostic.
    #[must_use]
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            span,
            message: message.into(),
        }
    }
}

/// A `--` comment, without its delimiters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// Span of the whole comment including the dashes.
    pub span: Span,
    /// Comment body, trimmed.
    pub text: String,
}

/// Output of a complete tokenization run.
#[derive(Clone, Debug, Default)]
pub struct Lexed {
    /// All tokens, terminated by an `Eof` token.
    pub tokens: Vec<Token>,
    /// All comments in source order.
    pub comments: Vec<Comment>,
    /// Lexical diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// What the scanner is currently looking at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Module text proper.
    Code,
    /// The body of a MACRO definition, opaque up to its `END`.
    MacroBody,
    /// An EXPORTS list, opaque up to its `;`.
    ExportList,
}

/// Byte scanner over one module text.
///
/// Problems never stop the scan; they are recorded in [`Lexed::diagnostics`].
pub struct Lexer<'src> {
    text: &'src str,
    at: usize,
    mode: Mode,
    out: Lexed,
}

impl<'src> Lexer<'src> {
    /// A scanner positioned at the start of `text`.
    #[must_use]
    pub fn new(text: &'src str) -> Self {
        Self {
            text,
            at: 0,
            mode: Mode::Code,
            out: Lexed::default(),
        }
    }

    /// Scan to the end, returning tokens terminated by `Eof`.
    #[must_use]
    pub fn tokenize(mut self) -> Lexed {
        loop {
            let token = match self.mode {
                Mode::Code => self.lex_code(),
                Mode::MacroBody => self.lex_macro_body(),
                Mode::ExportList => self.lex_export_list(),
            };
            self.out.tokens.push(token);
            if token.kind == TokenKind::Eof {
                return self.out;
            }
        }
    }

    fn byte(&self, ahead: usize) -> Option<u8> {
        self.text.as_bytes().get(self.at + ahead).copied()
    }

    fn at_comment(&self) -> bool {
        self.byte(0) == Some(b'-') && self.byte(1) == Some(b'-')
    }

    fn bump(&mut self, n: usize) {
        self.at = (self.at + n).min(self.text.len());
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.byte(0).is_some_and(&pred) {
            self.at += 1;
        }
    }

    /// Identifier characters, stopping before a `--` comment.
    fn eat_word(&mut self) {
        while self.byte(0).is_some_and(is_ident_byte) && !self.at_comment() {
            self.at += 1;
        }
    }

    fn span(&self, start: usize) -> Span {
        Span::new(start as ByteOffset, self.at as ByteOffset)
    }

    fn emit(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.span(start))
    }

    fn report(&mut self, severity: Severity, start: usize, message: impl Into<String>) {
        self.out.diagnostics.push(Diagnostic {
            severity,
            span: self.span(start),
            message: message.into(),
        });
    }

    fn lex_code(&mut self) -> Token {
        loop {
            self.eat_while(|b| b.is_ascii_whitespace());
            if !self.at_comment() {
                break;
            }
            self.comment();
        }

        let start = self.at;
        let Some(b) = self.byte(0) else {
            return self.emit(TokenKind::Eof, start);
        };
        if let Some(kind) = punctuation(b) {
            self.bump(1);
            return self.emit(kind, start);
        }

        match (b, self.byte(1), self.byte(2)) {
            (b'.', Some(b'.'), _) => {
                self.bump(2);
                self.emit(TokenKind::DotDot, start)
            }
            (b'.', ..) => {
                self.bump(1);
                self.emit(TokenKind::Dot, start)
            }
            (b':', Some(b':'), Some(b'=')) => {
                self.bump(3);
                self.emit(TokenKind::ColonColonEqual, start)
            }
            (b':', ..) => {
                self.bump(1);
                self.emit(TokenKind::Colon, start)
            }
            (b'-', Some(d), _) if d.is_ascii_digit() => {
                self.bump(1);
                self.number(start, TokenKind::NegativeNumber)
            }
            (b'-', ..) => {
                self.bump(1);
                self.emit(TokenKind::Minus, start)
            }
            (b'0'..=b'9', ..) => self.number(start, TokenKind::Number),
            (b'"', ..) => self.quoted(),
            (b'\'', ..) => self.radix_string(),
            (b, ..) if b.is_ascii_alphabetic() => self.word(),
            _ => {
                let c = self.text.get(self.at..).and_then(|s| s.chars().next());
                self.bump(c.map_or(1, char::len_utf8));
                let c = c.unwrap_or(char::REPLACEMENT_CHARACTER);
                self.report(Severity::Error, start, format!("unexpected character: {c:?}"));
                self.emit(TokenKind::Error, start)
            }
        }
    }

    /// Record a `--` comment. It ends at the line end or at the next `--`.
    fn comment(&mut self) {
        let start = self.at;
        self.bump(2);
        let text = self.text;
        let rest = &text.as_bytes()[self.at..];
        let len = rest
            .iter()
            .enumerate()
            .position(|(i, &b)| {
                b == b'\n' || b == b'\r' || (b == b'-' && rest.get(i + 1) == Some(&b'-'))
            })
            .unwrap_or(rest.len());
        let body = String::from_utf8_lossy(&rest[..len]).trim().into();
        let closed = rest.get(len) == Some(&b'-');
        self.bump(if closed { len + 2 } else { len });
        self.out.comments.push(Comment {
            span: self.span(start),
            text: body,
        });
    }

    fn lex_macro_body(&mut self) -> Token {
        loop {
            let start = self.at;
            match self.byte(0) {
                None => {
                    self.mode = Mode::Code;
                    self.report(Severity::Error, start, "MACRO definition has no END");
                    return self.emit(TokenKind::Eof, start);
                }
                Some(b'-') if self.at_comment() => self.comment(),
                Some(b'"') => {
                    self.quoted();
                }
                Some(b) if is_ident_byte(b) => {
                    self.eat_word();
                    if self.text.get(start..self.at) == Some("END") {
                        self.mode = Mode::Code;
                        return self.emit(TokenKind::KwEnd, start);
                    }
                }
                Some(_) => self.bump(1),
            }
        }
    }

    fn lex_export_list(&mut self) -> Token {
        loop {
            let start = self.at;
            match self.byte(0) {
                None => {
                    self.mode = Mode::Code;
                    return self.emit(TokenKind::Eof, start);
                }
                Some(b';') => {
                    self.bump(1);
                    self.mode = Mode::Code;
                    return self.emit(TokenKind::Semicolon, start);
                }
                Some(b'-') if self.at_comment() => self.comment(),
                Some(_) => self.bump(1),
            }
        }
    }

    fn word(&mut self) -> Token {
        let start = self.at;
        self.eat_word();
        let text = self.text.get(start..self.at).unwrap_or_default();
        if let Some(kind) = lookup_keyword(text) {
            match kind {
                TokenKind::KwMacro => self.mode = Mode::MacroBody,
                TokenKind::KwExports => self.mode = Mode::ExportList,
                _ => {}
            }
            return self.emit(kind, start);
        }
        if text.starts_with(|c: char| c.is_ascii_uppercase()) {
            self.emit(TokenKind::UppercaseIdent, start)
        } else {
            self.emit(TokenKind::LowercaseIdent, start)
        }
    }

    /// Digits after an optional sign already consumed from `start`.
    fn number(&mut self, start: usize, kind: TokenKind) -> Token {
        let digits = self.at;
        self.eat_while(|b| b.is_ascii_digit());
        if self.at - digits > 1 && self.byte_at(digits) == Some(b'0') {
            self.report(Severity::Warning, start, "leading zeros in number");
        }
        self.emit(kind, start)
    }

    fn byte_at(&self, index: usize) -> Option<u8> {
        self.text.as_bytes().get(index).copied()
    }

    /// A `"..."` literal; `""` inside it stands for one quote.
    fn quoted(&mut self) -> Token {
        let start = self.at;
        self.bump(1);
        loop {
            match self.byte(0) {
                None => {
                    self.report(Severity::Error, start, "unterminated string literal");
                    break;
                }
                Some(b'"') if self.byte(1) == Some(b'"') => self.bump(2),
                Some(b'"') => {
                    self.bump(1);
                    break;
                }
                Some(_) => self.bump(1),
            }
        }
        self.emit(TokenKind::QuotedString, start)
    }

    /// A `'...'H` or `'...'B` literal.
    fn radix_string(&mut self) -> Token {
        let start = self.at;
        self.bump(1);
        let digits = self.at;
        self.eat_while(|b| b != b'\'');
        let text = self.text;
        let body = &text.as_bytes()[digits..self.at];
        if self.byte(0).is_none() {
            self.report(Severity::Error, start, "unterminated hex/binary string");
            return self.emit(TokenKind::Error, start);
        }
        self.bump(1);

        let (kind, valid, what): (_, fn(u8) -> bool, _) = match self.byte(0) {
            Some(b'H' | b'h') => (TokenKind::HexString, |b: u8| b.is_ascii_hexdigit(), "hex"),
            Some(b'B' | b'b') => (TokenKind::BinString, |b: u8| b == b'0' || b == b'1', "binary"),
            _ => {
                self.report(
                    Severity::Error,
                    start,
                    "expected 'H' or 'B' suffix for hex/binary string",
                );
                return self.emit(TokenKind::Error, start);
            }
        };
        let bad = body.iter().any(|&b| !valid(b) && !b.is_ascii_whitespace());
        self.bump(1);
        if bad {
            self.report(Severity::Error, start, format!("invalid character in {what} string"));
        }
        self.emit(kind, start)
    }
}

fn punctuation(b: u8) -> Option<TokenKind> {
    Some(match b {
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b';' => TokenKind::Semicolon,
        b',' => TokenKind::Comma,
        b'|' => TokenKind::Pipe,
        b'<' => TokenKind::Less,
        _ => return None,
    })
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Clone, Debug, Default)]
pub struct LineIndex {
    /// Byte offset of the first character of every line.
    starts: Vec<ByteOffset>,
}

impl LineIndex {
    /// Build the index for `source`.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut starts = Vec::with_capacity(source.len() / 40 + 1);
        starts.push(0);
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                starts.push((i + 1) as ByteOffset);
            }
        }
        Self { starts }
    }

    /// 1-based line number containing `offset`.
    #[must_use]
    pub fn line(&self, offset: ByteOffset) -> u32 {
        match self.starts.binary_search(&offset) {
            Ok(idx) => u32::try_from(idx + 1).unwrap_or(u32::MAX),
            Err(idx) => u32::try_from(idx).unwrap_or(u32::MAX),
        }
    }

    /// 1-based `(line, column)` of `offset`.
    #[must_use]
    pub fn line_col(&self, offset: ByteOffset) -> (u32, u32) {
        let line = self.line(offset);
        let line_start = self.starts[(line - 1) as usize];
        (line, offset - line_start + 1)
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }
}
