//! Tokens and byte spans.

use super::ByteOffset;

/// Half-open byte range `start..end` of the module text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    /// First byte.
    pub start: ByteOffset,
    /// One past the last byte.
    pub end: ByteOffset,
}

impl Span {
    /// Span used for symbols that do not come from source text.
    pub const SYNTHETIC: Span = Span { start: 0, end: 0 };

    #[must_use]
    pub const fn new(start: ByteOffset, end: ByteOffset) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    #[must_use]
    pub const fn len(&self) -> ByteOffset {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn cover(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Slice the span out of `source`, or `""` if it is out of range.
    #[must_use]
    pub fn slice(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

/// One scanned token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    /// What was scanned.
    pub kind: TokenKind,
    /// Where.
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Kinds of token.
///
/// Only the ASN.1 reserved words are keywords. Macro names (`OBJECT-TYPE`),
/// clause names (`SYNTAX`, `STATUS`) and SMI base types (`Counter32`) are
/// ordinary identifiers: the parser recognizes clauses by their text, and
/// base types are symbols imported from the SMI modules like any other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    /// Lexical error.
    Error = 0,
    /// End of input.
    Eof,

    /// Uppercase identifier (module names, type names, macro and clause names).
    UppercaseIdent,
    /// Lowercase identifier (value names, enumeration labels).
    LowercaseIdent,

    /// Decimal digits.
    Number,
    /// `-` directly followed by digits.
    NegativeNumber,
    /// `"..."`, possibly spanning lines.
    QuotedString,
    /// Hex string literal (`'...'H`).
    HexString,
    /// Binary string literal (`'...'B`).
    BinString,

    // punctuation
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `:`
    Colon,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `|`
    Pipe,
    /// `-`
    Minus,
    /// `<`
    Less,

    /// `..`
    DotDot,
    /// `::=`
    ColonColonEqual,

    // reserved words
    /// `ANY`
    KwAny,
    /// `APPLICATION`
    KwApplication,
    /// `BEGIN`
    KwBegin,
    /// `BITS`
    KwBits,
    /// `BOOLEAN`
    KwBoolean,
    /// `CHOICE`
    KwChoice,
    /// `COMPONENT`
    KwComponent,
    /// `COMPONENTS`
    KwComponents,
    /// `DEFINITIONS`
    KwDefinitions,
    /// `END`
    KwEnd,
    /// `ENUMERATED`
    KwEnumerated,
    /// `EXPLICIT`
    KwExplicit,
    /// `EXPORTS`
    KwExports,
    /// `FALSE`
    KwFalse,
    /// `FROM`
    KwFrom,
    /// `IDENTIFIER`
    KwIdentifier,
    /// `IMPLICIT`
    KwImplicit,
    /// `IMPORTS`
    KwImports,
    /// `INTEGER`
    KwInteger,
    /// `MACRO`
    KwMacro,
    /// `MAX`
    KwMax,
    /// `MIN`
    KwMin,
    /// `NULL`
    KwNull,
    /// `OBJECT`
    KwObject,
    /// `OCTET`
    KwOctet,
    /// `OF`
    KwOf,
    /// `PRIVATE`
    KwPrivate,
    /// `REAL`
    KwReal,
    /// `SEQUENCE`
    KwSequence,
    /// `SET`
    KwSet,
    /// `SIZE`
    KwSize,
    /// `STRING`
    KwString,
    /// `TAGS`
    KwTags,
    /// `TRUE`
    KwTrue,
    /// `UNIVERSAL`
    KwUniversal,
    /// `WITH`
    KwWith,
}

impl TokenKind {
    /// Check if this is an identifier token.
    #[must_use]
    pub const fn is_identifier(self) -> bool {
        matches!(self, Self::UppercaseIdent | Self::LowercaseIdent)
    }

    /// Check if this is a reserved keyword.
    #[must_use]
    pub const fn is_keyword(self) -> bool {
        (self as u8) >= (Self::KwAny as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_cover() {
        let a = Span::new(4, 9);
        let b = Span::new(2, 6);
        assert_eq!(a.cover(b), Span::new(2, 9));
    }

    #[test]
    fn test_span_slice_out_of_range() {
        assert_eq!(Span::new(3, 40).slice("short"), "");
        assert_eq!(Span::new(0, 5).slice("short"), "short");
    }

    #[test]
    fn test_keyword_classification() {
        assert!(TokenKind::KwWith.is_keyword());
        assert!(TokenKind::KwAny.is_keyword());
        assert!(!TokenKind::DotDot.is_keyword());
        assert!(TokenKind::LowercaseIdent.is_identifier());
    }
}
