//! Leaf nodes shared by the rest of the tree.

use crate::lexer::Span;
use alloc::string::String;

/// Identifier with source location.
///
/// Uppercase identifiers name modules, types and macros; lowercase ones name
/// values and enumeration labels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    /// The identifier text.
    pub name: String,
    /// Source location.
    pub span: Span,
}

impl Ident {
    /// Create a new identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Whether the identifier starts with an uppercase letter.
    #[must_use]
    pub fn is_uppercase(&self) -> bool {
        self.name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_uppercase())
    }
}

/// Quoted string literal, quotes stripped and `""` unescaped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuotedString {
    /// The string content.
    pub value: String,
    /// Source location, quotes included.
    pub span: Span,
}

/// `label(number)` inside `INTEGER { ... }` or `BITS { ... }`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedNumber {
    /// The label.
    pub name: Ident,
    /// The number.
    pub value: i128,
    /// Covers `label(number)`.
    pub span: Span,
}
