//! Module-level syntax nodes.

use super::{Assignment, Ident};
use crate::lexer::{Comment, Diagnostic, Severity, Span};
use crate::model::TagMode;
use alloc::vec::Vec;

/// A parsed module.
///
/// ```text
/// ModuleName DEFINITIONS [EXPLICIT|IMPLICIT TAGS] ::= BEGIN
///     IMPORTS ... ;
///     <assignments>
/// END
/// ```
#[derive(Clone, Debug)]
pub struct Module {
    /// Module name.
    pub name: Ident,
    /// Default tagging from the header, if written.
    pub tagging: Option<TagMode>,
    /// Import groups in source order.
    pub imports: Vec<ImportClause>,
    /// Assignments in source order.
    pub body: Vec<Assignment>,
    /// Span of the whole module, header to `END`.
    pub span: Span,
    /// Every `--` comment of the source.
    pub comments: Vec<Comment>,
    /// Lexical and syntax diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

impl Module {
    /// Create an empty module.
    #[must_use]
    pub fn new(name: Ident, span: Span) -> Self {
        Self {
            name,
            tagging: None,
            imports: Vec::new(),
            body: Vec::new(),
            span,
            comments: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Check if this module has syntax errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// One `<symbols> FROM <module>` group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportClause {
    /// Imported names.
    pub symbols: Vec<Ident>,
    /// Source module name.
    pub from_module: Ident,
    /// Covers the whole group.
    pub span: Span,
}
