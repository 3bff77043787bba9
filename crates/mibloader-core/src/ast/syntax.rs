//! Assignments, type and value syntax, macro invocations.

use super::{Ident, NamedNumber, QuotedString};
use crate::lexer::Span;
use crate::model::{Constraint, Tag, TagMode};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

/// A top-level assignment.
#[derive(Clone, Debug)]
pub struct Assignment {
    /// Assigned name.
    pub name: Ident,
    /// What is assigned.
    pub kind: AssignmentKind,
    /// Covers the whole assignment.
    pub span: Span,
}

/// The three assignment forms.
#[derive(Clone, Debug)]
pub enum AssignmentKind {
    /// `Name ::= Type`
    Type(TypeSyntax),
    /// `name Type ::= value`
    Value {
        /// Declared type, often a macro invocation.
        syntax: TypeSyntax,
        /// Assigned value.
        value: ValueSyntax,
    },
    /// `NAME MACRO ::= BEGIN ... END`
    Macro,
}

/// A type as written.
#[derive(Clone, Debug)]
pub enum TypeSyntax {
    /// `Name`, `Module.Name`, or `Name { a(1), b(2) }`.
    Reference {
        /// Qualifying module.
        module: Option<Ident>,
        /// Type name.
        name: Ident,
        /// Enumeration restriction.
        values: Vec<NamedNumber>,
        /// Source location.
        span: Span,
    },
    /// `INTEGER` or `INTEGER { ... }`
    Integer {
        /// Enumeration labels.
        values: Vec<NamedNumber>,
        /// Source location.
        span: Span,
    },
    /// `BITS { ... }`
    Bits {
        /// Named bits.
        values: Vec<NamedNumber>,
        /// Source location.
        span: Span,
    },
    /// `OCTET STRING`
    OctetString(Span),
    /// `OBJECT IDENTIFIER`
    ObjectIdentifier(Span),
    /// `NULL`
    Null(Span),
    /// `BOOLEAN`
    Boolean(Span),
    /// `REAL`
    Real(Span),
    /// `SEQUENCE { ... }`
    Sequence {
        /// Fields.
        fields: Vec<Field>,
        /// Source location.
        span: Span,
    },
    /// `SEQUENCE OF T`
    SequenceOf {
        /// Element type.
        element: Box<TypeSyntax>,
        /// Source location.
        span: Span,
    },
    /// `CHOICE { ... }`
    Choice {
        /// Alternatives.
        fields: Vec<Field>,
        /// Source location.
        span: Span,
    },
    /// `[class n] [IMPLICIT|EXPLICIT] T`
    Tagged {
        /// The tag.
        tag: Tag,
        /// Written mode; the module default applies when absent.
        mode: Option<TagMode>,
        /// Tagged type.
        inner: Box<TypeSyntax>,
        /// Source location.
        span: Span,
    },
    /// `T (constraint)`
    Constrained {
        /// Constrained type.
        base: Box<TypeSyntax>,
        /// The constraint.
        constraint: Constraint,
        /// Source location.
        span: Span,
    },
    /// `MACRO-NAME clause*`
    Macro(MacroInvocation),
    /// A legacy construct the loader does not model.
    Unsupported {
        /// Construct name, e.g. `SET OF`.
        construct: &'static str,
        /// Source location.
        span: Span,
    },
}

impl TypeSyntax {
    /// Source location.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Reference { span, .. }
            | Self::Integer { span, .. }
            | Self::Bits { span, .. }
            | Self::Sequence { span, .. }
            | Self::SequenceOf { span, .. }
            | Self::Choice { span, .. }
            | Self::Tagged { span, .. }
            | Self::Constrained { span, .. }
            | Self::Unsupported { span, .. }
            | Self::OctetString(span)
            | Self::ObjectIdentifier(span)
            | Self::Null(span)
            | Self::Boolean(span)
            | Self::Real(span) => *span,
            Self::Macro(m) => m.span,
        }
    }
}

/// A SEQUENCE or CHOICE field.
#[derive(Clone, Debug)]
pub struct Field {
    /// Field name.
    pub name: Ident,
    /// Field type.
    pub syntax: TypeSyntax,
}

/// A macro invocation such as `OBJECT-TYPE SYNTAX ... STATUS ...`.
#[derive(Clone, Debug)]
pub struct MacroInvocation {
    /// Macro name.
    pub name: Ident,
    /// Clauses in source order.
    pub clauses: Vec<ClauseSyntax>,
    /// Source location.
    pub span: Span,
}

/// One `KEYWORD content` clause.
#[derive(Clone, Debug)]
pub struct ClauseSyntax {
    /// Clause keyword.
    pub keyword: Ident,
    /// Content, shaped by the keyword.
    pub body: ClauseBody,
}

/// Clause contents.
#[derive(Clone, Debug)]
pub enum ClauseBody {
    /// `SYNTAX Type`
    Type(TypeSyntax),
    /// `DESCRIPTION "..."`
    Text(QuotedString),
    /// `STATUS current`
    Ident(Ident),
    /// `INDEX { a, b }`
    Values(Vec<ValueSyntax>),
    /// `DEFVAL { v }`, `GROUP name`
    Value(ValueSyntax),
    /// `MODULE [Name [oid]]`, `SUPPORTS Name`
    Module {
        /// Named module; `None` is the current module.
        name: Option<Ident>,
        /// Optional module object identifier.
        oid: Option<ValueSyntax>,
    },
}

/// One component of a braced value.
#[derive(Clone, Debug)]
pub struct Component {
    /// Qualifying module of a `Module.name` component.
    pub module: Option<Ident>,
    /// Name part.
    pub name: Option<Ident>,
    /// Number part.
    pub number: Option<u32>,
    /// Source location.
    pub span: Span,
}

/// A value as written.
#[derive(Clone, Debug)]
pub enum ValueSyntax {
    /// `name` or `Module.name`
    Reference {
        /// Qualifying module.
        module: Option<Ident>,
        /// Value name.
        name: Ident,
    },
    /// A decimal number.
    Number(i128, Span),
    /// `'..'H` or `'..'B`
    Binary {
        /// Digits between the quotes.
        digits: String,
        /// 16 or 2.
        radix: u32,
        /// Source location.
        span: Span,
    },
    /// A quoted string.
    String(QuotedString),
    /// `TRUE` or `FALSE`.
    Boolean(bool, Span),
    /// `NULL`
    Null(Span),
    /// `{ ... }`: object identifier components or a set of bit labels.
    Braced {
        /// Components.
        components: Vec<Component>,
        /// Whether components were separated by commas.
        separated: bool,
        /// Source location.
        span: Span,
    },
}

impl ValueSyntax {
    /// Source location.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Reference { module, name } => module
                .as_ref()
                .map_or(name.span, |m| m.span.cover(name.span)),
            Self::Number(_, span)
            | Self::Boolean(_, span)
            | Self::Null(span)
            | Self::Binary { span, .. }
            | Self::Braced { span, .. } => *span,
            Self::String(s) => s.span,
        }
    }
}
