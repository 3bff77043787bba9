//! Symbols and the deferred-resolution slot.

use super::ids::ModuleId;
use super::types::Type;
use super::value::Value;
use crate::diag::Location;
use crate::lexer::Span;
use alloc::string::String;
use core::mem;

/// A slot resolved exactly once.
///
/// [`begin`](Self::begin) moves the unresolved form out and leaves the slot
/// in `Resolving`; [`finish`](Self::finish) stores the result. A slot found
/// in `Resolving` while resolving something else is a reference cycle.
#[derive(Clone, Debug)]
pub enum Deferred<T> {
    /// Written by the analyzer, not yet resolved.
    Unresolved(T),
    /// Taken out for resolution.
    Resolving,
    /// Final form.
    Resolved(T),
}

impl<T> Deferred<T> {
    /// Take the unresolved form out, or `None` if the slot is resolving or
    /// already resolved (the slot is left unchanged).
    pub fn begin(&mut self) -> Option<T> {
        match mem::replace(self, Self::Resolving) {
            Self::Unresolved(value) => Some(value),
            other => {
                *self = other;
                None
            }
        }
    }

    /// Store the resolved form.
    pub fn finish(&mut self, value: T) {
        *self = Self::Resolved(value);
    }

    /// The resolved form.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match self {
            Self::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Either form, unless the slot is being resolved.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        match self {
            Self::Unresolved(value) | Self::Resolved(value) => Some(value),
            Self::Resolving => None,
        }
    }

    /// Whether the slot is in `Resolving`.
    #[must_use]
    pub fn is_resolving(&self) -> bool {
        matches!(self, Self::Resolving)
    }

    /// Whether the slot is in `Resolved`.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// What a symbol declares.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    /// `Name ::= Type`
    Type(Deferred<Type>),
    /// `name Type ::= value`
    Value {
        /// Declared type.
        ty: Deferred<Type>,
        /// Assigned value.
        value: Deferred<Value>,
    },
    /// `NAME MACRO ::= BEGIN ... END`
    Macro,
}

/// A named declaration.
#[derive(Clone, Debug)]
pub struct Symbol {
    /// Name.
    pub name: String,
    /// Owning module, `None` for default-context roots.
    pub module: Option<ModuleId>,
    /// Start of the declaration.
    pub location: Location,
    /// Last line of the declaration.
    pub end_line: u32,
    /// Source span of the whole assignment.
    pub span: Span,
    /// Comment preceding the declaration.
    pub comment: Option<String>,
    /// Declaration kind and its expressions.
    pub kind: SymbolKind,
    /// Enumeration labels are local: reachable only through a type context.
    pub local: bool,
}

impl Symbol {
    /// Create a symbol with an unknown position.
    #[must_use]
    pub fn new(name: impl Into<String>, module: Option<ModuleId>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            module,
            location: Location::unknown(),
            end_line: 0,
            span: Span::SYNTHETIC,
            comment: None,
            kind,
            local: false,
        }
    }

    /// Whether this is a type symbol.
    #[must_use]
    pub fn is_type(&self) -> bool {
        matches!(self.kind, SymbolKind::Type(_))
    }

    /// Whether this is a value symbol.
    #[must_use]
    pub fn is_value(&self) -> bool {
        matches!(self.kind, SymbolKind::Value { .. })
    }

    /// Whether this is a macro symbol.
    #[must_use]
    pub fn is_macro(&self) -> bool {
        matches!(self.kind, SymbolKind::Macro)
    }

    /// Resolved type of a type symbol, or declared type of a value symbol.
    #[must_use]
    pub fn ty(&self) -> Option<&Type> {
        match &self.kind {
            SymbolKind::Type(ty) | SymbolKind::Value { ty, .. } => ty.get(),
            SymbolKind::Macro => None,
        }
    }

    /// Resolved value of a value symbol.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            SymbolKind::Value { value, .. } => value.get(),
            _ => None,
        }
    }

    /// Whether every expression of the symbol is resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        match &self.kind {
            SymbolKind::Type(ty) => ty.is_resolved(),
            SymbolKind::Value { ty, value } => ty.is_resolved() && value.is_resolved(),
            SymbolKind::Macro => true,
        }
    }

    /// Line range `(first, last)` of the declaration.
    #[must_use]
    pub fn lines(&self) -> (u32, u32) {
        (self.location.line, self.end_line.max(self.location.line))
    }
}
