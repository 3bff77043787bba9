//! Value expressions.

use super::ids::{NodeId, SymbolId};
use super::oid::Oid;
use crate::context::Context;
use crate::lexer::Span;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// An unresolved value reference.
#[derive(Clone, Debug)]
pub struct ValueReference {
    /// Lexical context at the point of use.
    pub context: Rc<Context>,
    /// Referenced name.
    pub name: String,
    /// Source span of the name.
    pub span: Span,
}

/// A numbered arc of an object identifier value, e.g. `org(3)` or `3`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidArc {
    /// Label written next to the number.
    pub name: Option<String>,
    /// Arc number.
    pub number: u32,
}

/// An object identifier value before its arcs are attached to the tree.
///
/// `{ ifEntry 1 }` has parent `ifEntry` and one arc; `{ 1 3 6 }` has no
/// parent and starts at a fixed root.
#[derive(Clone, Debug)]
pub struct OidComponents {
    /// Leading name-only component naming the parent value.
    pub parent: Option<ValueReference>,
    /// Numbered arcs following the parent.
    pub arcs: Vec<OidArc>,
}

/// The shape of a value.
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// Not yet resolved.
    Reference(ValueReference),
    /// A decimal number.
    Number(i128),
    /// A `'..'H` or `'..'B` string.
    Binary {
        /// Digits without quotes and suffix.
        digits: String,
        /// 16 or 2.
        radix: u32,
    },
    /// A quoted string.
    String(String),
    /// `TRUE` or `FALSE`.
    Boolean(bool),
    /// `NULL`
    Null,
    /// A set of bit labels, `{ a, b }`.
    Bits(Vec<String>),
    /// An object identifier not yet attached to the tree.
    OidComponents(OidComponents),
    /// An object identifier attached to the tree.
    Oid(NodeId),
    /// Neutral substitute for a value that failed to resolve.
    Placeholder,
}

/// A value expression.
#[derive(Clone, Debug)]
pub struct Value {
    /// Shape.
    pub kind: ValueKind,
    /// The value symbol this node was copied from, once resolved.
    pub reference: Option<SymbolId>,
}

impl Value {
    /// Wrap a kind without a back-reference.
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            reference: None,
        }
    }

    /// A decimal number.
    #[must_use]
    pub fn number(n: i128) -> Self {
        Self::new(ValueKind::Number(n))
    }

    /// A quoted string.
    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::new(ValueKind::String(s.into()))
    }

    /// A hex or binary string.
    #[must_use]
    pub fn binary(digits: impl Into<String>, radix: u32) -> Self {
        Self::new(ValueKind::Binary {
            digits: digits.into(),
            radix,
        })
    }

    /// An attached object identifier.
    #[must_use]
    pub fn oid(node: NodeId) -> Self {
        Self::new(ValueKind::Oid(node))
    }

    /// The neutral substitute for an unresolvable value.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(ValueKind::Placeholder)
    }

    /// An unresolved reference to `name` in `context`.
    #[must_use]
    pub fn reference(context: Rc<Context>, name: impl Into<String>, span: Span) -> Self {
        Self::new(ValueKind::Reference(ValueReference {
            context,
            name: name.into(),
            span,
        }))
    }

    /// Whether this is the neutral placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, ValueKind::Placeholder)
    }

    /// Whether this node is still unresolved.
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Reference(_) | ValueKind::OidComponents(_)
        )
    }

    /// Tree node of an attached object identifier.
    #[must_use]
    pub fn as_oid(&self) -> Option<NodeId> {
        match self.kind {
            ValueKind::Oid(node) => Some(node),
            _ => None,
        }
    }

    /// Numeric value of a number or a short enough hex/binary string.
    #[must_use]
    pub fn as_number(&self) -> Option<i128> {
        match &self.kind {
            ValueKind::Number(n) => Some(*n),
            ValueKind::Binary { digits, radix } if !digits.is_empty() => {
                let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
                i128::from_str_radix(&digits, *radix).ok()
            }
            _ => None,
        }
    }

    /// Length in octets of a string value.
    #[must_use]
    pub fn octet_len(&self) -> Option<usize> {
        match &self.kind {
            ValueKind::String(s) => Some(s.len()),
            ValueKind::Binary { digits, radix } => {
                let count = digits.chars().filter(|c| !c.is_whitespace()).count();
                let per_octet = if *radix == 16 { 2 } else { 8 };
                Some(count.div_ceil(per_octet))
            }
            _ => None,
        }
    }
}

/// Key of a module's by-value map: a number or a numeric OID path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    /// A numeric value.
    Number(i128),
    /// An object identifier path.
    Oid(Oid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_as_number() {
        assert_eq!(Value::binary("ff", 16).as_number(), Some(255));
        assert_eq!(Value::binary("0101", 2).as_number(), Some(5));
        assert_eq!(Value::binary("", 16).as_number(), None);
        assert_eq!(Value::binary("zz", 16).as_number(), None);
    }

    #[test]
    fn test_octet_len() {
        assert_eq!(Value::string("abc").octet_len(), Some(3));
        assert_eq!(Value::binary("0a0b0", 16).octet_len(), Some(3));
        assert_eq!(Value::binary("101", 2).octet_len(), Some(1));
        assert_eq!(Value::binary("", 16).octet_len(), Some(0));
        assert_eq!(Value::number(1).octet_len(), None);
    }

    #[test]
    fn test_value_key_order() {
        let a = ValueKey::Oid(Oid::new(vec![1, 3]));
        let b = ValueKey::Oid(Oid::new(vec![1, 3, 6]));
        assert!(a < b);
        assert!(ValueKey::Number(7) < a);
    }
}
