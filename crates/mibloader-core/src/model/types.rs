//! Type expressions.
//!
//! A [`Type`] is built by the analyzer with [`TypeKind::Reference`] nodes
//! standing in for every named type. Resolution replaces each reference with
//! a copy of its target's resolved node, re-applying the modifiers written at
//! the point of use, and records the target in [`Type::reference`].

use super::ids::SymbolId;
use super::value::{Value, ValueKind};
use crate::context::Context;
use crate::lexer::Span;
use crate::loader::ModuleCache;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Tag class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagClass {
    /// `[UNIVERSAL n]`
    Universal,
    /// `[APPLICATION n]`
    Application,
    /// `[n]`
    Context,
    /// `[PRIVATE n]`
    Private,
}

/// One entry of a tag chain: category plus number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Category.
    pub class: TagClass,
    /// Number within the category.
    pub number: u32,
}

impl Tag {
    /// Create a tag.
    #[must_use]
    pub const fn new(class: TagClass, number: u32) -> Self {
        Self { class, number }
    }

    /// `[UNIVERSAL number]`
    #[must_use]
    pub const fn universal(number: u32) -> Self {
        Self::new(TagClass::Universal, number)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class {
            TagClass::Universal => write!(f, "[UNIVERSAL {}]", self.number),
            TagClass::Application => write!(f, "[APPLICATION {}]", self.number),
            TagClass::Context => write!(f, "[{}]", self.number),
            TagClass::Private => write!(f, "[PRIVATE {}]", self.number),
        }
    }
}

/// Tagging mode of a tagged type or a module default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagMode {
    /// Prepend the new tag to the chain.
    Explicit,
    /// Replace the first entry of the chain.
    #[default]
    Implicit,
}

/// A bound of a range constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    /// `MIN`
    Min,
    /// `MAX`
    Max,
    /// A number.
    Number(i128),
}

/// One alternative of a constraint: a single value or a range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueRange {
    /// Lower bound, or the single value.
    pub lower: Bound,
    /// Upper bound for a range.
    pub upper: Option<Bound>,
}

impl ValueRange {
    /// Whether `n` lies within this alternative.
    #[must_use]
    pub fn contains(&self, n: i128) -> bool {
        let lo = self.lower.to_i128();
        let hi = self.upper.unwrap_or(self.lower).to_i128();
        lo <= n && n <= hi
    }
}

impl Bound {
    fn to_i128(self) -> i128 {
        match self {
            Self::Min => i128::MIN,
            Self::Max => i128::MAX,
            Self::Number(n) => n,
        }
    }
}

/// Subtype constraint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
    /// `(a..b | c)` on the value itself.
    Values(Vec<ValueRange>),
    /// `(SIZE (a..b | c))` on the length of a string.
    Size(Vec<ValueRange>),
}

impl Constraint {
    fn allows(ranges: &[ValueRange], n: i128) -> bool {
        ranges.is_empty() || ranges.iter().any(|r| r.contains(n))
    }

    /// Whether a numeric value satisfies a value constraint.
    #[must_use]
    pub fn allows_value(&self, n: i128) -> bool {
        match self {
            Self::Values(ranges) => Self::allows(ranges, n),
            Self::Size(_) => true,
        }
    }

    /// Whether a length satisfies a size constraint.
    #[must_use]
    pub fn allows_size(&self, len: usize) -> bool {
        match self {
            Self::Size(ranges) => {
                Self::allows(ranges, i128::try_from(len).unwrap_or(i128::MAX))
            }
            Self::Values(_) => true,
        }
    }
}

/// A labelled number of an enumerated INTEGER or a BITS type.
///
/// Each label is also a module-local value symbol so that names written
/// inside the type (e.g. in `DEFVAL`) resolve through a type context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedNumber {
    /// Label.
    pub name: String,
    /// Number or bit position.
    pub value: i128,
    /// The local value symbol carrying this label.
    pub symbol: Option<SymbolId>,
}

/// A field of a SEQUENCE or CHOICE.
#[derive(Clone, Debug)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub ty: Type,
}

/// Modifiers written next to a type reference, re-applied to the target's
/// node once the reference resolves.
#[derive(Clone, Debug, Default)]
pub struct Modifiers {
    /// Tags, innermost first.
    pub tags: Vec<(TagMode, Tag)>,
    /// Subtype constraint.
    pub constraint: Option<Constraint>,
    /// Enumeration restriction.
    pub values: Option<Vec<NamedNumber>>,
}

/// An unresolved type reference.
#[derive(Clone, Debug)]
pub struct TypeReference {
    /// Lexical context at the point of use.
    pub context: Rc<Context>,
    /// Referenced name.
    pub name: String,
    /// Source span of the name.
    pub span: Span,
    /// Modifiers written at the point of use.
    pub modifiers: Modifiers,
}

/// Contents of one macro clause, keyed by the clause keyword.
#[derive(Clone, Debug)]
pub enum ClauseContent {
    /// `SYNTAX`, `WRITE-SYNTAX`
    Type(Type),
    /// `DESCRIPTION`, `REFERENCE`, `UNITS`, ...
    Text(String),
    /// `STATUS`, `ACCESS`, `MAX-ACCESS`, `MIN-ACCESS`
    Ident(String),
    /// `INDEX`, `OBJECTS`, `VARIABLES`, ...
    Values(Vec<Value>),
    /// `AUGMENTS`, `DEFVAL`, `ENTERPRISE`, ...
    Value(Value),
    /// `MODULE`, `SUPPORTS`; `None` is the current module.
    Module(Option<String>),
}

/// One clause of a macro invocation.
#[derive(Clone, Debug)]
pub struct Clause {
    /// Clause keyword, e.g. `SYNTAX`.
    pub keyword: String,
    /// Clause contents.
    pub content: ClauseContent,
}

/// Opaque node for an SMI macro invocation (`OBJECT-TYPE`,
/// `TEXTUAL-CONVENTION`, `TRAP-TYPE`, ...).
#[derive(Clone, Debug)]
pub struct MacroType {
    /// Macro name.
    pub name: String,
    /// Clauses in source order.
    pub clauses: Vec<Clause>,
}

impl MacroType {
    /// Create a macro node without clauses.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clauses: Vec::new(),
        }
    }

    /// First clause with `keyword`.
    #[must_use]
    pub fn clause(&self, keyword: &str) -> Option<&ClauseContent> {
        self.clauses
            .iter()
            .find(|c| c.keyword == keyword)
            .map(|c| &c.content)
    }

    /// All clauses with `keyword`, in source order.
    pub fn clauses<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a ClauseContent> {
        self.clauses
            .iter()
            .filter(move |c| c.keyword == keyword)
            .map(|c| &c.content)
    }

    fn text(&self, keyword: &str) -> Option<&str> {
        match self.clause(keyword)? {
            ClauseContent::Text(text) | ClauseContent::Ident(text) => Some(text),
            _ => None,
        }
    }

    /// `SYNTAX` clause.
    #[must_use]
    pub fn syntax(&self) -> Option<&Type> {
        match self.clause("SYNTAX")? {
            ClauseContent::Type(ty) => Some(ty),
            _ => None,
        }
    }

    /// `STATUS` clause.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.text("STATUS")
    }

    /// `MAX-ACCESS` or `ACCESS` clause.
    #[must_use]
    pub fn access(&self) -> Option<&str> {
        self.text("MAX-ACCESS").or_else(|| self.text("ACCESS"))
    }

    /// `DESCRIPTION` clause.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.text("DESCRIPTION")
    }

    /// `INDEX` clause.
    #[must_use]
    pub fn index(&self) -> Option<&[Value]> {
        match self.clause("INDEX")? {
            ClauseContent::Values(values) => Some(values),
            _ => None,
        }
    }

    /// `DEFVAL` clause.
    #[must_use]
    pub fn defval(&self) -> Option<&Value> {
        match self.clause("DEFVAL")? {
            ClauseContent::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Whether `value` may be assigned to a symbol declared with this macro.
    ///
    /// `TRAP-TYPE` takes a trap number, `TEXTUAL-CONVENTION` defers to its
    /// syntax, every other macro takes an object identifier.
    #[must_use]
    pub fn is_compatible(&self, value: &Value) -> bool {
        match self.name.as_str() {
            "TRAP-TYPE" => matches!(
                value.kind,
                ValueKind::Number(_) | ValueKind::Placeholder | ValueKind::Reference(_)
            ),
            "TEXTUAL-CONVENTION" => self.syntax().is_none_or(|ty| ty.is_compatible(value)),
            _ => matches!(
                value.kind,
                ValueKind::Oid(_)
                    | ValueKind::OidComponents(_)
                    | ValueKind::Placeholder
                    | ValueKind::Reference(_)
            ),
        }
    }
}

/// The shape of a type.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// Not yet resolved.
    Reference(TypeReference),
    /// `INTEGER`, optionally enumerated.
    Integer {
        /// Enumeration labels.
        values: Vec<NamedNumber>,
    },
    /// `BITS { ... }`
    Bits {
        /// Named bit positions.
        values: Vec<NamedNumber>,
    },
    /// `OCTET STRING`
    OctetString,
    /// `OBJECT IDENTIFIER`
    ObjectIdentifier,
    /// `NULL`
    Null,
    /// `BOOLEAN`
    Boolean,
    /// `REAL`
    Real,
    /// `SEQUENCE { ... }`
    Sequence {
        /// Fields.
        fields: Vec<Field>,
    },
    /// `SEQUENCE OF T`
    SequenceOf(Box<Type>),
    /// `CHOICE { ... }`
    Choice {
        /// Alternatives.
        fields: Vec<Field>,
    },
    /// An SMI macro invocation.
    Macro(MacroType),
    /// Neutral substitute for a type that failed to resolve.
    Placeholder,
}

/// A type expression.
#[derive(Clone, Debug)]
pub struct Type {
    /// Shape.
    pub kind: TypeKind,
    /// Tag chain; index 0 is the outermost tag.
    pub tags: Vec<Tag>,
    /// Subtype constraint.
    pub constraint: Option<Constraint>,
    /// The type symbol this node was copied from, once resolved.
    pub reference: Option<SymbolId>,
    /// Whether the node was written as a built-in type rather than a name.
    pub primitive: bool,
    /// Comment attached to the node.
    pub comment: Option<String>,
}

impl Type {
    /// Create a node of `kind` carrying its universal tag.
    #[must_use]
    pub fn new(kind: TypeKind) -> Self {
        let universal = match &kind {
            TypeKind::Boolean => Some(1),
            TypeKind::Integer { .. } => Some(2),
            TypeKind::Bits { .. } => Some(3),
            TypeKind::OctetString => Some(4),
            TypeKind::Null => Some(5),
            TypeKind::ObjectIdentifier => Some(6),
            TypeKind::Real => Some(9),
            TypeKind::Sequence { .. } | TypeKind::SequenceOf(_) => Some(16),
            _ => None,
        };
        let primitive = !matches!(
            kind,
            TypeKind::Reference(_) | TypeKind::Macro(_) | TypeKind::Placeholder
        );
        Self {
            kind,
            tags: universal.map(Tag::universal).into_iter().collect(),
            constraint: None,
            reference: None,
            primitive,
            comment: None,
        }
    }

    /// The neutral substitute for an unresolvable type.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(TypeKind::Placeholder)
    }

    /// Plain `INTEGER`.
    #[must_use]
    pub fn integer() -> Self {
        Self::new(TypeKind::Integer { values: Vec::new() })
    }

    /// An unresolved reference to `name` in `context`.
    #[must_use]
    pub fn reference(context: Rc<Context>, name: impl Into<String>, span: Span) -> Self {
        Self::new(TypeKind::Reference(TypeReference {
            context,
            name: name.into(),
            span,
            modifiers: Modifiers::default(),
        }))
    }

    /// Whether this is the neutral placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, TypeKind::Placeholder)
    }

    /// Whether this node is still an unresolved reference.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Reference(_))
    }

    /// Tag chain, outermost first.
    #[must_use]
    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Apply a tag: EXPLICIT prepends it, IMPLICIT replaces the outermost
    /// entry and keeps the rest.
    pub fn apply_tag(&mut self, mode: TagMode, tag: Tag) {
        match mode {
            TagMode::Explicit => self.tags.insert(0, tag),
            TagMode::Implicit => match self.tags.first_mut() {
                Some(first) => *first = tag,
                None => self.tags.push(tag),
            },
        }
    }

    /// The `SYNTAX` of a macro node.
    #[must_use]
    pub fn syntax(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Macro(m) => m.syntax(),
            _ => None,
        }
    }

    /// The macro node, if this is one.
    #[must_use]
    pub fn as_macro(&self) -> Option<&MacroType> {
        match &self.kind {
            TypeKind::Macro(m) => Some(m),
            _ => None,
        }
    }

    /// Enumeration labels or named bits, looking through a macro's syntax.
    #[must_use]
    pub fn named_numbers(&self) -> &[NamedNumber] {
        match &self.kind {
            TypeKind::Integer { values } | TypeKind::Bits { values } => values,
            TypeKind::Macro(m) => m.syntax().map_or(&[], Type::named_numbers),
            TypeKind::Reference(r) => r.modifiers.values.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Look up an enumeration label or named bit.
    #[must_use]
    pub fn named_number(&self, name: &str) -> Option<&NamedNumber> {
        self.named_numbers().iter().find(|n| n.name == name)
    }

    /// Whether this node was reached through a type symbol called `name`,
    /// directly or through any link of the reference chain.
    #[must_use]
    pub fn references_symbol(&self, cache: &ModuleCache, name: &str) -> bool {
        let mut current = self.reference;
        let mut depth = 0;
        while let Some(id) = current {
            let Some(symbol) = cache.symbol(id) else {
                return false;
            };
            if symbol.name == name {
                return true;
            }
            depth += 1;
            if depth > MAX_REFERENCE_DEPTH {
                return false;
            }
            current = symbol.ty().and_then(|t| t.reference);
        }
        false
    }

    /// Whether `value` may be assigned to this type, constraints included.
    #[must_use]
    pub fn is_compatible(&self, value: &Value) -> bool {
        if matches!(value.kind, ValueKind::Placeholder | ValueKind::Reference(_)) {
            return true;
        }
        match &self.kind {
            TypeKind::Placeholder | TypeKind::Reference(_) => true,
            TypeKind::Integer { values } => match value.as_number() {
                Some(n) => {
                    (values.is_empty() || values.iter().any(|v| v.value == n))
                        && self.constraint.as_ref().is_none_or(|c| c.allows_value(n))
                }
                None => false,
            },
            TypeKind::Bits { values } => match &value.kind {
                ValueKind::Bits(labels) => labels
                    .iter()
                    .all(|l| values.is_empty() || values.iter().any(|v| &v.name == l)),
                ValueKind::Binary { .. } => true,
                _ => false,
            },
            TypeKind::OctetString => match value.octet_len() {
                Some(len) => self.constraint.as_ref().is_none_or(|c| c.allows_size(len)),
                None => false,
            },
            TypeKind::ObjectIdentifier => {
                matches!(value.kind, ValueKind::Oid(_) | ValueKind::OidComponents(_))
            }
            TypeKind::Null => matches!(value.kind, ValueKind::Null),
            TypeKind::Boolean => matches!(value.kind, ValueKind::Boolean(_)),
            TypeKind::Real => matches!(value.kind, ValueKind::Number(_)),
            TypeKind::Sequence { .. } | TypeKind::SequenceOf(_) | TypeKind::Choice { .. } => {
                false
            }
            TypeKind::Macro(m) => m.is_compatible(value),
        }
    }
}

/// Bound on reference-chain walks.
pub const MAX_REFERENCE_DEPTH: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::Value;

    fn tagged(tags: &[Tag]) -> Type {
        let mut ty = Type::integer();
        ty.tags = tags.to_vec();
        ty
    }

    const A: Tag = Tag::new(TagClass::Application, 1);
    const B: Tag = Tag::new(TagClass::Context, 7);
    const C: Tag = Tag::new(TagClass::Private, 3);

    #[test]
    fn test_explicit_tag_prepends() {
        let mut ty = tagged(&[A]);
        ty.apply_tag(TagMode::Explicit, B);
        assert_eq!(ty.tags(), &[B, A]);
    }

    #[test]
    fn test_implicit_tag_replaces_first() {
        let mut ty = tagged(&[A]);
        ty.apply_tag(TagMode::Implicit, B);
        assert_eq!(ty.tags(), &[B]);

        let mut ty = tagged(&[A, C]);
        ty.apply_tag(TagMode::Implicit, B);
        assert_eq!(ty.tags(), &[B, C]);
    }

    #[test]
    fn test_implicit_tag_on_untagged() {
        let mut ty = tagged(&[]);
        ty.apply_tag(TagMode::Implicit, B);
        assert_eq!(ty.tags(), &[B]);
    }

    #[test]
    fn test_universal_tags() {
        assert_eq!(Type::integer().tags(), &[Tag::universal(2)]);
        assert_eq!(Type::new(TypeKind::OctetString).tags(), &[Tag::universal(4)]);
        assert!(Type::placeholder().tags().is_empty());
        assert!(Type::integer().primitive);
        assert!(!Type::placeholder().primitive);
    }

    #[test]
    fn test_integer_compatibility() {
        let mut ty = Type::integer();
        ty.constraint = Some(Constraint::Values(vec![ValueRange {
            lower: Bound::Number(0),
            upper: Some(Bound::Number(10)),
        }]));
        assert!(ty.is_compatible(&Value::number(5)));
        assert!(!ty.is_compatible(&Value::number(11)));
        assert!(!ty.is_compatible(&Value::string("x")));
        assert!(ty.is_compatible(&Value::placeholder()));
    }

    #[test]
    fn test_enumeration_compatibility() {
        let ty = Type::new(TypeKind::Integer {
            values: vec![NamedNumber {
                name: "up".into(),
                value: 1,
                symbol: None,
            }],
        });
        assert!(ty.is_compatible(&Value::number(1)));
        assert!(!ty.is_compatible(&Value::number(2)));
        assert_eq!(ty.named_number("up").map(|n| n.value), Some(1));
    }

    #[test]
    fn test_size_constraint() {
        let mut ty = Type::new(TypeKind::OctetString);
        ty.constraint = Some(Constraint::Size(vec![ValueRange {
            lower: Bound::Number(0),
            upper: Some(Bound::Number(4)),
        }]));
        assert!(ty.is_compatible(&Value::string("abcd")));
        assert!(!ty.is_compatible(&Value::string("abcde")));
        assert!(ty.is_compatible(&Value::binary("0a0b", 16)));
    }

    #[test]
    fn test_range_bounds() {
        let range = ValueRange {
            lower: Bound::Min,
            upper: Some(Bound::Number(-1)),
        };
        assert!(range.contains(-100));
        assert!(!range.contains(0));
        let single = ValueRange {
            lower: Bound::Number(7),
            upper: None,
        };
        assert!(single.contains(7));
        assert!(!single.contains(8));
        let open = ValueRange {
            lower: Bound::Number(1),
            upper: Some(Bound::Max),
        };
        assert!(open.contains(i128::from(u64::MAX)));
    }

    #[test]
    fn test_macro_compatibility() {
        let trap = Type::new(TypeKind::Macro(MacroType::new("TRAP-TYPE")));
        assert!(trap.is_compatible(&Value::number(3)));
        let object = Type::new(TypeKind::Macro(MacroType::new("OBJECT-TYPE")));
        assert!(!object.is_compatible(&Value::number(3)));
        assert!(trap.is_compatible(&Value::placeholder()));
    }
}
