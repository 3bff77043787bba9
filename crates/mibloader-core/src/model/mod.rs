//! Resolved data model.
//!
//! Modules own their symbols; symbols carry deferred type and value
//! expressions; object identifier values point into the shared [`OidTree`].

mod ids;
mod module;
mod oid;
mod symbol;
mod tree;
mod types;
mod value;

pub use ids::{ModuleId, NodeId, SymbolId};
pub use module::{Import, Module, ModuleState, SmiVersion};
pub use oid::{Oid, ParseOidError};
pub use symbol::{Deferred, Symbol, SymbolKind};
pub use tree::{should_warn_duplicate, Attach, NodeClaim, OidNode, OidTree, ROOT_NAMES};
pub use types::{
    Bound, Clause, ClauseContent, Constraint, Field, MacroType, Modifiers, NamedNumber, Tag,
    TagClass, TagMode, Type, TypeKind, TypeReference, ValueRange, MAX_REFERENCE_DEPTH,
};
pub use value::{OidArc, OidComponents, Value, ValueKey, ValueKind, ValueReference};
