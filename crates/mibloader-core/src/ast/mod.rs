//! Syntax tree of one parsed module.
//!
//! Nodes mirror the source as written and carry spans. The analyzer turns
//! the tree into a [`crate::model::Module`] with unresolved references.

mod common;
mod module;
mod syntax;

pub use common::{Ident, NamedNumber, QuotedString};
pub use module::{ImportClause, Module};
pub use syntax::{
    Assignment, AssignmentKind, ClauseBody, ClauseSyntax, Component, Field, MacroInvocation,
    TypeSyntax, ValueSyntax,
};
