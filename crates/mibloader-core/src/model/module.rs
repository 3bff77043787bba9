//! Module container.
//!
//! A [`Module`] exclusively owns its symbols and lookup maps. Imports hold
//! only the [`ModuleId`] of their target, resolved during initialization.

use super::ids::{ModuleId, SymbolId};
use super::oid::Oid;
use super::symbol::Symbol;
use super::tree::OidTree;
use super::types::TagMode;
use super::value::ValueKey;
use crate::context::Context;
use crate::diag::Location;
use crate::lexer::{LineIndex, Span};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

/// SMI dialect of a module.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SmiVersion {
    /// SMIv1 (RFC 1155/1212/1215).
    #[default]
    V1,
    /// SMIv2 (RFC 2578/2579/2580).
    V2,
}

impl SmiVersion {
    /// 1 or 2.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

/// Resolution progress of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleState {
    /// Symbols created, nothing resolved.
    Parsed,
    /// Imports bound to their target modules.
    Initialized,
    /// Every symbol resolved.
    Validated,
}

/// An import declaration: `a, b FROM M`.
#[derive(Clone, Debug)]
pub struct Import {
    /// Target module name.
    pub name: String,
    /// Allowed symbol names; `None` allows every symbol of the target.
    pub symbols: Option<Vec<String>>,
    /// Added by the analyzer for a `MODULE` clause rather than written in
    /// the IMPORTS section.
    pub implicit: bool,
    /// Position of the target module name.
    pub location: Location,
    /// Target module, set during initialization.
    pub target: Option<ModuleId>,
}

impl Import {
    /// Create an unresolved import.
    #[must_use]
    pub fn new(name: impl Into<String>, symbols: Option<Vec<String>>, location: Location) -> Self {
        Self {
            name: name.into(),
            symbols,
            implicit: false,
            location,
            target: None,
        }
    }

    /// Whether `name` is on the allow-list.
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        self.symbols
            .as_ref()
            .is_none_or(|symbols| symbols.iter().any(|s| s == name))
    }
}

/// One compilation unit.
#[derive(Clone, Debug)]
pub struct Module {
    pub(crate) id: ModuleId,
    pub(crate) name: String,
    pub(crate) smi_version: SmiVersion,
    pub(crate) tagging: TagMode,
    pub(crate) file: Option<String>,
    pub(crate) on_disk: bool,
    pub(crate) text: String,
    pub(crate) lines: LineIndex,
    pub(crate) header_comment: Option<String>,
    pub(crate) footer_comment: Option<String>,
    pub(crate) imports: Vec<Import>,
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) by_name: BTreeMap<String, u32>,
    pub(crate) by_value: BTreeMap<ValueKey, u32>,
    pub(crate) loaded: bool,
    pub(crate) state: ModuleState,
    pub(crate) context: Rc<Context>,
}

impl Module {
    /// Create an empty module for the given source text.
    #[must_use]
    pub fn new(id: ModuleId, name: impl Into<String>, file: Option<String>, text: String) -> Self {
        let lines = LineIndex::new(&text);
        Self {
            id,
            name: name.into(),
            smi_version: SmiVersion::V1,
            tagging: TagMode::default(),
            file,
            on_disk: false,
            text,
            lines,
            header_comment: None,
            footer_comment: None,
            imports: Vec::new(),
            symbols: Vec::new(),
            by_name: BTreeMap::new(),
            by_value: BTreeMap::new(),
            loaded: false,
            state: ModuleState::Parsed,
            context: Rc::new(Context::Module(id)),
        }
    }

    /// Cache slot of this module.
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SMI dialect.
    #[must_use]
    pub fn smi_version(&self) -> SmiVersion {
        self.smi_version
    }

    /// Default tagging mode from the module header.
    #[must_use]
    pub fn tagging(&self) -> TagMode {
        self.tagging
    }

    /// File the module was read from.
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Whether [`file`](Self::file) is a path on disk rather than a label.
    #[must_use]
    pub fn is_on_disk(&self) -> bool {
        self.on_disk
    }

    /// Raw source text of the whole module.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Comment before the module header.
    #[must_use]
    pub fn header_comment(&self) -> Option<&str> {
        self.header_comment.as_deref()
    }

    /// Comment after the last declaration.
    #[must_use]
    pub fn footer_comment(&self) -> Option<&str> {
        self.footer_comment.as_deref()
    }

    /// Imports in declaration order, implicit ones last.
    #[must_use]
    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    /// Whether the module was requested explicitly rather than imported.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Resolution progress.
    #[must_use]
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// The standing lookup chain: own symbols, imports, default context.
    #[must_use]
    pub fn context(&self) -> &Rc<Context> {
        &self.context
    }

    /// Declared symbols in source order, enumeration labels excluded.
    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| !s.local)
    }

    /// Number of declared symbols.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols().count()
    }

    /// Symbol declared as `name`.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        let index = *self.by_name.get(name)?;
        self.symbols.get(index as usize)
    }

    /// Address of the symbol declared as `name`.
    #[must_use]
    pub fn symbol_id(&self, name: &str) -> Option<SymbolId> {
        self.by_name
            .get(name)
            .map(|&index| SymbolId::new(self.id, index))
    }

    /// Symbol at arena position `index`, labels included.
    #[must_use]
    pub fn symbol_at(&self, index: u32) -> Option<&Symbol> {
        self.symbols.get(index as usize)
    }

    pub(crate) fn symbol_at_mut(&mut self, index: u32) -> Option<&mut Symbol> {
        self.symbols.get_mut(index as usize)
    }

    /// Symbol whose value is exactly `key`. The first declared wins.
    #[must_use]
    pub fn symbol_by_value(&self, key: &ValueKey) -> Option<&Symbol> {
        let index = *self.by_value.get(key)?;
        self.symbols.get(index as usize)
    }

    /// Symbol whose OID is the longest prefix of `path` among this module's
    /// own values.
    #[must_use]
    pub fn symbol_by_oid(&self, path: &[u32]) -> Option<&Symbol> {
        (1..=path.len())
            .rev()
            .find_map(|len| self.symbol_by_value(&ValueKey::Oid(Oid::from(&path[..len]))))
    }

    /// Raw source text of one symbol's declaration.
    #[must_use]
    pub fn symbol_text(&self, symbol: &Symbol) -> &str {
        symbol.span.slice(&self.text)
    }

    /// The module's root symbol: its first declared value symbol, replaced
    /// by each ancestor node's owner while that owner belongs to this module.
    ///
    /// The first value symbol is returned as is when it does not own its
    /// node or its parent belongs to another module.
    #[must_use]
    pub fn root_symbol(&self, tree: &OidTree) -> Option<&Symbol> {
        let first = self.symbols().find(|s| s.is_value())?;
        let Some(mut node) = first.value().and_then(super::value::Value::as_oid) else {
            return Some(first);
        };
        let mut root = first;
        while let Some(parent) = tree.parent(node) {
            let Some(symbol) = tree
                .symbol(parent)
                .filter(|owner| owner.module == Some(self.id))
                .and_then(|owner| self.symbol_at(owner.index))
            else {
                break;
            };
            root = symbol;
            node = parent;
        }
        Some(root)
    }

    /// Source position of a byte offset span.
    #[must_use]
    pub fn location(&self, span: Span) -> Location {
        if span == Span::SYNTHETIC {
            return Location::new(self.file.clone(), 0, 0).with_on_disk(self.on_disk);
        }
        let (line, column) = self.lines.line_col(span.start);
        Location::new(self.file.clone(), line, column).with_on_disk(self.on_disk)
    }

    /// Last line touched by `span`.
    #[must_use]
    pub fn end_line(&self, span: Span) -> u32 {
        self.lines.line(span.end.saturating_sub(1).max(span.start))
    }

    /// Add a declared symbol. Returns `None` if the name is already taken.
    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> Option<SymbolId> {
        if self.by_name.contains_key(&symbol.name) {
            return None;
        }
        let index = self.push_symbol(symbol)?;
        let name = self.symbols[index as usize].name.clone();
        self.by_name.insert(name, index);
        Some(SymbolId::new(self.id, index))
    }

    /// Add an enumeration label, reachable only through its type.
    pub(crate) fn add_local(&mut self, mut symbol: Symbol) -> Option<SymbolId> {
        symbol.local = true;
        self.push_symbol(symbol).map(|index| SymbolId::new(self.id, index))
    }

    fn push_symbol(&mut self, symbol: Symbol) -> Option<u32> {
        let index = u32::try_from(self.symbols.len()).ok()?;
        self.symbols.push(symbol);
        Some(index)
    }

    /// Release everything the module owns.
    pub(crate) fn clear(&mut self) {
        self.imports.clear();
        self.symbols.clear();
        self.by_name.clear();
        self.by_value.clear();
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::symbol::{Deferred, SymbolKind};
    use crate::model::types::Type;
    use crate::model::value::Value;

    fn module() -> Module {
        let id = ModuleId::from_slot(0).unwrap();
        Module::new(id, "TEST-MIB", Some("TEST-MIB.txt".into()), "line one\nline two\n".into())
    }

    fn value_symbol(name: &str, value: Value) -> Symbol {
        Symbol::new(
            name,
            None,
            SymbolKind::Value {
                ty: Deferred::Resolved(Type::integer()),
                value: Deferred::Resolved(value),
            },
        )
    }

    #[test]
    fn test_add_symbol_rejects_duplicates() {
        let mut m = module();
        assert!(m.add_symbol(value_symbol("a", Value::number(1))).is_some());
        assert!(m.add_symbol(value_symbol("a", Value::number(2))).is_none());
        assert_eq!(m.symbol_count(), 1);
    }

    #[test]
    fn test_locals_hidden_from_name_map() {
        let mut m = module();
        m.add_symbol(value_symbol("a", Value::number(1)));
        let label = m.add_local(value_symbol("up", Value::number(1))).unwrap();
        assert!(m.symbol("up").is_none());
        assert_eq!(m.symbol_at(label.index).map(|s| s.name.as_str()), Some("up"));
        let names: Vec<_> = m.symbols().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_symbol_by_oid_longest_prefix() {
        let mut m = module();
        m.add_symbol(value_symbol("col", Value::number(0)));
        m.by_value.insert(ValueKey::Oid(Oid::new(vec![1, 3, 6, 1, 2])), 0);
        let found = m.symbol_by_oid(&[1, 3, 6, 1, 2, 7, 1]).map(|s| s.name.as_str());
        assert_eq!(found, Some("col"));
        assert!(m.symbol_by_oid(&[1, 3, 6]).is_none());
    }

    #[test]
    fn test_location() {
        let m = module();
        let loc = m.location(Span::new(10, 13));
        assert_eq!((loc.line, loc.column), (2, 2));
        assert_eq!(loc.file.as_deref(), Some("TEST-MIB.txt"));
        assert_eq!(m.end_line(Span::new(0, 15)), 2);
    }

    #[test]
    fn test_import_allow_list() {
        let open = Import::new("SNMPv2-SMI", None, Location::unknown());
        assert!(open.allows("anything"));
        let closed = Import::new("SNMPv2-SMI", Some(vec!["iso".into()]), Location::unknown());
        assert!(closed.allows("iso"));
        assert!(!closed.allows("org"));
    }
}
