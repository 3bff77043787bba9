//! Resolved symbol store of one loader.

use crate::context::DefaultContext;
use crate::model::{Module, ModuleId, OidTree, Symbol, SymbolId};
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Modules by id and name, the default context, and the shared OID tree.
///
/// Slots of evicted modules stay empty, so a [`ModuleId`] never addresses a
/// different module later.
#[derive(Debug)]
pub struct ModuleCache {
    modules: Vec<Option<Module>>,
    by_name: BTreeMap<String, ModuleId>,
    defaults: DefaultContext,
    tree: OidTree,
}

impl Default for ModuleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleCache {
    /// An empty cache with fresh OID roots.
    #[must_use]
    pub fn new() -> Self {
        let tree = OidTree::new();
        let defaults = DefaultContext::new(&tree);
        Self {
            modules: Vec::new(),
            by_name: BTreeMap::new(),
            defaults,
            tree,
        }
    }

    /// Reserve a slot for a module about to be built.
    pub(crate) fn allocate(&mut self) -> Option<ModuleId> {
        let id = ModuleId::from_slot(self.modules.len())?;
        self.modules.push(None);
        Some(id)
    }

    /// Store a module in its reserved slot and index it by name.
    pub(crate) fn insert(&mut self, module: Module) {
        let id = module.id();
        if let Some(slot) = self.modules.get_mut(id.slot()) {
            self.by_name.insert(module.name().into(), id);
            *slot = Some(module);
        }
    }

    /// Evict a module: drop it, unindex it, and remove its OID claims.
    pub(crate) fn remove(&mut self, id: ModuleId) -> Option<Module> {
        let mut module = self.modules.get_mut(id.slot())?.take()?;
        if self.by_name.get(module.name()) == Some(&id) {
            self.by_name.remove(module.name());
        }
        self.tree.detach_module(id);
        module.clear();
        Some(module)
    }

    /// Module in slot `id`.
    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.slot()).and_then(Option::as_ref)
    }

    pub(crate) fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(id.slot()).and_then(Option::as_mut)
    }

    /// Module called `name`.
    #[must_use]
    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.module(self.id_of(name)?)
    }

    /// Slot of the module called `name`.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    /// Whether a module called `name` is cached.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Cached modules in slot order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().flatten()
    }

    /// Symbol at `id`, default-context roots included.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        match id.module {
            Some(module) => self.module(module)?.symbol_at(id.index),
            None => self.defaults.symbol(id.index),
        }
    }

    /// Mutable symbol at `id`. Default-context roots are immutable.
    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.module_mut(id.module?)?.symbol_at_mut(id.index)
    }

    /// The default context.
    #[must_use]
    pub fn defaults(&self) -> &DefaultContext {
        &self.defaults
    }

    /// The shared OID tree.
    #[must_use]
    pub fn tree(&self) -> &OidTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut OidTree {
        &mut self.tree
    }

    /// Modules whose import list names `name`.
    #[must_use]
    pub fn importers_of(&self, name: &str) -> Vec<ModuleId> {
        self.modules()
            .filter(|m| m.imports().iter().any(|i| i.name == name))
            .map(Module::id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Location;
    use crate::model::Import;

    #[test]
    fn test_insert_and_remove() {
        let mut cache = ModuleCache::new();
        let id = cache.allocate().unwrap();
        cache.insert(Module::new(id, "A-MIB", None, String::new()));
        assert!(cache.contains("A-MIB"));
        assert_eq!(cache.module_by_name("A-MIB").map(Module::id), Some(id));

        let removed = cache.remove(id).unwrap();
        assert_eq!(removed.name(), "A-MIB");
        assert!(!cache.contains("A-MIB"));
        assert!(cache.module(id).is_none());

        let next = cache.allocate().unwrap();
        assert_ne!(next, id);
    }

    #[test]
    fn test_importers_of() {
        let mut cache = ModuleCache::new();
        let a = cache.allocate().unwrap();
        let mut module = Module::new(a, "A", None, String::new());
        module.imports.push(Import::new("B", None, Location::unknown()));
        cache.insert(module);
        let b = cache.allocate().unwrap();
        cache.insert(Module::new(b, "B", None, String::new()));

        assert_eq!(cache.importers_of("B"), vec![a]);
        assert!(cache.importers_of("A").is_empty());
    }
}
