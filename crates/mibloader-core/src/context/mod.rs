//! Scoped symbol lookup.
//!
//! Every name in a module is looked up through a [`Context`]. The standing
//! chain of a module is `Compound(module, Compound(import 0, ... default))`;
//! the analyzer extends it for the extent of a nested sub-scope. Lookups
//! return `None` on a miss and never fail; callers decide whether a miss is
//! an error or expected.

use crate::loader::ModuleCache;
use crate::model::{
    Deferred, ModuleId, NodeId, OidTree, Symbol, SymbolId, SymbolKind, Type, TypeKind, Value,
    MAX_REFERENCE_DEPTH, ROOT_NAMES,
};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;

/// Thing a type context unwraps to find names defined inside it.
#[derive(Clone, Debug)]
pub enum Anchor {
    /// A symbol; its type is unwrapped.
    Symbol(SymbolId),
    /// A type expression, resolved or not.
    Type(Box<Type>),
}

/// A scope answering "does this name resolve, and to what".
#[derive(Clone, Debug)]
pub enum Context {
    /// The fixed `ccitt`, `iso` and `joint-iso-ccitt` roots.
    Default,
    /// Names declared in a module; never looks at its imports.
    Module(ModuleId),
    /// Import `index` of `module`, restricted to its allow-list unless the
    /// lookup is expanded.
    Import {
        /// The importing module.
        module: ModuleId,
        /// Position in its import list.
        index: usize,
    },
    /// Try the first context, then the second.
    Compound(Rc<Context>, Rc<Context>),
    /// Names defined inside a type, such as enumeration labels.
    Type(Anchor),
}

impl Context {
    /// `Compound(first, second)`.
    #[must_use]
    pub fn compound(first: Rc<Context>, second: Rc<Context>) -> Rc<Context> {
        Rc::new(Self::Compound(first, second))
    }

    /// Look up `name`.
    ///
    /// `expanded` lifts import allow-lists, for constructs that implicitly
    /// reference another module's whole namespace.
    #[must_use]
    pub fn find(&self, cache: &ModuleCache, name: &str, expanded: bool) -> Option<SymbolId> {
        match self {
            Self::Default => cache.defaults().find(name),
            Self::Module(id) => cache.module(*id)?.symbol_id(name),
            Self::Import { module, index } => {
                let import = cache.module(*module)?.imports().get(*index)?;
                if !expanded && !import.allows(name) {
                    return None;
                }
                cache.module(import.target?)?.symbol_id(name)
            }
            Self::Compound(first, second) => first
                .find(cache, name, expanded)
                .or_else(|| second.find(cache, name, expanded)),
            Self::Type(anchor) => match anchor {
                Anchor::Symbol(id) => find_in_symbol(cache, *id, name, 0),
                Anchor::Type(ty) => find_in_type(cache, ty, name, 0),
            },
        }
    }
}

fn find_in_symbol(cache: &ModuleCache, id: SymbolId, name: &str, depth: usize) -> Option<SymbolId> {
    if depth > MAX_REFERENCE_DEPTH {
        return None;
    }
    match &cache.symbol(id)?.kind {
        SymbolKind::Type(ty) | SymbolKind::Value { ty, .. } => {
            find_in_type(cache, ty.peek()?, name, depth + 1)
        }
        SymbolKind::Macro => None,
    }
}

fn find_in_type(cache: &ModuleCache, ty: &Type, name: &str, depth: usize) -> Option<SymbolId> {
    if depth > MAX_REFERENCE_DEPTH {
        return None;
    }
    if let Some(label) = ty.named_number(name) {
        return label.symbol;
    }
    match &ty.kind {
        TypeKind::Macro(m) => find_in_type(cache, m.syntax()?, name, depth + 1),
        TypeKind::Reference(r) => {
            let target = r.context.find(cache, &r.name, false)?;
            find_in_symbol(cache, target, name, depth + 1)
        }
        _ => None,
    }
}

/// The per-loader root scope: three synthetic, rootless value symbols bound
/// to the fixed roots of the OID tree.
#[derive(Clone, Debug)]
pub struct DefaultContext {
    symbols: Vec<Symbol>,
}

impl DefaultContext {
    /// Bind the root names to the roots of `tree`.
    #[must_use]
    pub fn new(tree: &OidTree) -> Self {
        let symbols = (0u32..)
            .zip(ROOT_NAMES)
            .map(|(arc, name)| {
                let value = tree.root(arc).map_or_else(Value::placeholder, Value::oid);
                Symbol::new(
                    name,
                    None,
                    SymbolKind::Value {
                        ty: Deferred::Resolved(Type::new(TypeKind::ObjectIdentifier)),
                        value: Deferred::Resolved(value),
                    },
                )
            })
            .collect();
        Self { symbols }
    }

    /// Look up a root name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        (0u32..)
            .zip(&self.symbols)
            .find(|(_, s)| s.name == name)
            .map(|(index, _)| SymbolId::root(index))
    }

    /// Root symbol `index`.
    #[must_use]
    pub fn symbol(&self, index: u32) -> Option<&Symbol> {
        self.symbols.get(index as usize)
    }

    /// The root symbols in arc order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Longest-prefix match of `path` under whichever root it starts at.
    #[must_use]
    pub fn find_oid(&self, tree: &OidTree, path: &[u32]) -> Option<NodeId> {
        self.symbols
            .iter()
            .filter_map(|s| s.value().and_then(Value::as_oid))
            .find(|&root| tree.node(root).is_some_and(|n| path.first() == Some(&n.arc)))
            .and_then(|_| tree.find_longest_prefix(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Location;
    use crate::model::{Import, Module, NamedNumber};
    use alloc::string::String;

    fn value(n: i128) -> Symbol {
        Symbol::new(
            "",
            None,
            SymbolKind::Value {
                ty: Deferred::Resolved(Type::integer()),
                value: Deferred::Resolved(Value::number(n)),
            },
        )
    }

    fn named(name: &str, n: i128) -> Symbol {
        let mut s = value(n);
        s.name = name.into();
        s
    }

    /// B declares `shared`, `hidden`; A declares `own` and imports only
    /// `shared` from B.
    fn fixture() -> (ModuleCache, ModuleId, ModuleId) {
        let mut cache = ModuleCache::new();
        let b = cache.allocate().unwrap();
        let mut module_b = Module::new(b, "B", None, String::new());
        module_b.add_symbol(named("shared", 1));
        module_b.add_symbol(named("hidden", 2));
        cache.insert(module_b);

        let a = cache.allocate().unwrap();
        let mut module_a = Module::new(a, "A", None, String::new());
        module_a.add_symbol(named("own", 3));
        let mut import = Import::new("B", Some(vec!["shared".into()]), Location::unknown());
        import.target = Some(b);
        module_a.imports.push(import);
        cache.insert(module_a);
        (cache, a, b)
    }

    fn chain(a: ModuleId) -> Rc<Context> {
        Context::compound(
            Rc::new(Context::Module(a)),
            Context::compound(
                Rc::new(Context::Import { module: a, index: 0 }),
                Rc::new(Context::Default),
            ),
        )
    }

    #[test]
    fn test_import_scoping() {
        let (cache, a, b) = fixture();
        let ctx = chain(a);
        assert_eq!(ctx.find(&cache, "hidden", false), None);
        assert_eq!(
            ctx.find(&cache, "hidden", true),
            cache.module(b).unwrap().symbol_id("hidden")
        );
        assert!(ctx.find(&cache, "shared", false).is_some());
    }

    #[test]
    fn test_module_context_ignores_imports() {
        let (cache, a, _) = fixture();
        let ctx = Context::Module(a);
        assert!(ctx.find(&cache, "own", false).is_some());
        assert_eq!(ctx.find(&cache, "shared", true), None);
    }

    #[test]
    fn test_compound_fallback() {
        let (cache, a, b) = fixture();
        let first = Rc::new(Context::Module(a));
        let second = Rc::new(Context::Module(b));
        let both = Context::compound(first.clone(), second.clone());
        for name in ["own", "shared", "hidden", "iso", "missing"] {
            for expanded in [false, true] {
                let expected = first
                    .find(&cache, name, expanded)
                    .or_else(|| second.find(&cache, name, expanded));
                assert_eq!(both.find(&cache, name, expanded), expected, "{name}");
            }
        }
    }

    #[test]
    fn test_unresolved_import_finds_nothing() {
        let (mut cache, a, _) = fixture();
        cache.module_mut(a).unwrap().imports[0].target = None;
        let ctx = Context::Import { module: a, index: 0 };
        assert_eq!(ctx.find(&cache, "shared", true), None);
    }

    #[test]
    fn test_default_roots() {
        let cache = ModuleCache::new();
        let ctx = Context::Default;
        assert_eq!(ctx.find(&cache, "iso", false), Some(SymbolId::root(1)));
        assert_eq!(ctx.find(&cache, "joint-iso-ccitt", false), Some(SymbolId::root(2)));
        assert_eq!(ctx.find(&cache, "org", false), None);

        let iso = cache.symbol(SymbolId::root(1)).unwrap();
        let node = iso.value().and_then(Value::as_oid).unwrap();
        assert_eq!(cache.tree().path(node).arcs(), &[1]);
    }

    #[test]
    fn test_default_find_oid() {
        let mut cache = ModuleCache::new();
        let iso = cache.tree().root(1).unwrap();
        let org = cache.tree_mut().insert_child(iso, 3, Some("org"));
        let defaults = cache.defaults();
        assert_eq!(defaults.find_oid(cache.tree(), &[1, 3, 6, 1]), Some(org));
        assert_eq!(defaults.find_oid(cache.tree(), &[2, 5]), cache.tree().root(2));
        assert_eq!(defaults.find_oid(cache.tree(), &[7]), None);
    }

    #[test]
    fn test_type_context_finds_labels() {
        let (mut cache, a, _) = fixture();
        let label = cache
            .module_mut(a)
            .unwrap()
            .add_local(named("up", 1))
            .unwrap();
        let ty = Type::new(TypeKind::Integer {
            values: vec![NamedNumber {
                name: "up".into(),
                value: 1,
                symbol: Some(label),
            }],
        });
        let ctx = Context::Type(Anchor::Type(Box::new(ty.clone())));
        assert_eq!(ctx.find(&cache, "up", false), Some(label));
        assert_eq!(ctx.find(&cache, "down", false), None);

        // Through an unresolved reference to a type symbol.
        let tc = Symbol::new("Status", Some(a), SymbolKind::Type(Deferred::Unresolved(ty)));
        let tc = cache.module_mut(a).unwrap().add_symbol(tc).unwrap();
        let reference = Type::reference(chain(a), "Status", crate::lexer::Span::SYNTHETIC);
        let ctx = Context::Type(Anchor::Type(Box::new(reference)));
        assert_eq!(ctx.find(&cache, "up", false), Some(label));
        let ctx = Context::Type(Anchor::Symbol(tc));
        assert_eq!(ctx.find(&cache, "up", false), Some(label));
    }
}
