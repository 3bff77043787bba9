//! Import binding and symbol resolution.
//!
//! A module goes through two one-shot passes:
//!
//! ```text
//! Parsed → initialize → Initialized → validate → Validated
//! ```
//!
//! `initialize` binds every import to its target module. `validate` resolves
//! the deferred type and value of each symbol exactly once, attaching object
//! identifier values to the shared OID tree. Symbols of other modules are
//! resolved on demand when a reference reaches them first.
//!
//! Semantic problems are appended to the [`Log`]; a failed lookup
//! substitutes the neutral placeholder so the remaining symbols are still
//! checked.

use crate::context::Context;
use crate::diag::{Location, Log};
use crate::lexer::Span;
use crate::loader::{LoaderConfig, ModuleCache};
use crate::model::{
    should_warn_duplicate, Attach, Clause, ClauseContent, Constraint, Deferred, Field, MacroType,
    Modifiers, Module, ModuleId, ModuleState, NamedNumber, NodeId, Oid, OidComponents, Symbol,
    SymbolId, SymbolKind, Type, TypeKind, TypeReference, Value, ValueKey, ValueKind, ValueReference,
    MAX_REFERENCE_DEPTH,
};
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

/// Base SMI modules; an import from one of them must match the importer's
/// SMI version.
const BASE_SMI_MODULES: [&str; 6] = [
    "RFC1155-SMI",
    "RFC-1212",
    "RFC-1215",
    "SNMPv2-SMI",
    "SNMPv2-TC",
    "SNMPv2-CONF",
];

/// Modules superseded by later RFCs.
const OBSOLETE_MODULES: [&str; 4] = ["RFC1065-SMI", "RFC1066-MIB", "RFC1156-MIB", "RFC1158-MIB"];

/// Misuse of the one-shot resolution passes.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No module occupies the given cache slot.
    #[error("module is not in the cache")]
    UnknownModule,
    /// `initialize` was already run.
    #[error("module {name} is already initialized")]
    AlreadyInitialized {
        /// Module name.
        name: String,
    },
    /// `validate` was already run.
    #[error("module {name} is already validated")]
    AlreadyValidated {
        /// Module name.
        name: String,
    },
    /// `validate` was called before `initialize`.
    #[error("module {name} is not initialized")]
    NotInitialized {
        /// Module name.
        name: String,
    },
}

/// Hook for resolution trace events.
///
/// Methods default to no-ops so untraced resolution pays nothing.
pub(crate) trait ResolveTracer {
    /// A name did not resolve in any scope.
    fn reference_unresolved(&mut self, _module: &str, _name: &str) {}

    /// A symbol became the owner of an OID node.
    fn oid_attached(&mut self, _symbol: &str, _oid: &Oid) {}

    /// A symbol claimed a node another module's symbol owns.
    fn duplicate_oid(&mut self, _symbol: &str, _owner: &str, _oid: &Oid) {}
}

/// Tracer for untraced resolution.
pub(crate) struct NoopResolveTracer;

impl ResolveTracer for NoopResolveTracer {}

/// Bind the imports of module `id` to their target modules.
///
/// Logs an error for every import whose module is not in the cache or whose
/// allow-list names a symbol the target does not declare, and warnings for
/// SMI version mismatches and obsolete targets.
///
/// # Errors
///
/// Returns an error if the module is missing or already past this pass.
pub fn initialize(cache: &mut ModuleCache, id: ModuleId, log: &mut Log) -> Result<(), ResolveError> {
    let module = cache.module(id).ok_or(ResolveError::UnknownModule)?;
    match module.state() {
        ModuleState::Parsed => {}
        ModuleState::Initialized => {
            return Err(ResolveError::AlreadyInitialized {
                name: module.name().into(),
            })
        }
        ModuleState::Validated => {
            return Err(ResolveError::AlreadyValidated {
                name: module.name().into(),
            })
        }
    }

    let version = module.smi_version();
    let mut targets = Vec::with_capacity(module.imports().len());
    for import in module.imports() {
        let Some(target) = cache.module_by_name(&import.name) else {
            log.add_error(
                import.location.clone(),
                format!("cannot find module {}", import.name),
            );
            targets.push(None);
            continue;
        };

        for name in import.symbols.iter().flatten() {
            if target.symbol(name).is_none() {
                log.add_error(
                    import.location.clone(),
                    format!("'{name}' is not defined in module {}", import.name),
                );
            }
        }
        if BASE_SMI_MODULES.contains(&target.name()) && target.smi_version() != version {
            log.add_warning(
                import.location.clone(),
                format!(
                    "SMIv{} module {} imports from SMIv{} module {}",
                    version.number(),
                    module.name(),
                    target.smi_version().number(),
                    target.name()
                ),
            );
        }
        if OBSOLETE_MODULES.contains(&import.name.as_str()) {
            log.add_warning(
                import.location.clone(),
                format!("import from obsolete module {}", import.name),
            );
        }
        targets.push(Some(target.id()));
    }

    let module = cache.module_mut(id).ok_or(ResolveError::UnknownModule)?;
    for (import, target) in module.imports.iter_mut().zip(targets) {
        import.target = target;
    }
    module.state = ModuleState::Initialized;
    Ok(())
}

/// Resolve every symbol of module `id` and index its values.
///
/// # Errors
///
/// Returns an error if the module is missing, not initialized, or already
/// validated.
pub fn validate(
    cache: &mut ModuleCache,
    id: ModuleId,
    config: &LoaderConfig,
    log: &mut Log,
) -> Result<(), ResolveError> {
    validate_traced(cache, id, config, log, &mut NoopResolveTracer)
}

pub(crate) fn validate_traced<T: ResolveTracer + ?Sized>(
    cache: &mut ModuleCache,
    id: ModuleId,
    config: &LoaderConfig,
    log: &mut Log,
    tracer: &mut T,
) -> Result<(), ResolveError> {
    let module = cache.module(id).ok_or(ResolveError::UnknownModule)?;
    match module.state() {
        ModuleState::Initialized => {}
        ModuleState::Parsed => {
            return Err(ResolveError::NotInitialized {
                name: module.name().into(),
            })
        }
        ModuleState::Validated => {
            return Err(ResolveError::AlreadyValidated {
                name: module.name().into(),
            })
        }
    }
    let count = u32::try_from(module.symbols.len()).unwrap_or(u32::MAX);

    let mut resolver = Resolver {
        cache: &mut *cache,
        config,
        log,
        tracer,
    };
    for index in 0..count {
        resolver.validate_symbol(SymbolId::new(id, index));
    }
    resolver.index_values(id);

    let module = cache.module_mut(id).ok_or(ResolveError::UnknownModule)?;
    module.state = ModuleState::Validated;
    Ok(())
}

/// Where a construct was written, for diagnostics.
#[derive(Clone, Copy, Debug)]
struct Site {
    module: ModuleId,
    span: Span,
}

struct Resolver<'a, T: ResolveTracer + ?Sized> {
    cache: &'a mut ModuleCache,
    config: &'a LoaderConfig,
    log: &'a mut Log,
    tracer: &'a mut T,
}

impl<T: ResolveTracer + ?Sized> Resolver<'_, T> {
    // === Diagnostics ===

    fn location(&self, module: ModuleId, span: Span) -> Location {
        self.cache
            .module(module)
            .map_or_else(Location::unknown, |m| m.location(span))
    }

    fn error(&mut self, site: Site, message: String) {
        let location = self.location(site.module, site.span);
        self.log.add_error(location, message);
    }

    fn warning(&mut self, site: Site, message: String) {
        let location = self.location(site.module, site.span);
        self.log.add_warning(location, message);
    }

    fn module_name(&self, module: Option<ModuleId>) -> String {
        module
            .and_then(|m| self.cache.module(m))
            .map_or_else(String::new, |m| m.name().into())
    }

    fn symbol_site(&self, id: SymbolId) -> Option<Site> {
        let symbol = self.cache.symbol(id)?;
        Some(Site {
            module: id.module?,
            span: symbol.span,
        })
    }

    fn circular(&mut self, id: SymbolId) {
        let Some(symbol) = self.cache.symbol(id) else {
            return;
        };
        let location = symbol.location.clone();
        let message = format!("circular reference to '{}'", symbol.name);
        self.log.add_error(location, message);
    }

    // === Per-module driver ===

    fn validate_symbol(&mut self, id: SymbolId) {
        let Some(symbol) = self.cache.symbol(id) else {
            return;
        };
        if symbol.local {
            return;
        }
        match symbol.kind {
            SymbolKind::Macro => {}
            SymbolKind::Type(_) => {
                self.resolved_type(id);
            }
            SymbolKind::Value { .. } => {
                let ty = self.resolved_type(id);
                let value = self.resolved_value(id);
                if !ty.is_compatible(&value) {
                    if let Some(symbol) = self.cache.symbol(id) {
                        let location = symbol.location.clone();
                        let message =
                            format!("value of '{}' is incompatible with its type", symbol.name);
                        self.log.add_error(location, message);
                    }
                }
            }
        }
    }

    /// Fill the numeric-value map of `module`. The first declared wins.
    fn index_values(&mut self, module: ModuleId) {
        let Some(m) = self.cache.module(module) else {
            return;
        };
        let tree = self.cache.tree();
        let mut keys = Vec::new();
        for (index, symbol) in (0u32..).zip(&m.symbols) {
            if symbol.local {
                continue;
            }
            let key = match symbol.value().map(|v| &v.kind) {
                Some(ValueKind::Oid(node)) => ValueKey::Oid(tree.path(*node)),
                Some(ValueKind::Number(n)) => ValueKey::Number(*n),
                _ => continue,
            };
            keys.push((key, index));
        }
        if let Some(m) = self.cache.module_mut(module) {
            for (key, index) in keys {
                m.by_value.entry(key).or_insert(index);
            }
        }
    }

    // === Lookup ===

    /// Look `name` up in `context`, retrying with lifted import allow-lists.
    fn lookup(&mut self, context: &Context, name: &str, site: Site) -> Option<SymbolId> {
        if let Some(found) = context.find(self.cache, name, false) {
            return Some(found);
        }
        if let Some(found) = context.find(self.cache, name, true) {
            if self.config.warn_missing_imports {
                let source = self.module_name(found.module);
                self.warning(site, format!("missing import for '{name}', using {source}"));
            }
            return Some(found);
        }
        self.error(site, format!("undefined symbol '{name}'"));
        let module = self.module_name(Some(site.module));
        self.tracer.reference_unresolved(&module, name);
        None
    }

    // === Deferred slots ===

    /// The resolved type of symbol `id`, resolving it now if needed.
    fn resolved_type(&mut self, id: SymbolId) -> Type {
        match self.cache.symbol(id).map(|s| &s.kind) {
            Some(SymbolKind::Type(slot) | SymbolKind::Value { ty: slot, .. }) => match slot {
                Deferred::Resolved(ty) => return ty.clone(),
                Deferred::Resolving => {
                    self.circular(id);
                    return Type::placeholder();
                }
                Deferred::Unresolved(_) => {}
            },
            _ => return Type::placeholder(),
        }
        let Some(site) = self.symbol_site(id) else {
            return Type::placeholder();
        };
        let Some(ty) = self.type_slot(id).and_then(Deferred::begin) else {
            return Type::placeholder();
        };
        let resolved = self.resolve_type(ty, site);
        if let Some(slot) = self.type_slot(id) {
            slot.finish(resolved.clone());
        }
        resolved
    }

    /// The resolved value of symbol `id`, resolving it now if needed.
    fn resolved_value(&mut self, id: SymbolId) -> Value {
        match self.cache.symbol(id).map(|s| &s.kind) {
            Some(SymbolKind::Value { value, .. }) => match value {
                Deferred::Resolved(value) => return value.clone(),
                Deferred::Resolving => {
                    self.circular(id);
                    return Value::placeholder();
                }
                Deferred::Unresolved(_) => {}
            },
            _ => return Value::placeholder(),
        }
        let Some(site) = self.symbol_site(id) else {
            return Value::placeholder();
        };
        let bits = match self.cache.symbol(id).map(|s| &s.kind) {
            Some(SymbolKind::Value { ty, .. }) => ty.peek().is_some_and(|t| self.declares_bits(t, 0)),
            _ => false,
        };
        let Some(value) = self.value_slot(id).and_then(Deferred::begin) else {
            return Value::placeholder();
        };
        let resolved = self.resolve_value(value, site, bits);
        if let Some(node) = resolved.as_oid() {
            self.attach(id, node);
        }
        if let Some(slot) = self.value_slot(id) {
            slot.finish(resolved.clone());
        }
        resolved
    }

    fn type_slot(&mut self, id: SymbolId) -> Option<&mut Deferred<Type>> {
        match &mut self.cache.symbol_mut(id)?.kind {
            SymbolKind::Type(slot) | SymbolKind::Value { ty: slot, .. } => Some(slot),
            SymbolKind::Macro => None,
        }
    }

    fn value_slot(&mut self, id: SymbolId) -> Option<&mut Deferred<Value>> {
        match &mut self.cache.symbol_mut(id)?.kind {
            SymbolKind::Value { value, .. } => Some(value),
            _ => None,
        }
    }

    // === Types ===

    fn resolve_type(&mut self, ty: Type, site: Site) -> Type {
        let Type {
            kind,
            tags,
            constraint,
            reference,
            primitive,
            comment,
        } = ty;
        let kind = match kind {
            TypeKind::Reference(r) => return self.resolve_type_reference(r, site),
            TypeKind::Sequence { fields } => TypeKind::Sequence {
                fields: self.resolve_fields(fields, site),
            },
            TypeKind::Choice { fields } => TypeKind::Choice {
                fields: self.resolve_fields(fields, site),
            },
            TypeKind::SequenceOf(element) => {
                TypeKind::SequenceOf(Box::new(self.resolve_type(*element, site)))
            }
            TypeKind::Macro(m) => TypeKind::Macro(self.resolve_macro(m, site)),
            other => other,
        };
        Type {
            kind,
            tags,
            constraint,
            reference,
            primitive,
            comment,
        }
    }

    fn resolve_fields(&mut self, fields: Vec<Field>, site: Site) -> Vec<Field> {
        fields
            .into_iter()
            .map(|f| Field {
                name: f.name,
                ty: self.resolve_type(f.ty, site),
            })
            .collect()
    }

    /// Substitute a copy of the target's resolved node, with the modifiers
    /// written at the point of use re-applied.
    fn resolve_type_reference(&mut self, reference: TypeReference, site: Site) -> Type {
        let here = Site {
            span: reference.span,
            ..site
        };
        let Some(target) = self.lookup(&reference.context, &reference.name, here) else {
            return Type::placeholder();
        };
        let (is_type, is_macro) = self
            .cache
            .symbol(target)
            .map_or((false, false), |s| (s.is_type(), s.is_macro()));
        if is_macro {
            let mut ty = Type::new(TypeKind::Macro(MacroType::new(reference.name)));
            ty.reference = Some(target);
            return ty;
        }
        if !is_type {
            self.error(here, format!("'{}' is not a type", reference.name));
            return Type::placeholder();
        }

        let mut ty = self.resolved_type(target);
        ty.reference = Some(target);
        ty.primitive = false;
        let Modifiers {
            tags,
            constraint,
            values,
        } = reference.modifiers;
        if let Some(values) = values {
            restrict_values(&mut ty, values);
        }
        if let Some(constraint) = constraint {
            constrain(&mut ty, constraint);
        }
        for (mode, tag) in tags {
            ty.apply_tag(mode, tag);
        }
        ty
    }

    /// Check the macro is declared and resolve its clauses in order.
    fn resolve_macro(&mut self, invocation: MacroType, site: Site) -> MacroType {
        let standing = self.cache.module(site.module).map(|m| m.context.clone());
        if let Some(context) = standing {
            if let Some(target) = self.lookup(&context, &invocation.name, site) {
                if !self.cache.symbol(target).is_some_and(Symbol::is_macro) {
                    self.error(site, format!("'{}' is not a macro", invocation.name));
                }
            }
        }

        let MacroType { name, clauses } = invocation;
        let mut resolved = Vec::with_capacity(clauses.len());
        let mut syntax_is_bits = false;
        for Clause { keyword, content } in clauses {
            let content = match content {
                ClauseContent::Type(ty) => {
                    let ty = self.resolve_type(ty, site);
                    if keyword == "SYNTAX" {
                        syntax_is_bits = self.declares_bits(&ty, 0);
                    }
                    ClauseContent::Type(ty)
                }
                ClauseContent::Values(values) => ClauseContent::Values(
                    values
                        .into_iter()
                        .map(|v| self.resolve_value(v, site, false))
                        .collect(),
                ),
                ClauseContent::Value(value) => {
                    let bits = keyword == "DEFVAL" && syntax_is_bits;
                    ClauseContent::Value(self.resolve_value(value, site, bits))
                }
                other => other,
            };
            resolved.push(Clause { keyword, content });
        }
        MacroType {
            name,
            clauses: resolved,
        }
    }

    /// Whether `ty` is, or is defined in terms of, `BITS`.
    fn declares_bits(&self, ty: &Type, depth: usize) -> bool {
        if depth > MAX_REFERENCE_DEPTH {
            return false;
        }
        match &ty.kind {
            TypeKind::Bits { .. } => true,
            TypeKind::Macro(m) => m.syntax().is_some_and(|s| self.declares_bits(s, depth + 1)),
            TypeKind::Reference(r) => r
                .context
                .find(self.cache, &r.name, true)
                .and_then(|target| self.cache.symbol(target))
                .and_then(|s| match &s.kind {
                    SymbolKind::Type(slot) => slot.peek(),
                    _ => None,
                })
                .is_some_and(|t| self.declares_bits(t, depth + 1)),
            _ => false,
        }
    }

    // === Values ===

    /// Resolve a value expression. `bits` marks a value whose type is
    /// `BITS`, where `{ label }` names one bit rather than an OID.
    fn resolve_value(&mut self, value: Value, site: Site, bits: bool) -> Value {
        match value.kind {
            ValueKind::Reference(reference) => self.resolve_value_reference(reference, site),
            ValueKind::OidComponents(OidComponents {
                parent: Some(parent),
                arcs,
            }) if bits && arcs.is_empty() => Value::new(ValueKind::Bits(vec![parent.name])),
            ValueKind::OidComponents(components) => self.resolve_oid(components, site),
            _ => value,
        }
    }

    fn resolve_value_reference(&mut self, reference: ValueReference, site: Site) -> Value {
        let here = Site {
            span: reference.span,
            ..site
        };
        let Some(target) = self.lookup(&reference.context, &reference.name, here) else {
            return Value::placeholder();
        };
        if !self.cache.symbol(target).is_some_and(Symbol::is_value) {
            self.error(here, format!("'{}' is not a value", reference.name));
            return Value::placeholder();
        }
        let mut value = self.resolved_value(target);
        value.reference = Some(target);
        value
    }

    /// Walk `{ parent arc arc ... }` down the tree, creating missing nodes.
    fn resolve_oid(&mut self, components: OidComponents, site: Site) -> Value {
        let OidComponents { parent, arcs } = components;
        let mut arcs = arcs.into_iter();

        let start = match parent {
            Some(parent) => {
                let here = Site {
                    span: parent.span,
                    ..site
                };
                let name = parent.name.clone();
                let value = self.resolve_value_reference(parent, site);
                match value.as_oid() {
                    Some(node) => node,
                    None => {
                        if !value.is_placeholder() {
                            self.error(here, format!("'{name}' is not an object identifier"));
                        }
                        return Value::placeholder();
                    }
                }
            }
            None => {
                let root = arcs.next().and_then(|arc| self.cache.tree().root(arc.number));
                let Some(root) = root else {
                    self.error(site, "object identifier does not start at a root arc".into());
                    return Value::placeholder();
                };
                root
            }
        };

        let mut node = start;
        for arc in arcs {
            node = self
                .cache
                .tree_mut()
                .insert_child(node, arc.number, arc.name.as_deref());
        }
        Value::oid(node)
    }

    /// Record symbol `id` on `node`, warning about cross-module collisions.
    fn attach(&mut self, id: SymbolId, node: NodeId) {
        let Some(symbol) = self.cache.symbol(id) else {
            return;
        };
        let name = symbol.name.clone();
        let location = symbol.location.clone();

        match self.cache.tree_mut().attach(node, id, &name) {
            Attach::Unchanged => {}
            Attach::Owner => {
                let oid = self.cache.tree().path(node);
                self.tracer.oid_attached(&name, &oid);
            }
            Attach::Alias { owner } => {
                let (Some(owner_module), Some(module)) = (owner.module, id.module) else {
                    return;
                };
                let existing_loaded = self
                    .cache
                    .module(owner_module)
                    .is_some_and(Module::is_loaded);
                let incoming_loaded = self.cache.module(module).is_some_and(Module::is_loaded);
                if !should_warn_duplicate(owner_module, existing_loaded, module, incoming_loaded) {
                    return;
                }
                let owner_name = self
                    .cache
                    .symbol(owner)
                    .map_or_else(String::new, |s| s.name.clone());
                let owner_module_name = self.module_name(Some(owner_module));
                let oid = self.cache.tree().path(node);
                self.log.add_warning(
                    location,
                    format!(
                        "duplicate OID {oid} for '{name}', already assigned to '{owner_name}' in {owner_module_name}"
                    ),
                );
                self.tracer.duplicate_oid(&name, &owner_name, &oid);
            }
        }
    }
}

/// The SYNTAX clause of a macro node.
fn syntax_mut(m: &mut MacroType) -> Option<&mut Type> {
    m.clauses
        .iter_mut()
        .find(|c| c.keyword == "SYNTAX")
        .and_then(|c| match &mut c.content {
            ClauseContent::Type(ty) => Some(ty),
            _ => None,
        })
}

/// Replace the labels of an enumerated or bits type, looking through a
/// textual convention's syntax.
fn restrict_values(ty: &mut Type, values: Vec<NamedNumber>) {
    match &mut ty.kind {
        TypeKind::Integer { values: labels } | TypeKind::Bits { values: labels } => {
            *labels = values;
        }
        TypeKind::Macro(m) => {
            if let Some(syntax) = syntax_mut(m) {
                restrict_values(syntax, values);
            }
        }
        _ => {}
    }
}

/// Set the constraint of a type, looking through a textual convention's
/// syntax.
fn constrain(ty: &mut Type, constraint: Constraint) {
    if let TypeKind::Macro(m) = &mut ty.kind {
        if let Some(syntax) = syntax_mut(m) {
            constrain(syntax, constraint);
            return;
        }
    }
    ty.constraint = Some(constraint);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::diag::Severity;
    use crate::model::TagMode;
    use crate::parser::Parser;

    fn load_all(sources: &[&str], config: &LoaderConfig) -> (ModuleCache, Vec<ModuleId>, Log) {
        let mut cache = ModuleCache::new();
        let mut log = Log::new();
        let mut ids = Vec::new();
        for source in sources {
            let tree = Parser::new(source).parse_module().unwrap();
            let id = cache.allocate().unwrap();
            let mut module = analyze(&tree, id, None, (*source).into(), TagMode::Implicit, &mut log);
            module.loaded = true;
            cache.insert(module);
            ids.push(id);
        }
        for &id in ids.iter().rev() {
            initialize(&mut cache, id, &mut log).unwrap();
        }
        for &id in ids.iter().rev() {
            validate(&mut cache, id, config, &mut log).unwrap();
        }
        (cache, ids, log)
    }

    fn errors(log: &Log) -> Vec<String> {
        log.with_severity(Severity::Error)
            .map(|e| e.message.clone())
            .collect()
    }

    fn warnings(log: &Log) -> Vec<String> {
        log.with_severity(Severity::Warning)
            .map(|e| e.message.clone())
            .collect()
    }

    const MACROS: &str = "BASE DEFINITIONS ::= BEGIN
        OBJECT-TYPE MACRO ::= BEGIN END
        TEXTUAL-CONVENTION MACRO ::= BEGIN END
        END";

    #[test]
    fn test_reference_chain_terminates_in_concrete_node() {
        let (cache, ids, log) = load_all(
            &["M DEFINITIONS ::= BEGIN
            A ::= B
            B ::= C
            C ::= INTEGER (0..10)
            END"],
            &LoaderConfig::default(),
        );
        assert!(log.is_empty(), "{:?}", log.entries());
        let module = cache.module(ids[0]).unwrap();
        for name in ["A", "B"] {
            let ty = module.symbol(name).and_then(Symbol::ty).unwrap();
            assert!(matches!(ty.kind, TypeKind::Integer { .. }), "{name}");
            assert!(ty.references_symbol(&cache, "C"), "{name}");
            assert!(!ty.primitive);
        }
        let a = module.symbol("A").and_then(Symbol::ty).unwrap();
        assert_eq!(a.reference, module.symbol_id("B"));
        assert!(a.references_symbol(&cache, "B"));
        assert!(!a.references_symbol(&cache, "A"));
        assert!(module.symbol("C").and_then(Symbol::ty).unwrap().primitive);
    }

    #[test]
    fn test_passes_are_one_shot() {
        let (mut cache, ids, mut log) = load_all(
            &["M DEFINITIONS ::= BEGIN A ::= INTEGER END"],
            &LoaderConfig::default(),
        );
        let id = ids[0];
        assert_eq!(
            validate(&mut cache, id, &LoaderConfig::default(), &mut log),
            Err(ResolveError::AlreadyValidated { name: "M".into() })
        );
        assert!(matches!(
            initialize(&mut cache, id, &mut log),
            Err(ResolveError::AlreadyValidated { .. })
        ));

        let tree = Parser::new("N DEFINITIONS ::= BEGIN END").parse_module().unwrap();
        let n = cache.allocate().unwrap();
        let module = analyze(&tree, n, None, String::new(), TagMode::Implicit, &mut log);
        cache.insert(module);
        assert!(matches!(
            validate(&mut cache, n, &LoaderConfig::default(), &mut log),
            Err(ResolveError::NotInitialized { .. })
        ));
        initialize(&mut cache, n, &mut log).unwrap();
        assert!(matches!(
            initialize(&mut cache, n, &mut log),
            Err(ResolveError::AlreadyInitialized { .. })
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn test_undefined_type_becomes_placeholder() {
        let (cache, ids, log) = load_all(
            &["M DEFINITIONS ::= BEGIN
            T ::= Undefined
            U ::= INTEGER
            v U ::= 3
            END"],
            &LoaderConfig::default(),
        );
        assert_eq!(errors(&log), vec!["undefined symbol 'Undefined'"]);
        let module = cache.module(ids[0]).unwrap();
        assert!(module.symbol("T").and_then(Symbol::ty).unwrap().is_placeholder());
        assert!(module.symbol("v").unwrap().is_resolved());
        assert_eq!(
            module.symbol("v").and_then(Symbol::value).and_then(Value::as_number),
            Some(3)
        );
    }

    #[test]
    fn test_circular_reference_reported_once() {
        let (cache, ids, log) = load_all(
            &["M DEFINITIONS ::= BEGIN
            A ::= B
            B ::= A
            END"],
            &LoaderConfig::default(),
        );
        assert_eq!(errors(&log).len(), 1);
        assert!(errors(&log)[0].starts_with("circular reference"));
        let module = cache.module(ids[0]).unwrap();
        assert!(module.symbol("A").unwrap().is_resolved());
        assert!(module.symbol("B").unwrap().is_resolved());
    }

    #[test]
    fn test_missing_import_fallback() {
        let sources = [
            "A DEFINITIONS ::= BEGIN
            IMPORTS x FROM B;
            T ::= Y
            END",
            "B DEFINITIONS ::= BEGIN
            x INTEGER ::= 1
            Y ::= OCTET STRING
            END",
        ];
        let (_, _, log) = load_all(&sources, &LoaderConfig::default());
        assert!(errors(&log).is_empty());
        assert_eq!(warnings(&log), vec!["missing import for 'Y', using B"]);

        let quiet = LoaderConfig {
            warn_missing_imports: false,
            ..LoaderConfig::default()
        };
        let (_, _, log) = load_all(&sources, &quiet);
        assert!(log.is_empty());
    }

    #[test]
    fn test_import_checks() {
        let (_, _, log) = load_all(
            &["A DEFINITIONS ::= BEGIN
            IMPORTS x FROM MISSING-MIB y FROM A;
            END"],
            &LoaderConfig::default(),
        );
        assert_eq!(
            errors(&log),
            vec![
                "cannot find module MISSING-MIB",
                "'y' is not defined in module A"
            ]
        );
    }

    #[test]
    fn test_oid_values_attach_and_index() {
        let (cache, ids, log) = load_all(
            &["M DEFINITIONS ::= BEGIN
            internet OBJECT IDENTIFIER ::= { iso org(3) dod(6) 1 }
            private OBJECT IDENTIFIER ::= { internet 4 }
            alias OBJECT IDENTIFIER ::= { internet 4 }
            answer INTEGER ::= 42
            END"],
            &LoaderConfig::default(),
        );
        assert!(log.is_empty(), "{:?}", log.entries());
        let module = cache.module(ids[0]).unwrap();
        let private = module.symbol("private").and_then(Symbol::value).unwrap();
        let node = private.as_oid().unwrap();
        assert_eq!(cache.tree().path(node).to_dotted(), "1.3.6.1.4");
        assert_eq!(cache.tree().symbol(node), module.symbol_id("private"));
        let org = cache.tree().find_exact(&[1, 3]).unwrap();
        assert_eq!(cache.tree().node(org).and_then(|n| n.name()), Some("org"));

        let by_oid = module.symbol_by_value(&ValueKey::Oid(Oid::new(vec![1, 3, 6, 1, 4])));
        assert_eq!(by_oid.map(|s| s.name.as_str()), Some("private"));
        let by_number = module.symbol_by_value(&ValueKey::Number(42));
        assert_eq!(by_number.map(|s| s.name.as_str()), Some("answer"));
    }

    #[test]
    fn test_oid_must_start_at_root() {
        let (_, _, log) = load_all(
            &["M DEFINITIONS ::= BEGIN a OBJECT IDENTIFIER ::= { 7 1 } END"],
            &LoaderConfig::default(),
        );
        assert_eq!(errors(&log), vec!["object identifier does not start at a root arc"]);
    }

    #[test]
    fn test_incompatible_value() {
        let (_, _, log) = load_all(
            &["M DEFINITIONS ::= BEGIN
            small INTEGER (1..5) ::= 9
            ok INTEGER (1..5) ::= 3
            END"],
            &LoaderConfig::default(),
        );
        assert_eq!(errors(&log), vec!["value of 'small' is incompatible with its type"]);
    }

    #[test]
    fn test_macro_must_be_declared() {
        let (_, _, log) = load_all(
            &[r#"M DEFINITIONS ::= BEGIN
            x OBJECT-TYPE
                SYNTAX INTEGER
                ACCESS read-only
                STATUS mandatory
                ::= { iso 5 }
            END"#],
            &LoaderConfig::default(),
        );
        assert_eq!(errors(&log), vec!["undefined symbol 'OBJECT-TYPE'"]);
    }

    #[test]
    fn test_textual_convention_restrictions() {
        let (cache, ids, log) = load_all(
            &[
                r#"M DEFINITIONS ::= BEGIN
                IMPORTS OBJECT-TYPE, TEXTUAL-CONVENTION FROM BASE;
                Status ::= TEXTUAL-CONVENTION
                    STATUS current
                    DESCRIPTION "d"
                    SYNTAX INTEGER { up(1), down(2), testing(3) }
                Flags ::= TEXTUAL-CONVENTION
                    STATUS current
                    DESCRIPTION "d"
                    SYNTAX BITS { a(0), b(1) }
                s OBJECT-TYPE
                    SYNTAX Status { up(1), down(2) }
                    MAX-ACCESS read-only
                    STATUS current
                    DESCRIPTION "d"
                    DEFVAL { down }
                    ::= { iso 7 1 }
                f OBJECT-TYPE
                    SYNTAX Flags
                    MAX-ACCESS read-only
                    STATUS current
                    DESCRIPTION "d"
                    DEFVAL { { b } }
                    ::= { iso 7 2 }
                END"#,
                MACROS,
            ],
            &LoaderConfig::default(),
        );
        assert!(log.is_empty(), "{:?}", log.entries());
        let module = cache.module(ids[0]).unwrap();

        let s = module.symbol("s").and_then(Symbol::ty).unwrap();
        let syntax = s.syntax().unwrap();
        assert!(syntax.references_symbol(&cache, "Status"));
        assert_eq!(syntax.named_numbers().len(), 2);
        let defval = s.as_macro().and_then(MacroType::defval).unwrap();
        assert_eq!(defval.as_number(), Some(2));

        let f = module.symbol("f").and_then(Symbol::ty).unwrap();
        let defval = f.as_macro().and_then(MacroType::defval).unwrap();
        assert!(matches!(&defval.kind, ValueKind::Bits(labels) if labels == &["b"]));
    }

    #[test]
    fn test_index_reference_resolves_without_cycle() {
        let (cache, ids, log) = load_all(
            &[
                r#"M DEFINITIONS ::= BEGIN
                IMPORTS OBJECT-TYPE FROM BASE;
                entry OBJECT-TYPE
                    SYNTAX INTEGER
                    MAX-ACCESS not-accessible
                    STATUS current
                    DESCRIPTION "row"
                    INDEX { column }
                    ::= { iso 8 1 }
                column OBJECT-TYPE
                    SYNTAX INTEGER
                    MAX-ACCESS read-only
                    STATUS current
                    DESCRIPTION "col"
                    ::= { entry 1 }
                END"#,
                MACROS,
            ],
            &LoaderConfig::default(),
        );
        assert!(log.is_empty(), "{:?}", log.entries());
        let module = cache.module(ids[0]).unwrap();
        let entry = module.symbol("entry").and_then(Symbol::ty).unwrap();
        let index = entry.as_macro().and_then(MacroType::index).unwrap();
        assert_eq!(index[0].reference, module.symbol_id("column"));
        let node = index[0].as_oid().unwrap();
        assert_eq!(cache.tree().path(node).to_dotted(), "1.8.1.1");
    }
}
