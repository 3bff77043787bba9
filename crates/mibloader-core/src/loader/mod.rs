//! Batch loading with atomic commit.
//!
//! A load request starts a batch. The requested module is located and
//! parsed; every import it names that is not cached yet is queued and
//! processed the same way, so the fringe grows as import lists become known.
//! Once the queue is empty the batch runs two passes, each in reverse parse
//! order:
//!
//! ```text
//! queue → locate → parse → analyze → ... → initialize (all) → validate (all)
//! ```
//!
//! A batch whose log holds any error is evicted as a whole; modules from
//! earlier batches are unaffected.
//!
//! # Example
//!
//! ```
//! use mibloader_core::loader::{Loader, MemoryLocator, Source};
//!
//! let mut loader = Loader::new(MemoryLocator::new());
//! let source = Source::from_text(
//!     "M1",
//!     "M1 DEFINITIONS ::= BEGIN
//!      IMPORTS iso FROM SNMPv2-SMI;
//!      ex OBJECT IDENTIFIER ::= { iso 999 }
//!      END",
//! );
//! let loaded = loader.load_source(source).unwrap();
//! assert!(loaded.log.is_empty());
//! let node = loader.find_oid(&[1, 999]).unwrap();
//! assert_eq!(loader.tree().path(node).to_dotted(), "1.999");
//! ```

pub mod bundled;
mod cache;
mod source;

pub use cache::ModuleCache;
pub use source::{BundledLocator, Locator, MemoryLocator, Origin, Source};

use crate::analyzer::analyze;
use crate::context::DefaultContext;
use crate::diag::{Entry, Location, Log, Severity};
use crate::lexer::{self, LineIndex};
use crate::model::{Module, ModuleId, NodeId, Oid, OidTree, Symbol, SymbolId, TagMode};
use crate::parser::Parser;
use crate::resolver::{self, ResolveTracer};
use crate::trace::Phase;
use alloc::collections::{BTreeSet, VecDeque};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

#[cfg(feature = "tracing")]
use crate::trace::{TraceEvent, TraceLevel, Tracer};
#[cfg(feature = "tracing")]
use alloc::boxed::Box;

/// Loader settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Tagging for modules whose header does not name one.
    pub default_tagging: TagMode,
    /// Warn when a name only resolves with import allow-lists lifted.
    pub warn_missing_imports: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_tagging: TagMode::Implicit,
            warn_missing_imports: true,
        }
    }
}

/// A committed batch.
#[derive(Clone, Debug)]
pub struct Loaded {
    /// The requested module.
    pub module: ModuleId,
    /// Warnings of the batch.
    pub log: Log,
}

/// Why a batch was not committed.
#[derive(Clone, Debug, thiserror::Error)]
pub enum LoadError {
    /// The requested module could not be located.
    #[error("cannot locate module {name}")]
    NotFound {
        /// The requested name.
        name: String,
        /// Diagnostics gathered before the lookup failed.
        log: Log,
    },
    /// The batch logged at least one error and was rolled back.
    #[error("load failed with {} error(s)", .log.error_count())]
    Failed {
        /// Full log of the batch.
        log: Log,
    },
}

impl LoadError {
    /// The batch log.
    #[must_use]
    pub fn log(&self) -> &Log {
        match self {
            Self::NotFound { log, .. } | Self::Failed { log } => log,
        }
    }

    /// Take the batch log.
    #[must_use]
    pub fn into_log(self) -> Log {
        match self {
            Self::NotFound { log, .. } | Self::Failed { log } => log,
        }
    }
}

/// Why a module could not be unloaded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnloadError {
    /// No module with that name is cached.
    #[error("module {name} is not loaded")]
    NotLoaded {
        /// The module name.
        name: String,
    },
    /// Other cached modules still import it.
    #[error("module {name} is imported by {}", .importers.join(", "))]
    InUse {
        /// The module name.
        name: String,
        /// Names of the importing modules.
        importers: Vec<String>,
    },
}

/// Hook for loader trace events, on top of the resolution events.
trait LoadTracer: ResolveTracer {
    fn batch_start(&mut self, _request: &str) {}
    fn batch_end(&mut self, _modules: usize, _errors: usize, _warnings: usize) {}
    fn module_queued(&mut self, _name: &str) {}
    fn module_located(&mut self, _name: &str, _origin: &Origin) {}
    fn module_parsed(&mut self, _name: &str, _id: ModuleId, _symbols: usize) {}
    fn phase_start(&mut self, _phase: Phase, _modules: usize) {}
    fn phase_end(&mut self, _phase: Phase) {}
    fn batch_committed(&mut self, _modules: usize) {}
    fn batch_rolled_back(&mut self, _modules: usize) {}
    fn module_unloaded(&mut self, _name: &str) {}
}

struct NoopLoadTracer;

impl ResolveTracer for NoopLoadTracer {}
impl LoadTracer for NoopLoadTracer {}

/// Adapts a [`Tracer`] to the internal hooks.
#[cfg(feature = "tracing")]
struct TracingWrapper<'a, T: Tracer + ?Sized>(&'a mut T);

#[cfg(feature = "tracing")]
impl<T: Tracer + ?Sized> ResolveTracer for TracingWrapper<'_, T> {
    fn reference_unresolved(&mut self, module: &str, name: &str) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::ReferenceUnresolved { module, name }
        );
    }

    fn oid_attached(&mut self, symbol: &str, oid: &Oid) {
        if TraceLevel::Trace <= self.0.level() {
            let oid = oid.to_dotted();
            self.0.trace(
                TraceLevel::Trace,
                TraceEvent::OidAttached { symbol, oid: &oid },
            );
        }
    }

    fn duplicate_oid(&mut self, symbol: &str, owner: &str, oid: &Oid) {
        if TraceLevel::Warn <= self.0.level() {
            let oid = oid.to_dotted();
            self.0.trace(
                TraceLevel::Warn,
                TraceEvent::DuplicateOid {
                    symbol,
                    owner,
                    oid: &oid,
                },
            );
        }
    }
}

#[cfg(feature = "tracing")]
impl<T: Tracer + ?Sized> LoadTracer for TracingWrapper<'_, T> {
    fn batch_start(&mut self, request: &str) {
        crate::trace_event!(self.0, TraceLevel::Info, TraceEvent::BatchStart { request });
    }

    fn batch_end(&mut self, modules: usize, errors: usize, warnings: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::BatchEnd {
                modules,
                errors,
                warnings,
            }
        );
    }

    fn module_queued(&mut self, name: &str) {
        crate::trace_event!(self.0, TraceLevel::Debug, TraceEvent::ModuleQueued { name });
    }

    fn module_located(&mut self, name: &str, origin: &Origin) {
        if TraceLevel::Debug <= self.0.level() {
            let origin = origin.to_string();
            self.0.trace(
                TraceLevel::Debug,
                TraceEvent::ModuleLocated {
                    name,
                    origin: &origin,
                },
            );
        }
    }

    fn module_parsed(&mut self, name: &str, id: ModuleId, symbols: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Debug,
            TraceEvent::ModuleParsed { name, id, symbols }
        );
    }

    fn phase_start(&mut self, phase: Phase, modules: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::PhaseStart { phase, modules }
        );
    }

    fn phase_end(&mut self, phase: Phase) {
        crate::trace_event!(self.0, TraceLevel::Info, TraceEvent::PhaseEnd { phase });
    }

    fn batch_committed(&mut self, modules: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Info,
            TraceEvent::BatchCommitted { modules }
        );
    }

    fn batch_rolled_back(&mut self, modules: usize) {
        crate::trace_event!(
            self.0,
            TraceLevel::Warn,
            TraceEvent::BatchRolledBack { modules }
        );
    }

    fn module_unloaded(&mut self, name: &str) {
        crate::trace_event!(self.0, TraceLevel::Info, TraceEvent::ModuleUnloaded { name });
    }
}

/// A queued batch item.
enum Item {
    Name(String),
    Source(Source),
}

/// One loading session: a locator, a module cache and the shared OID tree.
///
/// Not reentrant; independent sessions use independent loaders.
pub struct Loader<L: Locator> {
    locator: L,
    cache: ModuleCache,
    config: LoaderConfig,
    #[cfg(feature = "tracing")]
    tracer: Option<Box<dyn Tracer>>,
}

impl<L: Locator> Loader<L> {
    /// Create a loader with default settings.
    pub fn new(locator: L) -> Self {
        Self {
            locator,
            cache: ModuleCache::new(),
            config: LoaderConfig::default(),
            #[cfg(feature = "tracing")]
            tracer: None,
        }
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Send trace events of every later operation to `tracer`.
    #[cfg(feature = "tracing")]
    #[must_use]
    pub fn with_tracer(mut self, tracer: impl Tracer + 'static) -> Self {
        self.tracer = Some(Box::new(tracer));
        self
    }

    /// Current settings.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// The locator, for adding search locations.
    pub fn locator_mut(&mut self) -> &mut L {
        &mut self.locator
    }

    /// Load module `name` and everything it imports.
    ///
    /// A module that is already cached is not parsed again; it is only
    /// marked as explicitly loaded.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if `name` cannot be located and
    /// [`LoadError::Failed`] if the batch logged any error.
    pub fn load(&mut self, name: &str) -> Result<Loaded, LoadError> {
        if let Some(module) = self
            .cache
            .id_of(name)
            .and_then(|id| self.cache.module_mut(id))
        {
            module.loaded = true;
            return Ok(Loaded {
                module: module.id(),
                log: Log::new(),
            });
        }
        self.dispatch(|this, tracer| this.run_batch(Item::Name(name.into()), tracer))
    }

    /// Load a module from caller-supplied text and everything it imports.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Failed`] if the batch logged any error, including
    /// when a module of the same name is already cached.
    pub fn load_source(&mut self, source: Source) -> Result<Loaded, LoadError> {
        self.dispatch(|this, tracer| this.run_batch(Item::Source(source), tracer))
    }

    /// Remove module `name` from the cache.
    ///
    /// # Errors
    ///
    /// Fails if the module is not cached or another cached module imports
    /// it; nothing is removed in that case.
    pub fn unload(&mut self, name: &str) -> Result<(), UnloadError> {
        let Some(id) = self.cache.id_of(name) else {
            return Err(UnloadError::NotLoaded { name: name.into() });
        };
        let importers: Vec<String> = self
            .cache
            .importers_of(name)
            .into_iter()
            .filter(|&m| m != id)
            .filter_map(|m| self.cache.module(m))
            .map(|m| m.name().to_string())
            .collect();
        if !importers.is_empty() {
            return Err(UnloadError::InUse {
                name: name.into(),
                importers,
            });
        }
        self.cache.remove(id);
        self.dispatch(|_, tracer| tracer.module_unloaded(name));
        Ok(())
    }

    fn dispatch<R>(&mut self, run: impl FnOnce(&mut Self, &mut dyn LoadTracer) -> R) -> R {
        #[cfg(feature = "tracing")]
        if let Some(mut tracer) = self.tracer.take() {
            let result = run(self, &mut TracingWrapper(tracer.as_mut()));
            self.tracer = Some(tracer);
            return result;
        }
        run(self, &mut NoopLoadTracer)
    }

    fn run_batch(&mut self, first: Item, tracer: &mut dyn LoadTracer) -> Result<Loaded, LoadError> {
        let request = match &first {
            Item::Name(name) => name.clone(),
            Item::Source(source) => source.origin.to_string(),
        };
        tracer.batch_start(&request);

        let mut log = Log::new();
        let mut batch: Vec<ModuleId> = Vec::new();
        let mut requested = None;
        let mut seen = BTreeSet::new();
        if let Item::Name(name) = &first {
            seen.insert(name.clone());
        }
        let mut queue = VecDeque::from([(first, true)]);

        while let Some((item, explicit)) = queue.pop_front() {
            let (source, from_caller) = match item {
                Item::Source(source) => (source, true),
                Item::Name(name) => match self.locator.locate(&name) {
                    Some(source) => {
                        tracer.module_located(&name, &source.origin);
                        (source, false)
                    }
                    None if explicit => {
                        self.evict(&batch);
                        tracer.batch_rolled_back(batch.len());
                        return Err(LoadError::NotFound { name, log });
                    }
                    // The importer's initialize pass reports the missing module.
                    None => continue,
                },
            };

            let Some((id, fresh)) = self.parse(source, explicit, from_caller, &mut log, tracer)
            else {
                continue;
            };
            if explicit {
                requested = Some(id);
            }
            if !fresh {
                continue;
            }
            batch.push(id);

            let Some(module) = self.cache.module(id) else {
                continue;
            };
            for import in module.imports() {
                if !self.cache.contains(&import.name) && seen.insert(import.name.clone()) {
                    tracer.module_queued(&import.name);
                    queue.push_back((Item::Name(import.name.clone()), false));
                }
            }
        }

        tracer.phase_start(Phase::Initialize, batch.len());
        for &id in batch.iter().rev() {
            if let Err(err) = resolver::initialize(&mut self.cache, id, &mut log) {
                log.add_internal_error(Location::unknown(), err.to_string());
            }
        }
        tracer.phase_end(Phase::Initialize);

        tracer.phase_start(Phase::Validate, batch.len());
        for &id in batch.iter().rev() {
            if let Err(err) =
                resolver::validate_traced(&mut self.cache, id, &self.config, &mut log, tracer)
            {
                log.add_internal_error(Location::unknown(), err.to_string());
            }
        }
        tracer.phase_end(Phase::Validate);
        tracer.batch_end(batch.len(), log.error_count(), log.warning_count());

        match requested {
            Some(module) if log.error_count() == 0 => {
                tracer.batch_committed(batch.len());
                Ok(Loaded { module, log })
            }
            _ => {
                if log.error_count() == 0 {
                    log.add_internal_error(Location::unknown(), "batch produced no module");
                }
                self.evict(&batch);
                tracer.batch_rolled_back(batch.len());
                Err(LoadError::Failed { log })
            }
        }
    }

    /// Parse and analyze one source into the cache.
    ///
    /// The flag is false when the source names a module that is already
    /// cached and was located by name. That module keeps its state and is
    /// not part of the batch.
    fn parse(
        &mut self,
        source: Source,
        explicit: bool,
        from_caller: bool,
        log: &mut Log,
        tracer: &mut dyn LoadTracer,
    ) -> Option<(ModuleId, bool)> {
        let Source { origin, text } = source;
        let file = origin.to_string();
        let on_disk = matches!(origin, Origin::File(_));
        let tree = match Parser::new(&text).parse_module() {
            Ok(tree) => tree,
            Err(diagnostics) => {
                let index = LineIndex::new(&text);
                for diag in diagnostics {
                    let (line, column) = index.line_col(diag.span.start);
                    let severity = match diag.severity {
                        lexer::Severity::Error => Severity::Error,
                        lexer::Severity::Warning => Severity::Warning,
                    };
                    let location =
                        Location::new(Some(file.clone()), line, column).with_on_disk(on_disk);
                    log.add(Entry::new(severity, location, diag.message));
                }
                return None;
            }
        };

        let name = tree.name.name.as_str();
        if let Some(existing) = self.cache.id_of(name) {
            if from_caller {
                let index = LineIndex::new(&text);
                let (line, column) = index.line_col(tree.name.span.start);
                log.add_error(
                    Location::new(Some(file), line, column).with_on_disk(on_disk),
                    format!("module {name} is already loaded"),
                );
                return None;
            }
            if explicit {
                if let Some(module) = self.cache.module_mut(existing) {
                    module.loaded = true;
                }
            }
            return Some((existing, false));
        }

        let Some(id) = self.cache.allocate() else {
            log.add_internal_error(Location::unknown(), "module table is full");
            return None;
        };
        let mut module = analyze(&tree, id, Some(&origin), text, self.config.default_tagging, log);
        module.loaded = explicit;
        tracer.module_parsed(module.name(), id, module.symbol_count());
        self.cache.insert(module);
        Some((id, true))
    }

    fn evict(&mut self, batch: &[ModuleId]) {
        for &id in batch.iter().rev() {
            self.cache.remove(id);
        }
    }

    // === Read API ===

    /// Cached module called `name`.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.cache.module_by_name(name)
    }

    /// Cached module in slot `id`.
    #[must_use]
    pub fn module_by_id(&self, id: ModuleId) -> Option<&Module> {
        self.cache.module(id)
    }

    /// Cached modules in load order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.cache.modules()
    }

    /// Whether `name` is cached and was requested explicitly.
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.module(name).is_some_and(Module::is_loaded)
    }

    /// Symbol at `id`.
    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.cache.symbol(id)
    }

    /// Symbol `name` of module `module`.
    #[must_use]
    pub fn lookup(&self, module: &str, name: &str) -> Option<&Symbol> {
        self.module(module)?.symbol(name)
    }

    /// The shared OID tree.
    #[must_use]
    pub fn tree(&self) -> &OidTree {
        self.cache.tree()
    }

    /// The root names and their nodes.
    #[must_use]
    pub fn root_oids(&self) -> Vec<(&str, NodeId)> {
        self.cache
            .defaults()
            .symbols()
            .iter()
            .filter_map(|s| Some((s.name.as_str(), s.value()?.as_oid()?)))
            .collect()
    }

    /// Deepest node along `path`, across every cached module.
    #[must_use]
    pub fn find_oid(&self, path: &[u32]) -> Option<NodeId> {
        self.cache.defaults().find_oid(self.cache.tree(), path)
    }

    /// Dotted form of [`find_oid`](Self::find_oid).
    #[must_use]
    pub fn find_dotted(&self, dotted: &str) -> Option<NodeId> {
        self.find_oid(Oid::from_dotted(dotted)?.arcs())
    }

    /// Symbol owning the deepest node along `path`.
    #[must_use]
    pub fn symbol_by_oid(&self, path: &[u32]) -> Option<&Symbol> {
        let mut node = self.find_oid(path);
        while let Some(id) = node {
            if let Some(owner) = self.tree().symbol(id).filter(|s| !s.is_root()) {
                return self.cache.symbol(owner);
            }
            node = self.tree().parent(id);
        }
        None
    }

    /// Names of cached modules that import `name`.
    #[must_use]
    pub fn importers_of(&self, name: &str) -> Vec<&str> {
        self.cache
            .importers_of(name)
            .into_iter()
            .filter_map(|id| self.cache.module(id))
            .map(Module::name)
            .collect()
    }

    /// The root scope of this session.
    #[must_use]
    pub fn default_context(&self) -> &DefaultContext {
        self.cache.defaults()
    }

    /// The resolved symbol store.
    #[must_use]
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }
}
