//! Loader tracing support.
//!
//! Structured trace events for following a batch through its phases. The
//! loader only emits them when built with the `tracing` feature.

use crate::model::ModuleId;

/// Trace verbosity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    /// Critical errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Batch and phase boundaries.
    Info,
    /// Per-module and per-symbol decisions.
    Debug,
    /// Every operation.
    Trace,
}

/// Resolution pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Imports bound to their targets.
    Initialize,
    /// Symbol bodies resolved.
    Validate,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::Initialize => write!(f, "initialize"),
            Phase::Validate => write!(f, "validate"),
        }
    }
}

/// Structured trace events emitted by the loader.
#[derive(Clone, Debug)]
pub enum TraceEvent<'a> {
    /// A load request started a batch.
    BatchStart {
        /// Requested module, or the label of a supplied source.
        request: &'a str,
    },
    /// A batch finished parsing and resolving.
    BatchEnd {
        /// Modules parsed in the batch.
        modules: usize,
        /// Errors logged.
        errors: usize,
        /// Warnings logged.
        warnings: usize,
    },
    /// A module name was added to the queue.
    ModuleQueued {
        /// The module name.
        name: &'a str,
    },
    /// A source was found for a queued name.
    ModuleLocated {
        /// The module name.
        name: &'a str,
        /// Where the source came from.
        origin: &'a str,
    },
    /// A source was parsed into a module.
    ModuleParsed {
        /// The module name.
        name: &'a str,
        /// Cache slot of the new module.
        id: ModuleId,
        /// Number of declared symbols.
        symbols: usize,
    },
    /// A resolution pass is starting.
    PhaseStart {
        /// The pass.
        phase: Phase,
        /// Modules it covers.
        modules: usize,
    },
    /// A resolution pass has ended.
    PhaseEnd {
        /// The pass.
        phase: Phase,
    },
    /// A name did not resolve.
    ReferenceUnresolved {
        /// Module containing the reference.
        module: &'a str,
        /// The unresolved name.
        name: &'a str,
    },
    /// A value symbol was attached to an OID node.
    OidAttached {
        /// Symbol name.
        symbol: &'a str,
        /// Dotted path of the node.
        oid: &'a str,
    },
    /// A symbol claimed a node another symbol already owns.
    DuplicateOid {
        /// Symbol name.
        symbol: &'a str,
        /// Name of the existing owner.
        owner: &'a str,
        /// Dotted path of the node.
        oid: &'a str,
    },
    /// Every module of the batch stayed in the cache.
    BatchCommitted {
        /// Modules kept.
        modules: usize,
    },
    /// The batch was evicted because of errors.
    BatchRolledBack {
        /// Modules evicted.
        modules: usize,
    },
    /// A module was removed from the cache.
    ModuleUnloaded {
        /// The module name.
        name: &'a str,
    },
}

/// Receiver of trace events.
///
/// The tracer filters events by the minimum level returned from `level()`.
pub trait Tracer {
    /// Minimum level to emit. Default: `TraceLevel::Info`.
    fn level(&self) -> TraceLevel {
        TraceLevel::Info
    }

    /// Called for each event at or above the configured level.
    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>);
}

/// A tracer that discards every event.
#[derive(Default, Clone, Copy, Debug)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn level(&self) -> TraceLevel {
        TraceLevel::Error
    }

    fn trace(&mut self, _level: TraceLevel, _event: TraceEvent<'_>) {}
}

/// Emit a trace event if the tracer level permits.
///
/// The event expression is only evaluated when it will be delivered.
#[macro_export]
macro_rules! trace_event {
    ($tracer:expr, $level:expr, $event:expr) => {
        if $level <= $tracer.level() {
            $tracer.trace($level, $event);
        }
    };
}
