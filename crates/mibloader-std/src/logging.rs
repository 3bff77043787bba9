//! Loader trace events as `tracing` events.

use mibloader_core::trace::{TraceEvent, TraceLevel, Tracer};
use tracing::level_filters::LevelFilter;

macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            TraceLevel::Error => tracing::error!($($arg)+),
            TraceLevel::Warn => tracing::warn!($($arg)+),
            TraceLevel::Info => tracing::info!($($arg)+),
            TraceLevel::Debug => tracing::debug!($($arg)+),
            TraceLevel::Trace => tracing::trace!($($arg)+),
        }
    };
}

/// A [`Tracer`] that forwards every event to the current `tracing`
/// subscriber under the `mibloader` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingBridge {
    level: Option<TraceLevel>,
}

impl TracingBridge {
    /// Follow the most verbose level any subscriber is interested in.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit events up to `level`, whatever the subscribers want.
    #[must_use]
    pub fn with_level(level: TraceLevel) -> Self {
        Self { level: Some(level) }
    }
}

fn from_filter(filter: LevelFilter) -> TraceLevel {
    if filter >= LevelFilter::TRACE {
        TraceLevel::Trace
    } else if filter >= LevelFilter::DEBUG {
        TraceLevel::Debug
    } else if filter >= LevelFilter::INFO {
        TraceLevel::Info
    } else if filter >= LevelFilter::WARN {
        TraceLevel::Warn
    } else {
        TraceLevel::Error
    }
}

impl Tracer for TracingBridge {
    fn level(&self) -> TraceLevel {
        self.level
            .unwrap_or_else(|| from_filter(LevelFilter::current()))
    }

    fn trace(&mut self, level: TraceLevel, event: TraceEvent<'_>) {
        match event {
            TraceEvent::BatchStart { request } => {
                emit!(level, target: "mibloader", request, "batch started");
            }
            TraceEvent::BatchEnd {
                modules,
                errors,
                warnings,
            } => {
                emit!(level, target: "mibloader", modules, errors, warnings, "batch resolved");
            }
            TraceEvent::ModuleQueued { name } => {
                emit!(level, target: "mibloader", module = name, "module queued");
            }
            TraceEvent::ModuleLocated { name, origin } => {
                emit!(level, target: "mibloader", module = name, origin, "module located");
            }
            TraceEvent::ModuleParsed { name, id, symbols } => {
                emit!(level, target: "mibloader", module = name, id = ?id, symbols, "module parsed");
            }
            TraceEvent::PhaseStart { phase, modules } => {
                emit!(level, target: "mibloader", phase = %phase, modules, "phase started");
            }
            TraceEvent::PhaseEnd { phase } => {
                emit!(level, target: "mibloader", phase = %phase, "phase finished");
            }
            TraceEvent::ReferenceUnresolved { module, name } => {
                emit!(level, target: "mibloader", module, name, "unresolved reference");
            }
            TraceEvent::OidAttached { symbol, oid } => {
                emit!(level, target: "mibloader", symbol, oid, "oid attached");
            }
            TraceEvent::DuplicateOid { symbol, owner, oid } => {
                emit!(level, target: "mibloader", symbol, owner, oid, "duplicate oid");
            }
            TraceEvent::BatchCommitted { modules } => {
                emit!(level, target: "mibloader", modules, "batch committed");
            }
            TraceEvent::BatchRolledBack { modules } => {
                emit!(level, target: "mibloader", modules, "batch rolled back");
            }
            TraceEvent::ModuleUnloaded { name } => {
                emit!(level, target: "mibloader", module = name, "module unloaded");
            }
        }
    }
}
