//! mibloader-std: filesystem integration for mibloader
//!
//! The core crate does no IO. This crate supplies the pieces a native
//! application needs around it: a [`FileLocator`] that finds modules on
//! disk, caret-style rendering of diagnostics that re-reads the offending
//! file, and a [`TracingBridge`] forwarding loader trace events to the
//! `tracing` ecosystem.
//!
//! ```no_run
//! use mibloader_std::{FileLocator, TracingBridge};
//! use mibloader_std::mibloader_core::Loader;
//!
//! let mut locator = FileLocator::new();
//! locator.add_dir("/usr/share/snmp/mibs");
//! let mut loader = Loader::new(locator).with_tracer(TracingBridge::new());
//! match loader.load("IF-MIB") {
//!     Ok(loaded) => eprint!("{}", mibloader_std::report::render_log_in(&loaded.log, loader.cache())),
//!     Err(err) => eprint!("{}", mibloader_std::report::render_log(err.log())),
//! }
//! ```

pub mod locator;
pub mod logging;
pub mod report;

pub use locator::FileLocator;
pub use logging::TracingBridge;
pub use report::SourceError;

pub use mibloader_core;
