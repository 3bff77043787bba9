//! mibloader-core: offline SNMP MIB loader
//!
//! Turns a set of named, mutually importing MIB modules into resolved symbol
//! tables and a shared OID tree. The crate is `no_std` compatible and does
//! no IO; sources reach it through a [`loader::Locator`].
//!
//! # Pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Analyzer → Module → Resolver → cache
//! ```
//!
//! Each load request is one batch: imports are discovered and queued while
//! parsing, every module is then initialized and validated, and the batch is
//! committed only if its log holds no error.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod analyzer;
pub mod ast;
pub mod context;
pub mod diag;
pub mod lexer;
pub mod loader;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod trace;

pub use diag::{Entry, Location, Log, Severity};
pub use loader::{LoadError, Loaded, Loader, LoaderConfig, Locator, Source, UnloadError};
pub use model::{Module, ModuleId, NodeId, Oid, OidTree, Symbol, SymbolId};
