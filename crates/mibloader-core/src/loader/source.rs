//! Module sources and the locator contract.

use super::bundled;
use alloc::collections::BTreeMap;
use alloc::string::String;
use core::fmt;

/// Where a module source came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A file on disk.
    File(String),
    /// A remote document.
    Url(String),
    /// Text handed over by the caller, with a label for diagnostics.
    Stream(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => f.write_str(path),
            Self::Url(url) => f.write_str(url),
            Self::Stream(label) => f.write_str(label),
        }
    }
}

/// Text of one module and where it came from.
#[derive(Clone, Debug)]
pub struct Source {
    /// Origin of the text.
    pub origin: Origin,
    /// The module text.
    pub text: String,
}

impl Source {
    /// A caller-supplied source.
    #[must_use]
    pub fn from_text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Stream(label.into()),
            text: text.into(),
        }
    }

    /// A source read from `path`.
    #[must_use]
    pub fn from_file(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: Origin::File(path.into()),
            text: text.into(),
        }
    }
}

/// Maps a module name to its source.
pub trait Locator {
    /// Find the source of module `name`.
    fn locate(&mut self, name: &str) -> Option<Source>;
}

impl<L: Locator + ?Sized> Locator for &mut L {
    fn locate(&mut self, name: &str) -> Option<Source> {
        (**self).locate(name)
    }
}

/// The embedded standard modules, matched by exact name.
#[derive(Clone, Copy, Debug, Default)]
pub struct BundledLocator;

impl Locator for BundledLocator {
    fn locate(&mut self, name: &str) -> Option<Source> {
        bundled::source(name)
    }
}

/// Module texts held in memory, backed by the embedded standard modules.
#[derive(Clone, Debug, Default)]
pub struct MemoryLocator {
    modules: BTreeMap<String, String>,
}

impl MemoryLocator {
    /// An empty locator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the text of module `name`, replacing any earlier text.
    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.modules.insert(name.into(), text.into());
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_module(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(name, text);
        self
    }
}

impl Locator for MemoryLocator {
    fn locate(&mut self, name: &str) -> Option<Source> {
        match self.modules.get(name) {
            Some(text) => Some(Source::from_text(name, text.as_str())),
            None => bundled::source(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_origin_display() {
        assert_eq!(Origin::File("/tmp/A.mib".into()).to_string(), "/tmp/A.mib");
        assert_eq!(Source::from_text("input", "").origin.to_string(), "input");
    }

    #[test]
    fn test_memory_locator_prefers_own_modules() {
        let mut locator = MemoryLocator::new().with_module("SNMPv2-SMI", "override");
        assert_eq!(locator.locate("SNMPv2-SMI").unwrap().text, "override");
        assert!(locator.locate("SNMPv2-TC").is_some());
        assert!(locator.locate("snmpv2-tc").is_none());
        assert!(locator.locate("NOPE-MIB").is_none());
    }
}
