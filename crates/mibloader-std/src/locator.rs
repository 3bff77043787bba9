//! Locating modules on disk.
//!
//! [`FileLocator`] tries three tiers in order:
//!
//! 1. search directories, matching the file stem against the module name
//!    without regard to case;
//! 2. resource directories, then the bundled standard modules, matching the
//!    name exactly;
//! 3. the content of every file in the search directories, matching the
//!    module name declared in its header.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use mibloader_core::loader::{BundledLocator, Locator, Source};

/// File extensions accepted for module files; the empty string stands for a
/// file without extension.
pub const EXTENSIONS: [&str; 4] = ["", "mib", "my", "txt"];

/// Finds module sources in directories and the embedded bundle.
#[derive(Debug)]
pub struct FileLocator {
    dirs: Vec<PathBuf>,
    resource_dirs: Vec<PathBuf>,
    bundled: bool,
    headers: Option<HashMap<String, PathBuf>>,
}

impl Default for FileLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLocator {
    /// A locator with no directories that falls back to the bundle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirs: Vec::new(),
            resource_dirs: Vec::new(),
            bundled: true,
            headers: None,
        }
    }

    /// Append a search directory.
    pub fn add_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.dirs.push(dir.into());
        self.headers = None;
        self
    }

    /// Append a resource directory, searched by exact name.
    pub fn add_resource_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.resource_dirs.push(dir.into());
        self
    }

    /// Enable or disable the embedded standard modules.
    #[must_use]
    pub fn with_bundled(mut self, bundled: bool) -> Self {
        self.bundled = bundled;
        self
    }

    /// The search directories, in lookup order.
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn by_stem(&self, name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .flat_map(|dir| module_files(dir))
            .find(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(name))
            })
    }

    fn by_resource(&self, name: &str) -> Option<PathBuf> {
        self.resource_dirs.iter().find_map(|dir| {
            EXTENSIONS.iter().find_map(|ext| {
                let path = if ext.is_empty() {
                    dir.join(name)
                } else {
                    dir.join(format!("{name}.{ext}"))
                };
                path.is_file().then_some(path)
            })
        })
    }

    fn by_header(&mut self, name: &str) -> Option<PathBuf> {
        let dirs = &self.dirs;
        let headers = self.headers.get_or_insert_with(|| {
            let mut headers = HashMap::new();
            for path in dirs.iter().flat_map(|dir| module_files(dir)) {
                let Some(text) = read(&path) else {
                    continue;
                };
                if let Some(declared) = declared_name(&text) {
                    headers.entry(declared.to_string()).or_insert(path);
                }
            }
            tracing::debug!(files = headers.len(), "indexed module headers");
            headers
        });
        headers.get(name).cloned()
    }
}

impl Locator for FileLocator {
    fn locate(&mut self, name: &str) -> Option<Source> {
        if let Some(path) = self.by_stem(name).or_else(|| self.by_resource(name)) {
            return load(&path);
        }
        if self.bundled {
            if let Some(source) = BundledLocator.locate(name) {
                return Some(source);
            }
        }
        let path = self.by_header(name)?;
        tracing::debug!(module = name, path = %path.display(), "located module by header");
        load(&path)
    }
}

/// Files directly inside `dir` with an accepted extension, sorted by path.
fn module_files(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), "cannot read directory: {err}");
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_module_extension(path))
        .collect();
    files.sort();
    files
}

fn has_module_extension(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        None => true,
        Some(ext) => EXTENSIONS[1..].iter().any(|e| ext.eq_ignore_ascii_case(e)),
    }
}

fn read(path: &Path) -> Option<String> {
    match fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) => {
            tracing::warn!(path = %path.display(), "cannot read module file: {err}");
            None
        }
    }
}

fn load(path: &Path) -> Option<Source> {
    let text = read(path)?;
    Some(Source::from_file(path.display().to_string(), text))
}

/// Name declared by a module header: the first word followed by
/// `DEFINITIONS`, ignoring comments.
pub fn declared_name(text: &str) -> Option<&str> {
    let mut words = text.lines().flat_map(code_words);
    let first = words.next()?;
    (words.next()? == "DEFINITIONS").then_some(first)
}

/// Words of `line` outside `--` comments. A comment ends at the next `--`
/// or at the end of the line.
fn code_words(line: &str) -> impl Iterator<Item = &str> {
    line.split("--")
        .step_by(2)
        .flat_map(str::split_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_name() {
        assert_eq!(declared_name("IF-MIB DEFINITIONS ::= BEGIN"), Some("IF-MIB"));
        assert_eq!(
            declared_name("-- header -- \n\n-- more\n  X-MIB\n DEFINITIONS ::= BEGIN"),
            Some("X-MIB")
        );
        assert_eq!(
            declared_name("-- a -- Y-MIB -- b\nDEFINITIONS ::= BEGIN"),
            Some("Y-MIB")
        );
        assert_eq!(declared_name("X-MIB ::= BEGIN"), None);
        assert_eq!(declared_name("-- only a comment"), None);
    }

    #[test]
    fn test_module_extension() {
        assert!(has_module_extension(Path::new("IF-MIB")));
        assert!(has_module_extension(Path::new("IF-MIB.MIB")));
        assert!(has_module_extension(Path::new("if-mib.my")));
        assert!(!has_module_extension(Path::new("IF-MIB.bak")));
    }
}
