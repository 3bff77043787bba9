//! Rendering diagnostics with source context.
//!
//! Entries only carry a file name and a position. Entries from files on disk
//! are rendered by re-reading the file to show the offending line with a
//! caret under the column. Entries from streams and bundled modules take the
//! text from the cached module, or from text the caller supplies. When no
//! text is available the entry is shown on its own.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;

use mibloader_core::loader::ModuleCache;
use mibloader_core::{Entry, Log};

/// Failure to fetch the source line of an entry.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

/// The line `entry` points at, read from its file on disk.
///
/// Returns `Ok(None)` for entries without a known position, for entries
/// whose file is a stream label rather than a path, and when the file is
/// shorter than the entry's line.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be read.
pub fn source_line(entry: &Entry) -> Result<Option<String>, SourceError> {
    let Some(file) = entry.location.file.as_deref() else {
        return Ok(None);
    };
    if !entry.location.on_disk || !entry.location.is_known() {
        return Ok(None);
    }
    let path = PathBuf::from(file);
    let bytes = fs::read(&path).map_err(|source| SourceError::Io { path, source })?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(entry.source_line(&text).map(str::to_string))
}

/// `entry` followed by its source line and a caret, when available.
pub fn render(entry: &Entry) -> String {
    match source_line(entry) {
        Ok(line) => with_line(entry, line.as_deref()),
        Err(err) => {
            tracing::trace!("no source context: {err}");
            entry.to_string()
        }
    }
}

/// `entry` rendered against `text`, the content of the entry's source.
pub fn render_with(entry: &Entry, text: &str) -> String {
    with_line(entry, entry.source_line(text))
}

/// `entry` rendered against the cached module it was reported in, falling
/// back to [`render`] when no cached module has the entry's file.
pub fn render_in(entry: &Entry, cache: &ModuleCache) -> String {
    let module = entry
        .location
        .file
        .as_deref()
        .and_then(|file| cache.modules().find(|m| m.file() == Some(file)));
    match module {
        Some(module) => render_with(entry, module.text()),
        None => render(entry),
    }
}

fn with_line(entry: &Entry, line: Option<&str>) -> String {
    let mut out = entry.to_string();
    if let Some(line) = line {
        let _ = write!(out, "\n{line}\n{}", entry.caret_line());
    }
    out
}

/// Every entry of `log` rendered with [`render`], one block per entry.
pub fn render_log(log: &Log) -> String {
    join(log, render)
}

/// Every entry of `log` rendered with [`render_in`].
pub fn render_log_in(log: &Log, cache: &ModuleCache) -> String {
    join(log, |entry| render_in(entry, cache))
}

fn join(log: &Log, mut render: impl FnMut(&Entry) -> String) -> String {
    let mut out = String::new();
    for entry in log.entries() {
        out.push_str(&render(entry));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mibloader_core::{Location, Severity};
    use std::io::Write as _;

    #[test]
    fn test_render_with_caret() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "A DEFINITIONS ::= BEGIN\n  x Foo ::= 1\nEND\n").unwrap();
        let path = file.path().display().to_string();

        let entry = Entry::new(
            Severity::Error,
            Location::new(Some(path.clone()), 2, 5).with_on_disk(true),
            "undefined symbol 'Foo'",
        );
        assert_eq!(
            render(&entry),
            format!("{path}:2:5: error: undefined symbol 'Foo'\n  x Foo ::= 1\n    ^")
        );
    }

    #[test]
    fn test_render_degrades_without_file() {
        let entry = Entry::new(
            Severity::Warning,
            Location::new(Some("/nonexistent/X-MIB".into()), 3, 1).with_on_disk(true),
            "suspicious",
        );
        assert!(matches!(source_line(&entry), Err(SourceError::Io { .. })));
        assert_eq!(render(&entry), "/nonexistent/X-MIB:3:1: warning: suspicious");

        let unknown = Entry::new(Severity::Error, Location::unknown(), "lost");
        assert_eq!(source_line(&unknown).unwrap(), None);
        assert_eq!(render(&unknown), "<unknown>: error: lost");
    }

    #[test]
    fn test_stream_label_is_not_a_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "first\nsecond\n").unwrap();
        let label = file.path().display().to_string();

        let entry = Entry::new(Severity::Error, Location::new(Some(label.clone()), 2, 1), "bad");
        assert_eq!(source_line(&entry).unwrap(), None);
        assert_eq!(render(&entry), format!("{label}:2:1: error: bad"));
        assert_eq!(
            render_with(&entry, "one\n  two\n"),
            format!("{label}:2:1: error: bad\n  two\n^")
        );
    }

    #[test]
    fn test_render_log() {
        let mut log = Log::new();
        log.add_error(Location::unknown(), "one");
        log.add_warning(Location::unknown(), "two");
        assert_eq!(render_log(&log), "<unknown>: error: one\n<unknown>: warning: two\n");
    }
}
