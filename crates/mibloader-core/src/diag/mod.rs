//! Diagnostics log.
//!
//! Every phase of a load appends positioned entries to one [`Log`]. Semantic
//! problems never abort a phase; the loader decides success or failure from
//! the error count once the whole batch has been processed.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Severity of a log entry, ordered from most to least grave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// A bug signal, e.g. a front-end construction failure.
    InternalError,
    /// The batch cannot be committed.
    Error,
    /// Suspicious but tolerated input.
    Warning,
}

impl Severity {
    /// Lowercase label used in rendered entries.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InternalError => "internal error",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    /// Whether entries of this severity fail a batch.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::InternalError | Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Source position of an entry.
///
/// Lines and columns are 1-based; line 0 means the position is unknown.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Location {
    /// File the entry refers to, if it came from a file.
    pub file: Option<String>,
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// Whether `file` names a file on disk rather than a stream label.
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_disk: bool,
}

impl Location {
    /// Create a location.
    #[must_use]
    pub fn new(file: Option<String>, line: u32, column: u32) -> Self {
        Self {
            file,
            line,
            column,
            on_disk: false,
        }
    }

    /// Mark `file` as a path on disk.
    #[must_use]
    pub fn with_on_disk(mut self, on_disk: bool) -> Self {
        self.on_disk = on_disk;
        self
    }

    /// A location with no position information.
    #[must_use]
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Whether the location carries a line number.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.line > 0
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("<unknown>");
        if self.is_known() {
            write!(f, "{file}:{}:{}", self.line, self.column)
        } else {
            f.write_str(file)
        }
    }
}

/// One diagnostics entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    /// Severity.
    pub severity: Severity,
    /// Where the problem is.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Entry {
    /// Create an entry.
    #[must_use]
    pub fn new(severity: Severity, location: Location, message: impl Into<String>) -> Self {
        Self {
            severity,
            location,
            message: message.into(),
        }
    }

    /// Extract the offending line from `text`, the content of the entry's file.
    ///
    /// Returns `None` when the location is unknown or out of range.
    #[must_use]
    pub fn source_line<'t>(&self, text: &'t str) -> Option<&'t str> {
        if !self.location.is_known() {
            return None;
        }
        text.lines()
            .nth(self.location.line as usize - 1)
            .map(|line| line.trim_end_matches('\r'))
    }

    /// A line of spaces ending in `^` under the entry's column.
    #[must_use]
    pub fn caret_line(&self) -> String {
        let mut caret = String::new();
        for _ in 1..self.location.column.max(1) {
            caret.push(' ');
        }
        caret.push('^');
        caret
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Ordered collection of diagnostics entries with running counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Log {
    entries: Vec<Entry>,
    errors: usize,
    warnings: usize,
}

impl Log {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn add(&mut self, entry: Entry) {
        match entry.severity {
            Severity::InternalError | Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
        }
        self.entries.push(entry);
    }

    /// Append an error.
    pub fn add_error(&mut self, location: Location, message: impl Into<String>) {
        self.add(Entry::new(Severity::Error, location, message));
    }

    /// Append a warning.
    pub fn add_warning(&mut self, location: Location, message: impl Into<String>) {
        self.add(Entry::new(Severity::Warning, location, message));
    }

    /// Append an internal error.
    pub fn add_internal_error(&mut self, location: Location, message: impl Into<String>) {
        self.add(Entry::new(Severity::InternalError, location, message));
    }

    /// Number of errors, internal errors included.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterate over entries of one severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.severity == severity)
    }

    /// Whether the log has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move all entries of `other` to the end of this log.
    pub fn append(&mut self, other: Log) {
        for entry in other.entries {
            self.add(entry);
        }
    }
}

impl<'a> IntoIterator for &'a Log {
    type Item = &'a Entry;
    type IntoIter = core::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::ToString;

    fn at(line: u32, column: u32) -> Location {
        Location::new(Some("IF-MIB.txt".into()), line, column)
    }

    #[test]
    fn test_counts() {
        let mut log = Log::new();
        assert!(log.is_empty());
        log.add_error(at(1, 1), "first");
        log.add_warning(at(2, 1), "second");
        log.add_internal_error(at(3, 1), "third");
        assert_eq!(log.error_count(), 2);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_insertion_order() {
        let mut log = Log::new();
        log.add_warning(at(9, 1), "b");
        log.add_error(at(1, 1), "a");
        let messages: Vec<_> = log.entries().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "a"]);
    }

    #[test]
    fn test_append_keeps_counts() {
        let mut first = Log::new();
        first.add_error(at(1, 1), "a");
        let mut second = Log::new();
        second.add_warning(at(1, 1), "b");
        second.add_error(at(2, 1), "c");
        first.append(second);
        assert_eq!(first.error_count(), 2);
        assert_eq!(first.warning_count(), 1);
    }

    #[test]
    fn test_entry_display() {
        let entry = Entry::new(Severity::Error, at(12, 5), "undefined symbol 'Foo'");
        assert_eq!(entry.to_string(), "IF-MIB.txt:12:5: error: undefined symbol 'Foo'");

        let entry = Entry::new(Severity::Warning, Location::unknown(), "odd");
        assert_eq!(format!("{entry}"), "<unknown>: warning: odd");
    }

    #[test]
    fn test_source_line_and_caret() {
        let text = "A DEFINITIONS ::= BEGIN\r\n  x Foo ::= 1\r\nEND\r\n";
        let entry = Entry::new(Severity::Error, at(2, 5), "bad");
        assert_eq!(entry.source_line(text), Some("  x Foo ::= 1"));
        assert_eq!(entry.caret_line(), "    ^");

        let missing = Entry::new(Severity::Error, at(40, 1), "bad");
        assert_eq!(missing.source_line(text), None);
        let unknown = Entry::new(Severity::Error, Location::unknown(), "bad");
        assert_eq!(unknown.source_line(text), None);
    }

    #[test]
    fn test_severity_order() {
        assert!(Severity::InternalError < Severity::Error);
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::InternalError.is_error());
        assert!(!Severity::Warning.is_error());
    }
}
