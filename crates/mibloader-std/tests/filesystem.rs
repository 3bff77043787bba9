//! Loading modules from directories on disk.

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use mibloader_std::mibloader_core::loader::{Locator, Origin, Source};
use mibloader_std::mibloader_core::trace::TraceLevel;
use mibloader_std::mibloader_core::Loader;
use mibloader_std::{report, FileLocator, TracingBridge};

const ACME_MIB: &str = "-- ACME enterprise root
ACME-MIB DEFINITIONS ::= BEGIN
IMPORTS enterprises FROM SNMPv2-SMI;
acme OBJECT IDENTIFIER ::= { enterprises 99999 }
END
";

const ACME_PRODUCTS_MIB: &str = "ACME-PRODUCTS-MIB DEFINITIONS ::= BEGIN
IMPORTS acme FROM ACME-MIB;
acmeProducts OBJECT IDENTIFIER ::= { acme 1 }
END
";

fn write(dir: &Path, file: &str, text: &str) {
    fs::write(dir.join(file), text).unwrap();
}

#[test]
fn test_stem_match_ignores_case_and_extension() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "acme-mib.my", ACME_MIB);
    write(dir.path(), "ACME-MIB.bak", "garbage");

    let mut locator = FileLocator::new();
    locator.add_dir(dir.path());
    let source = locator.locate("ACME-MIB").unwrap();
    assert_eq!(
        source.origin,
        Origin::File(dir.path().join("acme-mib.my").display().to_string())
    );
    assert_eq!(source.text, ACME_MIB);
    assert!(locator.locate("ACME-PRODUCTS-MIB").is_none());
}

#[test]
fn test_search_dirs_shadow_resources_and_bundle() {
    let search = tempfile::tempdir().unwrap();
    let resources = tempfile::tempdir().unwrap();
    write(search.path(), "SNMPv2-TC.txt", "from search dir");
    write(resources.path(), "SNMPv2-CONF", "from resources");

    let mut locator = FileLocator::new();
    locator.add_dir(search.path()).add_resource_dir(resources.path());

    assert_eq!(locator.locate("SNMPv2-TC").unwrap().text, "from search dir");
    assert_eq!(locator.locate("SNMPv2-CONF").unwrap().text, "from resources");
    let smi = locator.locate("SNMPv2-SMI").unwrap();
    assert_eq!(smi.origin, Origin::Stream("SNMPv2-SMI".into()));

    let mut bare = FileLocator::new().with_bundled(false);
    assert!(bare.locate("SNMPv2-SMI").is_none());
}

#[test]
fn test_header_sniffing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "acme.txt", ACME_MIB);
    write(dir.path(), "products", ACME_PRODUCTS_MIB);
    write(dir.path(), "readme.txt", "not a module");

    let mut locator = FileLocator::new();
    locator.add_dir(dir.path());
    let source = locator.locate("ACME-MIB").unwrap();
    assert_eq!(source.text, ACME_MIB);
    assert!(locator.locate("acme-mib").is_none());

    let mut loader = Loader::new(locator);
    let loaded = loader.load("ACME-PRODUCTS-MIB").unwrap();
    assert!(loaded.log.is_empty(), "{}", loaded.log);
    let node = loader.find_dotted("1.3.6.1.4.1.99999.1").unwrap();
    assert_eq!(loader.tree().path(node).to_string(), "1.3.6.1.4.1.99999.1");
    assert!(loader.module("ACME-MIB").is_some());
}

#[test]
fn test_report_shows_source_line() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "BROKEN-MIB.mib",
        "BROKEN-MIB DEFINITIONS ::= BEGIN\nBad ::= Missing\nEND\n",
    );
    let mut locator = FileLocator::new();
    locator.add_dir(dir.path());

    let mut loader = Loader::new(locator);
    let err = loader.load("BROKEN-MIB").unwrap_err();
    assert_eq!(err.log().error_count(), 1);

    let rendered = report::render_log(err.log());
    let mut lines = rendered.lines();
    let header = lines.next().unwrap();
    assert!(header.contains("BROKEN-MIB.mib:2:"), "{header}");
    assert!(header.contains("error: "), "{header}");
    assert_eq!(lines.next(), Some("Bad ::= Missing"));
    assert!(lines.next().is_some_and(|caret| caret.trim_start() == "^"));
}

#[test]
fn test_report_takes_stream_text_from_cache() {
    let mut loader = Loader::new(FileLocator::new());
    let loaded = loader
        .load_source(Source::from_text(
            "inline",
            "M DEFINITIONS ::= BEGIN\nmy_value INTEGER ::= 1\nEND\n",
        ))
        .unwrap();
    assert_eq!(loaded.log.warning_count(), 1);
    assert!(!loaded.log.entries()[0].location.on_disk);

    let rendered = report::render_log_in(&loaded.log, loader.cache());
    let mut lines = rendered.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("inline:2:1: warning: "), "{header}");
    assert_eq!(lines.next(), Some("my_value INTEGER ::= 1"));
    assert_eq!(lines.next(), Some("^"));

    assert_eq!(report::render_log(&loaded.log).lines().count(), 1);
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_tracing_bridge_forwards_events() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut loader =
            Loader::new(FileLocator::new()).with_tracer(TracingBridge::with_level(TraceLevel::Debug));
        loader.load("SNMPv2-TC").unwrap();
        loader.unload("SNMPv2-TC").unwrap();
    });

    let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("batch started"), "{output}");
    assert!(output.contains("request=\"SNMPv2-TC\""), "{output}");
    assert!(output.contains("module parsed"), "{output}");
    assert!(output.contains("batch committed"), "{output}");
    assert!(output.contains("module unloaded"), "{output}");
    assert!(!output.contains("oid attached"), "{output}");
}
