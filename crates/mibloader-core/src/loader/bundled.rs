//! Standard modules compiled into the crate.

use super::source::{Origin, Source};

const MODULES: [(&str, &str); 7] = [
    ("RFC1155-SMI", include_str!("../../mibs/RFC1155-SMI.txt")),
    ("RFC-1212", include_str!("../../mibs/RFC-1212.txt")),
    ("RFC-1215", include_str!("../../mibs/RFC-1215.txt")),
    ("RFC1213-MIB", include_str!("../../mibs/RFC1213-MIB.txt")),
    ("SNMPv2-SMI", include_str!("../../mibs/SNMPv2-SMI.txt")),
    ("SNMPv2-TC", include_str!("../../mibs/SNMPv2-TC.txt")),
    ("SNMPv2-CONF", include_str!("../../mibs/SNMPv2-CONF.txt")),
];

/// Names of the bundled modules.
pub fn names() -> impl Iterator<Item = &'static str> {
    MODULES.iter().map(|(name, _)| *name)
}

/// Text of bundled module `name`. Names are case-sensitive.
#[must_use]
pub fn text(name: &str) -> Option<&'static str> {
    MODULES.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

pub(crate) fn source(name: &str) -> Option<Source> {
    text(name).map(|text| Source {
        origin: Origin::Stream(name.into()),
        text: text.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_exact() {
        assert!(text("SNMPv2-SMI").is_some_and(|t| t.contains("SNMPv2-SMI DEFINITIONS")));
        assert!(text("SNMPV2-SMI").is_none());
        assert_eq!(names().count(), 7);
    }
}
