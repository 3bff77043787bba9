//! Keyword lookup table.
//!
//! Uses a sorted static array with binary search for `no_std` compatibility.

use super::TokenKind;

/// Keyword entry mapping text to token kind.
struct KeywordEntry {
    text: &'static str,
    kind: TokenKind,
}

macro_rules! keywords {
    ($($text:literal => $kind:ident),* $(,)?) => {
        &[$(KeywordEntry { text: $text, kind: TokenKind::$kind }),*]
    };
}

/// Sorted keyword table for binary search.
///
/// Must stay sorted by ASCII byte order; `test_keywords_sorted` checks it.
static KEYWORDS: &[KeywordEntry] = keywords![
    "ANY" => KwAny,
    "APPLICATION" => KwApplication,
    "BEGIN" => KwBegin,
    "BITS" => KwBits,
    "BOOLEAN" => KwBoolean,
    "CHOICE" => KwChoice,
    "COMPONENT" => KwComponent,
    "COMPONENTS" => KwComponents,
    "DEFINITIONS" => KwDefinitions,
    "END" => KwEnd,
    "ENUMERATED" => KwEnumerated,
    "EXPLICIT" => KwExplicit,
    "EXPORTS" => KwExports,
    "FALSE" => KwFalse,
    "FROM" => KwFrom,
    "IDENTIFIER" => KwIdentifier,
    "IMPLICIT" => KwImplicit,
    "IMPORTS" => KwImports,
    "INTEGER" => KwInteger,
    "MACRO" => KwMacro,
    "MAX" => KwMax,
    "MIN" => KwMin,
    "NULL" => KwNull,
    "OBJECT" => KwObject,
    "OCTET" => KwOctet,
    "OF" => KwOf,
    "PRIVATE" => KwPrivate,
    "REAL" => KwReal,
    "SEQUENCE" => KwSequence,
    "SET" => KwSet,
    "SIZE" => KwSize,
    "STRING" => KwString,
    "TAGS" => KwTags,
    "TRUE" => KwTrue,
    "UNIVERSAL" => KwUniversal,
    "WITH" => KwWith,
];

/// Look up a keyword by text.
///
/// Returns `Some(TokenKind)` if the text is a keyword, `None` otherwise.
#[must_use]
pub fn lookup_keyword(text: &str) -> Option<TokenKind> {
    KEYWORDS
        .binary_search_by(|entry| entry.text.cmp(text))
        .ok()
        .map(|idx| KEYWORDS[idx].kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_sorted() {
        for window in KEYWORDS.windows(2) {
            assert!(
                window[0].text < window[1].text,
                "Keywords not sorted: {:?} should come before {:?}",
                window[0].text,
                window[1].text
            );
        }
    }

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(lookup_keyword("DEFINITIONS"), Some(TokenKind::KwDefinitions));
        assert_eq!(lookup_keyword("COMPONENTS"), Some(TokenKind::KwComponents));
        assert_eq!(lookup_keyword("IMPLICIT"), Some(TokenKind::KwImplicit));

        // Macro and base type names are plain identifiers.
        assert_eq!(lookup_keyword("OBJECT-TYPE"), None);
        assert_eq!(lookup_keyword("Counter32"), None);
        assert_eq!(lookup_keyword("SYNTAX"), None);
        assert_eq!(lookup_keyword(""), None);
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(lookup_keyword("integer"), None);
        assert_eq!(lookup_keyword("Integer"), None);
        assert_eq!(lookup_keyword("INTEGER"), Some(TokenKind::KwInteger));
    }
}
