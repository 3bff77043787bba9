//! Numeric object identifiers.

use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

/// An object identifier as its sequence of arcs, e.g. `1.3.6.1.2.1`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Oid(Vec<u32>);

/// A dotted OID string that is not a list of `u32` arcs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid object identifier arc {arc:?}")]
pub struct ParseOidError {
    arc: alloc::string::String,
}

impl Oid {
    #[must_use]
    pub fn new(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }

    /// Parse `1.3.6.1`, with or without a leading dot. Returns `None` on
    /// any malformed arc.
    #[must_use]
    pub fn from_dotted(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// The dotted form, without a leading dot.
    #[must_use]
    pub fn to_dotted(&self) -> alloc::string::String {
        alloc::format!("{self}")
    }

    #[must_use]
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `other` lies at or below `self`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl FromStr for Oid {
    type Err = ParseOidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('.').unwrap_or(s);
        if s.is_empty() {
            return Ok(Self::default());
        }
        s.split('.')
            .map(|arc| arc.parse().map_err(|_| ParseOidError { arc: arc.into() }))
            .collect::<Result<Vec<u32>, _>>()
            .map(Self)
    }
}

impl From<&[u32]> for Oid {
    fn from(arcs: &[u32]) -> Self {
        Self(arcs.to_vec())
    }
}

impl From<Vec<u32>> for Oid {
    fn from(arcs: Vec<u32>) -> Self {
        Self(arcs)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.0.iter();
        if let Some(first) = arcs.next() {
            write!(f, "{first}")?;
        }
        arcs.try_for_each(|arc| write!(f, ".{arc}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_parse() {
        assert_eq!(Oid::from_dotted("1.3.6.1").unwrap().arcs(), &[1, 3, 6, 1]);
        assert_eq!(Oid::from_dotted(".1.3").unwrap().arcs(), &[1, 3]);
        assert!(Oid::from_dotted("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_arcs() {
        assert_eq!(
            "1.3.x.1".parse::<Oid>().unwrap_err().to_string(),
            "invalid object identifier arc \"x\""
        );
        assert!(Oid::from_dotted("1..3").is_none());
        assert!(Oid::from_dotted("1.-3").is_none());
        assert!(Oid::from_dotted("1.99999999999").is_none());
    }

    #[test]
    fn test_dotted_form() {
        assert_eq!(Oid::new(vec![1, 3, 6, 1, 2, 1]).to_dotted(), "1.3.6.1.2.1");
        assert_eq!(Oid::from(&[0u32][..]).to_string(), "0");
        assert_eq!(Oid::default().to_dotted(), "");
    }

    #[test]
    fn test_prefix() {
        let mib2 = Oid::from(vec![1, 3, 6, 1, 2, 1]);
        let system = Oid::from(vec![1, 3, 6, 1, 2, 1, 1]);
        assert!(mib2.is_prefix_of(&system));
        assert!(mib2.is_prefix_of(&mib2));
        assert!(!system.is_prefix_of(&mib2));
    }
}
