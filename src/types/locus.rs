//! Locus addressing
//!
//! A locus is a dot-separated path of non-negative integers rooted at "0":
//! "0", "0.3", "0.3.1". Loci are immutable values; new loci are derived.
//! Ordering is lexicographic over segments with a prefix sorting first.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LudicsError, Result};
use crate::ROOT_LOCUS;

lazy_static! {
    static ref RE_LOCUS: Regex = Regex::new(r"^\d+(\.\d+)*$").unwrap();
}

/// Hierarchical address of a dialogue position
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locus {
    segments: Vec<u32>,
}

impl Locus {
    /// The root locus "0"
    pub fn root() -> Self {
        Self { segments: vec![0] }
    }

    /// Parse a dotted path
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(LudicsError::invalid_locus(path, "empty path"));
        }
        if !RE_LOCUS.is_match(trimmed) {
            return Err(LudicsError::invalid_locus(path, "segments must be non-negative integers"));
        }

        let mut segments = Vec::new();
        for seg in trimmed.split('.') {
            let value = seg
                .parse::<u32>()
                .map_err(|_| LudicsError::invalid_locus(path, format!("segment '{}' out of range", seg)))?;
            segments.push(value);
        }

        if segments[0] != 0 {
            return Err(LudicsError::invalid_locus(path, format!("locus must be rooted at {}", ROOT_LOCUS)));
        }

        Ok(Self { segments })
    }

    /// Integer segments, root first
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Number of segments below the root (root = 0)
    pub fn depth(&self) -> usize {
        self.segments.len() - 1
    }

    pub fn is_root(&self) -> bool {
        self.segments.len() == 1
    }

    /// Parent locus, None only for the root
    pub fn parent(&self) -> Option<Locus> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Trailing segment (0 for the root)
    pub fn child_suffix(&self) -> u32 {
        self.segments.last().copied().unwrap_or(0)
    }

    /// Derive the child locus `self.suffix`
    pub fn child(&self, suffix: u32) -> Locus {
        let mut segments = self.segments.clone();
        segments.push(suffix);
        Self { segments }
    }

    /// Sibling with another trailing suffix (root has no siblings)
    pub fn sibling(&self, suffix: u32) -> Option<Locus> {
        self.parent().map(|p| p.child(suffix))
    }

    /// Strict ancestor: `self` is a proper prefix of `other`
    pub fn is_ancestor(&self, other: &Locus) -> bool {
        self.segments.len() < other.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// `self` equals `other` or is its ancestor
    pub fn is_prefix_of(&self, other: &Locus) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Segments of `self` below `ancestor`, if `ancestor` is a prefix
    pub fn relative_to(&self, ancestor: &Locus) -> Option<&[u32]> {
        if ancestor.is_prefix_of(self) {
            Some(&self.segments[ancestor.segments.len()..])
        } else {
            None
        }
    }

    /// Replace the `from` prefix with `to`; None if `from` is not a prefix
    pub fn rebase(&self, from: &Locus, to: &Locus) -> Option<Locus> {
        let rest = self.relative_to(from)?;
        let mut segments = to.segments.clone();
        segments.extend_from_slice(rest);
        Some(Self { segments })
    }

    /// Total order used everywhere loci are sorted
    pub fn compare(&self, other: &Locus) -> Ordering {
        self.cmp(other)
    }
}

impl Default for Locus {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for Locus {
    type Err = LudicsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Locus {
    type Error = LudicsError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Locus> for String {
    fn from(locus: Locus) -> Self {
        locus.to_string()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn l(s: &str) -> Locus {
        Locus::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(l("0").to_string(), "0");
        assert_eq!(l("0.3.1").to_string(), "0.3.1");
        assert_eq!(l(" 0.12 ").segments(), &[0, 12]);
    }

    #[test]
    fn test_malformed_paths_rejected() {
        for bad in ["", "0.", ".0", "0..1", "0.a", "1.2", "0.-1", "0.99999999999"] {
            let err = Locus::parse(bad).unwrap_err();
            assert_eq!(err.code(), "INVALID_LOCUS", "expected InvalidLocus for {:?}", bad);
        }
    }

    #[test]
    fn test_parent_and_suffix() {
        assert_eq!(l("0").parent(), None);
        assert_eq!(l("0.3").parent(), Some(l("0")));
        assert_eq!(l("0.3.1").parent(), Some(l("0.3")));
        assert_eq!(l("0.3.7").child_suffix(), 7);
        assert_eq!(l("0").child_suffix(), 0);
        assert_eq!(l("0.3").child(2), l("0.3.2"));
        assert_eq!(l("0.3").sibling(5), Some(l("0.5")));
        assert_eq!(l("0").sibling(5), None);
    }

    #[test]
    fn test_ancestry() {
        assert!(l("0").is_ancestor(&l("0.1")));
        assert!(l("0.1").is_ancestor(&l("0.1.4.2")));
        assert!(!l("0.1").is_ancestor(&l("0.1")));
        assert!(!l("0.1").is_ancestor(&l("0.10")));
        assert!(l("0.1").is_prefix_of(&l("0.1")));
    }

    #[test]
    fn test_ordering_is_segment_lexicographic() {
        let mut loci = vec![l("0.10"), l("0.2"), l("0.1.5"), l("0.1"), l("0")];
        loci.sort();
        let rendered: Vec<String> = loci.iter().map(|x| x.to_string()).collect();
        assert_eq!(rendered, vec!["0", "0.1", "0.1.5", "0.2", "0.10"]);
        assert_eq!(l("0.1").compare(&l("0.1.0")), Ordering::Less);
    }

    #[test]
    fn test_rebase() {
        let moved = l("0.1.2.3").rebase(&l("0.1"), &l("0.4")).unwrap();
        assert_eq!(moved, l("0.4.2.3"));
        assert_eq!(l("0.2.1").rebase(&l("0.1"), &l("0.4")), None);
        assert_eq!(l("0.1.2").relative_to(&l("0.1")), Some(&[2u32][..]));
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&l("0.2.1")).unwrap();
        assert_eq!(json, "\"0.2.1\"");
        let back: Locus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, l("0.2.1"));
        assert!(serde_json::from_str::<Locus>("\"0.x\"").is_err());
    }
}
