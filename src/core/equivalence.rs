//! Expression equivalence for the spiritual composition mode

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Act;

lazy_static! {
    static ref RE_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref RE_TRAILING_PUNCT: Regex = Regex::new(r"[\s\.\!\?;:,]+$").unwrap();
}

/// Decides whether two paired acts say the same thing
pub trait ExpressionEquivalence: Send + Sync {
    fn equivalent(&self, a: &Act, b: &Act) -> bool;
}

/// Semantic annotations when both carry one, else normalized text
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEquivalence;

impl ExpressionEquivalence for DefaultEquivalence {
    fn equivalent(&self, a: &Act, b: &Act) -> bool {
        if let (Some(sa), Some(sb)) = (&a.semantic, &b.semantic) {
            if normalize(sa) == normalize(sb) {
                return true;
            }
        }
        normalize(&a.expression) == normalize(&b.expression)
    }
}

impl<F> ExpressionEquivalence for F
where
    F: Fn(&Act, &Act) -> bool + Send + Sync,
{
    fn equivalent(&self, a: &Act, b: &Act) -> bool {
        self(a, b)
    }
}

/// Lowercase, collapse whitespace, drop trailing punctuation
pub fn normalize(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let collapsed = RE_WHITESPACE.replace_all(&lower, " ");
    RE_TRAILING_PUNCT.replace(&collapsed, "").into_owned()
}

// =============================================================================
// TESTS
// =============================================================================
