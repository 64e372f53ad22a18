//! Content fingerprints for designs and traces
//!
//! SHA-256 over a canonical byte stream with 0x00 separators. Versions are
//! excluded so identical content hashes identically across recompiles.

use sha2::{Digest, Sha256};

use crate::types::{ActKind, Design, Trace};

/// Hex fingerprint of a design's content
pub fn design_fingerprint(design: &Design) -> String {
    let mut hasher = Sha256::new();
    hasher.update(design.id().as_bytes());
    hasher.update([0u8]);
    hasher.update(design.participant().tag().as_bytes());
    hasher.update([0u8]);
    hasher.update(design.semantics().as_bytes());
    hasher.update([0u8]);

    let mut acts: Vec<_> = design.acts().iter().collect();
    acts.sort_by(|a, b| a.locus.cmp(&b.locus));
    for act in acts {
        hasher.update(act.locus.to_string().as_bytes());
        hasher.update([0u8]);
        match &act.kind {
            ActKind::Daimon => hasher.update(b"daimon"),
            ActKind::Proper {
                polarity,
                ramification,
                additive,
            } => {
                hasher.update(polarity.sign().as_bytes());
                hasher.update([u8::from(*additive)]);
                for s in ramification {
                    hasher.update(s.to_be_bytes());
                }
            }
        }
        hasher.update([0u8]);
        hasher.update(act.expression.as_bytes());
        hasher.update([0u8]);
        if let Some(sem) = &act.semantic {
            hasher.update(sem.as_bytes());
        }
        hasher.update([0u8]);
    }

    for (locus, binding) in design.instantiations() {
        hasher.update(locus.to_string().as_bytes());
        hasher.update([0u8]);
        hasher.update(binding.name.as_bytes());
        hasher.update([u8::from(binding.masked)]);
    }
    for (locus, ext) in design.copy_extensions() {
        hasher.update(locus.to_string().as_bytes());
        for s in ext {
            hasher.update(s.to_be_bytes());
        }
        hasher.update([0u8]);
    }

    to_hex(&hasher.finalize())
}

/// Hex fingerprint of a trace's serialized form
pub fn trace_fingerprint(trace: &Trace) -> String {
    let bytes = serde_json::to_vec(trace).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Locus, Participant};

    fn design(expr: &str) -> Design {
        let mut d = Design::new("s/P", Participant::Proponent);
        d.append_proper(Locus::root(), expr, [1], false).unwrap();
        d
    }

    #[test]
    fn test_fingerprint_is_content_hash() {
        let a = design("p");
        let mut b = design("p");
        b.bump_version();
        assert_eq!(design_fingerprint(&a), design_fingerprint(&b));
        assert_ne!(design_fingerprint(&a), design_fingerprint(&design("q")));
        assert_eq!(design_fingerprint(&a).len(), 64);
    }
}
