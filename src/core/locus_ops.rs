//! Locus operations: copying subtrees to fresh siblings and binding witnesses
//!
//! Both return a new design at `version + 1`; the input is never touched.
//! A no-op (zero copies, identical re-binding) keeps the version.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LudicsError, Result};
use crate::types::{Design, Instantiation, Locus};

/// Result of `copy_locus`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOutcome {
    pub design: Design,
    /// Fresh sibling loci, ascending
    pub children: Vec<Locus>,
    /// Original locus → its copy under each fresh child, in `children` order
    pub bijection: BTreeMap<Locus, Vec<Locus>>,
}

/// Duplicate the subtree at `base` under `count` fresh siblings
pub fn copy_locus(design: &Design, base: &Locus, count: usize) -> Result<CopyOutcome> {
    let parent = base
        .parent()
        .ok_or_else(|| LudicsError::invalid_locus(base.to_string(), "root locus cannot be copied"))?;

    if !design.has_subtree(base) {
        return Err(design.not_found(base));
    }
    if let Some(binding) = design.instantiation(base).filter(|b| b.masked) {
        return Err(LudicsError::AlreadyInstantiated {
            locus: base.to_string(),
            name: binding.name.clone(),
        });
    }

    if count == 0 {
        return Ok(CopyOutcome {
            design: design.clone(),
            children: Vec::new(),
            bijection: BTreeMap::new(),
        });
    }

    let exhausted = || LudicsError::invalid_locus(parent.to_string(), format!("no room for {} more children", count));
    let count = u32::try_from(count).map_err(|_| exhausted())?;
    let mut in_use = design.occupied_children(&parent);
    in_use.extend(design.effective_ramification(&parent));
    let start = match in_use.iter().max() {
        Some(m) => m.checked_add(1).ok_or_else(exhausted)?,
        None => 0,
    };
    start.checked_add(count - 1).ok_or_else(exhausted)?;
    let suffixes: Vec<u32> = (start..=start + (count - 1)).collect();
    let children: Vec<Locus> = suffixes.iter().map(|s| parent.child(*s)).collect();

    let subtree = design.subtree(base);
    let extensions: Vec<(Locus, Vec<u32>)> = design
        .copy_extensions()
        .iter()
        .filter(|(l, _)| base.is_prefix_of(l))
        .map(|(l, ext)| (l.clone(), ext.iter().copied().collect()))
        .collect();

    let mut next = design.clone();
    next.extend_ramification(&parent, suffixes.iter().copied());

    let mut bijection: BTreeMap<Locus, Vec<Locus>> = BTreeMap::new();
    for child in &children {
        for (locus, ext) in &extensions {
            if let Some(moved) = locus.rebase(base, child) {
                next.extend_ramification(&moved, ext.iter().copied());
            }
        }
        for act in &subtree {
            let Some(moved) = act.locus.rebase(base, child) else {
                continue;
            };
            next.insert(
                None,
                moved.clone(),
                act.expression.clone(),
                act.semantic.clone(),
                act.kind.clone(),
            )?;
            bijection.entry(act.locus.clone()).or_default().push(moved);
        }
    }
    next.bump_version();

    info!(
        design = %design.id(),
        base = %base,
        count,
        version = next.version(),
        "copied locus"
    );

    Ok(CopyOutcome {
        design: next,
        children,
        bijection,
    })
}

/// Bind a witness name at `base`; masked bindings are final
pub fn instantiate(design: &Design, base: &Locus, name: &str, mask: bool) -> Result<Design> {
    if !design.has_subtree(base) {
        return Err(design.not_found(base));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(LudicsError::InvalidWitness { name: name.to_string() });
    }

    match design.instantiation(base) {
        Some(existing) if existing.name == name && existing.masked == mask => {
            return Ok(design.clone());
        }
        Some(existing) if existing.masked => {
            return Err(LudicsError::AlreadyInstantiated {
                locus: base.to_string(),
                name: existing.name.clone(),
            });
        }
        _ => {}
    }

    let mut next = design.clone();
    next.bind(
        base.clone(),
        Instantiation {
            name: name.to_string(),
            masked: mask,
        },
    );
    next.bump_version();

    info!(
        design = %design.id(),
        base = %base,
        witness = name,
        masked = mask,
        version = next.version(),
        "instantiated locus"
    );
    Ok(next)
}

// =============================================================================
// TESTS
// =============================================================================
