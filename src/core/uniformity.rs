//! Uniformity: are two instances of a universal locus played alike?
//!
//! Each child subtree is normalized to ordered lines of
//! (relative path, kind signature, expression), with witness names bound by
//! `instantiate` renamed positionally to $0, $1, … Equal lists are uniform.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{LudicsError, Result};
use crate::types::{ActKind, Counterexample, Design, Locus, NormalizedAct, UniformityResult};

/// Compare the subtrees at `child_a` and `child_b`, both direct children of `base`
pub fn check_uniform(design: &Design, base: &Locus, child_a: &Locus, child_b: &Locus) -> Result<UniformityResult> {
    for child in [child_a, child_b] {
        if child.parent().as_ref() != Some(base) {
            return Err(LudicsError::invalid_locus(
                child.to_string(),
                format!("not a direct child of {}", base),
            ));
        }
        if !design.has_subtree(child) {
            return Err(design.not_found(child));
        }
    }

    if design.occupied_children(base).len() < 2 {
        return Ok(UniformityResult::not_applicable(base.clone(), child_a.clone(), child_b.clone()));
    }

    let lines_a = normalize_subtree(design, child_a);
    let lines_b = normalize_subtree(design, child_b);

    let result = if lines_a == lines_b {
        UniformityResult::uniform(base.clone(), child_a.clone(), child_b.clone())
    } else {
        let i = lines_a
            .iter()
            .zip(lines_b.iter())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| lines_a.len().min(lines_b.len()));
        UniformityResult::not_uniform(
            base.clone(),
            child_a.clone(),
            child_b.clone(),
            Counterexample {
                a: lines_a.get(i).cloned(),
                b: lines_b.get(i).cloned(),
            },
        )
    };

    debug!(
        design = %design.id(),
        base = %base,
        a = %child_a,
        b = %child_b,
        result = %result.display_value(),
        "checked uniformity"
    );
    Ok(result)
}

/// Ordered normalized lines for the subtree rooted at `root`
pub fn normalize_subtree(design: &Design, root: &Locus) -> Vec<NormalizedAct> {
    let witnesses: Vec<(Locus, String, String)> = design
        .instantiations()
        .iter()
        .filter(|(l, _)| root.is_prefix_of(l))
        .enumerate()
        .map(|(i, (l, b))| (l.clone(), b.name.clone(), format!("${}", i)))
        .collect();

    let mut lines: BTreeMap<Locus, NormalizedAct> = BTreeMap::new();
    for act in design.subtree(root) {
        let signature = match &act.kind {
            ActKind::Daimon => "†".to_string(),
            ActKind::Proper { polarity, additive, .. } => {
                let ram: Vec<String> = design
                    .effective_ramification(&act.locus)
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                format!(
                    "{}{}[{}]",
                    polarity.sign(),
                    if *additive { "&" } else { "" },
                    ram.join(",")
                )
            }
        };
        lines.insert(
            act.locus.clone(),
            NormalizedAct {
                path: relative_path(&act.locus, root),
                signature,
                expression: rename_witnesses(act.expression.trim(), &witnesses),
                binder: None,
            },
        );
    }

    for (locus, _, placeholder) in &witnesses {
        let line = lines.entry(locus.clone()).or_insert_with(|| NormalizedAct {
            path: relative_path(locus, root),
            signature: String::new(),
            expression: String::new(),
            binder: None,
        });
        line.binder = Some(placeholder.clone());
    }

    lines.into_values().collect()
}

fn relative_path(locus: &Locus, root: &Locus) -> String {
    locus
        .relative_to(root)
        .map(|rest| rest.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("."))
        .unwrap_or_default()
}

fn rename_witnesses(expression: &str, witnesses: &[(Locus, String, String)]) -> String {
    let mut out = expression.to_string();
    for (_, name, placeholder) in witnesses {
        out = replace_standalone(&out, name, placeholder);
    }
    out
}

/// Replace occurrences of `name` not flanked by a word character
fn replace_standalone(text: &str, name: &str, placeholder: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (start, _) in text.match_indices(name) {
        let end = start + name.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.map_or(false, is_word) || after.map_or(false, is_word) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(placeholder);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locus_ops::{copy_locus, instantiate};
    use crate::types::{Participant, UniformityReason};

    fn l(s: &str) -> Locus {
        Locus::parse(s).unwrap()
    }

    fn base_design() -> Design {
        let mut d = Design::new("u/P", Participant::Proponent);
        d.append_proper(l("0"), "forall x", [1], false).unwrap();
        d.append_proper(l("0.1"), "P(x)", [1], false).unwrap();
        d.append_proper(l("0.1.1"), "Q(x)", [], false).unwrap();
        d
    }

    fn witnessed(second_leaf: &str) -> Design {
        let mut d = Design::new("u/P", Participant::Proponent);
        d.append_proper(l("0"), "forall", [1, 2], false).unwrap();
        d.append_proper(l("0.1"), "P(a)", [1], false).unwrap();
        d.append_proper(l("0.1.1"), "Q(a)", [], false).unwrap();
        d.append_proper(l("0.2"), "P(b)", [1], false).unwrap();
        d.append_proper(l("0.2.1"), second_leaf, [], false).unwrap();
        let d = instantiate(&d, &l("0.1"), "a", false).unwrap();
        instantiate(&d, &l("0.2"), "b", false).unwrap()
    }

    #[test]
    fn test_renamed_witnesses_are_uniform() {
        let d = witnessed("Q(b)");
        let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.2")).unwrap();
        assert_eq!(result.uniform, Some(true));
        let lines = normalize_subtree(&d, &l("0.2"));
        assert_eq!(lines[0].expression, "P($0)");
        assert_eq!(lines[0].binder.as_deref(), Some("$0"));
        assert_eq!(lines[1].path, "1");
    }

    #[test]
    fn test_foreign_witness_breaks_uniformity() {
        let d = witnessed("Q(a)");
        let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.2")).unwrap();
        assert_eq!(result.uniform, Some(false));
        assert_eq!(result.reason, "not_uniform");
        let cx = result.counterexample.unwrap();
        assert_eq!(cx.a.unwrap().expression, "Q($0)");
        assert_eq!(cx.b.unwrap().expression, "Q(a)");
    }

    #[test]
    fn test_reflexive_when_applicable() {
        let d = copy_locus(&base_design(), &l("0.1"), 1).unwrap().design;
        let result = check_uniform(&d, &l("0"), &l("0.2"), &l("0.2")).unwrap();
        assert_eq!(result.uniform, Some(true));
        assert_eq!(result.code, UniformityReason::R501_UNIFORM);
    }

    #[test]
    fn test_punctuated_witness_names_renamed() {
        let mut d = Design::new("u/P", Participant::Proponent);
        d.append_proper(l("0"), "forall", [1, 2], false).unwrap();
        d.append_proper(l("0.1"), "P(x')", [1], false).unwrap();
        d.append_proper(l("0.1.1"), "Q(x', xx')", [], false).unwrap();
        d.append_proper(l("0.2"), "P(y-1)", [1], false).unwrap();
        d.append_proper(l("0.2.1"), "Q(y-1, xx')", [], false).unwrap();
        let d = instantiate(&d, &l("0.1"), "x'", false).unwrap();
        let d = instantiate(&d, &l("0.2"), "y-1", false).unwrap();

        let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.2")).unwrap();
        assert_eq!(result.uniform, Some(true));
        let lines = normalize_subtree(&d, &l("0.1"));
        assert_eq!(lines[1].expression, "Q($0, xx')");
    }

    #[test]
    fn test_plain_copies_are_uniform() {
        let d = copy_locus(&base_design(), &l("0.1"), 2).unwrap().design;
        let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.3")).unwrap();
        assert_eq!(result.uniform, Some(true));
    }

    #[test]
    fn test_single_child_not_applicable() {
        let d = base_design();
        let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.1")).unwrap();
        assert_eq!(result.uniform, None);
        assert!(!result.is_applicable());
        assert_eq!(result.reason, "not_applicable");
    }

    #[test]
    fn test_shape_difference_reported() {
        let mut other = Design::new("u/P", Participant::Proponent);
        other.append_proper(l("0"), "", [1, 2], false).unwrap();
        other.append_proper(l("0.1"), "P", [1], false).unwrap();
        other.append_proper(l("0.2"), "P", [1], true).unwrap();
        let result = check_uniform(&other, &l("0"), &l("0.1"), &l("0.2")).unwrap();
        assert_eq!(result.uniform, Some(false));
        let cx = result.counterexample.unwrap();
        assert_eq!(cx.a.unwrap().signature, "+[1]");
        assert_eq!(cx.b.unwrap().signature, "+&[1]");
    }

    #[test]
    fn test_child_validation() {
        let d = copy_locus(&base_design(), &l("0.1"), 1).unwrap().design;
        assert_eq!(
            check_uniform(&d, &l("0"), &l("0.1.1"), &l("0.2")).unwrap_err().code(),
            "INVALID_LOCUS"
        );
        assert_eq!(
            check_uniform(&d, &l("0"), &l("0.1"), &l("0.9")).unwrap_err().code(),
            "LOCUS_NOT_FOUND"
        );
    }

    #[test]
    fn test_rename_whole_words_only() {
        let w = vec![(l("0.1"), "x".to_string(), "$0".to_string())];
        assert_eq!(rename_witnesses("x loves xavier", &w), "$0 loves xavier");
    }
}
