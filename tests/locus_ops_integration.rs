//! Integration tests for locus copies, witnesses and uniformity

use ludics::core::{check_uniform, copy_locus, design_fingerprint, instantiate, load_design, save_design};
use ludics::types::{Design, Locus, Participant};
use pretty_assertions::assert_eq;

fn l(s: &str) -> Locus {
    Locus::parse(s).unwrap()
}

/// ∀x. P(x) ⊢ Q(x), with one instance played out
fn universal() -> Design {
    let mut d = Design::new("forall/P", Participant::Proponent);
    d.append_proper(l("0"), "forall x", [1], false).unwrap();
    d.append_proper(l("0.1"), "P(x)", [1, 2], false).unwrap();
    d.append_proper(l("0.1.1"), "Q(x)", [], true).unwrap();
    d.append_daimon(l("0.1.2"), "").unwrap();
    d
}

fn shape(design: &Design, base: &Locus) -> Vec<(Vec<u32>, String, bool)> {
    design
        .subtree(base)
        .iter()
        .map(|a| {
            (
                a.locus.relative_to(base).map(|r| r.to_vec()).unwrap_or_default(),
                a.expression.clone(),
                a.is_daimon(),
            )
        })
        .collect()
}

#[test]
fn test_copy_preserves_shape() {
    let d = universal();
    let out = copy_locus(&d, &l("0.1"), 3).unwrap();
    assert_eq!(out.children, vec![l("0.2"), l("0.3"), l("0.4")]);

    let original = shape(&out.design, &l("0.1"));
    for child in &out.children {
        assert_eq!(shape(&out.design, child), original);
        assert_eq!(
            out.design.effective_ramification(child),
            out.design.effective_ramification(&l("0.1"))
        );
        assert!(out.design.act_at(&child.child(1)).unwrap().kind.is_additive());
    }
    assert_eq!(out.bijection.len(), 3);
    assert_eq!(out.design.version(), 2);
}

#[test]
fn test_uniformity_reflexive_on_every_instance() {
    let out = copy_locus(&universal(), &l("0.1"), 2).unwrap();
    let mut d = out.design;
    for (i, child) in std::iter::once(l("0.1")).chain(out.children).enumerate() {
        d = instantiate(&d, &child, &format!("w{}", i), false).unwrap();
        let result = check_uniform(&d, &l("0"), &child, &child).unwrap();
        assert_eq!(result.uniform, Some(true), "instance {}", child);
    }
    let result = check_uniform(&d, &l("0"), &l("0.1"), &l("0.3")).unwrap();
    assert_eq!(result.uniform, Some(true));
}

#[test]
fn test_masked_instance_cannot_be_copied_or_rebound() {
    let d = instantiate(&universal(), &l("0.1"), "a", true).unwrap();
    assert_eq!(copy_locus(&d, &l("0.1"), 1).unwrap_err().code(), "ALREADY_INSTANTIATED");
    assert_eq!(instantiate(&d, &l("0.1"), "b", false).unwrap_err().code(), "ALREADY_INSTANTIATED");
    // same binding again is a no-op
    assert_eq!(instantiate(&d, &l("0.1"), "a", true).unwrap(), d);
}

#[test]
fn test_copied_design_survives_file_roundtrip() {
    let out = copy_locus(&universal(), &l("0.1"), 1).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = save_design(&out.design, dir.path()).unwrap();
    let loaded = load_design(&path).unwrap();

    assert_eq!(loaded, out.design);
    assert_eq!(design_fingerprint(&loaded), design_fingerprint(&out.design));
    assert_eq!(loaded.copy_extensions().get(&l("0")).map(|s| s.len()), Some(1));
}
