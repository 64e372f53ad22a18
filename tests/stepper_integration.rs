//! Integration tests for the interaction stepper
//!
//! Scenarios, determinism and budget prefix-consistency

use ludics::core::{step, trace_fingerprint, Stepper};
use ludics::types::{CompositionMode, Design, Locus, Participant, Phase, TraceReason, TraceStatus};
use pretty_assertions::assert_eq;

fn l(s: &str) -> Locus {
    Locus::parse(s).unwrap()
}

fn pro() -> Design {
    Design::new("t/P", Participant::Proponent)
}

fn opp() -> Design {
    Design::new("t/O", Participant::Opponent)
}

/// Claim with two challenges; the second is answered by a daimon on each side
fn two_branch_pair() -> (Design, Design) {
    let mut p = pro();
    p.append_proper(l("0"), "claim", [1, 2], false).unwrap();
    p.append_proper(l("0.1.1"), "grounds", [1], false).unwrap();
    let mut o = opp();
    o.append_proper(l("0.1"), "why", [1], false).unwrap();
    o.append_daimon(l("0.1.1.1"), "").unwrap();
    o.append_daimon(l("0.2"), "").unwrap();
    (p, o)
}

#[test]
fn test_scenario_simple_convergence() {
    let (p, o) = two_branch_pair();
    let trace = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, 100);

    assert!(trace.is_convergent());
    assert_eq!(trace.reason, TraceReason::R101_ALL_BRANCHES_CLOSED);
    let loci: Vec<String> = trace.pairs.iter().map(|p| p.locus.to_string()).collect();
    assert_eq!(loci, vec!["0", "0.1", "0.1.1"]);

    let closure = trace.ended_at_daimon.unwrap();
    assert_eq!(closure.locus, l("0.2"));
    assert_eq!(closure.side, Participant::Opponent);
    assert_eq!(trace.pos_design.id, "t/P");
    assert_eq!(trace.neg_design.version, 1);
}

#[test]
fn test_scenario_stuck() {
    let mut p = pro();
    p.append_proper(l("0"), "claim", [1], false).unwrap();
    let trace = step(&p, &opp(), CompositionMode::Assoc, Phase::Neutral, 100);

    assert_eq!(trace.status, TraceStatus::Stuck);
    assert_eq!(trace.reason_locus, Some(l("0.1")));
    assert_eq!(trace.daimon_hints.len(), 1);
    assert_eq!(trace.daimon_hints[0].side, Participant::Opponent);
    assert!(trace.ended_at_daimon.is_none());
}

#[test]
fn test_scenario_additive_branch_selection() {
    let mut p = pro();
    p.append_proper(l("0"), "choose", [1, 2], true).unwrap();
    p.append_daimon(l("0.2"), "").unwrap();
    let mut o = opp();
    o.append_proper(l("0"), "choose", [2], false).unwrap();

    let trace = step(&p, &o, CompositionMode::Partial, Phase::Neutral, 100);
    assert_eq!(trace.status, TraceStatus::Convergent);
    assert_eq!(trace.used_additive.get(&l("0")), Some(&l("0.2")));
    assert_eq!(trace.gaps.get(&l("0")).map(|g| g.iter().copied().collect::<Vec<_>>()), Some(vec![1]));

    // no explicit choice: the branch the opponent actually plays is taken
    let mut p2 = pro();
    p2.append_proper(l("0"), "choose", [1, 2], true).unwrap();
    let mut o2 = opp();
    o2.append_daimon(l("0.1"), "").unwrap();
    let scanned = step(&p2, &o2, CompositionMode::Assoc, Phase::Neutral, 100);
    assert_eq!(scanned.status, TraceStatus::Convergent);
    assert_eq!(scanned.used_additive.get(&l("0")), Some(&l("0.1")));
    assert!(scanned.pairs.iter().all(|p| p.locus != l("0.2")));
}

#[test]
fn test_scenario_divergence_under_strict_mode() {
    let mut p = pro();
    p.append_proper(l("0"), "claim", [1, 2], false).unwrap();
    p.append_daimon(l("0.2"), "").unwrap();
    let mut o = opp();
    o.append_proper(l("0"), "claim", [1], false).unwrap();
    o.append_daimon(l("0.1"), "").unwrap();

    let strict = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, 100);
    assert_eq!(strict.status, TraceStatus::Divergent);
    assert_eq!(strict.reason, TraceReason::R203_RAMIFICATION_MISMATCH);
    assert_eq!(strict.reason_locus, Some(l("0")));

    let partial = step(&p, &o, CompositionMode::Partial, Phase::Neutral, 100);
    assert_eq!(partial.status, TraceStatus::Convergent);
    assert_eq!(
        partial.gaps.get(&l("0")).map(|g| g.iter().copied().collect::<Vec<_>>()),
        Some(vec![2])
    );
}

#[test]
fn test_stepping_is_deterministic() {
    let (p, o) = two_branch_pair();
    let a = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, 100);
    let b = Stepper::new(CompositionMode::Assoc).max_pairs(100).run(&p, &o);
    assert_eq!(a, b);
    assert_eq!(trace_fingerprint(&a), trace_fingerprint(&b));
}

#[test]
fn test_budget_prefix_consistency() {
    let (p, o) = two_branch_pair();
    let full = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, 100);
    assert_eq!(full.pairs.len(), 3);

    for k in 0..full.pairs.len() {
        let cut = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, k);
        assert_eq!(cut.status, TraceStatus::Ongoing, "budget {}", k);
        assert_eq!(cut.reason, TraceReason::R401_BUDGET_EXHAUSTED);
        assert_eq!(cut.pairs, full.pairs[..k].to_vec(), "budget {}", k);
        assert!(!cut.daimon_hints.is_empty());
    }

    let exact = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, full.pairs.len());
    assert_eq!(exact, full);
}

#[test]
fn test_decisive_pairs_lead_to_end() {
    let (p, o) = two_branch_pair();
    let trace = step(&p, &o, CompositionMode::Assoc, Phase::Neutral, 100);
    // ends at the daimon on 0.2: only the root pair is on that path
    let decisive: Vec<String> = trace.decisive_pairs().iter().map(|p| p.locus.to_string()).collect();
    assert_eq!(decisive, vec!["0"]);
}

#[test]
fn test_spiritual_mode_reads_semantic_annotations() {
    let mut p = pro();
    p.append_proper(l("0"), "Taxes should rise", [1], false).unwrap();
    p.annotate(&l("0"), "claim:tax-increase").unwrap();
    let mut o = opp();
    o.append_proper(l("0"), "We need higher taxes", [1], false).unwrap();
    o.annotate(&l("0"), "claim:tax-increase").unwrap();
    o.append_daimon(l("0.1"), "").unwrap();

    let strict = step(&p, &o, CompositionMode::Partial, Phase::Neutral, 100);
    assert_eq!(strict.reason, TraceReason::R202_EXPRESSION_MISMATCH);
    let spiritual = step(&p, &o, CompositionMode::Spiritual, Phase::Neutral, 100);
    assert_eq!(spiritual.status, TraceStatus::Convergent);
}
