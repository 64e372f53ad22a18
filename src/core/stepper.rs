//! Interaction stepper: walks two designs from the root and classifies
//! the interaction
//!
//! Depth-first worklist of cursor loci starting at "0". At each cursor:
//! 1. a daimon (Proponent's first) closes the branch
//! 2. no act on either side → STUCK
//! 3. wrong polarity in a slot → DIVERGENT
//! 4. both live → expression and ramification checks per mode
//! 5. budget reached → ONGOING
//! 6. emit the pair, descend from the acting act
//!
//! Pure over (pos, neg, mode, phase, max_pairs, equivalence).

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::core::equivalence::{DefaultEquivalence, ExpressionEquivalence};
use crate::types::{
    Act, CompositionMode, DaimonClosure, DaimonHint, Design, Locus, Participant, Phase, Polarity, Trace,
    TracePair, TraceReason,
};
use crate::DEFAULT_MAX_PAIRS;

/// Step two designs with the default equivalence predicate
pub fn step(pos: &Design, neg: &Design, mode: CompositionMode, phase: Phase, max_pairs: usize) -> Trace {
    Stepper::new(mode).phase(phase).max_pairs(max_pairs).run(pos, neg)
}

/// Configured interaction run
pub struct Stepper<'e> {
    mode: CompositionMode,
    phase: Phase,
    max_pairs: usize,
    equivalence: &'e dyn ExpressionEquivalence,
}

impl<'e> Stepper<'e> {
    pub fn new(mode: CompositionMode) -> Self {
        Self {
            mode,
            phase: Phase::default(),
            max_pairs: DEFAULT_MAX_PAIRS,
            equivalence: &DefaultEquivalence,
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = max_pairs;
        self
    }

    /// Predicate consulted in spiritual mode
    pub fn equivalence(mut self, equivalence: &'e dyn ExpressionEquivalence) -> Self {
        self.equivalence = equivalence;
        self
    }

    pub fn run(&self, pos: &Design, neg: &Design) -> Trace {
        let mut walk = Walk::new(pos, neg);
        let (reason, end) = self.drive(&mut walk);
        let trace = walk.finish(self, reason, end);
        debug!(
            pos = %trace.pos_design.id,
            neg = %trace.neg_design.id,
            mode = %self.mode,
            status = %trace.status,
            reason = trace.reason.code(),
            pairs = trace.pairs.len(),
            "stepped designs"
        );
        trace
    }

    fn drive(&self, walk: &mut Walk<'_>) -> (TraceReason, Option<Locus>) {
        let pos = walk.pos;
        let neg = walk.neg;

        while let Some(cursor) = walk.worklist.pop() {
            walk.ts += 1;
            let locus = cursor.locus.clone();
            let p = pos.act_at(&locus);
            let n = neg.act_at(&locus);

            // 1. daimon closes the branch
            let daimon = p
                .filter(|a| a.is_daimon())
                .map(|a| (a, Participant::Proponent))
                .or_else(|| n.filter(|a| a.is_daimon()).map(|a| (a, Participant::Opponent)));
            if let Some((act, side)) = daimon {
                walk.ended_at_daimon = Some(DaimonClosure {
                    locus: locus.clone(),
                    side,
                    act_id: act.id.clone(),
                });
                walk.last_closed = Some(locus);
                continue;
            }

            // 2. dead end
            if p.is_none() && n.is_none() {
                walk.hints.push(DaimonHint {
                    locus: locus.clone(),
                    side: cursor.expected,
                });
                return (TraceReason::R301_NO_ACT_AT_LOCUS, Some(locus));
            }

            // 3. polarity
            let wrong_pos = p.map(|a| a.polarity() != Some(Polarity::Positive)).unwrap_or(false);
            let wrong_neg = n.map(|a| a.polarity() != Some(Polarity::Negative)).unwrap_or(false);
            if wrong_pos || wrong_neg {
                return (TraceReason::R201_POLARITY_CLASH, Some(locus));
            }

            let (acting, other, acting_side) = match (p, n) {
                (Some(p), Some(n)) => match self.phase.leader() {
                    Participant::Proponent => (p, Some(n), Participant::Proponent),
                    Participant::Opponent => (n, Some(p), Participant::Opponent),
                },
                (Some(p), None) => (p, None, Participant::Proponent),
                (None, Some(n)) => (n, None, Participant::Opponent),
                (None, None) => unreachable!("dead end handled above"),
            };
            let (acting_design, chooser_design) = match acting_side {
                Participant::Proponent => (pos, neg),
                Participant::Opponent => (neg, pos),
            };
            let acting_ram = acting_design.effective_ramification(&locus);
            let other_ram = other
                .map(|_| chooser_design.effective_ramification(&locus))
                .unwrap_or_default();

            // 4. both live
            if let Some(other) = other {
                if !self.expressions_match(acting, other) {
                    return (TraceReason::R202_EXPRESSION_MISMATCH, Some(locus));
                }
                if !other_ram.is_empty() {
                    if !other_ram.is_subset(&acting_ram) {
                        return (TraceReason::R204_RAMIFICATION_NOT_SUBSET, Some(locus));
                    }
                    if self.mode == CompositionMode::Assoc && other_ram != acting_ram {
                        return (TraceReason::R203_RAMIFICATION_MISMATCH, Some(locus));
                    }
                    let gap: BTreeSet<u32> = acting_ram.difference(&other_ram).copied().collect();
                    if !gap.is_empty() {
                        walk.gaps.insert(locus.clone(), gap);
                    }
                }
            }

            // 5. budget
            if walk.pairs.len() >= self.max_pairs {
                walk.hints.push(DaimonHint {
                    locus: locus.clone(),
                    side: cursor.expected,
                });
                let pending: Vec<DaimonHint> = walk
                    .worklist
                    .iter()
                    .rev()
                    .map(|c| DaimonHint {
                        locus: c.locus.clone(),
                        side: c.expected,
                    })
                    .collect();
                walk.hints.extend(pending);
                return (TraceReason::R401_BUDGET_EXHAUSTED, Some(locus));
            }

            // 6. emit and descend
            walk.pairs.push(TracePair {
                pos_act_id: p.map(|a| a.id.clone()),
                neg_act_id: n.map(|a| a.id.clone()),
                locus: locus.clone(),
                ts: walk.ts,
            });

            if acting_ram.is_empty() {
                return (TraceReason::R302_NO_CONTINUATION, Some(locus));
            }

            let expected = acting_side.other();
            if acting.kind.is_additive() {
                let explicit: BTreeSet<u32> = other_ram.intersection(&acting_ram).copied().collect();
                let choice = if explicit.len() > 1 {
                    if self.mode == CompositionMode::Assoc {
                        return (TraceReason::R205_ADDITIVE_MULTI_SELECT, Some(locus));
                    }
                    explicit.iter().next().copied()
                } else if let Some(only) = explicit.iter().next() {
                    Some(*only)
                } else {
                    acting_ram
                        .iter()
                        .copied()
                        .find(|s| chooser_design.has_subtree(&locus.child(*s)))
                };
                let Some(chosen) = choice else {
                    return (TraceReason::R303_NO_ADDITIVE_CHOICE, Some(locus));
                };
                let child = locus.child(chosen);
                walk.used_additive.insert(locus.clone(), child.clone());
                walk.worklist.push(Cursor { locus: child, expected });
            } else {
                for s in acting_ram.iter().rev() {
                    walk.worklist.push(Cursor {
                        locus: locus.child(*s),
                        expected,
                    });
                }
            }
        }

        let end = walk.last_closed.clone();
        (TraceReason::R101_ALL_BRANCHES_CLOSED, end)
    }

    fn expressions_match(&self, a: &Act, b: &Act) -> bool {
        if a.is_wildcard() || b.is_wildcard() {
            return true;
        }
        if a.expression.trim() == b.expression.trim() {
            return true;
        }
        self.mode == CompositionMode::Spiritual && self.equivalence.equivalent(a, b)
    }
}

struct Cursor {
    locus: Locus,
    /// Side expected to play here
    expected: Participant,
}

/// Mutable state of one run
struct Walk<'d> {
    pos: &'d Design,
    neg: &'d Design,
    worklist: Vec<Cursor>,
    pairs: Vec<TracePair>,
    used_additive: BTreeMap<Locus, Locus>,
    gaps: BTreeMap<Locus, BTreeSet<u32>>,
    hints: Vec<DaimonHint>,
    ended_at_daimon: Option<DaimonClosure>,
    last_closed: Option<Locus>,
    ts: u64,
}

impl<'d> Walk<'d> {
    fn new(pos: &'d Design, neg: &'d Design) -> Self {
        Self {
            pos,
            neg,
            worklist: vec![Cursor {
                locus: Locus::root(),
                expected: Participant::Proponent,
            }],
            pairs: Vec::new(),
            used_additive: BTreeMap::new(),
            gaps: BTreeMap::new(),
            hints: Vec::new(),
            ended_at_daimon: None,
            last_closed: None,
            ts: 0,
        }
    }

    fn finish(self, stepper: &Stepper<'_>, reason: TraceReason, end: Option<Locus>) -> Trace {
        let decisive_indices = match &end {
            Some(end) => self
                .pairs
                .iter()
                .enumerate()
                .filter(|(_, pair)| pair.locus.is_prefix_of(end))
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        };

        Trace {
            status: reason.status(),
            pairs: self.pairs,
            decisive_indices,
            used_additive: self.used_additive,
            gaps: self.gaps,
            ended_at_daimon: self.ended_at_daimon,
            daimon_hints: self.hints,
            reason,
            reason_locus: end,
            pos_design: self.pos.reference(),
            neg_design: self.neg.reference(),
            mode: stepper.mode,
            phase: stepper.phase,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
