//! Design compilation: dialogue moves → Proponent/Opponent designs per scope
//!
//! Each scope gets a synthesized Proponent root at "0" labelled with the
//! scope label. Moves are placed in feed order:
//! - ASSERT/SUPPOSE take the locus hint, else a fresh child of the root
//! - other kinds resolve a parent (hint, target anchor, last assertion, root)
//!   and attach to the first free declared child of that parent
//! - RETRACT/CONCEDE/CLOSE and sealed moves become daimons
//! - a move carrying `payload.acts` places each proto-act at its own locus
//!   instead, anchored where the move itself would attach
//!
//! After placement every proper act's ramification is widened with the
//! children occupied in either design, then both designs are built through
//! the checked insertion path.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use tracing::{debug, info};

use crate::core::scoping::{self, ScopeGroup};
use crate::error::{LudicsError, Result};
use crate::types::{
    ActKind, CompileOutput, CompiledScope, Design, DialogueMove, Locus, MoveKind, Participant,
    ProtoPolarity, RamificationEntry, ScopingStrategy,
};
use crate::DEFAULT_RESPONSE_SLOT;

/// Compile a move feed under a scoping strategy
pub fn compile(moves: &[DialogueMove], strategy: ScopingStrategy) -> Result<CompileOutput> {
    let groups = scoping::partition(moves, strategy);
    let mut scopes = Vec::with_capacity(groups.len());
    for group in groups {
        scopes.push(compile_scope(group)?);
    }
    info!(%strategy, moves = moves.len(), scopes = scopes.len(), "compiled move feed");
    Ok(CompileOutput { strategy, scopes })
}

/// Design id for one side of a scope
pub fn design_id(scope_key: &str, side: Participant) -> String {
    format!("{}/{}", scope_key, side.tag())
}

#[derive(Debug, Clone)]
enum Shape {
    Proper { ramification: BTreeSet<u32>, additive: bool },
    Daimon,
}

#[derive(Debug, Clone)]
struct Placement {
    actor: Option<String>,
    side: Participant,
    locus: Locus,
    expression: String,
    semantic: Option<String>,
    shape: Shape,
    /// Position within its side's design
    act_index: usize,
}

/// Placements of both sides while a scope is being compiled
struct Draft {
    key: String,
    placements: Vec<Placement>,
    by_locus: [BTreeMap<Locus, usize>; 2],
    anchors: HashMap<String, Locus>,
    last_assert: Option<Locus>,
    actor_side: HashMap<String, Participant>,
}

fn slot(side: Participant) -> usize {
    match side {
        Participant::Proponent => 0,
        Participant::Opponent => 1,
    }
}

impl Draft {
    fn new(key: &str, label: &str) -> Self {
        let mut draft = Self {
            key: key.to_string(),
            placements: Vec::new(),
            by_locus: [BTreeMap::new(), BTreeMap::new()],
            anchors: HashMap::new(),
            last_assert: None,
            actor_side: HashMap::new(),
        };
        draft.push(Placement {
            actor: None,
            side: Participant::Proponent,
            locus: Locus::root(),
            expression: label.to_string(),
            semantic: None,
            shape: Shape::Proper {
                ramification: BTreeSet::new(),
                additive: false,
            },
            act_index: 0,
        });
        draft
    }

    fn push(&mut self, mut placement: Placement) {
        let s = slot(placement.side);
        placement.act_index = self.by_locus[s].len();
        self.by_locus[s].insert(placement.locus.clone(), self.placements.len());
        self.placements.push(placement);
    }

    fn at(&self, side: Participant, locus: &Locus) -> Option<&Placement> {
        self.by_locus[slot(side)].get(locus).map(|&i| &self.placements[i])
    }

    fn at_either<'a>(&'a self, locus: &'a Locus) -> impl Iterator<Item = &'a Placement> + 'a {
        [Participant::Proponent, Participant::Opponent]
            .into_iter()
            .filter_map(move |side| self.at(side, locus))
    }

    /// Child suffixes of `parent` with anything placed at or below them
    fn occupied_children(&self, parent: &Locus) -> BTreeSet<u32> {
        let depth = parent.segments().len();
        self.by_locus
            .iter()
            .flat_map(move |map| {
                map.range((Bound::Excluded(parent.clone()), Bound::Unbounded))
                    .take_while(move |(l, _)| parent.is_ancestor(l))
                    .map(move |(l, _)| l.segments()[depth])
            })
            .collect()
    }

    fn declared(&self, locus: &Locus) -> BTreeSet<u32> {
        self.at_either(locus)
            .flat_map(|p| match &p.shape {
                Shape::Proper { ramification, .. } => ramification.clone(),
                Shape::Daimon => BTreeSet::new(),
            })
            .collect()
    }

    /// First free declared child, else one past everything in use
    fn pick_child(&self, mv: &DialogueMove, parent: &Locus) -> Result<Locus> {
        let declared = self.declared(parent);
        let occupied = self.occupied_children(parent);
        if let Some(free) = declared.iter().find(|s| !occupied.contains(s)) {
            return Ok(parent.child(*free));
        }
        let next = match declared.iter().chain(occupied.iter()).max() {
            Some(m) => m.checked_add(1).ok_or_else(|| LudicsError::InvalidMove {
                move_id: mv.id.clone(),
                detail: format!("no free child suffix left under {}", parent),
            })?,
            None => DEFAULT_RESPONSE_SLOT,
        };
        Ok(parent.child(next))
    }

    fn sealing_daimon(&self, locus: &Locus) -> Option<Locus> {
        let mut cursor = Some(locus.clone());
        while let Some(l) = cursor {
            if self.at_either(&l).any(|p| matches!(p.shape, Shape::Daimon)) {
                return Some(l);
            }
            cursor = l.parent();
        }
        None
    }

    fn first_below(&self, locus: &Locus) -> Option<Locus> {
        self.by_locus
            .iter()
            .filter_map(|map| {
                map.range((Bound::Excluded(locus.clone()), Bound::Unbounded))
                    .next()
                    .map(|(l, _)| l.clone())
                    .filter(|l| locus.is_ancestor(l))
            })
            .min()
    }

    fn side_for(&self, mv: &DialogueMove) -> Participant {
        if let Some(side) = mv.side {
            return side;
        }
        match mv.kind {
            MoveKind::Why => Participant::Opponent,
            MoveKind::Concede => self
                .actor_side
                .get(&mv.actor_id)
                .copied()
                .unwrap_or(Participant::Opponent),
            MoveKind::Close => self
                .actor_side
                .get(&mv.actor_id)
                .copied()
                .unwrap_or(Participant::Proponent),
            _ => Participant::Proponent,
        }
    }

    fn hint(mv: &DialogueMove) -> Result<Option<Locus>> {
        mv.target_locus_hint.as_deref().map(Locus::parse).transpose()
    }

    /// Where a reply attaches: hint, target anchor, last assertion, root
    fn anchor_for(&self, mv: &DialogueMove, hint: Option<Locus>) -> Locus {
        hint.or_else(|| {
            mv.target
                .as_ref()
                .and_then(|t| self.anchors.get(&t.key()))
                .cloned()
        })
        .or_else(|| self.last_assert.clone())
        .unwrap_or_else(Locus::root)
    }

    fn locus_for(&self, mv: &DialogueMove) -> Result<Locus> {
        let hint = Self::hint(mv)?;

        if mv.kind.is_assertion() {
            if let Some(hint) = hint {
                return Ok(hint);
            }
            let root = Locus::root();
            return match mv.child_suffix {
                Some(s) => Ok(root.child(s)),
                None => self.pick_child(mv, &root),
            };
        }

        let parent = self.anchor_for(mv, hint);
        match mv.child_suffix {
            Some(s) => Ok(parent.child(s)),
            None => self.pick_child(mv, &parent),
        }
    }

    fn place(&mut self, mv: &DialogueMove) -> Result<()> {
        if !mv.payload.acts.is_empty() {
            return self.place_acts(mv);
        }

        let side = self.side_for(mv);
        let locus = self.locus_for(mv)?;
        let shape = if mv.kind.is_closing() || mv.sealed {
            Shape::Daimon
        } else {
            Shape::Proper {
                ramification: resolve_ramification(mv, &locus)?,
                additive: mv.payload.additive,
            }
        };
        self.put(mv, side, locus.clone(), mv.expression().to_string(), shape)?;

        self.anchors.insert(format!("move:{}", mv.id), locus.clone());
        if mv.kind.is_assertion() {
            if let Some(target) = &mv.target {
                self.anchors.entry(target.key()).or_insert_with(|| locus.clone());
            }
            self.last_assert = Some(locus);
        } else if mv.kind == MoveKind::Retract {
            self.last_assert = None;
        }
        Ok(())
    }

    /// Expand `payload.acts`; the first positive act becomes the move's anchor
    fn place_acts(&mut self, mv: &DialogueMove) -> Result<()> {
        let default = self.anchor_for(mv, Self::hint(mv)?);
        let mut first_pos = None;

        for proto in &mv.payload.acts {
            let locus = match proto.locus_path.as_deref().map(str::trim) {
                Some(path) if !path.is_empty() => Locus::parse(path)?,
                _ => default.clone(),
            };
            let (side, shape) = match proto.polarity {
                ProtoPolarity::Pos => (
                    Participant::Proponent,
                    Shape::Proper {
                        ramification: proto.openings.iter().copied().collect(),
                        additive: proto.additive,
                    },
                ),
                ProtoPolarity::Neg => (
                    Participant::Opponent,
                    Shape::Proper {
                        ramification: proto.openings.iter().copied().collect(),
                        additive: false,
                    },
                ),
                ProtoPolarity::Daimon => (mv.side.unwrap_or(Participant::Proponent), Shape::Daimon),
            };
            if proto.polarity == ProtoPolarity::Pos && first_pos.is_none() {
                first_pos = Some(locus.clone());
            }
            let expression = proto.expression.clone().unwrap_or_default();
            self.put(mv, side, locus, expression, shape)?;
        }

        let anchor = first_pos.unwrap_or(default);
        self.anchors.insert(format!("move:{}", mv.id), anchor.clone());
        if let Some(target) = &mv.target {
            self.anchors.insert(target.key(), anchor.clone());
        }
        self.last_assert = Some(anchor);
        Ok(())
    }

    /// Checked placement of one act on one side
    fn put(
        &mut self,
        mv: &DialogueMove,
        side: Participant,
        locus: Locus,
        expression: String,
        shape: Shape,
    ) -> Result<()> {
        if let Some(sealed_at) = self.sealing_daimon(&locus) {
            return Err(LudicsError::SealedBranch {
                locus: locus.to_string(),
                sealed_at: sealed_at.to_string(),
            });
        }

        if let Some(existing) = self.at(side, &locus) {
            return Err(LudicsError::LocusOccupied {
                locus: locus.to_string(),
                act_id: format!("{}#{}", design_id(&self.key, side), existing.act_index),
            });
        }

        // a daimon may face a live act at its own locus, never anything below
        if matches!(shape, Shape::Daimon) {
            if let Some(below) = self.first_below(&locus) {
                return Err(LudicsError::SealedBranch {
                    locus: below.to_string(),
                    sealed_at: locus.to_string(),
                });
            }
        }

        debug!(
            scope = %self.key,
            move_id = %mv.id,
            kind = %mv.kind,
            side = %side,
            locus = %locus,
            "placed act"
        );

        self.actor_side.entry(mv.actor_id.clone()).or_insert(side);
        self.push(Placement {
            actor: Some(mv.actor_id.clone()),
            side,
            locus,
            expression,
            semantic: mv.payload.semantic.clone(),
            shape,
            act_index: 0,
        });
        Ok(())
    }

    /// Open every proper act onto the children played in either design
    fn widen(&mut self) {
        let children: Vec<BTreeSet<u32>> = self
            .placements
            .iter()
            .map(|p| {
                self.occupied_children(&p.locus)
                    .into_iter()
                    .filter(|s| self.at_either(&p.locus.child(*s)).next().is_some())
                    .collect()
            })
            .collect();

        for (placement, extra) in self.placements.iter_mut().zip(children) {
            if let Shape::Proper { ramification, .. } = &mut placement.shape {
                ramification.extend(extra);
            }
        }
    }

    fn build(&self, side: Participant) -> Result<Design> {
        let mut design = Design::new(design_id(&self.key, side), side).with_scope(self.key.clone());
        for p in self.placements.iter().filter(|p| p.side == side) {
            let kind = match &p.shape {
                Shape::Proper { ramification, additive } => ActKind::Proper {
                    polarity: side.polarity(),
                    ramification: ramification.clone(),
                    additive: *additive,
                },
                Shape::Daimon => ActKind::Daimon,
            };
            design.insert(None, p.locus.clone(), p.expression.clone(), p.semantic.clone(), kind)?;
        }
        Ok(design)
    }
}

/// Suffixes from bare numbers, dotted child paths, or the default slot
fn resolve_ramification(mv: &DialogueMove, locus: &Locus) -> Result<BTreeSet<u32>> {
    if mv.payload.ramification.is_empty() {
        return Ok(BTreeSet::from([DEFAULT_RESPONSE_SLOT]));
    }

    let mut suffixes = BTreeSet::new();
    for entry in &mv.payload.ramification {
        let suffix = match entry {
            RamificationEntry::Suffix(s) => *s,
            RamificationEntry::Path(p) if !p.contains('.') => p.trim().parse::<u32>().map_err(|_| {
                LudicsError::InvalidMove {
                    move_id: mv.id.clone(),
                    detail: format!("ramification entry '{}' is not a suffix", p),
                }
            })?,
            RamificationEntry::Path(p) => {
                let child = Locus::parse(p)?;
                if child.parent().as_ref() != Some(locus) {
                    return Err(LudicsError::InvalidMove {
                        move_id: mv.id.clone(),
                        detail: format!("ramification path {} is not a child of {}", child, locus),
                    });
                }
                child.child_suffix()
            }
        };
        suffixes.insert(suffix);
    }
    Ok(suffixes)
}

/// Compile one scope's moves into its design pair
pub fn compile_scope(group: ScopeGroup<'_>) -> Result<CompiledScope> {
    let ScopeGroup {
        key,
        moves,
        mut metadata,
    } = group;

    let mut draft = Draft::new(&key, &metadata.label);
    for mv in &moves {
        draft.place(mv)?;
    }
    draft.widen();

    for p in &draft.placements {
        if let Some(actor) = &p.actor {
            match p.side {
                Participant::Proponent => metadata.actors.proponent.insert(actor.clone()),
                Participant::Opponent => metadata.actors.opponent.insert(actor.clone()),
            };
        }
    }

    let opponent_design = draft.build(Participant::Opponent)?;
    let proponent_design = draft.build(Participant::Proponent)?;

    debug!(
        scope = %key,
        p_acts = proponent_design.len(),
        o_acts = opponent_design.len(),
        "compiled scope"
    );

    Ok(CompiledScope {
        key,
        proponent_design,
        opponent_design,
        metadata,
    })
}

// =============================================================================
// TESTS
// =============================================================================
