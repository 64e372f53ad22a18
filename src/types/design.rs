//! Design: one participant's tree of acts, indexed by locus
//!
//! Invariants enforced on every insertion:
//! - one act per locus
//! - nothing strictly below a daimon
//! - a child of a proper act sits inside its effective ramification
//!   (declared ∪ copy-extended)
//! - act polarity follows the participant

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::error::{LudicsError, Result};
use crate::types::{Act, ActKind, Locus, Participant, Polarity};
use crate::SEMANTICS_TAG;

/// Witness binding recorded by `instantiate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instantiation {
    pub name: String,
    #[serde(default)]
    pub masked: bool,
}

/// Reference to a specific design version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesignRef {
    pub id: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DesignData", into = "DesignData")]
pub struct Design {
    id: String,
    participant: Participant,
    semantics: String,
    version: u64,
    scope: Option<String>,
    acts: Vec<Act>,
    index: BTreeMap<Locus, usize>,
    instantiations: BTreeMap<Locus, Instantiation>,
    copy_extensions: BTreeMap<Locus, BTreeSet<u32>>,
}

impl Design {
    /// Empty design at version 1
    pub fn new(id: impl Into<String>, participant: Participant) -> Self {
        Self {
            id: id.into(),
            participant,
            semantics: SEMANTICS_TAG.to_string(),
            version: 1,
            scope: None,
            acts: Vec::new(),
            index: BTreeMap::new(),
            instantiations: BTreeMap::new(),
            copy_extensions: BTreeMap::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn participant(&self) -> Participant {
        self.participant
    }

    pub fn polarity(&self) -> Polarity {
        self.participant.polarity()
    }

    pub fn semantics(&self) -> &str {
        &self.semantics
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn reference(&self) -> DesignRef {
        DesignRef {
            id: self.id.clone(),
            version: self.version,
        }
    }

    /// Acts in insertion order
    pub fn acts(&self) -> &[Act] {
        &self.acts
    }

    pub fn len(&self) -> usize {
        self.acts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acts.is_empty()
    }

    pub fn act_at(&self, locus: &Locus) -> Option<&Act> {
        self.index.get(locus).map(|&i| &self.acts[i])
    }

    pub fn contains(&self, locus: &Locus) -> bool {
        self.index.contains_key(locus)
    }

    /// Acts at or below `base`, in locus order
    pub fn subtree(&self, base: &Locus) -> Vec<&Act> {
        self.index
            .range(base.clone()..)
            .take_while(|(locus, _)| base.is_prefix_of(locus))
            .map(|(_, &i)| &self.acts[i])
            .collect()
    }

    /// Any act at or below `base`
    pub fn has_subtree(&self, base: &Locus) -> bool {
        self.index
            .range(base.clone()..)
            .next()
            .map(|(locus, _)| base.is_prefix_of(locus))
            .unwrap_or(false)
    }

    /// First act strictly below `base`
    fn first_descendant(&self, base: &Locus) -> Option<&Locus> {
        self.index
            .range((Bound::Excluded(base.clone()), Bound::Unbounded))
            .next()
            .map(|(locus, _)| locus)
            .filter(|locus| base.is_ancestor(locus))
    }

    /// Suffixes of direct children of `parent` whose subtree holds an act
    pub fn occupied_children(&self, parent: &Locus) -> BTreeSet<u32> {
        let depth = parent.segments().len();
        self.index
            .range((Bound::Excluded(parent.clone()), Bound::Unbounded))
            .take_while(|(locus, _)| parent.is_ancestor(locus))
            .map(|(locus, _)| locus.segments()[depth])
            .collect()
    }

    /// Declared ramification plus suffixes added by copying
    pub fn effective_ramification(&self, locus: &Locus) -> BTreeSet<u32> {
        let mut ram = self
            .act_at(locus)
            .map(|a| a.kind.ramification())
            .unwrap_or_default();
        if let Some(ext) = self.copy_extensions.get(locus) {
            ram.extend(ext.iter().copied());
        }
        ram
    }

    /// Nearest daimon at or above `locus`
    pub fn daimon_at_or_above(&self, locus: &Locus) -> Option<Locus> {
        let mut cursor = Some(locus.clone());
        while let Some(l) = cursor {
            if self.act_at(&l).map(|a| a.is_daimon()).unwrap_or(false) {
                return Some(l);
            }
            cursor = l.parent();
        }
        None
    }

    pub fn instantiation(&self, locus: &Locus) -> Option<&Instantiation> {
        self.instantiations.get(locus)
    }

    pub fn instantiations(&self) -> &BTreeMap<Locus, Instantiation> {
        &self.instantiations
    }

    pub fn copy_extensions(&self) -> &BTreeMap<Locus, BTreeSet<u32>> {
        &self.copy_extensions
    }

    /// Place a proper act; polarity comes from the participant
    pub fn append_proper(
        &mut self,
        locus: Locus,
        expression: impl Into<String>,
        ramification: impl IntoIterator<Item = u32>,
        additive: bool,
    ) -> Result<&Act> {
        let kind = ActKind::proper(self.polarity(), ramification, additive);
        let i = self.insert(None, locus, expression.into(), None, kind)?;
        Ok(&self.acts[i])
    }

    /// Place a daimon closing the branch at `locus`
    pub fn append_daimon(&mut self, locus: Locus, expression: impl Into<String>) -> Result<&Act> {
        let i = self.insert(None, locus, expression.into(), None, ActKind::Daimon)?;
        Ok(&self.acts[i])
    }

    /// Attach a semantic annotation to an existing act
    pub fn annotate(&mut self, locus: &Locus, semantic: impl Into<String>) -> Result<()> {
        let i = *self.index.get(locus).ok_or_else(|| self.not_found(locus))?;
        self.acts[i].semantic = Some(semantic.into());
        Ok(())
    }

    pub(crate) fn not_found(&self, locus: &Locus) -> LudicsError {
        LudicsError::LocusNotFound {
            design_id: self.id.clone(),
            locus: locus.to_string(),
        }
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn extend_ramification(&mut self, parent: &Locus, suffixes: impl IntoIterator<Item = u32>) {
        self.copy_extensions
            .entry(parent.clone())
            .or_default()
            .extend(suffixes);
    }

    pub(crate) fn bind(&mut self, locus: Locus, binding: Instantiation) {
        self.instantiations.insert(locus, binding);
    }

    /// Checked insertion shared by every construction path
    pub(crate) fn insert(
        &mut self,
        id: Option<String>,
        locus: Locus,
        expression: String,
        semantic: Option<String>,
        kind: ActKind,
    ) -> Result<usize> {
        if let Some(existing) = self.act_at(&locus) {
            return Err(LudicsError::LocusOccupied {
                locus: locus.to_string(),
                act_id: existing.id.clone(),
            });
        }

        if let Some(polarity) = kind.polarity() {
            if polarity != self.polarity() {
                return Err(LudicsError::MalformedTree {
                    locus: locus.to_string(),
                    detail: format!(
                        "{} act in {} design {}",
                        polarity,
                        self.participant.to_string().to_lowercase(),
                        self.id
                    ),
                });
            }
        }

        if let Some(parent) = locus.parent() {
            if let Some(sealed_at) = self.daimon_at_or_above(&parent) {
                return Err(LudicsError::SealedBranch {
                    locus: locus.to_string(),
                    sealed_at: sealed_at.to_string(),
                });
            }
            if self.contains(&parent) {
                let ram = self.effective_ramification(&parent);
                if !ram.contains(&locus.child_suffix()) {
                    return Err(LudicsError::MalformedTree {
                        locus: locus.to_string(),
                        detail: format!("suffix {} outside ramification of {}", locus.child_suffix(), parent),
                    });
                }
            }
        }

        match &kind {
            ActKind::Daimon => {
                if let Some(below) = self.first_descendant(&locus) {
                    return Err(LudicsError::SealedBranch {
                        locus: below.to_string(),
                        sealed_at: locus.to_string(),
                    });
                }
            }
            ActKind::Proper { ramification, .. } => {
                let mut ram = ramification.clone();
                if let Some(ext) = self.copy_extensions.get(&locus) {
                    ram.extend(ext.iter().copied());
                }
                let stray: Vec<u32> = self
                    .occupied_children(&locus)
                    .into_iter()
                    .filter(|s| !ram.contains(s) && self.contains(&locus.child(*s)))
                    .collect();
                if let Some(s) = stray.first() {
                    return Err(LudicsError::MalformedTree {
                        locus: locus.child(*s).to_string(),
                        detail: format!("suffix {} outside ramification of {}", s, locus),
                    });
                }
            }
        }

        let i = self.acts.len();
        let id = id.unwrap_or_else(|| format!("{}#{}", self.id, i));
        self.acts.push(Act {
            id,
            locus: locus.clone(),
            expression,
            semantic,
            kind,
        });
        self.index.insert(locus, i);
        Ok(i)
    }
}

// =============================================================================
// SERIALIZED FORM
// =============================================================================

/// Wire form; deserialization replays every insertion rule
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DesignData {
    id: String,
    participant: Participant,
    #[serde(default = "default_semantics")]
    semantics: String,
    #[serde(default = "default_version")]
    version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
    #[serde(default)]
    acts: Vec<Act>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    instantiations: BTreeMap<Locus, Instantiation>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    copy_extensions: BTreeMap<Locus, BTreeSet<u32>>,
}

fn default_semantics() -> String {
    SEMANTICS_TAG.to_string()
}

fn default_version() -> u64 {
    1
}

impl TryFrom<DesignData> for Design {
    type Error = LudicsError;

    fn try_from(data: DesignData) -> Result<Self> {
        let mut design = Design::new(data.id, data.participant);
        design.semantics = data.semantics;
        design.version = data.version;
        design.scope = data.scope;
        design.copy_extensions = data.copy_extensions;

        for act in data.acts {
            design.insert(Some(act.id), act.locus, act.expression, act.semantic, act.kind)?;
        }

        for (locus, binding) in data.instantiations {
            if !design.has_subtree(&locus) {
                return Err(design.not_found(&locus));
            }
            if binding.name.trim().is_empty() {
                return Err(LudicsError::InvalidWitness { name: binding.name });
            }
            design.bind(locus, binding);
        }

        Ok(design)
    }
}

impl From<Design> for DesignData {
    fn from(design: Design) -> Self {
        Self {
            id: design.id,
            participant: design.participant,
            semantics: design.semantics,
            version: design.version,
            scope: design.scope,
            acts: design.acts,
            instantiations: design.instantiations,
            copy_extensions: design.copy_extensions,
        }
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

    fn sample() -> Design {
        let mut d = Design::new("t/P", Participant::Proponent);
        d.append_proper(l("0"), "root", [1, 2], false).unwrap();
        d.append_proper(l("0.1"), "a", [1], false).unwrap();
        d.append_daimon(l("0.2"), "").unwrap();
        d
    }

    #[test]
    fn test_ids_follow_insertion_order() {
        let d = sample();
        let ids: Vec<&str> = d.acts().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["t/P#0", "t/P#1", "t/P#2"]);
        assert_eq!(d.act_at(&l("0.1")).unwrap().expression, "a");
    }

    #[test]
    fn test_occupied_locus_rejected() {
        let mut d = sample();
        let err = d.append_proper(l("0.1"), "again", [1], false).unwrap_err();
        assert_eq!(err.code(), "LOCUS_OCCUPIED");
    }

    #[test]
    fn test_append_below_daimon_sealed() {
        let mut d = sample();
        let err = d.append_proper(l("0.2.1"), "x", [1], false).unwrap_err();
        match err {
            LudicsError::SealedBranch { sealed_at, .. } => assert_eq!(sealed_at, "0.2"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_daimon_above_existing_acts_sealed() {
        let mut d = Design::new("t/O", Participant::Opponent);
        d.append_proper(l("0.1.1"), "x", [1], false).unwrap();
        let err = d.append_daimon(l("0.1"), "").unwrap_err();
        assert_eq!(err.code(), "SEALED_BRANCH");
    }

    #[test]
    fn test_child_outside_ramification_malformed() {
        let mut d = sample();
        let err = d.append_proper(l("0.3"), "x", [1], false).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_TREE");
    }

    #[test]
    fn test_parent_must_cover_existing_children() {
        let mut d = Design::new("t/P", Participant::Proponent);
        d.append_proper(l("0.4"), "late child", [1], false).unwrap();
        let err = d.append_proper(l("0"), "root", [1], false).unwrap_err();
        assert_eq!(err.code(), "MALFORMED_TREE");
    }

    #[test]
    fn test_subtree_and_children() {
        let mut d = sample();
        d.append_proper(l("0.1.1"), "b", [], false).unwrap();
        let sub: Vec<String> = d.subtree(&l("0.1")).iter().map(|a| a.locus.to_string()).collect();
        assert_eq!(sub, vec!["0.1", "0.1.1"]);
        assert_eq!(d.occupied_children(&l("0")).into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert!(d.has_subtree(&l("0.1.1")));
        assert!(!d.has_subtree(&l("0.3")));
    }

    #[test]
    fn test_effective_ramification_includes_extensions() {
        let mut d = sample();
        d.extend_ramification(&l("0"), [3]);
        assert_eq!(d.effective_ramification(&l("0")).into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        d.append_proper(l("0.3"), "copy", [1], false).unwrap();
    }

    #[test]
    fn test_serde_replays_rules() {
        let d = sample();
        let json = serde_json::to_string(&d).unwrap();
        let back: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);

        let bad = r#"{"id":"x","participant":"proponent","acts":[
            {"id":"x#0","locus":"0","kind":{"type":"daimon"}},
            {"id":"x#1","locus":"0.1","kind":{"type":"proper","polarity":"positive","ramification":[]}}
        ]}"#;
        assert!(serde_json::from_str::<Design>(bad).is_err());
    }

    #[test]
    fn test_wrong_polarity_rejected_on_load() {
        let bad = r#"{"id":"x","participant":"opponent","acts":[
            {"id":"x#0","locus":"0","kind":{"type":"proper","polarity":"positive","ramification":[1]}}
        ]}"#;
        assert!(serde_json::from_str::<Design>(bad).is_err());
    }
}
