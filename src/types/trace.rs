//! Trace: the computed result of stepping two designs against each other

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use colored::Color;
use serde::{Deserialize, Serialize};

use crate::types::{DesignRef, Locus, Participant, TraceReason};

/// The four outcomes of an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceStatus {
    /// Budget exhausted, prefix is resumable
    Ongoing,
    /// Every branch closed by a daimon
    Convergent,
    /// Paired acts disagree
    Divergent,
    /// Dead end without explicit termination
    Stuck,
}

impl TraceStatus {
    /// Terminal color for display
    pub fn color(&self) -> Color {
        match self {
            TraceStatus::Ongoing => Color::Yellow,
            TraceStatus::Convergent => Color::Green,
            TraceStatus::Divergent => Color::Red,
            TraceStatus::Stuck => Color::BrightBlack,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            TraceStatus::Ongoing => "…",
            TraceStatus::Convergent => "✓",
            TraceStatus::Divergent => "✗",
            TraceStatus::Stuck => "∅",
        }
    }
}

impl fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TraceStatus::Ongoing => "ONGOING",
            TraceStatus::Convergent => "CONVERGENT",
            TraceStatus::Divergent => "DIVERGENT",
            TraceStatus::Stuck => "STUCK",
        };
        write!(f, "{}", name)
    }
}

/// How strictly paired acts are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositionMode {
    /// Expressions equal, ramifications equal
    #[default]
    Assoc,
    /// Expressions equal, opponent ramification may be a subset
    Partial,
    /// Partial, plus pluggable expression equivalence
    Spiritual,
}

impl CompositionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompositionMode::Assoc => "assoc",
            CompositionMode::Partial => "partial",
            CompositionMode::Spiritual => "spiritual",
        }
    }
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompositionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assoc" => Ok(CompositionMode::Assoc),
            "partial" => Ok(CompositionMode::Partial),
            "spiritual" => Ok(CompositionMode::Spiritual),
            other => Err(format!("unknown composition mode '{}'", other)),
        }
    }
}

/// Whose act drives descent when both sides act at a locus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    #[serde(rename = "neutral")]
    Neutral,
    #[serde(rename = "focus-P")]
    FocusP,
    #[serde(rename = "focus-O")]
    FocusO,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Neutral => "neutral",
            Phase::FocusP => "focus-P",
            Phase::FocusO => "focus-O",
        }
    }

    /// Side whose act leads when both are live
    pub fn leader(&self) -> Participant {
        match self {
            Phase::Neutral | Phase::FocusP => Participant::Proponent,
            Phase::FocusO => Participant::Opponent,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "neutral" => Ok(Phase::Neutral),
            "focus-P" | "focus-p" | "p" | "P" => Ok(Phase::FocusP),
            "focus-O" | "focus-o" | "o" | "O" => Ok(Phase::FocusO),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// One step of an interaction; one-sided when only one design acts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracePair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_act_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neg_act_id: Option<String>,
    pub locus: Locus,
    /// Logical stepping counter
    pub ts: u64,
}

/// Where a daimon would let a stuck or unfinished branch close
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaimonHint {
    pub locus: Locus,
    /// Side expected to answer at the locus
    pub side: Participant,
}

/// The daimon that closed the last finished branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaimonClosure {
    pub locus: Locus,
    pub side: Participant,
    pub act_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub status: TraceStatus,
    pub pairs: Vec<TracePair>,
    pub decisive_indices: Vec<usize>,
    pub used_additive: BTreeMap<Locus, Locus>,
    /// Declared continuations the opponent left unanswered (partial/spiritual)
    pub gaps: BTreeMap<Locus, BTreeSet<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at_daimon: Option<DaimonClosure>,
    pub daimon_hints: Vec<DaimonHint>,
    pub reason: TraceReason,
    /// Locus where the trace ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_locus: Option<Locus>,
    pub pos_design: DesignRef,
    pub neg_design: DesignRef,
    pub mode: CompositionMode,
    pub phase: Phase,
}

impl Trace {
    pub fn is_convergent(&self) -> bool {
        self.status == TraceStatus::Convergent
    }

    /// Pairs on the path to the ending locus
    pub fn decisive_pairs(&self) -> Vec<&TracePair> {
        self.decisive_indices.iter().filter_map(|&i| self.pairs.get(i)).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&TraceStatus::Convergent).unwrap(), "\"CONVERGENT\"");
        assert_eq!(serde_json::to_string(&Phase::FocusO).unwrap(), "\"focus-O\"");
        assert_eq!(serde_json::to_string(&CompositionMode::Spiritual).unwrap(), "\"spiritual\"");
        let phase: Phase = serde_json::from_str("\"focus-P\"").unwrap();
        assert_eq!(phase, Phase::FocusP);
    }

    #[test]
    fn test_parse_mode_and_phase() {
        assert_eq!("PARTIAL".parse::<CompositionMode>().unwrap(), CompositionMode::Partial);
        assert!("loose".parse::<CompositionMode>().is_err());
        assert_eq!("focus-O".parse::<Phase>().unwrap().leader(), Participant::Opponent);
        assert_eq!(Phase::default().leader(), Participant::Proponent);
    }
}
