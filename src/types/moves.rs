//! Dialogue moves: the compiler's input

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Participant;

/// Kinds of dialogue move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveKind {
    Assert,
    Why,
    Grounds,
    Retract,
    Concede,
    Close,
    Therefore,
    Suppose,
    Discharge,
}

impl MoveKind {
    /// Opens a new assertion rather than answering one
    pub fn is_assertion(&self) -> bool {
        matches!(self, MoveKind::Assert | MoveKind::Suppose)
    }

    /// Compiles to a daimon regardless of payload
    pub fn is_closing(&self) -> bool {
        matches!(self, MoveKind::Retract | MoveKind::Concede | MoveKind::Close)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::Assert => "ASSERT",
            MoveKind::Why => "WHY",
            MoveKind::Grounds => "GROUNDS",
            MoveKind::Retract => "RETRACT",
            MoveKind::Concede => "CONCEDE",
            MoveKind::Close => "CLOSE",
            MoveKind::Therefore => "THEREFORE",
            MoveKind::Suppose => "SUPPOSE",
            MoveKind::Discharge => "DISCHARGE",
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MoveKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_uppercase().as_str() {
            "ASSERT" => MoveKind::Assert,
            "WHY" => MoveKind::Why,
            "GROUNDS" => MoveKind::Grounds,
            "RETRACT" => MoveKind::Retract,
            "CONCEDE" => MoveKind::Concede,
            "CLOSE" => MoveKind::Close,
            "THEREFORE" => MoveKind::Therefore,
            "SUPPOSE" => MoveKind::Suppose,
            "DISCHARGE" => MoveKind::Discharge,
            other => return Err(format!("unknown move kind '{}'", other)),
        };
        Ok(kind)
    }
}

/// What a move is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    /// "claim", "argument", "card", or "move" to point at another move
    #[serde(rename = "type")]
    pub target_type: String,
    pub id: String,
}

impl TargetRef {
    pub fn new(target_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            id: id.into(),
        }
    }

    /// Key used for anchors and scope grouping
    pub fn key(&self) -> String {
        format!("{}:{}", self.target_type, self.id)
    }

    pub fn is_move(&self) -> bool {
        self.target_type == "move"
    }
}

/// A ramification entry: bare child suffix or full child path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RamificationEntry {
    Suffix(u32),
    Path(String),
}

/// Which design a proto-act lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtoPolarity {
    Pos,
    Neg,
    Daimon,
}

/// One act of a multi-act move, placed at its own locus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoAct {
    pub polarity: ProtoPolarity,
    /// Absolute locus; the move's anchor when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locus_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub openings: Vec<u32>,
    #[serde(default)]
    pub additive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl ProtoAct {
    pub fn new(polarity: ProtoPolarity) -> Self {
        Self {
            polarity,
            locus_path: None,
            openings: Vec::new(),
            additive: false,
            expression: None,
        }
    }

    pub fn at(mut self, path: &str) -> Self {
        self.locus_path = Some(path.to_string());
        self
    }

    pub fn opening(mut self, suffixes: &[u32]) -> Self {
        self.openings = suffixes.to_vec();
        self
    }

    pub fn with_expression(mut self, expression: &str) -> Self {
        self.expression = Some(expression.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ramification: Vec<RamificationEntry>,
    #[serde(default)]
    pub additive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
    /// Takes precedence over the single-act placement when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acts: Vec<ProtoAct>,
}

/// One dialogue move by one actor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueMove {
    pub id: String,
    pub actor_id: String,
    pub kind: MoveKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_locus_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_suffix: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Participant>,
    #[serde(default)]
    pub payload: MovePayload,
    #[serde(default)]
    pub sealed: bool,
}

impl DialogueMove {
    pub fn new(id: impl Into<String>, actor_id: impl Into<String>, kind: MoveKind) -> Self {
        Self {
            id: id.into(),
            actor_id: actor_id.into(),
            kind,
            target: None,
            topic_id: None,
            target_locus_hint: None,
            child_suffix: None,
            side: None,
            payload: MovePayload::default(),
            sealed: false,
        }
    }

    pub fn on(mut self, target_type: &str, id: &str) -> Self {
        self.target = Some(TargetRef::new(target_type, id));
        self
    }

    /// Target another move by id
    pub fn replying_to(self, move_id: &str) -> Self {
        self.on("move", move_id)
    }

    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic_id = Some(topic.to_string());
        self
    }

    pub fn with_expression(mut self, expression: &str) -> Self {
        self.payload.expression = Some(expression.to_string());
        self
    }

    pub fn with_ramification(mut self, suffixes: &[u32]) -> Self {
        self.payload.ramification = suffixes.iter().map(|s| RamificationEntry::Suffix(*s)).collect();
        self
    }

    pub fn with_acts(mut self, acts: Vec<ProtoAct>) -> Self {
        self.payload.acts = acts;
        self
    }

    pub fn additive(mut self) -> Self {
        self.payload.additive = true;
        self
    }

    pub fn at(mut self, hint: &str) -> Self {
        self.target_locus_hint = Some(hint.to_string());
        self
    }

    pub fn as_side(mut self, side: Participant) -> Self {
        self.side = Some(side);
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn expression(&self) -> &str {
        self.payload.expression.as_deref().unwrap_or("")
    }
}

// =============================================================================
// TESTS
// =============================================================================
