//! Scopes: independent sub-dialogues, each compiled to a P/O design pair

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Design;

/// How moves are partitioned into scopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopingStrategy {
    /// Everything in one scope
    #[default]
    Legacy,
    /// One scope per topic (or target when no topic is set)
    Topic,
    /// One scope per pair of interacting actors
    ActorPair,
    /// One scope per argument/claim target
    Argument,
}

impl ScopingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopingStrategy::Legacy => "legacy",
            ScopingStrategy::Topic => "topic",
            ScopingStrategy::ActorPair => "actor-pair",
            ScopingStrategy::Argument => "argument",
        }
    }
}

impl fmt::Display for ScopingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScopingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(ScopingStrategy::Legacy),
            "topic" => Ok(ScopingStrategy::Topic),
            "actor-pair" | "actor_pair" => Ok(ScopingStrategy::ActorPair),
            "argument" => Ok(ScopingStrategy::Argument),
            other => Err(format!("unknown scoping strategy '{}'", other)),
        }
    }
}

/// Which actors played which side in a scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeActors {
    pub proponent: BTreeSet<String>,
    pub opponent: BTreeSet<String>,
    pub all: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMetadata {
    pub scope_type: ScopingStrategy,
    pub label: String,
    pub move_count: usize,
    pub actors: ScopeActors,
    /// Distinct target types touched by moves in the scope
    pub target_types: BTreeSet<String>,
    /// Move ids that target a move compiled in another scope
    pub cross_scope_refs: Vec<String>,
}

/// One compiled scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScope {
    pub key: String,
    pub proponent_design: Design,
    pub opponent_design: Design,
    pub metadata: ScopeMetadata,
}

/// Result of compiling a move feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub strategy: ScopingStrategy,
    pub scopes: Vec<CompiledScope>,
}

impl CompileOutput {
    pub fn scope(&self, key: &str) -> Option<&CompiledScope> {
        self.scopes.iter().find(|s| s.key == key)
    }
}
