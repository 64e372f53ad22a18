//! Scoping: partition a move feed into independent sub-dialogues
//!
//! Strategies:
//! - legacy: one scope, key "legacy"
//! - topic: "topic:{topic_id}", falling back to the target id
//! - argument: "argument:{target_type}:{target_id}"
//! - actor-pair: "actor-pair:{a}:{b}" for the thread owner and a challenger
//!
//! A move replying to an earlier move joins that move's scope. Moves with
//! nothing to scope on land in "legacy".

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::types::{DialogueMove, ScopeActors, ScopeMetadata, ScopingStrategy};

pub const LEGACY_SCOPE: &str = "legacy";

/// Moves of one scope, in feed order
#[derive(Debug, Clone)]
pub struct ScopeGroup<'a> {
    pub key: String,
    pub moves: Vec<&'a DialogueMove>,
    pub metadata: ScopeMetadata,
}

/// Partition moves; groups come back ordered by key
pub fn partition(moves: &[DialogueMove], strategy: ScopingStrategy) -> Vec<ScopeGroup<'_>> {
    let keys = scope_keys(moves, strategy);

    let mut grouped: BTreeMap<String, Vec<&DialogueMove>> = BTreeMap::new();
    for (mv, key) in moves.iter().zip(keys.iter()) {
        grouped.entry(key.clone()).or_default().push(mv);
    }

    let key_of: HashMap<&str, &str> = moves
        .iter()
        .zip(keys.iter())
        .map(|(mv, key)| (mv.id.as_str(), key.as_str()))
        .collect();

    let groups: Vec<ScopeGroup<'_>> = grouped
        .into_iter()
        .map(|(key, scoped)| {
            let metadata = metadata_for(&key, strategy, &scoped, &key_of);
            ScopeGroup {
                key,
                moves: scoped,
                metadata,
            }
        })
        .collect();

    debug!(%strategy, moves = moves.len(), scopes = groups.len(), "partitioned moves");
    groups
}

/// Scope key for every move, aligned with the input
pub fn scope_keys(moves: &[DialogueMove], strategy: ScopingStrategy) -> Vec<String> {
    let position: HashMap<&str, usize> = moves
        .iter()
        .enumerate()
        .map(|(i, mv)| (mv.id.as_str(), i))
        .collect();

    // Earlier move this one replies to
    let parent_of = |i: usize| -> Option<usize> {
        let target = moves[i].target.as_ref()?;
        if !target.is_move() {
            return None;
        }
        position.get(target.id.as_str()).copied().filter(|&j| j < i)
    };

    match strategy {
        ScopingStrategy::Legacy => vec![LEGACY_SCOPE.to_string(); moves.len()],
        ScopingStrategy::Topic => {
            let mut keys: Vec<String> = Vec::with_capacity(moves.len());
            for (i, mv) in moves.iter().enumerate() {
                let key = if let Some(topic) = &mv.topic_id {
                    format!("topic:{}", topic)
                } else if let Some(j) = parent_of(i) {
                    keys[j].clone()
                } else if let Some(target) = &mv.target {
                    format!("topic:{}", target.id)
                } else {
                    LEGACY_SCOPE.to_string()
                };
                keys.push(key);
            }
            keys
        }
        ScopingStrategy::Argument => {
            let mut keys: Vec<String> = Vec::with_capacity(moves.len());
            for (i, mv) in moves.iter().enumerate() {
                let key = if let Some(j) = parent_of(i) {
                    keys[j].clone()
                } else if let Some(target) = &mv.target {
                    format!("argument:{}", target.key())
                } else {
                    LEGACY_SCOPE.to_string()
                };
                keys.push(key);
            }
            keys
        }
        ScopingStrategy::ActorPair => {
            // Thread root per move
            let mut roots: Vec<Option<String>> = Vec::with_capacity(moves.len());
            for (i, mv) in moves.iter().enumerate() {
                let root = match parent_of(i) {
                    Some(j) => roots[j].clone(),
                    None => mv.target.as_ref().map(|t| t.key()),
                };
                roots.push(root);
            }

            // Distinct actors per thread, in order of appearance
            let mut actors_by_root: HashMap<&str, Vec<&str>> = HashMap::new();
            for (mv, root) in moves.iter().zip(roots.iter()) {
                if let Some(root) = root {
                    let actors = actors_by_root.entry(root.as_str()).or_default();
                    if !actors.contains(&mv.actor_id.as_str()) {
                        actors.push(mv.actor_id.as_str());
                    }
                }
            }

            moves
                .iter()
                .zip(roots.iter())
                .map(|(mv, root)| {
                    let Some(root) = root else {
                        return LEGACY_SCOPE.to_string();
                    };
                    let actors = &actors_by_root[root.as_str()];
                    let owner = actors[0];
                    let partner = if mv.actor_id == owner {
                        actors.get(1).copied()
                    } else {
                        Some(mv.actor_id.as_str())
                    };
                    match partner {
                        Some(p) => pair_key(owner, p),
                        None => format!("actor-pair:{}", owner),
                    }
                })
                .collect()
        }
    }
}

fn pair_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("actor-pair:{}:{}", a, b)
    } else {
        format!("actor-pair:{}:{}", b, a)
    }
}

/// Human label for a scope key
pub fn label_for(key: &str) -> String {
    if key == LEGACY_SCOPE {
        return "Legacy (All)".to_string();
    }
    if let Some(topic) = key.strip_prefix("topic:") {
        return format!("Topic: {}", topic);
    }
    if let Some(rest) = key.strip_prefix("actor-pair:") {
        return match rest.split_once(':') {
            Some((a, b)) => format!("Actors: {} ↔ {}", a, b),
            None => format!("Actor: {}", rest),
        };
    }
    if let Some(rest) = key.strip_prefix("argument:") {
        return match rest.split_once(':') {
            Some((kind, id)) => format!("Argument: {} {}", kind, id),
            None => format!("Argument: {}", rest),
        };
    }
    key.to_string()
}

fn metadata_for(
    key: &str,
    strategy: ScopingStrategy,
    moves: &[&DialogueMove],
    key_of: &HashMap<&str, &str>,
) -> ScopeMetadata {
    let all: BTreeSet<String> = moves.iter().map(|m| m.actor_id.clone()).collect();
    let target_types: BTreeSet<String> = moves
        .iter()
        .filter_map(|m| m.target.as_ref().map(|t| t.target_type.clone()))
        .collect();
    let cross_scope_refs: Vec<String> = moves
        .iter()
        .filter(|m| {
            m.target
                .as_ref()
                .filter(|t| t.is_move())
                .and_then(|t| key_of.get(t.id.as_str()))
                .map(|other| *other != key)
                .unwrap_or(false)
        })
        .map(|m| m.id.clone())
        .collect();

    ScopeMetadata {
        scope_type: if key == LEGACY_SCOPE {
            ScopingStrategy::Legacy
        } else {
            strategy
        },
        label: label_for(key),
        move_count: moves.len(),
        actors: ScopeActors {
            all,
            ..ScopeActors::default()
        },
        target_types,
        cross_scope_refs,
    }
}

// =============================================================================
// TESTS
// =============================================================================
