//! Act model: the atomic units placed at loci

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Locus;

/// Polarity of a proper act
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Acting: the side that moves at this locus
    Positive,
    /// Receiving: the side that answers
    Negative,
}

impl Polarity {
    /// Single-character marker for terminal and normalized output
    pub fn sign(&self) -> &'static str {
        match self {
            Polarity::Positive => "+",
            Polarity::Negative => "-",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
        };
        write!(f, "{}", name)
    }
}

/// Which side of an interaction a design plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Participant {
    Proponent,
    Opponent,
}

impl Participant {
    /// Proponent designs carry positive acts, Opponent designs negative ones
    pub fn polarity(&self) -> Polarity {
        match self {
            Participant::Proponent => Polarity::Positive,
            Participant::Opponent => Polarity::Negative,
        }
    }

    pub fn other(&self) -> Participant {
        match self {
            Participant::Proponent => Participant::Opponent,
            Participant::Opponent => Participant::Proponent,
        }
    }

    /// Suffix used in compiled design ids ("P" / "O")
    pub fn tag(&self) -> &'static str {
        match self {
            Participant::Proponent => "P",
            Participant::Opponent => "O",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Participant::Proponent => "Proponent",
            Participant::Opponent => "Opponent",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Participant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proponent" | "p" => Ok(Participant::Proponent),
            "opponent" | "o" => Ok(Participant::Opponent),
            other => Err(format!("unknown participant '{}'", other)),
        }
    }
}

/// Closed sum of act kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActKind {
    /// Ordinary act with polarity and declared continuations
    Proper {
        polarity: Polarity,
        ramification: BTreeSet<u32>,
        #[serde(default)]
        additive: bool,
    },
    /// Terminal act closing its branch
    Daimon,
}

impl ActKind {
    pub fn proper(polarity: Polarity, ramification: impl IntoIterator<Item = u32>, additive: bool) -> Self {
        ActKind::Proper {
            polarity,
            ramification: ramification.into_iter().collect(),
            additive,
        }
    }

    pub fn is_daimon(&self) -> bool {
        matches!(self, ActKind::Daimon)
    }

    pub fn polarity(&self) -> Option<Polarity> {
        match self {
            ActKind::Proper { polarity, .. } => Some(*polarity),
            ActKind::Daimon => None,
        }
    }

    pub fn is_additive(&self) -> bool {
        match self {
            ActKind::Proper { additive, .. } => *additive,
            ActKind::Daimon => false,
        }
    }

    /// Declared ramification (empty for a daimon)
    pub fn ramification(&self) -> BTreeSet<u32> {
        match self {
            ActKind::Proper { ramification, .. } => ramification.clone(),
            ActKind::Daimon => BTreeSet::new(),
        }
    }
}

/// An act placed at a locus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Act {
    pub id: String,
    pub locus: Locus,
    #[serde(default)]
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
    pub kind: ActKind,
}

impl Act {
    pub fn is_daimon(&self) -> bool {
        self.kind.is_daimon()
    }

    pub fn polarity(&self) -> Option<Polarity> {
        self.kind.polarity()
    }

    /// Child loci named by the declared ramification
    pub fn child_loci(&self) -> Vec<Locus> {
        self.kind
            .ramification()
            .into_iter()
            .map(|s| self.locus.child(s))
            .collect()
    }

    /// Empty expression is a wildcard reception
    pub fn is_wildcard(&self) -> bool {
        self.expression.trim().is_empty()
    }
}

impl fmt::Display for Act {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActKind::Daimon => write!(f, "{} † @{}", self.id, self.locus),
            ActKind::Proper {
                polarity,
                ramification,
                additive,
            } => {
                let ram: Vec<String> = ramification.iter().map(|s| s.to_string()).collect();
                write!(
                    f,
                    "{} {}{} @{} [{}] \"{}\"",
                    self.id,
                    polarity.sign(),
                    if *additive { "&" } else { "" },
                    self.locus,
                    ram.join(","),
                    self.expression
                )
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_polarity() {
        assert_eq!(Participant::Proponent.polarity(), Polarity::Positive);
        assert_eq!(Participant::Opponent.polarity(), Polarity::Negative);
        assert_eq!(Participant::Opponent.other(), Participant::Proponent);
        assert_eq!("O".parse::<Participant>().unwrap(), Participant::Opponent);
    }

    #[test]
    fn test_daimon_has_no_polarity() {
        assert_eq!(ActKind::Daimon.polarity(), None);
        assert!(ActKind::Daimon.ramification().is_empty());
        let kind = ActKind::proper(Polarity::Positive, [2, 1], true);
        assert_eq!(kind.polarity(), Some(Polarity::Positive));
        assert!(kind.is_additive());
        assert_eq!(kind.ramification().into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_kind_json_shape() {
        let json = serde_json::to_value(ActKind::proper(Polarity::Negative, [1], false)).unwrap();
        assert_eq!(json["type"], "proper");
        assert_eq!(json["polarity"], "negative");
        assert_eq!(json["ramification"], serde_json::json!([1]));
        let daimon: ActKind = serde_json::from_str(r#"{"type":"daimon"}"#).unwrap();
        assert!(daimon.is_daimon());
    }

    #[test]
    fn test_child_loci() {
        let act = Act {
            id: "d#0".into(),
            locus: Locus::parse("0.2").unwrap(),
            expression: "p".into(),
            semantic: None,
            kind: ActKind::proper(Polarity::Positive, [1, 3], false),
        };
        let children: Vec<String> = act.child_loci().iter().map(|l| l.to_string()).collect();
        assert_eq!(children, vec!["0.2.1", "0.2.3"]);
    }
}
