//! Uniformity check result types
//!
//! `uniform` is None when the check does not apply (fewer than two
//! instantiated children under the base).

use serde::{Deserialize, Serialize};

use crate::types::Locus;

/// One normalized line of a subtree
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NormalizedAct {
    /// Path below the compared child ("" for the child itself)
    pub path: String,
    /// "†" for a daimon, else polarity, additive flag and ramification
    pub signature: String,
    /// Expression with bound witnesses renamed to $0, $1, …
    pub expression: String,
    /// Positional witness bound at this locus, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binder: Option<String>,
}

impl std::fmt::Display for NormalizedAct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "." } else { self.path.as_str() };
        write!(f, "{} {} \"{}\"", path, self.signature, self.expression)?;
        if let Some(b) = &self.binder {
            write!(f, " bind {}", b)?;
        }
        Ok(())
    }
}

/// First differing line between two subtrees (None past the shorter end)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counterexample {
    pub a: Option<NormalizedAct>,
    pub b: Option<NormalizedAct>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum UniformityReason {
    /// Subtrees are alpha-equivalent
    R501_UNIFORM,
    /// Subtrees differ in shape, polarity or expression
    R502_NOT_UNIFORM,
    /// Fewer than two children under the base
    R503_NOT_APPLICABLE,
}

impl UniformityReason {
    pub fn code(&self) -> &'static str {
        match self {
            Self::R501_UNIFORM => "R501_UNIFORM",
            Self::R502_NOT_UNIFORM => "R502_NOT_UNIFORM",
            Self::R503_NOT_APPLICABLE => "R503_NOT_APPLICABLE",
        }
    }

    /// Short wire label ("not_applicable" et al.)
    pub fn label(&self) -> &'static str {
        match self {
            Self::R501_UNIFORM => "uniform",
            Self::R502_NOT_UNIFORM => "not_uniform",
            Self::R503_NOT_APPLICABLE => "not_applicable",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::R501_UNIFORM => "Children are alpha-equivalent",
            Self::R502_NOT_UNIFORM => "Children played differently",
            Self::R503_NOT_APPLICABLE => "Fewer than two children",
        }
    }
}

impl std::fmt::Display for UniformityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformityResult {
    pub uniform: Option<bool>,
    pub reason: String,
    pub code: UniformityReason,
    pub base: Locus,
    pub child_a: Locus,
    pub child_b: Locus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<Counterexample>,
}

impl UniformityResult {
    pub fn uniform(base: Locus, child_a: Locus, child_b: Locus) -> Self {
        Self::with(Some(true), UniformityReason::R501_UNIFORM, base, child_a, child_b, None)
    }

    pub fn not_uniform(base: Locus, child_a: Locus, child_b: Locus, counterexample: Counterexample) -> Self {
        Self::with(
            Some(false),
            UniformityReason::R502_NOT_UNIFORM,
            base,
            child_a,
            child_b,
            Some(counterexample),
        )
    }

    pub fn not_applicable(base: Locus, child_a: Locus, child_b: Locus) -> Self {
        Self::with(None, UniformityReason::R503_NOT_APPLICABLE, base, child_a, child_b, None)
    }

    fn with(
        uniform: Option<bool>,
        code: UniformityReason,
        base: Locus,
        child_a: Locus,
        child_b: Locus,
        counterexample: Option<Counterexample>,
    ) -> Self {
        Self {
            uniform,
            reason: code.label().to_string(),
            code,
            base,
            child_a,
            child_b,
            counterexample,
        }
    }

    pub fn is_applicable(&self) -> bool {
        self.uniform.is_some()
    }

    /// Format for display
    pub fn display_value(&self) -> String {
        match self.uniform {
            Some(true) => "UNIFORM".to_string(),
            Some(false) => "NOT UNIFORM".to_string(),
            None => "N/A".to_string(),
        }
    }
}
