//! Reason codes explaining how a trace ended
//! R1xx convergence, R2xx divergence, R3xx stuck, R4xx budget

use serde::{Deserialize, Serialize};

use crate::types::TraceStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum TraceReason {
    // =========================================================================
    // R1xx: Convergence
    // =========================================================================
    /// Every explored branch closed on a daimon
    R101_ALL_BRANCHES_CLOSED,

    // =========================================================================
    // R2xx: Divergence
    // =========================================================================
    /// Act in a slot has the wrong polarity
    R201_POLARITY_CLASH,
    /// Paired expressions do not match under the mode
    R202_EXPRESSION_MISMATCH,
    /// Ramifications differ (strict mode)
    R203_RAMIFICATION_MISMATCH,
    /// Opponent ramification not contained in the acting one
    R204_RAMIFICATION_NOT_SUBSET,
    /// Opponent selected several additive branches (strict mode)
    R205_ADDITIVE_MULTI_SELECT,

    // =========================================================================
    // R3xx: Stuck
    // =========================================================================
    /// Neither design has an act at the cursor
    R301_NO_ACT_AT_LOCUS,
    /// Acting act declares no continuation
    R302_NO_CONTINUATION,
    /// Opponent made no additive choice
    R303_NO_ADDITIVE_CHOICE,

    // =========================================================================
    // R4xx: Budget
    // =========================================================================
    /// max_pairs reached; prefix is valid and resumable
    R401_BUDGET_EXHAUSTED,
}

impl TraceReason {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_ALL_BRANCHES_CLOSED => "R101_ALL_BRANCHES_CLOSED",
            Self::R201_POLARITY_CLASH => "R201_POLARITY_CLASH",
            Self::R202_EXPRESSION_MISMATCH => "R202_EXPRESSION_MISMATCH",
            Self::R203_RAMIFICATION_MISMATCH => "R203_RAMIFICATION_MISMATCH",
            Self::R204_RAMIFICATION_NOT_SUBSET => "R204_RAMIFICATION_NOT_SUBSET",
            Self::R205_ADDITIVE_MULTI_SELECT => "R205_ADDITIVE_MULTI_SELECT",
            Self::R301_NO_ACT_AT_LOCUS => "R301_NO_ACT_AT_LOCUS",
            Self::R302_NO_CONTINUATION => "R302_NO_CONTINUATION",
            Self::R303_NO_ADDITIVE_CHOICE => "R303_NO_ADDITIVE_CHOICE",
            Self::R401_BUDGET_EXHAUSTED => "R401_BUDGET_EXHAUSTED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_ALL_BRANCHES_CLOSED => "All branches closed by daimon",
            Self::R201_POLARITY_CLASH => "Polarity clash",
            Self::R202_EXPRESSION_MISMATCH => "Expressions do not match",
            Self::R203_RAMIFICATION_MISMATCH => "Ramifications differ",
            Self::R204_RAMIFICATION_NOT_SUBSET => "Opponent opens loci the actor never declared",
            Self::R205_ADDITIVE_MULTI_SELECT => "Several additive branches selected",
            Self::R301_NO_ACT_AT_LOCUS => "No act at locus",
            Self::R302_NO_CONTINUATION => "No continuation declared",
            Self::R303_NO_ADDITIVE_CHOICE => "No additive branch chosen",
            Self::R401_BUDGET_EXHAUSTED => "Pair budget exhausted",
        }
    }

    /// Status a trace ending for this reason carries
    pub fn status(&self) -> TraceStatus {
        match self {
            Self::R101_ALL_BRANCHES_CLOSED => TraceStatus::Convergent,
            Self::R201_POLARITY_CLASH
            | Self::R202_EXPRESSION_MISMATCH
            | Self::R203_RAMIFICATION_MISMATCH
            | Self::R204_RAMIFICATION_NOT_SUBSET
            | Self::R205_ADDITIVE_MULTI_SELECT => TraceStatus::Divergent,
            Self::R301_NO_ACT_AT_LOCUS | Self::R302_NO_CONTINUATION | Self::R303_NO_ADDITIVE_CHOICE => {
                TraceStatus::Stuck
            }
            Self::R401_BUDGET_EXHAUSTED => TraceStatus::Ongoing,
        }
    }
}

impl std::fmt::Display for TraceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

// =============================================================================
// TESTS
// =============================================================================
