//! Error types for the ludics engine
//!
//! Every failure is structural and deterministic given the same input.
//! Budget exhaustion is not an error: it surfaces as an ONGOING trace.

use thiserror::Error;

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, LudicsError>;

/// All failures the engine can report
#[derive(Debug, Error)]
pub enum LudicsError {
    /// Malformed locus path (empty, non-numeric, not rooted at 0)
    #[error("invalid locus '{path}': {detail}")]
    InvalidLocus { path: String, detail: String },

    /// No act at or below the locus in the design
    #[error("locus {locus} not found in design {design_id}")]
    LocusNotFound { design_id: String, locus: String },

    /// Write at or below a locus closed by a daimon
    #[error("branch sealed: {locus} is at or below daimon at {sealed_at}")]
    SealedBranch { locus: String, sealed_at: String },

    /// A second act placed on an occupied locus
    #[error("locus {locus} already holds act {act_id}")]
    LocusOccupied { locus: String, act_id: String },

    /// Act placed outside its parent's ramification
    #[error("malformed tree at {locus}: {detail}")]
    MalformedTree { locus: String, detail: String },

    /// Masked locus re-bound with a different witness
    #[error("locus {locus} already instantiated with witness '{name}'")]
    AlreadyInstantiated { locus: String, name: String },

    /// Witness name unusable
    #[error("invalid witness name '{name}'")]
    InvalidWitness { name: String },

    /// Caller holds a stale design snapshot
    #[error("design {design_id} is at version {current}, caller expected {expected}")]
    DesignVersionMismatch {
        design_id: String,
        expected: u64,
        current: u64,
    },

    /// Unknown design id
    #[error("design {0} not found")]
    DesignNotFound(String),

    /// Dialogue move that cannot be compiled
    #[error("move {move_id}: {detail}")]
    InvalidMove { move_id: String, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LudicsError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidLocus { .. } => "INVALID_LOCUS",
            Self::LocusNotFound { .. } => "LOCUS_NOT_FOUND",
            Self::SealedBranch { .. } => "SEALED_BRANCH",
            Self::LocusOccupied { .. } => "LOCUS_OCCUPIED",
            Self::MalformedTree { .. } => "MALFORMED_TREE",
            Self::AlreadyInstantiated { .. } => "ALREADY_INSTANTIATED",
            Self::InvalidWitness { .. } => "INVALID_WITNESS",
            Self::DesignVersionMismatch { .. } => "DESIGN_VERSION_MISMATCH",
            Self::DesignNotFound(_) => "DESIGN_NOT_FOUND",
            Self::InvalidMove { .. } => "INVALID_MOVE",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    pub(crate) fn invalid_locus(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidLocus {
            path: path.into(),
            detail: detail.into(),
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
    fn test_codes_are_stable() {
        let err = LudicsError::SealedBranch {
            locus: "0.1.1".into(),
            sealed_at: "0.1".into(),
        };
        assert_eq!(err.code(), "SEALED_BRANCH");
        assert!(err.to_string().contains("0.1.1"));
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = LudicsError::DesignVersionMismatch {
            design_id: "legacy/P".into(),
            expected: 2,
            current: 3,
        };
        assert_eq!(err.code(), "DESIGN_VERSION_MISMATCH");
        assert_eq!(
            err.to_string(),
            "design legacy/P is at version 3, caller expected 2"
        );
    }
}
