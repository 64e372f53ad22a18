//! Engine configuration
//!
//! Loaded from a JSON file; any missing field falls back to the defaults
//! in `lib.rs`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::types::{CompositionMode, Phase, ScopingStrategy};
use crate::{DEFAULT_MAX_PAIRS, MAX_PAIRS_LIMIT, TRACE_CACHE_CAPACITY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_max_pairs: usize,
    /// Requests above this are clamped
    pub max_pairs_limit: usize,
    pub default_mode: CompositionMode,
    pub default_phase: Phase,
    pub default_strategy: ScopingStrategy,
    /// 0 disables the trace cache
    pub trace_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_pairs: DEFAULT_MAX_PAIRS,
            max_pairs_limit: MAX_PAIRS_LIMIT,
            default_mode: CompositionMode::default(),
            default_phase: Phase::default(),
            default_strategy: ScopingStrategy::default(),
            trace_cache_capacity: TRACE_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        debug!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    /// Load if a path is given, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Budget for a request: explicit value or default, never above the limit
    pub fn effective_max_pairs(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_max_pairs)
            .min(self.max_pairs_limit)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"default_mode": "partial"}"#).unwrap();
        assert_eq!(config.default_mode, CompositionMode::Partial);
        assert_eq!(config.default_max_pairs, DEFAULT_MAX_PAIRS);
        assert_eq!(config.default_phase, Phase::Neutral);
    }

    #[test]
    fn test_max_pairs_clamped() {
        let config = EngineConfig {
            max_pairs_limit: 10,
            ..EngineConfig::default()
        };
        assert_eq!(config.effective_max_pairs(Some(50)), 10);
        assert_eq!(config.effective_max_pairs(Some(3)), 3);
        assert_eq!(config.effective_max_pairs(None), 10);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"default_strategy": "actor-pair", "trace_cache_capacity": 0}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.default_strategy, ScopingStrategy::ActorPair);
        assert_eq!(config.trace_cache_capacity, 0);

        let path = file.into_temp_path();
        let gone = path.to_path_buf();
        path.close().unwrap();
        assert!(EngineConfig::load(&gone).is_err());
    }
}
