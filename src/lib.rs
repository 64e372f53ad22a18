//! Ludics: interaction engine for deliberation dialogues
//!
//! Moves → scoped sub-dialogues → per-participant designs → stepper → trace.
//! CLI and HTTP boundary sit on top of `core::LudicsEngine`.

pub mod config;
pub mod core;
pub mod error;
pub mod types;

pub use error::{LudicsError, Result};

// =============================================================================
// LOCI
// =============================================================================

/// Root locus of every design
pub const ROOT_LOCUS: &str = "0";

/// Response slot a Proper act opens when no ramification is given
pub const DEFAULT_RESPONSE_SLOT: u32 = 1;

// =============================================================================
// STEPPER BUDGET
// =============================================================================

/// Pairs emitted before a trace is reported ONGOING
pub const DEFAULT_MAX_PAIRS: usize = 1024;

/// Hard ceiling; requests above it are clamped
pub const MAX_PAIRS_LIMIT: usize = 100_000;

// =============================================================================
// ENGINE
// =============================================================================

/// Semantics tag stamped on compiled designs
pub const SEMANTICS_TAG: &str = "ludics-v1";

/// Traces memoized per engine before the cache is cleared
pub const TRACE_CACHE_CAPACITY: usize = 256;

/// Capacity of the design version broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.1.0";
