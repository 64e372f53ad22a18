//! Engine facade: design store, version counters, trace cache
//!
//! Designs are stored as `Arc<Design>` snapshots keyed by id. Every change
//! to a stored design raises its version and is announced on a broadcast
//! channel. Steps run against snapshots and are memoized by content.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::core::compiler;
use crate::core::fingerprint::design_fingerprint;
use crate::core::locus_ops::{self, CopyOutcome};
use crate::core::stepper::Stepper;
use crate::core::uniformity;
use crate::error::{LudicsError, Result};
use crate::types::{
    CompileOutput, CompositionMode, Design, DesignRef, DialogueMove, Locus, Phase, ScopingStrategy, Trace,
    UniformityResult,
};
use crate::EVENT_CHANNEL_CAPACITY;

/// Pushed whenever a stored design gets a new version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignVersionEvent {
    pub design_id: String,
    pub version: u64,
    /// compile | copy | instantiate | insert
    pub cause: String,
    pub at: DateTime<Utc>,
}

/// Step two stored designs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRequest {
    pub pos_design_id: String,
    pub neg_design_id: String,
    #[serde(default)]
    pub mode: Option<CompositionMode>,
    #[serde(default)]
    pub phase: Option<Phase>,
    #[serde(default)]
    pub max_pairs: Option<usize>,
    /// Fail with a version mismatch unless the stored design is at this version
    #[serde(default)]
    pub pos_version: Option<u64>,
    #[serde(default)]
    pub neg_version: Option<u64>,
}

impl StepRequest {
    pub fn new(pos_design_id: impl Into<String>, neg_design_id: impl Into<String>) -> Self {
        Self {
            pos_design_id: pos_design_id.into(),
            neg_design_id: neg_design_id.into(),
            mode: None,
            phase: None,
            max_pairs: None,
            pos_version: None,
            neg_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    pos: String,
    neg: String,
    mode: CompositionMode,
    phase: Phase,
    max_pairs: usize,
}

#[derive(Debug, Clone)]
struct Stored {
    design: Arc<Design>,
    fingerprint: String,
}

pub struct LudicsEngine {
    config: EngineConfig,
    designs: HashMap<String, Stored>,
    traces: Mutex<HashMap<CacheKey, Trace>>,
    events: broadcast::Sender<DesignVersionEvent>,
}

impl Default for LudicsEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl LudicsEngine {
    pub fn new(config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            designs: HashMap::new(),
            traces: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sender half of the version channel, for subscribers outside the engine
    pub fn events(&self) -> broadcast::Sender<DesignVersionEvent> {
        self.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DesignVersionEvent> {
        self.events.subscribe()
    }

    pub fn design(&self, id: &str) -> Option<Arc<Design>> {
        self.designs.get(id).map(|s| Arc::clone(&s.design))
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }

    /// Number of memoized traces
    pub fn cached_traces(&self) -> usize {
        self.traces.lock().map(|c| c.len()).unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Compilation
    // -------------------------------------------------------------------------

    /// Compile a move feed and store every resulting design
    ///
    /// A recompiled design keeps its version when its content is unchanged,
    /// otherwise it gets the stored version + 1.
    pub fn compile(&mut self, moves: &[DialogueMove], strategy: Option<ScopingStrategy>) -> Result<CompileOutput> {
        let strategy = strategy.unwrap_or(self.config.default_strategy);
        let mut output = compiler::compile(moves, strategy)?;

        for scope in &mut output.scopes {
            for design in [&mut scope.proponent_design, &mut scope.opponent_design] {
                let stored = self.store(design.clone(), "compile");
                *design = stored.as_ref().clone();
            }
        }

        info!(
            strategy = %strategy,
            moves = moves.len(),
            scopes = output.scopes.len(),
            "compiled move feed"
        );
        Ok(output)
    }

    /// Store a design built elsewhere (file, API body)
    pub fn insert_design(&mut self, design: Design) -> DesignRef {
        self.store(design, "insert").reference()
    }

    fn store(&mut self, mut design: Design, cause: &str) -> Arc<Design> {
        let fingerprint = design_fingerprint(&design);
        let id = design.id().to_string();

        if let Some(existing) = self.designs.get(&id) {
            if existing.fingerprint == fingerprint {
                debug!(design = %id, version = existing.design.version(), "design unchanged");
                return Arc::clone(&existing.design);
            }
            let next = design.version().max(existing.design.version() + 1);
            design.set_version(next);
        }

        let design = Arc::new(design);
        self.designs.insert(
            id,
            Stored {
                design: Arc::clone(&design),
                fingerprint,
            },
        );
        self.announce(&design, cause);
        design
    }

    fn announce(&self, design: &Design, cause: &str) {
        debug!(design = %design.id(), version = design.version(), cause, "design version");
        // no subscribers is fine
        let _ = self.events.send(DesignVersionEvent {
            design_id: design.id().to_string(),
            version: design.version(),
            cause: cause.to_string(),
            at: Utc::now(),
        });
    }

    fn fetch(&self, id: &str, expected: Option<u64>) -> Result<&Stored> {
        let stored = self
            .designs
            .get(id)
            .ok_or_else(|| LudicsError::DesignNotFound(id.to_string()))?;
        if let Some(expected) = expected {
            let current = stored.design.version();
            if expected != current {
                warn!(design = %id, expected, current, "stale design version");
                return Err(LudicsError::DesignVersionMismatch {
                    design_id: id.to_string(),
                    expected,
                    current,
                });
            }
        }
        Ok(stored)
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    pub fn step(&self, request: &StepRequest) -> Result<Trace> {
        let pos = self.fetch(&request.pos_design_id, request.pos_version)?;
        let neg = self.fetch(&request.neg_design_id, request.neg_version)?;

        let mode = request.mode.unwrap_or(self.config.default_mode);
        let phase = request.phase.unwrap_or(self.config.default_phase);
        let max_pairs = self.config.effective_max_pairs(request.max_pairs);

        let key = CacheKey {
            pos: pos.fingerprint.clone(),
            neg: neg.fingerprint.clone(),
            mode,
            phase,
            max_pairs,
        };

        if let Some(hit) = self.cached(&key) {
            // versions may have moved while content stayed the same
            let mut trace = hit;
            trace.pos_design = pos.design.reference();
            trace.neg_design = neg.design.reference();
            debug!(pos = %request.pos_design_id, neg = %request.neg_design_id, "trace cache hit");
            return Ok(trace);
        }

        let trace = Stepper::new(mode)
            .phase(phase)
            .max_pairs(max_pairs)
            .run(&pos.design, &neg.design);

        info!(
            pos = %request.pos_design_id,
            neg = %request.neg_design_id,
            status = %trace.status,
            pairs = trace.pairs.len(),
            "stepped"
        );

        self.remember(key, &trace);
        Ok(trace)
    }

    fn cached(&self, key: &CacheKey) -> Option<Trace> {
        self.traces.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: CacheKey, trace: &Trace) {
        let capacity = self.config.trace_cache_capacity;
        if capacity == 0 {
            return;
        }
        if let Ok(mut cache) = self.traces.lock() {
            if cache.len() >= capacity {
                debug!(capacity, "trace cache full, clearing");
                cache.clear();
            }
            cache.insert(key, trace.clone());
        }
    }

    /// True when either design moved past the version the trace was taken at
    pub fn is_stale(&self, trace: &Trace) -> bool {
        [&trace.pos_design, &trace.neg_design].iter().any(|r| {
            self.designs
                .get(&r.id)
                .map(|s| s.design.version() != r.version)
                .unwrap_or(true)
        })
    }

    // -------------------------------------------------------------------------
    // Locus operations
    // -------------------------------------------------------------------------

    pub fn copy_locus(
        &mut self,
        design_id: &str,
        base: &Locus,
        count: usize,
        expected_version: Option<u64>,
    ) -> Result<CopyOutcome> {
        let current = Arc::clone(&self.fetch(design_id, expected_version)?.design);
        let mut outcome = locus_ops::copy_locus(&current, base, count)?;
        if outcome.children.is_empty() {
            return Ok(outcome);
        }
        let stored = self.store(outcome.design, "copy");
        outcome.design = stored.as_ref().clone();
        Ok(outcome)
    }

    pub fn instantiate(
        &mut self,
        design_id: &str,
        base: &Locus,
        name: &str,
        mask: bool,
        expected_version: Option<u64>,
    ) -> Result<DesignRef> {
        let current = Arc::clone(&self.fetch(design_id, expected_version)?.design);
        let next = locus_ops::instantiate(&current, base, name, mask)?;
        Ok(self.store(next, "instantiate").reference())
    }

    pub fn check_uniformity(
        &self,
        design_id: &str,
        base: &Locus,
        child_a: &Locus,
        child_b: &Locus,
    ) -> Result<UniformityResult> {
        let stored = self.fetch(design_id, None)?;
        uniformity::check_uniform(&stored.design, base, child_a, child_b)
    }
}

// =============================================================================
// TESTS
// =============================================================================
