//! Core modules for the interaction engine

pub mod api;
pub mod compiler;
pub mod engine;
pub mod equivalence;
pub mod fingerprint;
pub mod io;
pub mod locus_ops;
pub mod scoping;
pub mod stepper;
pub mod uniformity;

pub use api::{create_router, run_server};
pub use compiler::{compile, design_id};
pub use engine::{DesignVersionEvent, LudicsEngine, StepRequest};
pub use equivalence::{DefaultEquivalence, ExpressionEquivalence};
pub use fingerprint::{design_fingerprint, trace_fingerprint};
pub use io::{load_design, load_moves, save_design, save_json};
pub use locus_ops::{copy_locus, instantiate, CopyOutcome};
pub use stepper::{step, Stepper};
pub use uniformity::{check_uniform, normalize_subtree};
