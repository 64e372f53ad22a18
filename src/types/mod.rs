//! Core types for the ludics engine

mod act;
mod design;
mod locus;
mod moves;
mod output;
mod reason;
mod scope;
mod trace;
mod uniformity;

pub use act::{Act, ActKind, Participant, Polarity};
pub use design::{Design, DesignRef, Instantiation};
pub use locus::Locus;
pub use moves::{DialogueMove, MoveKind, MovePayload, ProtoAct, ProtoPolarity, RamificationEntry, TargetRef};
pub use output::{pair_lines, StepOutput};
pub use reason::TraceReason;
pub use scope::{CompileOutput, CompiledScope, ScopeActors, ScopeMetadata, ScopingStrategy};
pub use trace::{CompositionMode, DaimonClosure, DaimonHint, Phase, Trace, TracePair, TraceStatus};
pub use uniformity::{Counterexample, NormalizedAct, UniformityReason, UniformityResult};
