//! Replay engine — execution clock, state classification, scripted replay.
//!
//! Per feed event:
//! 1. Clock: validate ordering, advance the execution position
//! 2. Classify: derive the seven bar-state flags
//! 3. Rollback: discard the prior revision's per-bar state on re-entry
//! 4. Handler: invoke user logic with bar + flags + scoped context
//! 5. Commit: make per-bar state permanent on confirmed revisions

pub mod classifier;
pub mod clock;
pub mod handles;
pub mod runner;
pub mod scope;

pub use classifier::{classify, BarState};
pub use clock::{ExecutionClock, ExecutionPosition, SequenceError};
pub use handles::{Drawing, DrawingBoard, HandleId, HandleRing};
pub use runner::{
    FaultRecord, HandlerCtx, HandlerError, ReplayError, RunSummary, RunnerConfig, ScriptRunner,
    StateRecord, UpdateHandler,
};
pub use scope::{ScopedVars, Value, VarScope};
