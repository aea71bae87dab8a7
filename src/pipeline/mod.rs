//! Conversational turn pipeline.
//!
//! Stages run strictly in order, each bounded by its own timeout; the first
//! failure aborts the turn.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::{Pipeline, PipelineConfig, TurnOutcome};
pub use stage::{Stage, StageTimeouts, TurnTiming, run_stage};
