//! Agent Workflow
//!
//! The orchestration state machine for remediation sessions: router,
//! planner/executor loop with tool dispatch, preplanner distillation,
//! and summarization, with per-phase checkpointing.

pub mod checkpoint;
pub mod graph;
pub mod phases;
pub mod plan;
pub mod prompts;
pub mod state;

pub use checkpoint::{CheckpointStore, MemoryCheckpointStore};
pub use graph::{Phase, Workflow};
pub use phases::{
    is_completion_signal, ExecutorOutcome, PhaseRunner, PlannerDecision, Route, WorkflowConfig,
    IDLE_RESPONSE,
};
pub use plan::format_plans_to_markdown;
pub use state::{SessionState, StepRecord, UsageTotals};
