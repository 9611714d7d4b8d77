//! Workflow Driver
//!
//! Sequences the phases of one session as a small state machine and
//! checkpoints the session after every phase. A hard transition ceiling
//! bounds every session regardless of oracle behavior.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use agent_core::error::{AgentError, Result};
use agent_core::provider::LlmProvider;
use agent_core::tool::{ToolContext, ToolRegistry};

use crate::checkpoint::CheckpointStore;
use crate::phases::{ExecutorOutcome, PhaseRunner, PlannerDecision, Route, WorkflowConfig};
use crate::state::SessionState;

/// The phases of the orchestration state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Router,
    Chatbot,
    Planner,
    Executor,
    Tools,
    PrePlanner,
    Summarizer,
    Final,
}

/// Drives one session from router to final phase
pub struct Workflow {
    phases: PhaseRunner,
    store: Arc<dyn CheckpointStore>,
}

impl Workflow {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: WorkflowConfig,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            phases: PhaseRunner::new(provider, tools, config),
            store,
        }
    }

    /// Run a session to completion.
    ///
    /// Every phase transition counts toward the recursion limit; exceeding
    /// it aborts the session with `AgentError::RecursionLimit`. The state
    /// is checkpointed after each phase, so a failed session still leaves
    /// its last consistent snapshot behind.
    pub async fn run(
        &self,
        state: &mut SessionState,
        ctx: &ToolContext,
        cancel: CancellationToken,
    ) -> Result<()> {
        let limit = self.phases.config().recursion_limit;
        let mut phase = Phase::Router;
        let mut transitions = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            transitions += 1;
            if transitions > limit {
                tracing::warn!(limit, "phase transition ceiling exceeded");
                return Err(AgentError::RecursionLimit(limit));
            }
            tracing::debug!(?phase, transitions, "executing phase");

            let next = match phase {
                Phase::Router => match self.phases.route(state, &cancel).await? {
                    Route::Task => Phase::Planner,
                    Route::Conversational => Phase::Chatbot,
                },
                Phase::Chatbot => {
                    self.phases.chatbot(state, &cancel).await?;
                    Phase::Final
                }
                Phase::Planner => {
                    self.phases.planner(state, &cancel).await?;
                    match self.phases.planner_decision(state) {
                        PlannerDecision::Execute => Phase::Executor,
                        PlannerDecision::Complete => Phase::Summarizer,
                    }
                }
                Phase::Executor => match self.phases.executor(state, &cancel).await? {
                    ExecutorOutcome::Act => Phase::Tools,
                    ExecutorOutcome::Exit => Phase::PrePlanner,
                },
                Phase::Tools => {
                    self.phases.dispatch_tools(state, ctx, &cancel).await?;
                    Phase::Executor
                }
                Phase::PrePlanner => {
                    self.phases.preplanner(state);
                    Phase::Planner
                }
                Phase::Summarizer => {
                    self.phases.summarizer(state, &cancel).await?;
                    Phase::Final
                }
                Phase::Final => {
                    self.phases.finalize(state);
                    self.store.save(state)?;
                    return Ok(());
                }
            };

            self.store.save(state)?;
            phase = next;
        }
    }
}
