//! Workflow Phases
//!
//! One method per phase of the orchestration state machine. Phases mutate the
//! `SessionState` they are handed and report which transition to take next;
//! the driver in `graph.rs` sequences them.
//!
//! The executor phase is the tool-calling sub-loop: it is bounded by the
//! session's cycle budget and by stagnation detection, and both bounds are
//! normal exits, never errors.

use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use agent_core::error::{AgentError, Result};
use agent_core::message::{Message, Role};
use agent_core::provider::{Completion, GenerationOptions, LlmProvider};
use agent_core::tool::{same_call_payload, ToolContext, ToolRegistry, ToolSchema};

use crate::prompts;
use crate::state::{render_tool_calls, SessionState, StepRecord};

/// Fixed idle response emitted on budget and stagnation exits
pub const IDLE_RESPONSE: &str = "Alright, What do you think?";

/// Tuning knobs for one workflow run
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Executor cycle budget per planner round
    pub max_executor_cycles: u32,

    /// Cooldown between executor oracle invocations (rate limiting)
    pub executor_cooldown: Duration,

    /// Hard ceiling on phase transitions per session
    pub recursion_limit: usize,

    /// Generation options for every oracle call
    pub generation: GenerationOptions,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_executor_cycles: 2,
            executor_cooldown: Duration::from_secs(10),
            recursion_limit: 25,
            generation: GenerationOptions::default(),
        }
    }
}

/// Router output: which path the session takes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// Task-execution path (planner loop)
    Task,
    /// Conversational path (single chat response)
    Conversational,
}

/// Planner output: continue executing or close the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlannerDecision {
    Execute,
    Complete,
}

/// Executor output: dispatch the requested tools or yield to the preplanner
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutorOutcome {
    Act,
    Exit,
}

/// Parse the completion signal out of a planner step.
///
/// The step text must be exactly `Reasoning: <text> Step: done`
/// (case-insensitive, reasoning non-greedy up to the `Step:` token).
/// A step that merely mentions "done" elsewhere does not match.
pub fn is_completion_signal(step_text: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"(?is)^reasoning:\s*.+?\s*step:\s*done$").expect("completion pattern is valid")
    });
    re.is_match(step_text.trim())
}

/// Executes the individual phases against one session's state
pub struct PhaseRunner {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: WorkflowConfig,
}

impl PhaseRunner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    fn sorted_tool_names(&self) -> Vec<&str> {
        let mut names = self.tools.names();
        names.sort_unstable();
        names
    }

    /// One oracle invocation, abandoned the moment the session is cancelled
    async fn oracle(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
    ) -> Result<Completion> {
        tokio::select! {
            () = cancel.cancelled() => Err(AgentError::Cancelled),
            completion = self.provider.complete(messages, &self.config.generation) => completion,
        }
    }

    async fn oracle_with_tools(
        &self,
        cancel: &CancellationToken,
        messages: &[Message],
        schemas: &[ToolSchema],
    ) -> Result<Completion> {
        tokio::select! {
            () = cancel.cancelled() => Err(AgentError::Cancelled),
            completion = self
                .provider
                .complete_with_tools(messages, &self.config.generation, schemas) => completion,
        }
    }

    /// One-shot classification of the query. Not revisited; a malformed or
    /// failed classification degrades to the conversational path.
    /// Cancellation is the one error that still aborts the session.
    pub async fn route(&self, state: &mut SessionState, cancel: &CancellationToken) -> Result<Route> {
        tracing::info!("entering router phase");
        let messages = [
            Message::system(prompts::ROUTER_PROMPT),
            Message::user(prompts::user_query_message(&state.query)),
        ];

        match self.oracle(cancel, &messages).await {
            Ok(completion) => {
                state.usage.add(completion.usage_or_zero());
                let decision = completion.content.trim().to_lowercase();
                tracing::info!(%decision, "router decision");
                if decision == "code" {
                    Ok(Route::Task)
                } else {
                    Ok(Route::Conversational)
                }
            }
            Err(AgentError::Cancelled) => Err(AgentError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "router call failed, taking conversational path");
                Ok(Route::Conversational)
            }
        }
    }

    /// Conversational path: a single chat response
    pub async fn chatbot(&self, state: &mut SessionState, cancel: &CancellationToken) -> Result<()> {
        tracing::info!("entering chatbot phase");
        let messages = [
            Message::system(prompts::CHATBOT_PROMPT),
            Message::user(prompts::user_query_message(&state.query)),
        ];
        let completion = self.oracle(cancel, &messages).await?;
        state.usage.add(completion.usage_or_zero());
        state.agent_response = completion.content;
        Ok(())
    }

    /// Produce exactly one next step and seed a fresh executor transcript.
    ///
    /// Appends one StepRecord, replaces the executor transcript wholesale,
    /// and resets the cycle counter.
    pub async fn planner(&self, state: &mut SessionState, cancel: &CancellationToken) -> Result<()> {
        tracing::info!("entering planner phase");
        let tool_names = self.sorted_tool_names();
        let prior_actions = state.previous_steps_actions.join("\n");

        let directive = prompts::planner_prompt(&state.codebase, &prior_actions, &tool_names);
        let messages = [
            Message::system(directive),
            Message::user(prompts::user_query_message(&state.query)),
        ];
        let completion = self.oracle(cancel, &messages).await?;
        state.usage.add(completion.usage_or_zero());

        let step_text = completion.content;
        tracing::info!(step = %step_text, "current task");

        let executor_directive =
            prompts::executor_prompt(&state.codebase, &tool_names, &prior_actions, &step_text);
        state.executor_messages.replace(vec![
            Message::system(executor_directive),
            Message::user(prompts::user_query_message(&state.query)),
        ]);

        state
            .previous_steps_actions
            .push(format!("STEP: \n{}", step_text));
        state.plans.push(StepRecord::new(&step_text));
        state.current_step = step_text;
        state.current_cycle = 0;
        Ok(())
    }

    /// Decide global completion from the step text just produced
    pub fn planner_decision(&self, state: &SessionState) -> PlannerDecision {
        tracing::info!("making planner decision");
        let step = state.current_step.trim().to_lowercase();
        if is_completion_signal(&step) {
            return PlannerDecision::Complete;
        }
        if step.contains("done") {
            // Observability for the fragile free-text contract: the oracle
            // said "done" somewhere but not in the completion form.
            tracing::info!(step = %state.current_step, "step mentions 'done' without matching the completion signal");
        }
        PlannerDecision::Execute
    }

    /// One executor iteration: budget check, oracle invocation with the tool
    /// registry bound, stagnation check, transcript append, cooldown.
    pub async fn executor(
        &self,
        state: &mut SessionState,
        cancel: &CancellationToken,
    ) -> Result<ExecutorOutcome> {
        tracing::info!(
            cycle = state.current_cycle,
            budget = state.max_executor_cycles,
            "entering executor phase"
        );

        if state.current_cycle >= state.max_executor_cycles {
            tracing::info!("cycle budget reached, yielding to preplanner");
            self.push_idle(state);
            return Ok(ExecutorOutcome::Exit);
        }

        let schemas = self.tools.schemas();
        let completion = self
            .oracle_with_tools(cancel, state.executor_messages.messages(), &schemas)
            .await?;
        state.usage.add(completion.usage_or_zero());

        // Degenerate-oracle signal: the same call payload twice in a row.
        // The response is discarded (its usage already accounted) and the
        // round ends exactly as a budget exit does.
        if state.executor_messages.len() > 2 && completion.has_tool_calls() {
            if let Some(previous) = state.executor_messages.last_assistant() {
                if same_call_payload(&previous.tool_calls, &completion.tool_calls) {
                    tracing::info!("same call payload twice in a row, yielding to preplanner");
                    self.push_idle(state);
                    return Ok(ExecutorOutcome::Exit);
                }
            }
        }

        tracing::debug!(thought = %completion.content, calls = completion.tool_calls.len(), "executor response");
        let message = Message::assistant_with_calls(completion.content, completion.tool_calls);
        let has_calls = message.has_tool_calls();
        state.executor_messages.push(message.clone());
        state.evaluation_messages.push(message);
        state.current_cycle += 1;

        if !has_calls {
            return Ok(ExecutorOutcome::Exit);
        }

        // Rate-limit the oracle before the next invocation
        tokio::select! {
            () = cancel.cancelled() => return Err(AgentError::Cancelled),
            () = tokio::time::sleep(self.config.executor_cooldown) => {}
        }
        Ok(ExecutorOutcome::Act)
    }

    fn push_idle(&self, state: &mut SessionState) {
        let idle = Message::assistant(IDLE_RESPONSE);
        state.executor_messages.push(idle.clone());
        state.evaluation_messages.push(idle);
        state.current_cycle += 1;
    }

    /// Resolve and run every tool call from the last executor message.
    ///
    /// Calls run sequentially in call order; each yields exactly one
    /// correlated result message, failures included.
    pub async fn dispatch_tools(
        &self,
        state: &mut SessionState,
        ctx: &ToolContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        tracing::info!("entering tool dispatch phase");
        let calls = state
            .executor_messages
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        for call in &calls {
            tracing::info!(tool = %call.name, call_id = %call.id, "dispatching tool call");
            let result = tokio::select! {
                () = cancel.cancelled() => return Err(AgentError::Cancelled),
                result = self.tools.dispatch(call, ctx) => result,
            };
            let message = Message::tool(result.output, result.id);
            state.executor_messages.push(message.clone());
            state.evaluation_messages.push(message);
        }
        Ok(())
    }

    /// Distill the finished executor transcript into one trajectory block
    /// appended to the durable step-action history.
    pub fn preplanner(&self, state: &mut SessionState) {
        tracing::info!("entering preplanner phase");
        let mut trajectory = vec!["Executor Actions: \n".to_string()];
        for msg in state.executor_messages.messages() {
            match msg.role {
                Role::System | Role::User => continue,
                Role::Assistant => {
                    let mut entry = format!("AI: {}", msg.content);
                    if msg.has_tool_calls() {
                        entry.push_str(&format!(
                            "\n  Tool Calls: {}",
                            render_tool_calls(&msg.tool_calls)
                        ));
                    }
                    trajectory.push(entry);
                }
                Role::Tool => {
                    let mut entry = format!("TOOL RESPONSE: {}", msg.content);
                    if let Some(id) = &msg.tool_call_id {
                        entry.push_str(&format!("\n  Tool Call ID: {}", id));
                    }
                    trajectory.push(entry);
                }
            }
        }
        state.previous_steps_actions.push(trajectory.join("\n---\n"));
    }

    /// Produce the final user-facing answer from the step-action history
    pub async fn summarizer(&self, state: &mut SessionState, cancel: &CancellationToken) -> Result<()> {
        tracing::info!("entering summarizer phase");
        let messages = [
            Message::system(prompts::summarizer_prompt(&state.query)),
            Message::user(format!(
                "Planner Actions and Decisions:\n{}\n",
                state.previous_steps_actions.join("\n")
            )),
        ];
        let completion = self.oracle(cancel, &messages).await?;
        state.usage.add(completion.usage_or_zero());
        state.agent_response = completion.content;
        Ok(())
    }

    /// End-of-session bookkeeping. Workspace and credential cleanup belong
    /// to the service layer; this phase is the sink for both paths.
    pub fn finalize(&self, state: &SessionState) {
        tracing::info!(
            session_id = %state.session_id,
            input_tokens = state.usage.input_tokens,
            output_tokens = state.usage.output_tokens,
            "entering final phase"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_signal_matches_done_step() {
        assert!(is_completion_signal("Reasoning: all fixed Step: done"));
        assert!(is_completion_signal("Reasoning: all fixed step: DONE"));
        assert!(is_completion_signal("reasoning: multi\nline rationale step: done"));
    }

    #[test]
    fn test_completion_signal_requires_reasoning_clause() {
        assert!(!is_completion_signal("Step: done"));
        assert!(!is_completion_signal("done"));
    }

    #[test]
    fn test_completion_signal_rejects_ordinary_steps() {
        assert!(!is_completion_signal("Reasoning: needs more info Step: edit file X"));
        // Mentioning "done" elsewhere is not a completion signal
        assert!(!is_completion_signal(
            "Reasoning: the fix is done Step: open a pull request"
        ));
        assert!(!is_completion_signal(
            "Reasoning: almost Step: done and then verify"
        ));
    }
}
