//! End-to-end workflow tests against a scripted reasoning client.
//!
//! Each test drives the full state machine with a fixed response script and
//! asserts on the resulting session state: transcripts, plan history, tool
//! invocation counts, and usage totals.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use agent_core::error::{AgentError, Result};
use agent_core::message::{Message, Role};
use agent_core::provider::{Completion, GenerationOptions, LlmProvider, TokenUsage};
use agent_core::tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult, ToolSchema};
use agent_workflow::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use agent_workflow::graph::Workflow;
use agent_workflow::phases::{WorkflowConfig, IDLE_RESPONSE};
use agent_workflow::state::SessionState;

/// Returns canned completions in order; every response costs 10/5 tokens
/// unless built with `text_unmetered`.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Completion>>,
    oracle_calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(responses: Vec<Completion>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            oracle_calls: AtomicUsize::new(0),
        }
    }

    fn calls_made(&self) -> usize {
        self.oracle_calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Result<Completion> {
        self.oracle_calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".to_string()))
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        self.next()
    }

    async fn complete_with_tools(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
        _tools: &[ToolSchema],
    ) -> Result<Completion> {
        self.next()
    }
}

fn text(content: &str) -> Completion {
    Completion {
        content: content.to_string(),
        model: "scripted".to_string(),
        tool_calls: Vec::new(),
        usage: Some(TokenUsage::new(10, 5)),
    }
}

fn text_unmetered(content: &str) -> Completion {
    Completion {
        usage: None,
        ..text(content)
    }
}

fn with_calls(content: &str, calls: Vec<ToolCall>) -> Completion {
    Completion {
        tool_calls: calls,
        ..text(content)
    }
}

fn probe_call(args: &[(&str, &str)]) -> ToolCall {
    let arguments: HashMap<String, serde_json::Value> = args
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::String((*v).to_string())))
        .collect();
    ToolCall::new("run_probe", arguments)
}

/// Counts invocations; always succeeds
struct ProbeTool {
    hits: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for ProbeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "run_probe".to_string(),
            description: "Probe a service endpoint".to_string(),
            parameters: Vec::new(),
        }
    }

    async fn execute(&self, _call: &ToolCall, _ctx: &ToolContext) -> Result<ToolResult> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::success("run_probe", "probe ok"))
    }
}

struct Harness {
    provider: Arc<ScriptedProvider>,
    store: Arc<MemoryCheckpointStore>,
    workflow: Workflow,
    ctx: ToolContext,
    probe_hits: Arc<AtomicUsize>,
}

fn harness(responses: Vec<Completion>, config: WorkflowConfig) -> Harness {
    let provider = Arc::new(ScriptedProvider::new(responses));
    let probe_hits = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(ProbeTool {
        hits: Arc::clone(&probe_hits),
    });
    let store = Arc::new(MemoryCheckpointStore::new());
    let workflow = Workflow::new(
        Arc::clone(&provider) as Arc<dyn LlmProvider>,
        Arc::new(registry),
        config,
        Arc::clone(&store) as Arc<dyn CheckpointStore>,
    );
    let ctx = ToolContext {
        session_id: "test-session".to_string(),
        workspace_root: PathBuf::from("/tmp/agent-workflow-tests"),
        codebase: Vec::new(),
        github: None,
        command_timeout: Duration::from_secs(5),
    };
    Harness {
        provider,
        store,
        workflow,
        ctx,
        probe_hits,
    }
}

fn fast_config(max_executor_cycles: u32) -> WorkflowConfig {
    WorkflowConfig {
        max_executor_cycles,
        executor_cooldown: Duration::ZERO,
        ..WorkflowConfig::default()
    }
}

fn new_state(query: &str, max_executor_cycles: u32) -> SessionState {
    SessionState::new(query, Vec::new(), "test-session", max_executor_cycles)
}

#[tokio::test]
async fn test_conversational_path_answers_directly() {
    let h = harness(
        vec![text("chat"), text("Kubernetes schedules pods onto nodes.")],
        fast_config(2),
    );
    let mut state = new_state("what does the scheduler do?", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.agent_response, "Kubernetes schedules pods onto nodes.");
    assert!(state.plans.is_empty());
    assert_eq!(h.probe_hits.load(Ordering::SeqCst), 0);
    assert_eq!(h.provider.calls_made(), 2);
}

#[tokio::test]
async fn test_malformed_router_decision_degrades_to_chat() {
    let h = harness(
        vec![
            text("I believe this is a code-related request"),
            text("Happy to help."),
        ],
        fast_config(2),
    );
    let mut state = new_state("fix the deployment", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.agent_response, "Happy to help.");
    assert!(state.plans.is_empty());
}

#[tokio::test]
async fn test_executor_bounded_by_cycle_budget() {
    let h = harness(
        vec![
            text("code"),
            text("Reasoning: the service is failing Step: probe the endpoints"),
            with_calls("checking the first endpoint", vec![probe_call(&[("host", "api")])]),
            with_calls("checking the second endpoint", vec![probe_call(&[("host", "db")])]),
            text("Reasoning: both endpoints responded Step: done"),
            text("Both endpoints are healthy."),
        ],
        fast_config(2),
    );
    let mut state = new_state("probe the endpoints", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    // Two oracle-backed cycles ran, then the budget forced an idle exit
    // without a third invocation.
    assert_eq!(h.probe_hits.load(Ordering::SeqCst), 2);
    assert_eq!(h.provider.calls_made(), 6);
    assert_eq!(state.agent_response, "Both endpoints are healthy.");
    assert_eq!(state.plans.len(), 2);

    let idle_count = state
        .evaluation_messages
        .messages()
        .iter()
        .filter(|m| m.content == IDLE_RESPONSE)
        .count();
    assert_eq!(idle_count, 1);
}

#[tokio::test]
async fn test_planner_replaces_executor_transcript() {
    let h = harness(
        vec![
            text("code"),
            text("Reasoning: inspect first Step: probe the service"),
            with_calls("probing", vec![probe_call(&[("host", "api")])]),
            with_calls("probing again", vec![probe_call(&[("host", "db")])]),
            text("Reasoning: all checks passed Step: done"),
            text("Everything checks out."),
        ],
        fast_config(2),
    );
    let mut state = new_state("check the service", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    // The second planner call reseeded the transcript: directive plus user
    // context only, with the first round's messages gone.
    assert_eq!(state.executor_messages.len(), 2);
    assert_eq!(state.executor_messages.messages()[0].role, Role::System);
    assert_eq!(state.executor_messages.messages()[1].role, Role::User);

    // The audit log kept everything, tool results included.
    let tool_messages = state
        .evaluation_messages
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .count();
    assert_eq!(tool_messages, 2);

    // The distilled trajectory survives in the durable step-action log.
    assert!(state
        .previous_steps_actions
        .iter()
        .any(|entry| entry.starts_with("Executor Actions: \n")));
}

#[tokio::test]
async fn test_stagnation_cuts_round_short() {
    // Budget of five, but the oracle repeats the same call payload; ids
    // differ, the name and arguments do not.
    let h = harness(
        vec![
            text("code"),
            text("Reasoning: restart it Step: probe the api"),
            with_calls("probing", vec![probe_call(&[("host", "api")])]),
            with_calls("probing once more", vec![probe_call(&[("host", "api")])]),
            text("Reasoning: no progress possible Step: done"),
            text("The probe kept repeating; stopped early."),
        ],
        fast_config(5),
    );
    let mut state = new_state("probe the api", 5);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    // The repeated call was never dispatched.
    assert_eq!(h.probe_hits.load(Ordering::SeqCst), 1);
    assert_eq!(h.provider.calls_made(), 6);
    assert!(state
        .evaluation_messages
        .messages()
        .iter()
        .any(|m| m.content == IDLE_RESPONSE));
}

#[tokio::test]
async fn test_usage_totals_are_the_exact_sum() {
    // Five metered responses at 10/5 each plus one with no usage metadata,
    // which counts as zero.
    let h = harness(
        vec![
            text("code"),
            text("Reasoning: look around Step: probe the host"),
            with_calls("probing", vec![probe_call(&[("host", "api")])]),
            text_unmetered("nothing more to do"),
            text("Reasoning: finished Step: done"),
            text("All set."),
        ],
        fast_config(2),
    );
    let mut state = new_state("probe the host", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.usage.input_tokens, 50);
    assert_eq!(state.usage.output_tokens, 25);
}

#[tokio::test]
async fn test_every_tool_call_gets_a_correlated_result() {
    // One executor response requesting two calls: one for a tool that does
    // not exist and one real. Both must yield correlated results.
    let missing = ToolCall::new("no_such_tool", HashMap::new());
    let missing_id = missing.id.clone();
    let probe = probe_call(&[("host", "api")]);
    let probe_id = probe.id.clone();

    let h = harness(
        vec![
            text("code"),
            text("Reasoning: try both Step: gather data"),
            with_calls("running both", vec![missing, probe]),
            text("that covers it"),
            text("Reasoning: gathered Step: done"),
            text("Gathered what was available."),
        ],
        fast_config(3),
    );
    let mut state = new_state("gather data", 3);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    let results: Vec<&Message> = state
        .evaluation_messages
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].tool_call_id.as_deref(), Some(missing_id.as_str()));
    assert!(results[0].content.contains("Tool not found: no_such_tool"));
    assert_eq!(results[1].tool_call_id.as_deref(), Some(probe_id.as_str()));
    assert_eq!(results[1].content, "probe ok");
    assert_eq!(h.probe_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recursion_limit_aborts_runaway_session() {
    // A planner that never signals done with an executor that never calls
    // tools loops planner -> executor -> preplanner forever.
    let responses = std::iter::once(text("code"))
        .chain((0..10).flat_map(|_| {
            vec![
                text("Reasoning: still looking Step: keep probing"),
                text("nothing found yet"),
            ]
        }))
        .collect();
    let h = harness(
        responses,
        WorkflowConfig {
            max_executor_cycles: 2,
            executor_cooldown: Duration::ZERO,
            recursion_limit: 6,
            ..WorkflowConfig::default()
        },
    );
    let mut state = new_state("keep probing", 2);

    let err = h
        .workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::RecursionLimit(6)));
}

#[tokio::test]
async fn test_cancellation_stops_the_session() {
    let h = harness(
        vec![
            text("code"),
            text("Reasoning: begin Step: probe the host"),
            with_calls("probing", vec![probe_call(&[("host", "api")])]),
        ],
        fast_config(2),
    );
    let mut state = new_state("probe the host", 2);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .workflow
        .run(&mut state, &h.ctx, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Cancelled));
    assert_eq!(h.provider.calls_made(), 0);
}

/// Answers plain completions from a script but never resolves a tool-bound
/// one, pinning the session inside the executor's oracle call.
struct StallingProvider {
    responses: Mutex<VecDeque<Completion>>,
}

#[async_trait]
impl LlmProvider for StallingProvider {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
    ) -> Result<Completion> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AgentError::Provider("script exhausted".to_string()))
    }

    async fn complete_with_tools(
        &self,
        _messages: &[Message],
        _options: &GenerationOptions,
        _tools: &[ToolSchema],
    ) -> Result<Completion> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_cancellation_interrupts_in_flight_oracle_call() {
    let provider = Arc::new(StallingProvider {
        responses: Mutex::new(
            vec![
                text("code"),
                text("Reasoning: the pod is crash-looping Step: inspect the deployment"),
            ]
            .into_iter()
            .collect(),
        ),
    });
    let workflow = Workflow::new(
        provider as Arc<dyn LlmProvider>,
        Arc::new(ToolRegistry::new()),
        fast_config(2),
        Arc::new(MemoryCheckpointStore::new()) as Arc<dyn CheckpointStore>,
    );
    let ctx = ToolContext {
        session_id: "test-session".to_string(),
        workspace_root: PathBuf::from("/tmp/agent-workflow-tests"),
        codebase: Vec::new(),
        github: None,
        command_timeout: Duration::from_secs(5),
    };
    let mut state = new_state("inspect the deployment", 2);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    // The run must unblock promptly even though the oracle call never returns.
    let run = tokio::time::timeout(
        Duration::from_secs(2),
        workflow.run(&mut state, &ctx, cancel),
    )
    .await
    .expect("cancellation must interrupt the in-flight oracle call");
    assert!(matches!(run.unwrap_err(), AgentError::Cancelled));
}

#[tokio::test]
async fn test_checkpoint_holds_final_state() {
    let h = harness(
        vec![text("chat"), text("Done talking.")],
        fast_config(2),
    );
    let mut state = new_state("just chatting", 2);

    h.workflow
        .run(&mut state, &h.ctx, CancellationToken::new())
        .await
        .unwrap();

    let snapshot = h.store.load("test-session").unwrap().unwrap();
    assert_eq!(snapshot.agent_response, "Done talking.");
    assert_eq!(snapshot.usage, state.usage);
}
