//! Session State
//!
//! The mutable record threaded through every phase. One instance per session;
//! phases execute strictly sequentially, so the state is exclusively owned by
//! its own run and needs no locking.

use serde::{Deserialize, Serialize};

use agent_core::message::{Role, Transcript};
use agent_core::provider::TokenUsage;
use agent_core::session::RepositoryDescriptor;

/// One planner-produced unit of work description.
///
/// Records are appended, exactly one per planner call, and never mutated;
/// together they form the append-only plan history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRecord {
    /// Raw plan text as generated (carries the Reasoning/Step clauses)
    pub raw: String,
}

impl StepRecord {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

/// Monotonically increasing usage account, reported to the caller at the end
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageTotals {
    /// Fold in one call's usage; never decreases
    pub fn add(&mut self, usage: TokenUsage) {
        self.input_tokens += usage.input_tokens;
        self.output_tokens += usage.output_tokens;
    }
}

/// Full orchestration state for one session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionState {
    /// The user's natural-language request
    pub query: String,

    /// Repositories this session may operate on
    pub codebase: Vec<RepositoryDescriptor>,

    /// Unique id keying workspace isolation and checkpointing
    pub session_id: String,

    /// The step text produced by the most recent planner call
    pub current_step: String,

    /// Append-only plan history, one record per planner call
    pub plans: Vec<StepRecord>,

    /// Durable step-action log fed back into every planner directive
    pub previous_steps_actions: Vec<String>,

    /// Executor iterations within the current planner round
    pub current_cycle: u32,

    /// Cycle budget for each executor run
    pub max_executor_cycles: u32,

    /// Final user-facing answer, set by chatbot or summarizer
    pub agent_response: String,

    /// Accumulated oracle cost across the whole session
    pub usage: UsageTotals,

    /// Per-step transcript driving the tool-calling loop;
    /// replaced wholesale at every planner entry
    pub executor_messages: Transcript,

    /// Durable audit log of every generated/tool message; never cleared
    pub evaluation_messages: Transcript,
}

impl SessionState {
    pub fn new(
        query: impl Into<String>,
        codebase: Vec<RepositoryDescriptor>,
        session_id: impl Into<String>,
        max_executor_cycles: u32,
    ) -> Self {
        Self {
            query: query.into(),
            codebase,
            session_id: session_id.into(),
            current_step: String::new(),
            plans: Vec::new(),
            previous_steps_actions: Vec::new(),
            current_cycle: 0,
            max_executor_cycles,
            agent_response: String::new(),
            usage: UsageTotals::default(),
            executor_messages: Transcript::new(),
            evaluation_messages: Transcript::new(),
        }
    }

    /// Render the full audit trail as a trajectory string for reporting.
    ///
    /// Directive and user-context entries are skipped; generated entries
    /// appear as `AI:` lines (with their tool calls when present) and tool
    /// results as `TOOL:` lines with their call ids.
    pub fn trajectory_string(&self) -> String {
        let mut entries = Vec::new();
        for msg in self.evaluation_messages.messages() {
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
                    entries.push(entry);
                }
                Role::Tool => {
                    let mut entry = format!("TOOL: {}", msg.content);
                    if let Some(id) = &msg.tool_call_id {
                        entry.push_str(&format!("\n  Tool Call ID: {}", id));
                    }
                    entries.push(entry);
                }
            }
        }
        entries.join("\n---\n")
    }
}

/// Compact rendering of a call payload for trajectory lines
pub(crate) fn render_tool_calls(calls: &[agent_core::ToolCall]) -> String {
    let rendered: Vec<serde_json::Value> = calls
        .iter()
        .map(|c| {
            serde_json::json!({
                "name": c.name,
                "arguments": c.arguments,
            })
        })
        .collect();
    serde_json::Value::Array(rendered).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::message::Message;
    use agent_core::provider::TokenUsage;

    #[test]
    fn test_usage_totals_accumulate() {
        let mut totals = UsageTotals::default();
        totals.add(TokenUsage::new(10, 5));
        totals.add(TokenUsage::new(3, 2));
        assert_eq!(totals.input_tokens, 13);
        assert_eq!(totals.output_tokens, 7);
    }

    #[test]
    fn test_trajectory_skips_directives() {
        let mut state = SessionState::new("q", Vec::new(), "s1", 2);
        state.evaluation_messages.push(Message::system("directive"));
        state.evaluation_messages.push(Message::user("q"));
        state.evaluation_messages.push(Message::assistant("thinking"));
        state.evaluation_messages.push(Message::tool("result", "id-9"));

        let trajectory = state.trajectory_string();
        assert!(!trajectory.contains("directive"));
        assert!(trajectory.contains("AI: thinking"));
        assert!(trajectory.contains("TOOL: result"));
        assert!(trajectory.contains("Tool Call ID: id-9"));
    }
}
