//! Phase Directives
//!
//! Builders for the system directives each phase sends to the reasoning
//! client. Only the shape is load-bearing: the planner directive carries the
//! repository descriptors, the concatenated prior-step action log, and the
//! capability name list; the executor directive additionally carries the
//! current step.

use agent_core::session::RepositoryDescriptor;

/// Classification directive for the router. The response is matched against
/// the literal token `code`; anything else degrades to the chat path.
pub const ROUTER_PROMPT: &str = r#"You are a query router for a DevOps remediation agent.

Classify the user query into exactly one of two categories and answer with a
single word, nothing else:

- `code` - the query asks to investigate, diagnose, or fix something in the
  user's repositories or cloud infrastructure (errors, failing deployments,
  misconfigurations, log analysis, infrastructure changes).
- `chat` - anything else: greetings, general questions, requests that do not
  touch the codebase or infrastructure.
"#;

/// Directive for the conversational path
pub const CHATBOT_PROMPT: &str = r#"You are a helpful DevOps assistant. The user's query does not require touching
any repository or infrastructure; answer it conversationally and concisely.
If the user seems to want remediation work done, explain that they should
describe the problem and the affected repositories.
"#;

/// Build the planner directive for one planning round
pub fn planner_prompt(
    codebase: &[RepositoryDescriptor],
    previous_steps_actions: &str,
    tool_names: &[&str],
) -> String {
    format!(
        r#"You are the planner of a DevOps remediation agent. Your job is to decide the
SINGLE next step towards resolving the user's request, given what has already
been done.

Repositories available to the agent:
{codebase}

Tools the executor can use: {tools}

Rules:
- Produce exactly ONE next step, not a full plan.
- Always answer in the form: `Reasoning: <why this step> Step: <the step>`
- Start by cloning the relevant repository if it has not been cloned yet.
- Investigate before changing anything: view files, search, read logs.
- When the request is fully resolved (or cannot be progressed further),
  answer exactly: `Reasoning: <summary of why the work is complete> Step: done`

Previous steps and their outcomes:
{actions}
"#,
        codebase = render_codebase(codebase),
        tools = tool_names.join(", "),
        actions = if previous_steps_actions.trim().is_empty() {
            "(none yet)"
        } else {
            previous_steps_actions
        },
    )
}

/// Build the executor directive seeding one tool-calling round
pub fn executor_prompt(
    codebase: &[RepositoryDescriptor],
    tool_names: &[&str],
    previous_steps_actions: &str,
    current_step: &str,
) -> String {
    format!(
        r#"You are the executor of a DevOps remediation agent. Carry out the current
step using the available tools, then report what you found or changed.

Repositories available to the agent:
{codebase}

Tools available: {tools}

Previous steps and their outcomes:
{actions}

Current step to execute:
{step}

Call tools as needed to complete the step. When the step is complete, answer
with a short plain-text report and no further tool calls.
"#,
        codebase = render_codebase(codebase),
        tools = tool_names.join(", "),
        actions = if previous_steps_actions.trim().is_empty() {
            "(none yet)"
        } else {
            previous_steps_actions
        },
        step = current_step,
    )
}

/// Build the summarizer directive closing the session
pub fn summarizer_prompt(user_query: &str) -> String {
    format!(
        r#"You are summarizing a DevOps remediation session for the user.

The user's original request was:
{user_query}

You will receive the full log of planner steps and executor actions. Write a
clear, user-facing summary: what was investigated, what was found, what was
changed, and whether a pull request was opened. Do not mention internal tool
names or message formats.
"#
    )
}

/// User-query turn appended after every directive
pub fn user_query_message(query: &str) -> String {
    format!("User Query: {}\n", query)
}

fn render_codebase(codebase: &[RepositoryDescriptor]) -> String {
    if codebase.is_empty() {
        return "(none)".into();
    }
    codebase
        .iter()
        .map(|r| format!("- {} (branch: {})", r.repository_url, r.branch))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryDescriptor {
        RepositoryDescriptor {
            repository_url: "https://github.com/example/infra.git".into(),
            branch: "main".into(),
            githubapp_installation_id: None,
        }
    }

    #[test]
    fn test_planner_prompt_carries_context() {
        let prompt = planner_prompt(&[repo()], "STEP: cloned the repo", &["view", "edit"]);
        assert!(prompt.contains("https://github.com/example/infra.git"));
        assert!(prompt.contains("view, edit"));
        assert!(prompt.contains("STEP: cloned the repo"));
    }

    #[test]
    fn test_empty_history_renders_placeholder() {
        let prompt = planner_prompt(&[repo()], "  ", &["view"]);
        assert!(prompt.contains("(none yet)"));
    }
}
