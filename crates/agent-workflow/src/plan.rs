//! Plan Rendering
//!
//! Turns the raw planner step history into a markdown report. The planner's
//! free-text contract (`Reasoning: ... Step: ...`) is parsed leniently:
//! a missing clause renders as `N/A` instead of dropping the record.

use std::sync::OnceLock;

use regex::Regex;

use crate::state::StepRecord;

fn reasoning_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)reasoning\s*:\s*").expect("reasoning pattern is valid"))
}

fn step_head() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bstep\s*:").expect("step pattern is valid"))
}

fn step_clause() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bstep\s*:\s*([^\n]*)").expect("step pattern is valid"))
}

/// Extract the reasoning clause: the text after `Reasoning:` up to the first
/// newline or the `Step:` token, whichever comes first.
fn extract_reasoning(text: &str) -> Option<String> {
    let head = reasoning_head().find(text)?;
    let rest = &text[head.end()..];

    let mut end = rest.len();
    if let Some(newline) = rest.find('\n') {
        end = end.min(newline);
    }
    if let Some(step) = step_head().find(rest) {
        end = end.min(step.start());
    }
    Some(rest[..end].trim().to_string())
}

fn extract_step(text: &str) -> Option<String> {
    step_clause()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn render_record(record: &StepRecord) -> String {
    let text = record.raw.trim().replace("\\n", "\n").replace('\r', "");
    // A present-but-empty clause renders as-is; only an absent clause
    // falls back to N/A.
    let reasoning = extract_reasoning(&text).unwrap_or_else(|| "N/A".to_string());
    let step = extract_step(&text).unwrap_or_else(|| "N/A".to_string());
    format!("**Reasoning**: {}\n**Step**: {}", reasoning, step)
}

/// Render the full plan history as markdown, one block per planner step
pub fn format_plans_to_markdown(plans: &[StepRecord]) -> String {
    plans
        .iter()
        .map(render_record)
        .collect::<Vec<_>>()
        .join("\n\n")
}
