//! Argument Extraction
//!
//! Tool-call arguments arrive as a loose JSON map from the reasoning client.
//! These helpers pull typed values out with validation errors the client can
//! read back and correct.

#[cfg(test)]
use std::collections::HashMap;

use agent_core::error::{AgentError, Result};
use agent_core::tool::ToolCall;

pub(crate) fn require_str<'a>(call: &'a ToolCall, name: &str) -> Result<&'a str> {
    call.arguments
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AgentError::ToolValidation(format!("'{}' must be a string", name)))
}

pub(crate) fn opt_str<'a>(call: &'a ToolCall, name: &str) -> Option<&'a str> {
    call.arguments.get(name).and_then(|v| v.as_str())
}

/// Integer argument that tolerates the client sending it as a JSON string
pub(crate) fn opt_u64(call: &ToolCall, name: &str) -> Option<u64> {
    let value = call.arguments.get(name)?;
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

pub(crate) fn require_u64(call: &ToolCall, name: &str) -> Result<u64> {
    opt_u64(call, name)
        .ok_or_else(|| AgentError::ToolValidation(format!("'{}' must be a positive integer", name)))
}

#[cfg(test)]
pub(crate) fn args_from(pairs: &[(&str, serde_json::Value)]) -> HashMap<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_arguments_accept_string_form() {
        let call = ToolCall::new(
            "view_file",
            args_from(&[("start_line", json!("12")), ("end_line", json!(40))]),
        );
        assert_eq!(opt_u64(&call, "start_line"), Some(12));
        assert_eq!(opt_u64(&call, "end_line"), Some(40));
        assert_eq!(opt_u64(&call, "missing"), None);
    }

    #[test]
    fn test_require_str_rejects_non_strings() {
        let call = ToolCall::new("view_file", args_from(&[("file_path", json!(7))]));
        assert!(require_str(&call, "file_path").is_err());
    }
}
