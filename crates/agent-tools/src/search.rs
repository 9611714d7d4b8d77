//! Codebase Search
//!
//! Recursive literal grep over the session codebase. The query goes to grep
//! as a single argument, so no shell quoting or escaping applies.

use std::collections::HashMap;

use async_trait::async_trait;

use agent_core::error::Result;
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::require_str;
use crate::process::run_command;

pub struct SearchTool;

#[async_trait]
impl Tool for SearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search".to_string(),
            description: "Recursively search all files in the codebase for a text or code \
                          fragment. Matches are listed as 'filename:line_number:matched_line'. \
                          Notebook files are excluded."
                .to_string(),
            parameters: vec![ParameterSchema {
                name: "query".to_string(),
                param_type: "string".to_string(),
                description: "Text or code snippet to search for".to_string(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let query = require_str(call, "query")?;

        let output = run_command(
            "grep",
            &["-rn", "--exclude=*.ipynb", "--", query, "."],
            &ctx.codebase_dir(),
            &HashMap::new(),
            ctx.command_timeout,
        )
        .await?;

        // grep exits 1 on zero matches; that is an ordinary empty result.
        if output.stdout.is_empty() && !output.stderr.is_empty() {
            return Ok(ToolResult::failure("search", output.stderr));
        }
        Ok(ToolResult::success("search", output.stdout))
    }
}
