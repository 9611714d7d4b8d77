//! File Tools
//!
//! Windowed viewing, in-place line-range edits, file creation, and directory
//! listing, all scoped to the session codebase directory.
//!
//! View windows are numbered relative to the window (1..n), with notes about
//! how many lines sit above and below, so the client can page through large
//! files without loading them whole.

use async_trait::async_trait;
use tokio::io::AsyncBufReadExt;

use agent_core::error::Result;
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::{opt_str, require_str, require_u64};
use crate::paths::{resolve_in_codebase, resolve_in_repository};

fn string_param(name: &str, description: &str, required: bool) -> ParameterSchema {
    ParameterSchema {
        name: name.to_string(),
        param_type: "string".to_string(),
        description: description.to_string(),
        required,
    }
}

fn integer_param(name: &str, description: &str, required: bool) -> ParameterSchema {
    ParameterSchema {
        name: name.to_string(),
        param_type: "integer".to_string(),
        description: description.to_string(),
        required,
    }
}

/// Read a window of lines from a file with above/below context notes
pub struct ViewFileTool;

#[async_trait]
impl Tool for ViewFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "view".to_string(),
            description: "Read a window of lines from a file, with notes about how many lines \
                          sit above and below the window. Paths are relative to the codebase \
                          root, e.g. 'repo/main.py'."
                .to_string(),
            parameters: vec![
                string_param("file_path", "Path to the file, relative to the codebase root", true),
                integer_param("starting_line", "First line to include (1-based, inclusive)", true),
                integer_param("ending_line", "Last line to include (1-based, inclusive)", true),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let file_path = require_str(call, "file_path")?;
        let starting_line = require_u64(call, "starting_line")? as usize;
        let ending_line = require_u64(call, "ending_line")? as usize;

        if starting_line < 1 {
            return Ok(ToolResult::failure(
                "view",
                "Starting line must be greater than 0",
            ));
        }

        let path = resolve_in_codebase(ctx, file_path)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                return Ok(ToolResult::failure(
                    "view",
                    format!("Could not read '{}': {}", file_path, e),
                ))
            }
        };

        let lines: Vec<&str> = contents.lines().collect();
        let end = ending_line.min(lines.len());
        let window: Vec<String> = lines
            .get(starting_line - 1..end)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}: {}", i + 1, line))
            .collect();

        let lines_above = starting_line - 1;
        let lines_below = lines.len().saturating_sub(ending_line);
        let output = format!(
            "There's {} lines above\n{}\n\nThere's {} lines below\n",
            lines_above,
            window.join("\n"),
            lines_below
        );
        Ok(ToolResult::success("view", output))
    }
}

/// Replace an inclusive 1-based line range with new code
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "edit".to_string(),
            description: "Replace the lines from starting_line to ending_line (inclusive) with \
                          new_code. Paths are relative to the codebase root."
                .to_string(),
            parameters: vec![
                string_param("file_path", "Path to the file, relative to the codebase root", true),
                string_param("new_code", "Code to insert in place of the replaced lines", true),
                integer_param("starting_line", "First line to replace (1-based, inclusive)", true),
                integer_param("ending_line", "Last line to replace (1-based, inclusive)", true),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let file_path = require_str(call, "file_path")?;
        let new_code = require_str(call, "new_code")?;
        let starting_line = require_u64(call, "starting_line")? as usize;
        let ending_line = require_u64(call, "ending_line")? as usize;

        if starting_line < 1 {
            return Ok(ToolResult::failure(
                "edit",
                "Error: Starting line must be greater than 0.",
            ));
        }

        let path = resolve_in_codebase(ctx, file_path)?;
        if !path.is_file() {
            return Ok(ToolResult::failure(
                "edit",
                format!("Error: File '{}' does not exist.", file_path),
            ));
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();

        let replacement = if new_code.ends_with('\n') {
            new_code.trim_end_matches('\n').to_string()
        } else {
            new_code.to_string()
        };

        // Replacing a range past EOF appends instead of failing, and a
        // reversed range inserts at starting_line without removing anything.
        let start = (starting_line - 1).min(lines.len());
        let end = ending_line.min(lines.len()).max(start);
        lines.splice(start..end, std::iter::once(replacement));

        let mut updated = lines.join("\n");
        updated.push('\n');
        tokio::fs::write(&path, updated).await?;

        tracing::info!(file = %file_path, starting_line, ending_line, "applied edit");
        Ok(ToolResult::success("edit", "File edited successfully"))
    }
}

/// Create a file inside one of the cloned repositories
pub struct CreateFileTool;

#[async_trait]
impl Tool for CreateFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_file".to_string(),
            description: "Create a file with the given content. The path must sit inside one \
                          of the cloned repositories, e.g. 'repo/newfile.py'; placement at the \
                          codebase root is rejected."
                .to_string(),
            parameters: vec![
                string_param("file_path", "Path to the new file, relative to the codebase root", true),
                string_param("content", "Content to write to the new file", true),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let file_path = require_str(call, "file_path")?;
        let content = require_str(call, "content")?;

        let path = match resolve_in_repository(ctx, file_path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::failure("create_file", e.to_string())),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::info!(file = %file_path, "created file");
        Ok(ToolResult::success(
            "create_file",
            format!("File created at {}", file_path),
        ))
    }
}

/// List a directory, reporting line counts for files
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_directory_contents".to_string(),
            description: "List the files and subdirectories of a directory. Files are reported \
                          with their line counts. Paths are relative to the codebase root; use \
                          '.' for the codebase root itself."
                .to_string(),
            parameters: vec![string_param(
                "dir_path",
                "Path to the directory, relative to the codebase root",
                false,
            )],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let dir_path = opt_str(call, "dir_path").unwrap_or(".");
        let path = resolve_in_codebase(ctx, dir_path)?;
        if !path.is_dir() {
            return Ok(ToolResult::failure(
                "list_directory_contents",
                format!("Directory '{}' not found.", dir_path),
            ));
        }

        let mut items = Vec::new();
        let mut entries = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_file() {
                // Binary or unreadable files are skipped, matching how a
                // human would scan a source tree.
                let Ok(file) = tokio::fs::File::open(entry.path()).await else {
                    continue;
                };
                let mut line_count = 0usize;
                let mut reader_lines = tokio::io::BufReader::new(file).lines();
                loop {
                    match reader_lines.next_line().await {
                        Ok(Some(_)) => line_count += 1,
                        Ok(None) => break,
                        Err(_) => {
                            line_count = 0;
                            break;
                        }
                    }
                }
                items.push(format!("{}, it has {} lines", name, line_count));
            } else {
                items.push(name);
            }
        }
        items.sort();

        Ok(ToolResult::success(
            "list_directory_contents",
            items.join("\n"),
        ))
    }
}
