//! Codebase Path Safety
//!
//! Every file-facing tool takes paths relative to the session's codebase
//! directory. Absolute paths and parent traversal are rejected before any
//! filesystem access happens.

use std::path::{Component, Path, PathBuf};

use agent_core::error::{AgentError, Result};
use agent_core::tool::ToolContext;

/// Resolve a client-supplied path inside the session codebase directory
pub(crate) fn resolve_in_codebase(ctx: &ToolContext, relative: &str) -> Result<PathBuf> {
    let path = Path::new(relative);
    if path.is_absolute() {
        return Err(AgentError::ToolValidation(format!(
            "'{}' is absolute; paths must be relative to the codebase",
            relative
        )));
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(AgentError::ToolValidation(format!(
                "'{}' traverses outside the codebase",
                relative
            )));
        }
    }
    Ok(ctx.codebase_dir().join(path))
}

/// Like `resolve_in_codebase`, but additionally requires the path to sit
/// inside one of the cloned repositories rather than at the codebase root.
pub(crate) fn resolve_in_repository(ctx: &ToolContext, relative: &str) -> Result<PathBuf> {
    let resolved = resolve_in_codebase(ctx, relative)?;

    let mut components = Path::new(relative).components();
    let Some(first) = components.next() else {
        return Err(AgentError::ToolValidation("path is empty".to_string()));
    };
    if components.next().is_none() {
        return Err(AgentError::ToolValidation(format!(
            "'{}' sits at the codebase root; files belong inside a cloned repository",
            relative
        )));
    }

    let repo_dir = ctx.codebase_dir().join(first);
    if !repo_dir.is_dir() {
        return Err(AgentError::ToolValidation(format!(
            "'{}' does not start with a cloned repository directory",
            relative
        )));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ctx(root: &Path) -> ToolContext {
        ToolContext {
            session_id: "s1".to_string(),
            workspace_root: root.to_path_buf(),
            codebase: Vec::new(),
            github: None,
            command_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_rejects_absolute_and_traversing_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        assert!(resolve_in_codebase(&ctx, "/etc/passwd").is_err());
        assert!(resolve_in_codebase(&ctx, "repo/../../escape").is_err());
        assert!(resolve_in_codebase(&ctx, "repo/src/main.py").is_ok());
    }

    #[test]
    fn test_repository_paths_must_start_with_a_cloned_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        std::fs::create_dir_all(ctx.codebase_dir().join("billing-svc")).unwrap();

        assert!(resolve_in_repository(&ctx, "billing-svc/src/new.py").is_ok());
        assert!(resolve_in_repository(&ctx, "unknown-repo/new.py").is_err());
        assert!(resolve_in_repository(&ctx, "loose_file.py").is_err());
    }
}
