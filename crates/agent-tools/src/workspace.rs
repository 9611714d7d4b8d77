//! Session Workspace Lifecycle
//!
//! Each session gets an isolated directory holding its cloned repositories
//! and service-account key. The service layer prepares the workspace before
//! a session runs and tears it down afterwards, keys included.

use std::collections::HashMap;

use agent_core::error::{AgentError, Result};
use agent_core::tool::ToolContext;

use crate::process::run_command;

/// Create the session directory tree and place the service-account key.
///
/// The key source may be a `gs://` object (fetched via the gcloud CLI), an
/// HTTP(S) URL, or a local file path.
pub async fn prepare_session_workspace(ctx: &ToolContext, sa_key_source: Option<&str>) -> Result<()> {
    tokio::fs::create_dir_all(ctx.codebase_dir()).await?;
    if let Some(source) = sa_key_source {
        fetch_sa_key(ctx, source).await?;
    }
    tracing::info!(session_id = %ctx.session_id, "prepared session workspace");
    Ok(())
}

async fn fetch_sa_key(ctx: &ToolContext, source: &str) -> Result<()> {
    let dest = ctx.sa_key_path();
    if source.starts_with("gs://") {
        let dest_str = dest.to_string_lossy().into_owned();
        let output = run_command(
            "gcloud",
            &["storage", "cp", source, &dest_str],
            &ctx.session_dir(),
            &HashMap::new(),
            ctx.command_timeout,
        )
        .await?;
        if !output.success {
            return Err(AgentError::Workspace(format!(
                "failed to fetch service-account key from {}: {}",
                source, output.stderr
            )));
        }
    } else if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source).await.map_err(|e| {
            AgentError::Workspace(format!("failed to download service-account key: {}", e))
        })?;
        if !response.status().is_success() {
            return Err(AgentError::Workspace(format!(
                "service-account key download returned {}",
                response.status()
            )));
        }
        let bytes = response.bytes().await.map_err(|e| {
            AgentError::Workspace(format!("failed to download service-account key: {}", e))
        })?;
        tokio::fs::write(&dest, bytes).await?;
    } else {
        tokio::fs::copy(source, &dest).await.map_err(|e| {
            AgentError::Workspace(format!(
                "failed to copy service-account key from {}: {}",
                source, e
            ))
        })?;
    }
    Ok(())
}

/// Remove the whole session directory, credentials included
pub async fn teardown_session_workspace(ctx: &ToolContext) -> Result<()> {
    let dir = ctx.session_dir();
    if dir.exists() {
        tokio::fs::remove_dir_all(&dir).await?;
        tracing::info!(session_id = %ctx.session_id, "removed session workspace");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ctx(root: &std::path::Path) -> ToolContext {
        ToolContext {
            session_id: "s1".to_string(),
            workspace_root: root.to_path_buf(),
            codebase: Vec::new(),
            github: None,
            command_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_prepare_creates_codebase_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        prepare_session_workspace(&ctx, None).await.unwrap();
        assert!(ctx.codebase_dir().is_dir());
    }

    #[tokio::test]
    async fn test_local_key_source_is_copied() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        let key_src = tmp.path().join("key.json");
        tokio::fs::write(&key_src, r#"{"project_id": "p"}"#).await.unwrap();

        prepare_session_workspace(&ctx, Some(key_src.to_str().unwrap()))
            .await
            .unwrap();
        assert!(ctx.sa_key_path().is_file());
    }

    #[tokio::test]
    async fn test_teardown_removes_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        prepare_session_workspace(&ctx, None).await.unwrap();
        tokio::fs::write(ctx.sa_key_path(), "secret").await.unwrap();

        teardown_session_workspace(&ctx).await.unwrap();
        assert!(!ctx.session_dir().exists());
    }

    #[tokio::test]
    async fn test_teardown_of_missing_workspace_is_a_noop() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        teardown_session_workspace(&ctx).await.unwrap();
    }
}
