//! gcloud Command Execution
//!
//! Runs a client-supplied gcloud command under the session's service-account
//! key. The key is activated first and the project is pinned from the key
//! file, so the command can never land on a default or inherited project.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use agent_core::error::{AgentError, Result};
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::require_str;
use crate::process::run_shell;

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: String,
}

/// Read the session's service-account key and return its project id
pub(crate) async fn session_project_id(ctx: &ToolContext) -> Result<String> {
    let raw = tokio::fs::read_to_string(ctx.sa_key_path())
        .await
        .map_err(|e| {
            AgentError::Workspace(format!("service-account key is not available: {}", e))
        })?;
    let key: ServiceAccountKey = serde_json::from_str(&raw)
        .map_err(|e| AgentError::Workspace(format!("malformed service-account key: {}", e)))?;
    Ok(key.project_id)
}

/// Environment for gcloud/terraform subprocesses: credentials bound to the
/// session key.
pub(crate) fn credential_env(ctx: &ToolContext) -> HashMap<String, String> {
    HashMap::from([(
        "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
        ctx.sa_key_path().to_string_lossy().into_owned(),
    )])
}

/// Activate the session service account for the gcloud CLI
pub(crate) async fn activate_service_account(ctx: &ToolContext) -> Result<()> {
    let command = format!(
        "gcloud auth activate-service-account --key-file={}",
        ctx.sa_key_path().display()
    );
    let output = run_shell(
        &command,
        &ctx.session_dir(),
        &credential_env(ctx),
        ctx.command_timeout,
    )
    .await?;
    if !output.success {
        return Err(AgentError::Auth(format!(
            "Error authenticating with service account: {}",
            output.stderr
        )));
    }
    Ok(())
}

pub struct GcloudTool;

#[async_trait]
impl Tool for GcloudTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "run_gcloud_command".to_string(),
            description: "Execute a gcloud command against the session's Google Cloud project, \
                          e.g. 'gcloud compute instances list'. The command must start with \
                          'gcloud'; the project flag is added automatically."
                .to_string(),
            parameters: vec![ParameterSchema {
                name: "command".to_string(),
                param_type: "string".to_string(),
                description: "The gcloud command to execute".to_string(),
                required: true,
            }],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let command = require_str(call, "command")?;

        if command.split_whitespace().next() != Some("gcloud") {
            return Ok(ToolResult::failure(
                "run_gcloud_command",
                format!("Error: gcloud command not found in the command: {}", command),
            ));
        }

        let project_id = session_project_id(ctx).await?;
        activate_service_account(ctx).await?;

        let full_command = format!("{} --project={}", command, project_id);
        tracing::info!(command = %full_command, "running gcloud command");
        let output = run_shell(
            &full_command,
            &ctx.session_dir(),
            &credential_env(ctx),
            ctx.command_timeout,
        )
        .await?;

        if output.success {
            Ok(ToolResult::success("run_gcloud_command", output.stdout))
        } else {
            Ok(ToolResult::failure("run_gcloud_command", output.combined()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::args_from;
    use serde_json::json;
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
    async fn test_rejects_non_gcloud_commands() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());

        let call = ToolCall::new(
            "run_gcloud_command",
            args_from(&[("command", json!("rm -rf /"))]),
        );
        let result = GcloudTool.execute(&call, &ctx).await.unwrap();
        assert!(!result.success);
        assert!(result.output.contains("gcloud command not found"));
    }

    #[tokio::test]
    async fn test_project_id_comes_from_session_key() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        tokio::fs::create_dir_all(ctx.session_dir()).await.unwrap();
        tokio::fs::write(
            ctx.sa_key_path(),
            r#"{"type": "service_account", "project_id": "acme-prod"}"#,
        )
        .await
        .unwrap();

        assert_eq!(session_project_id(&ctx).await.unwrap(), "acme-prod");
    }

    #[tokio::test]
    async fn test_missing_key_is_a_workspace_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = ctx(tmp.path());
        let err = session_project_id(&ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::Workspace(_)));
    }
}
