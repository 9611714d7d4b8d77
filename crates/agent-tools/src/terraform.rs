//! Terraform Command Execution
//!
//! Read-only Terraform subset. The allowlist gate runs before anything is
//! spawned; `apply` and friends never reach a subprocess. `init` must carry
//! a backend config so plans read the real remote state.

use async_trait::async_trait;

use agent_core::error::Result;
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::require_str;
use crate::gcloud::credential_env;
use crate::paths::resolve_in_codebase;
use crate::process::run_shell;

const ALLOWED_OPERATIONS: [&str; 6] = ["init", "plan", "validate", "fmt", "show", "state list"];

fn validate_command(terraform_command: &str) -> std::result::Result<(), String> {
    // Compound command lines would smuggle a second operation past the
    // allowlist through the shell.
    if terraform_command.contains(';')
        || terraform_command.contains('&')
        || terraform_command.contains('|')
        || terraform_command.contains('`')
        || terraform_command.contains('$')
        || terraform_command.contains('\n')
    {
        return Err(
            "Shell control characters are not allowed in the terraform command".to_string(),
        );
    }
    let allowed = ALLOWED_OPERATIONS
        .iter()
        .any(|op| terraform_command.contains(op));
    let is_apply = terraform_command.split_whitespace().nth(1) == Some("apply");
    if !allowed || is_apply {
        return Err(format!(
            "The operation in your command is not valid. Valid operations: {:?}",
            ALLOWED_OPERATIONS
        ));
    }
    if terraform_command.contains("init") && !terraform_command.contains("-backend-config") {
        return Err(
            "To use init command you should always provide backend config file to get the state"
                .to_string(),
        );
    }
    Ok(())
}

pub struct TerraformTool;

#[async_trait]
impl Tool for TerraformTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "terraform_command_executor".to_string(),
            description: "Run a read-only Terraform command (init, plan, validate, fmt, show, \
                          state list) in a directory of the codebase. 'apply' is not permitted. \
                          Run 'terraform init' with a backend config before other commands."
                .to_string(),
            parameters: vec![
                ParameterSchema {
                    name: "terraform_command".to_string(),
                    param_type: "string".to_string(),
                    description: "The Terraform command to run, e.g. 'terraform plan'".to_string(),
                    required: true,
                },
                ParameterSchema {
                    name: "dir_execution".to_string(),
                    param_type: "string".to_string(),
                    description: "Directory (relative to the codebase root) to run in, e.g. 'repo/infra'"
                        .to_string(),
                    required: true,
                },
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let terraform_command = require_str(call, "terraform_command")?;
        let dir_execution = require_str(call, "dir_execution")?;

        if let Err(reason) = validate_command(terraform_command) {
            return Ok(ToolResult::failure("terraform_command_executor", reason));
        }

        let dir = resolve_in_codebase(ctx, dir_execution)?;
        if !dir.is_dir() {
            return Ok(ToolResult::failure(
                "terraform_command_executor",
                format!("Directory '{}' not found in the codebase.", dir_execution),
            ));
        }

        tracing::info!(command = %terraform_command, dir = %dir_execution, "running terraform command");
        let output = run_shell(
            terraform_command,
            &dir,
            &credential_env(ctx),
            ctx.command_timeout,
        )
        .await?;

        let report = serde_json::json!({
            "success": output.success,
            "stdout": output.stdout,
            "stderr": output.stderr,
        })
        .to_string();
        if output.success {
            Ok(ToolResult::success("terraform_command_executor", report))
        } else {
            Ok(ToolResult::failure("terraform_command_executor", report))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_admits_read_only_operations() {
        assert!(validate_command("terraform plan").is_ok());
        assert!(validate_command("terraform validate").is_ok());
        assert!(validate_command("terraform state list").is_ok());
        assert!(validate_command("terraform init -backend-config=backend.hcl").is_ok());
    }

    #[test]
    fn test_apply_is_rejected() {
        assert!(validate_command("terraform apply").is_err());
        assert!(validate_command("terraform apply -auto-approve").is_err());
        assert!(validate_command("terraform destroy").is_err());
    }

    #[test]
    fn test_init_requires_backend_config() {
        let err = validate_command("terraform init").unwrap_err();
        assert!(err.contains("backend config"));
    }

    #[test]
    fn test_compound_command_lines_are_rejected() {
        assert!(validate_command("terraform plan && terraform apply").is_err());
        assert!(validate_command("terraform plan; terraform apply").is_err());
        assert!(validate_command("terraform show | tee /tmp/out").is_err());
        assert!(validate_command("terraform plan $(id)").is_err());
    }
}
