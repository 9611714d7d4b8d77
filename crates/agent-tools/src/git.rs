//! Git Tools
//!
//! Repository cloning and pull-request creation. Both authenticate through
//! the GitHub App installation configured for the target repository; the
//! remediation itself always lands on a dedicated `devops-agent-<ts>` branch
//! so the session never pushes to the user's base branch directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use agent_core::error::{AgentError, Result};
use agent_core::tool::{ParameterSchema, Tool, ToolCall, ToolContext, ToolResult, ToolSchema};

use crate::args::require_str;
use crate::github::GithubApi;
use crate::process::run_command;

fn string_param(name: &str, description: &str) -> ParameterSchema {
    ParameterSchema {
        name: name.to_string(),
        param_type: "string".to_string(),
        description: description.to_string(),
        required: true,
    }
}

/// Clone a configured repository and check out a fresh agent branch
pub struct CloneRepositoryTool {
    github: Arc<dyn GithubApi>,
}

impl CloneRepositoryTool {
    pub fn new(github: Arc<dyn GithubApi>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl Tool for CloneRepositoryTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "clone_repository".to_string(),
            description: "Clone one of the session's repositories into the codebase and check \
                          out a new hotfix branch. The URL must match a repository configured \
                          for this session."
                .to_string(),
            parameters: vec![
                string_param("repo_url", "HTTPS URL of the repository to clone"),
                string_param("branch", "Branch to clone, e.g. 'main'"),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let repo_url = require_str(call, "repo_url")?;
        let branch = require_str(call, "branch")?;

        let Some(descriptor) = ctx.find_repository(|r| r.repository_url == repo_url) else {
            return Ok(ToolResult::failure(
                "clone_repository",
                "No matching repository found in the codebase.",
            ));
        };
        let repo_name = descriptor.name().to_string();

        if ctx.codebase_dir().join(&repo_name).exists() {
            return Ok(ToolResult::failure(
                "clone_repository",
                format!(
                    "Repository {} already exists in the codebase. Please delete the existing \
                     clone before running this tool.",
                    repo_name
                ),
            ));
        }

        let Some(installation_id) = descriptor.githubapp_installation_id else {
            return Ok(ToolResult::failure(
                "clone_repository",
                "No GitHub App installation is configured for this repository.",
            ));
        };
        let creds = ctx.github.as_ref().ok_or_else(|| {
            AgentError::Auth("GitHub App credentials are not configured".to_string())
        })?;
        let token = self.github.installation_token(creds, installation_id).await?;

        let authed_url = repo_url.replacen(
            "https://",
            &format!("https://x-access-token:{}@", token),
            1,
        );
        let clone = run_command(
            "git",
            &["clone", "--branch", branch, &authed_url],
            &ctx.codebase_dir(),
            &HashMap::new(),
            ctx.command_timeout,
        )
        .await?;
        if !clone.success {
            return Ok(ToolResult::failure(
                "clone_repository",
                format!("git clone failed: {}", clone.stderr),
            ));
        }

        let agent_branch = format!("devops-agent-{}", chrono::Utc::now().timestamp());
        let checkout = run_command(
            "git",
            &["checkout", "-b", &agent_branch],
            &ctx.codebase_dir().join(&repo_name),
            &HashMap::new(),
            ctx.command_timeout,
        )
        .await?;
        if !checkout.success {
            return Ok(ToolResult::failure(
                "clone_repository",
                format!("git checkout failed: {}", checkout.stderr),
            ));
        }

        tracing::info!(repo = %repo_name, branch = %agent_branch, "cloned repository");
        Ok(ToolResult::success(
            "clone_repository",
            format!(
                "Repository {} cloned successfully and branch {} checked out.",
                repo_name, agent_branch
            ),
        ))
    }
}

/// Commit, push the agent branch, and open a pull request
pub struct PullRequestTool {
    github: Arc<dyn GithubApi>,
}

impl PullRequestTool {
    pub fn new(github: Arc<dyn GithubApi>) -> Self {
        Self { github }
    }

    async fn git(&self, ctx: &ToolContext, repo_name: &str, args: &[&str]) -> Result<crate::process::CommandOutput> {
        run_command(
            "git",
            args,
            &ctx.codebase_dir().join(repo_name),
            &HashMap::new(),
            ctx.command_timeout,
        )
        .await
    }
}

#[async_trait]
impl Tool for PullRequestTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "create_pull_request".to_string(),
            description: "Commit all changes in the named repository, push the agent branch, \
                          and open a pull request against the repository's configured base \
                          branch."
                .to_string(),
            parameters: vec![
                string_param("repo_name", "Name of the changed repository (a folder in the codebase)"),
                string_param("pr_title", "Title for the pull request"),
                string_param("pr_body", "Body explaining the problem and the provided fix"),
            ],
        }
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult> {
        let repo_name = require_str(call, "repo_name")?;
        let pr_title = require_str(call, "pr_title")?;
        let pr_body = require_str(call, "pr_body")?;

        let Some(descriptor) =
            ctx.find_repository(|r| r.repository_url.contains(repo_name)).cloned()
        else {
            return Ok(ToolResult::failure(
                "create_pull_request",
                "Repository not found in codebase.",
            ));
        };
        let Some(installation_id) = descriptor.githubapp_installation_id else {
            return Ok(ToolResult::failure(
                "create_pull_request",
                "No GitHub App installation is configured for this repository.",
            ));
        };
        let Some(full_name) = descriptor.full_name() else {
            return Ok(ToolResult::failure(
                "create_pull_request",
                "Repository URL is not a github.com repository.",
            ));
        };
        let creds = ctx.github.as_ref().ok_or_else(|| {
            AgentError::Auth("GitHub App credentials are not configured".to_string())
        })?;
        let token = self.github.installation_token(creds, installation_id).await?;

        let branch_out = self.git(ctx, repo_name, &["branch", "--show-current"]).await?;
        let agent_branch = branch_out.stdout.trim().to_string();
        if agent_branch.is_empty() {
            return Ok(ToolResult::failure(
                "create_pull_request",
                format!("Could not determine the working branch: {}", branch_out.stderr),
            ));
        }

        self.git(ctx, repo_name, &["add", "-A"]).await?;
        // An empty commit set is not fatal; the branch may already carry
        // the changes from an earlier attempt.
        let commit = self.git(ctx, repo_name, &["commit", "-m", pr_title]).await?;
        if !commit.success {
            tracing::info!(repo = %repo_name, output = %commit.combined(), "git commit made no changes");
        }

        let push = self
            .git(ctx, repo_name, &["push", "--set-upstream", "origin", &agent_branch])
            .await?;
        if !push.success {
            let force = self
                .git(ctx, repo_name, &["push", "--force", "origin", &agent_branch])
                .await?;
            if !force.success {
                return Ok(ToolResult::failure(
                    "create_pull_request",
                    format!("git push failed: {}", force.stderr),
                ));
            }
        }

        self.github
            .close_matching_pull(&full_name, &token, &agent_branch, &descriptor.branch)
            .await?;
        let pr_url = self
            .github
            .create_pull(
                &full_name,
                &token,
                pr_title,
                pr_body,
                &agent_branch,
                &descriptor.branch,
            )
            .await?;

        tracing::info!(repo = %repo_name, url = %pr_url, "pull request created");
        Ok(ToolResult::success(
            "create_pull_request",
            format!("Pull Request created: {}", pr_url),
        ))
    }
}
