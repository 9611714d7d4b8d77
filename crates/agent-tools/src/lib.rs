//! Agent Tools
//!
//! The remediation capabilities the executor can dispatch: git operations,
//! file viewing and editing, codebase search, gcloud and Terraform command
//! execution, and cloud log retrieval. All of them operate inside the
//! session workspace and report failures as ordinary tool results.

use std::sync::Arc;

use agent_core::tool::ToolRegistry;

mod args;
mod paths;

pub mod files;
pub mod gcloud;
pub mod git;
pub mod github;
pub mod logs;
pub mod process;
pub mod search;
pub mod terraform;
pub mod workspace;

pub use files::{CreateFileTool, EditFileTool, ListDirectoryTool, ViewFileTool};
pub use gcloud::GcloudTool;
pub use git::{CloneRepositoryTool, PullRequestTool};
pub use github::{GithubApi, GithubClient};
pub use logs::RetrieveLogsTool;
pub use search::SearchTool;
pub use terraform::TerraformTool;
pub use workspace::{prepare_session_workspace, teardown_session_workspace};

/// Build a registry holding every remediation capability
pub fn full_registry(github: Arc<dyn GithubApi>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(CloneRepositoryTool::new(Arc::clone(&github)));
    registry.register(PullRequestTool::new(github));
    registry.register(ViewFileTool);
    registry.register(EditFileTool);
    registry.register(CreateFileTool);
    registry.register(ListDirectoryTool);
    registry.register(SearchTool);
    registry.register(GcloudTool);
    registry.register(TerraformTool);
    registry.register(RetrieveLogsTool);
    registry
}
