//! Tool System
//!
//! Extensible tool framework for agent capabilities. Tools are registered at
//! startup and resolved by name at dispatch time; an unknown name produces an
//! explicit failure result rather than an error. Every dispatched call yields
//! exactly one result correlated by call id, including on execution failure.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::session::{GithubAppCredentials, RepositoryDescriptor};

/// Tool call request emitted by the reasoning client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Opaque call identifier used to correlate the result
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    /// Create a call with a fresh identifier
    pub fn new(name: impl Into<String>, arguments: HashMap<String, serde_json::Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            arguments,
        }
    }

    /// Structural equality by name and argument map, ignoring the call id.
    /// Argument maps compare order-insensitively.
    pub fn same_invocation(&self, other: &ToolCall) -> bool {
        self.name == other.name && self.arguments == other.arguments
    }
}

/// Structural equality over whole call payloads, used for stagnation detection
pub fn same_call_payload(a: &[ToolCall], b: &[ToolCall]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_invocation(y))
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call id this result answers
    pub id: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: false,
            output: error.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to the reasoning client)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

/// Ambient session context injected into every tool invocation.
///
/// Tools never receive this from the reasoning client; the orchestrator
/// supplies it at dispatch time.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Session identifier, used for workspace isolation
    pub session_id: String,

    /// Root under which per-session workspaces live
    pub workspace_root: PathBuf,

    /// Repository descriptors for this session
    pub codebase: Vec<RepositoryDescriptor>,

    /// GitHub App credentials, if configured
    pub github: Option<GithubAppCredentials>,

    /// Wall-clock bound on any shell-level action
    pub command_timeout: Duration,
}

impl ToolContext {
    /// This session's private directory
    pub fn session_dir(&self) -> PathBuf {
        self.workspace_root.join(&self.session_id)
    }

    /// Directory holding the cloned repositories
    pub fn codebase_dir(&self) -> PathBuf {
        self.session_dir().join("codebase")
    }

    /// Location of the session's service-account key
    pub fn sa_key_path(&self) -> PathBuf {
        self.session_dir().join("sa_key.json")
    }

    /// Find the descriptor whose repository URL matches the predicate
    pub fn find_repository<F>(&self, pred: F) -> Option<&RepositoryDescriptor>
    where
        F: Fn(&RepositoryDescriptor) -> bool,
    {
        self.codebase.iter().find(|r| pred(r))
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with given arguments and ambient session context
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolResult>;

    /// Validate arguments before execution (optional)
    fn validate(&self, call: &ToolCall) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(AgentError::ToolValidation(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// Registry for available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let schema = tool.schema();
        self.tools.insert(schema.name.clone(), Arc::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Dispatch a tool call, always producing a correlated result.
    ///
    /// Unknown names, validation failures, and execution errors are all
    /// captured as failure results; nothing is silently dropped.
    pub async fn dispatch(&self, call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(&call.name) else {
            return ToolResult::failure(&call.name, format!("Tool not found: {}", call.name))
                .with_id(&call.id);
        };

        if let Err(e) = tool.validate(call) {
            return ToolResult::failure(&call.name, e.to_string()).with_id(&call.id);
        }

        match tool.execute(call, ctx).await {
            Ok(result) => result.with_id(&call.id),
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "tool execution failed");
                ToolResult::failure(&call.name, format!("Error executing {}: {}", call.name, e))
                    .with_id(&call.id)
            }
        }
    }

    /// Get all tool schemas (bound as available actions on executor calls)
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
