//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Reasoning-client (LLM provider) error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Phase-transition ceiling reached in the workflow driver
    #[error("Recursion limit ({0}) reached")]
    RecursionLimit(usize),

    /// Session cancelled via its cancellation token
    #[error("Session cancelled")]
    Cancelled,

    /// Parse error (e.g., plan or completion-signal parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Session workspace error (unreadable/missing workspace directory)
    #[error("Workspace error: {0}")]
    Workspace(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication failed (GitHub App, service account)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::ProviderUnavailable(_) | AgentError::Io(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Provider(msg) => format!("The reasoning service encountered an error: {}", msg),
            AgentError::ProviderUnavailable(_) => {
                "The reasoning service is currently unavailable. Please try again.".into()
            }
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::ToolValidation(msg) => format!("Invalid tool input: {}", msg),
            AgentError::ToolExecution(msg) => format!("Tool error: {}", msg),
            AgentError::RecursionLimit(_) => {
                "The session exceeded its step budget. Please try a narrower request.".into()
            }
            AgentError::Cancelled => "The session was cancelled.".into(),
            AgentError::Workspace(msg) => format!("Session workspace error: {}", msg),
            AgentError::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            AgentError::Config(msg) => format!("Configuration error: {}", msg),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Other(err.to_string())
    }
}
