//! Application State

use std::sync::Arc;

use agent_core::LlmProvider;
use agent_workflow::Workflow;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// LLM provider (Ollama)
    pub provider: Arc<dyn LlmProvider>,

    /// Session orchestrator
    pub workflow: Arc<Workflow>,

    /// Server configuration
    pub config: Arc<ServerConfig>,
}
