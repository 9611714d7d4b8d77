//! Server Configuration
//!
//! Everything comes from environment variables with working defaults, so a
//! bare `cargo run` against a local Ollama works without a .env file.

use std::path::PathBuf;
use std::time::Duration;

use agent_core::provider::GenerationOptions;
use agent_core::session::GithubAppCredentials;
use agent_workflow::WorkflowConfig;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: String,

    /// Root under which per-session workspaces live
    pub workspace_root: PathBuf,

    /// Wall-clock bound for any single tool subprocess
    pub command_timeout: Duration,

    /// Workflow tuning (budgets, cooldown, recursion limit, generation)
    pub workflow: WorkflowConfig,

    /// GitHub App credentials; git tools fail without them
    pub github: Option<GithubAppCredentials>,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = WorkflowConfig::default();
        let workflow = WorkflowConfig {
            max_executor_cycles: env_parse("MAX_EXECUTOR_CYCLES", defaults.max_executor_cycles),
            executor_cooldown: Duration::from_secs(env_parse(
                "EXECUTOR_COOLDOWN_SECS",
                defaults.executor_cooldown.as_secs(),
            )),
            recursion_limit: env_parse("RECURSION_LIMIT", defaults.recursion_limit),
            generation: GenerationOptions {
                model: std::env::var("OLLAMA_MODEL")
                    .unwrap_or_else(|_| GenerationOptions::default().model),
                ..GenerationOptions::default()
            },
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into()),
            workspace_root: PathBuf::from(
                std::env::var("WORKSPACE_ROOT").unwrap_or_else(|_| "./tmp".into()),
            ),
            command_timeout: Duration::from_secs(env_parse("COMMAND_TIMEOUT_SECS", 300)),
            workflow,
            github: github_credentials_from_env(),
        }
    }
}

/// GITHUBAPP_PRIVATE_KEY may hold the PEM inline or a path to the key file
fn github_credentials_from_env() -> Option<GithubAppCredentials> {
    let app_id = std::env::var("GITHUBAPP_ID").ok()?;
    let key_value = std::env::var("GITHUBAPP_PRIVATE_KEY").ok()?;
    let private_key = if key_value.contains("-----BEGIN") {
        key_value
    } else {
        match std::fs::read_to_string(&key_value) {
            Ok(pem) => pem,
            Err(e) => {
                tracing::warn!(path = %key_value, error = %e, "could not read GitHub App key file");
                return None;
            }
        }
    };
    Some(GithubAppCredentials {
        app_id,
        private_key,
    })
}
