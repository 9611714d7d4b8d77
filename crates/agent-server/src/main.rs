//! DevOps Remediation Agent HTTP Server
//!
//! Axum-based ingress. A `/chat` request runs one bounded remediation
//! session: router, planner/executor loop with the full tool registry,
//! summarizer, with the session workspace prepared before and removed after.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::LlmProvider;
use agent_runtime::OllamaProvider;
use agent_tools::{full_registry, GithubClient};
use agent_workflow::{MemoryCheckpointStore, Workflow};

use crate::config::ServerConfig;
use crate::handlers::{chat_handler, health_check, root};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Arc::new(ServerConfig::from_env());

    let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::from_env()?);
    match provider.health_check().await {
        Ok(true) => tracing::info!("connected to Ollama"),
        Ok(false) | Err(_) => {
            tracing::warn!("Ollama not available - sessions will fail");
            tracing::warn!("make sure Ollama is running: ollama serve");
        }
    }

    if config.github.is_some() {
        tracing::info!("GitHub App credentials configured");
    } else {
        tracing::warn!("GitHub App credentials not configured - git tools disabled");
        tracing::warn!("set GITHUBAPP_ID and GITHUBAPP_PRIVATE_KEY in .env");
    }

    let tools = full_registry(Arc::new(GithubClient::new()));
    tracing::info!("registered {} tools:", tools.len());
    let mut names = tools.names();
    names.sort_unstable();
    for name in names {
        tracing::info!("  {}", name);
    }

    let workflow = Arc::new(Workflow::new(
        Arc::clone(&provider),
        Arc::new(tools),
        config.workflow.clone(),
        Arc::new(MemoryCheckpointStore::new()),
    ));

    let app_state = AppState {
        provider,
        workflow,
        config: Arc::clone(&config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/chat", post(chat_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("devops agent server running on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
