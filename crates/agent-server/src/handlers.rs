//! HTTP Handlers
//!
//! One remediation session per `/chat` request: prepare the workspace, run
//! the workflow to completion, render the plan and trajectory, tear the
//! workspace down. The response carries everything a caller needs to audit
//! the session.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use agent_core::session::RepositoryDescriptor;
use agent_core::tool::ToolContext;
use agent_tools::{prepare_session_workspace, teardown_session_workspace};
use agent_workflow::{format_plans_to_markdown, SessionState};

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub codebase: Vec<RepositoryDescriptor>,
    pub session_id: String,
    #[serde(default)]
    pub sa_key_bucket_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub agent_response: String,
    pub plan: String,
    pub status: String,
    pub message: String,
    pub agent_trajectory: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: &str) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            code: "INVALID_REQUEST".into(),
        }),
    )
}

fn internal_error(error: String, code: &str) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error,
            code: code.to_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.provider.health_check().await.unwrap_or(false);
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
    })
}

/// Root endpoint with a pointer to the API surface
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "DevOps Agent API",
        "endpoints": ["/health", "/chat"],
    }))
}

/// Run one remediation session end to end
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    if payload.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    if payload.session_id.trim().is_empty() {
        return Err(bad_request("session_id must not be empty"));
    }

    tracing::info!(session_id = %payload.session_id, "chat session started");

    let ctx = ToolContext {
        session_id: payload.session_id.clone(),
        workspace_root: state.config.workspace_root.clone(),
        codebase: payload.codebase.clone(),
        github: state.config.github.clone(),
        command_timeout: state.config.command_timeout,
    };

    prepare_session_workspace(&ctx, payload.sa_key_bucket_link.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to prepare session workspace");
            internal_error(e.user_message(), "WORKSPACE_ERROR")
        })?;

    let mut session = SessionState::new(
        payload.query,
        payload.codebase,
        payload.session_id.clone(),
        state.config.workflow.max_executor_cycles,
    );

    let run = state
        .workflow
        .run(&mut session, &ctx, CancellationToken::new())
        .await;

    if let Err(e) = teardown_session_workspace(&ctx).await {
        tracing::warn!(error = %e, session_id = %payload.session_id, "workspace teardown failed");
    }

    if let Err(e) = run {
        tracing::error!(error = %e, session_id = %payload.session_id, "workflow failed");
        return Err(internal_error(e.user_message(), "WORKFLOW_ERROR"));
    }

    tracing::info!(
        session_id = %payload.session_id,
        input_tokens = session.usage.input_tokens,
        output_tokens = session.usage.output_tokens,
        "chat session finished"
    );

    Ok(Json(ChatResponse {
        agent_response: session.agent_response.clone(),
        plan: format_plans_to_markdown(&session.plans),
        status: "success".into(),
        message: "devops agent launched successfully.".into(),
        agent_trajectory: session.trajectory_string(),
        input_tokens: session.usage.input_tokens,
        output_tokens: session.usage.output_tokens,
    }))
}
