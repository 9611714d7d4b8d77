//! # agent-core
//!
//! Shared vocabulary for the remediation agent: transcript messages, the
//! reasoning-client contract, the tool system, and session types.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     agent-workflow                           │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │ Orchestrator│  │    Tool     │  │   LlmProvider        │  │
//! │  │  (phases)   │──│   Registry  │──│   (reasoning client) │  │
//! │  └─────────────┘  └─────────────┘  └──────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait lets the orchestration run against any inference
//! backend; the `Tool` trait lets capabilities be registered without the
//! orchestrator knowing their internals.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;
pub mod tool;

pub use error::{AgentError, Result};
pub use message::{Message, Role, Transcript};
pub use provider::{Completion, GenerationOptions, LlmProvider, TokenUsage};
pub use session::{GithubAppCredentials, RepositoryDescriptor};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult, ToolSchema};
