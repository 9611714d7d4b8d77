//! Reasoning-Client Contract
//!
//! Common interface to the planning/generation oracle. Every call takes an
//! ordered transcript and returns generated text, zero or more tool calls,
//! and a usage record. Responses are untrusted: absent usage metadata is
//! folded in as zero cost by the orchestration layer, and a response carrying
//! both freeform text and tool calls is valid.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "llama3.2", "qwen2.5-coder")
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Token usage statistics for a single call
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// Response from a reasoning-client call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Tool calls requested alongside the text (possibly empty)
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Token usage, if the provider reported it
    pub usage: Option<TokenUsage>,
}

impl Completion {
    /// Whether the response requested any tool calls
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Usage with absent/garbled metadata treated as zero cost
    pub fn usage_or_zero(&self) -> TokenUsage {
        self.usage.unwrap_or_default()
    }
}

/// Strategy trait for reasoning clients
///
/// Implement this trait to add support for new inference backends.
/// The workflow works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool>;

    /// Generate a completion from a transcript
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion>;

    /// Generate a completion with tool schemas bound as available actions
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
        tools: &[ToolSchema],
    ) -> Result<Completion>;
}
