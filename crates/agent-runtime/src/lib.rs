//! Agent Runtime
//!
//! Concrete reasoning-client backends behind the `LlmProvider` trait.
//! Currently Ollama only.

pub mod ollama;

pub use ollama::{OllamaConfig, OllamaProvider};
