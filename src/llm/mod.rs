//! Language-model contract
//!
//! Planner, synthesizer and the LLM-backed tools only ever see
//! [`LanguageModel`]: prompt in, text out.

use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod scripted;

pub use gemini::GeminiClient;
pub use scripted::{Reply, ScriptedModel};

/// Synchronous-from-the-caller completion. Every failure is
/// [`crate::error::OrchestrationError::ModelInvocationError`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
