//! Scripted model for development & testing
//!
//! Keeps the orchestration loop runnable without a live LLM.

use crate::error::OrchestrationError;
use crate::llm::LanguageModel;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Answer with the prompt itself.
    Echo,
    Fail(String),
}

/// Replays queued replies in order and records every prompt.
/// Once the queue is drained it echoes.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Reply::Text(t.into())))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
            .unwrap_or(Reply::Echo);

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Echo => Ok(prompt.to_string()),
            Reply::Fail(reason) => Err(OrchestrationError::ModelInvocationError(reason)),
        }
    }
}
